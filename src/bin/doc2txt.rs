//! CLI binary for doc2txt.
//!
//! `serve` runs the backend; `submit` and `health` talk to a running one.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use doc2txt::client::DEFAULT_SERVER_URL;
use doc2txt::{Doc2TxtClient, ServiceConfig};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the backend against a local Tika server
  doc2txt serve --tika-endpoint http://localhost:9998

  # Extract text through Tika
  doc2txt submit report.pdf

  # Extract text with the in-process converter
  doc2txt submit --markitdown page.html

  # Full JSON response (text, metadata, parser_used)
  doc2txt submit --json report.pdf > report.json

  # Check both extractors
  doc2txt health

ENVIRONMENT VARIABLES:
  TIKA_SERVER_ENDPOINT    Tika server base URL (default http://localhost:9998)
  DOC2TXT_HOST            Bind address for `serve` (default 0.0.0.0)
  DOC2TXT_PORT            Bind port for `serve` (default 8005)
  DOC2TXT_WORKERS         HTTP worker threads (default one per core)
  DOC2TXT_TIKA_TIMEOUT    Tika request timeout in seconds (default 300)
  DOC2TXT_HEALTH_TIMEOUT  Tika health probe timeout in seconds (default 5)
  DOC2TXT_MAX_BODY_MB     Request body limit in MiB (default 64)
  DOC2TXT_TEMP_DIR        Directory for the local extractor's temp files
  PDFIUM_LIB_PATH         Path to libpdfium for PDF conversion
  DOC2TXT_SERVER          Backend URL used by `submit` and `health`
  RUST_LOG                Overrides the log filter
"#;

/// Document-to-text extraction proxy.
#[derive(Parser, Debug)]
#[command(
    name = "doc2txt",
    version,
    about = "Document-to-text extraction proxy over Apache Tika and an in-process converter",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOC2TXT_VERBOSE")]
    verbose: bool,

    /// Suppress all logs except errors.
    #[arg(short, long, global = true, env = "DOC2TXT_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP backend.
    Serve(ServeArgs),
    /// Send a file to a running backend and print the extracted text.
    Submit(SubmitArgs),
    /// Print the health report of a running backend.
    Health(RemoteArgs),
}

/// Flags for `serve`. Each one overrides the matching environment variable
/// read by `ServiceConfig::from_env`; unset flags keep the environment value
/// or the built-in default.
#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to bind (DOC2TXT_HOST, default 0.0.0.0).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (DOC2TXT_PORT, default 8005).
    #[arg(short, long)]
    port: Option<u16>,

    /// Tika server base URL (TIKA_SERVER_ENDPOINT).
    #[arg(long)]
    tika_endpoint: Option<String>,

    /// Per-request Tika timeout in seconds (DOC2TXT_TIKA_TIMEOUT, default 300).
    #[arg(long)]
    tika_timeout: Option<u64>,

    /// Health probe timeout in seconds (DOC2TXT_HEALTH_TIMEOUT, default 5).
    #[arg(long)]
    health_timeout: Option<u64>,

    /// HTTP worker threads (DOC2TXT_WORKERS, default one per core).
    #[arg(long)]
    workers: Option<usize>,

    /// Maximum request body in MiB (DOC2TXT_MAX_BODY_MB, default 64).
    #[arg(long)]
    max_body_mb: Option<usize>,

    /// Directory for temporary files (DOC2TXT_TEMP_DIR).
    #[arg(long)]
    temp_dir: Option<PathBuf>,

    /// Path to the pdfium shared library (PDFIUM_LIB_PATH).
    #[arg(long)]
    pdfium_lib: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RemoteArgs {
    /// Backend base URL.
    #[arg(long, env = "DOC2TXT_SERVER", default_value = DEFAULT_SERVER_URL)]
    server: String,

    /// Request timeout in seconds.
    #[arg(long, env = "DOC2TXT_CLIENT_TIMEOUT", default_value_t = 300)]
    timeout: u64,
}

#[derive(Args, Debug)]
struct SubmitArgs {
    /// File to extract.
    file: PathBuf,

    /// Use the in-process converter instead of Tika.
    #[arg(long, alias = "alternate")]
    markitdown: bool,

    /// Print the full JSON response instead of the text.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    remote: RemoteArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Submit(args) => submit(args).await,
        Command::Health(args) => health(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let config = build_config(&args)?;
    doc2txt::server::run(config).await.context("Server failed")
}

/// Environment first, then CLI flags on top.
fn build_config(args: &ServeArgs) -> Result<ServiceConfig> {
    let mut builder = ServiceConfig::from_env()
        .context("Invalid configuration in environment")?
        .into_builder();

    if let Some(ref host) = args.host {
        builder = builder.host(host.clone());
    }
    if let Some(port) = args.port {
        builder = builder.port(port);
    }
    if let Some(ref endpoint) = args.tika_endpoint {
        builder = builder.tika_endpoint(endpoint.clone());
    }
    if let Some(secs) = args.tika_timeout {
        builder = builder.tika_timeout_secs(secs);
    }
    if let Some(secs) = args.health_timeout {
        builder = builder.health_timeout_secs(secs);
    }
    if let Some(n) = args.workers {
        builder = builder.workers(n);
    }
    if let Some(mb) = args.max_body_mb {
        builder = builder.max_body_bytes(mb.saturating_mul(1024 * 1024));
    }
    if let Some(ref dir) = args.temp_dir {
        builder = builder.temp_dir(dir.clone());
    }
    if let Some(ref lib) = args.pdfium_lib {
        builder = builder.pdfium_library_path(lib.clone());
    }

    builder.build().context("Invalid configuration")
}

fn client(remote: &RemoteArgs) -> Result<Doc2TxtClient> {
    Doc2TxtClient::new(&remote.server, Duration::from_secs(remote.timeout))
        .context("Failed to create HTTP client")
}

async fn submit(args: SubmitArgs) -> Result<()> {
    let response = client(&args.remote)?
        .process_file(&args.file, args.markitdown)
        .await
        .with_context(|| format!("Failed to process {}", args.file.display()))?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&response).context("Failed to serialise response")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(response.text.as_bytes())
            .context("Failed to write to stdout")?;
        if !response.text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
        eprintln!(
            "{} chars via {}",
            response.text.chars().count(),
            response.parser_used
        );
    }

    Ok(())
}

async fn health(args: RemoteArgs) -> Result<()> {
    let status = client(&args)?
        .health()
        .await
        .context("Health check failed")?;

    println!("Service:      {}", status.service);
    println!("Status:       {}", status.status);
    println!("Tika server:  {}", status.tika_server);
    println!("Local:        {}", status.markitdown);
    Ok(())
}
