//! CLI binary for edgequake-restyle.
//!
//! A thin shim over the library crate: `serve` runs the HTTP service and
//! `transform` restyles a single local image.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use edgequake_restyle::pipeline::input::{default_output_path, load_image};
use edgequake_restyle::server::{self, DEFAULT_BODY_LIMIT};
use edgequake_restyle::{RestyleConfig, Restyler, Stage, StageObserver};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── Spinner observer ─────────────────────────────────────────────────────────

/// Shows the current pipeline stage on a spinner.
struct SpinnerObserver {
    bar: ProgressBar,
}

impl SpinnerObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Restyle");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl StageObserver for SpinnerObserver {
    fn on_stage(&self, stage: Stage) {
        if stage.is_terminal() {
            self.bar.finish_and_clear();
        } else {
            self.bar.set_message(format!("{stage}…"));
        }
    }
}

// ── CLI definition ───────────────────────────────────────────────────────────

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP service on port 3000
  restyle serve

  # Restyle one photo, writing sala.restyled.png next to it
  restyle transform sala.jpg

  # Full JSON result (image + items) on stdout
  restyle transform sala.jpg --json > result.json

HTTP API:
  POST /api/transform   {"imageBase64": "<base64 or data URI>"}
    200 {"imageBase64": "...", "items": ["...", ...]}
    4xx/5xx {"error": "..."}
  GET  /health

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY           Credential for both services (required)
  RESTYLE_EDIT_URL         Image-edit endpoint
  RESTYLE_CHAT_URL         Chat-completions endpoint
  RESTYLE_EDIT_MODEL       Image-edit model (default gpt-image-1.5)
  RESTYLE_CHAT_MODEL       Vision chat model (default gpt-4o)
  RESTYLE_DEFAULT_MIME     MIME type for bare base64 (default image/png)
  RESTYLE_EDIT_TIMEOUT     Edit call timeout, seconds (default 120)
  RESTYLE_EXTRACT_TIMEOUT  Listing call timeout, seconds (default 60)
  RESTYLE_BIND             Server bind address (default 0.0.0.0:3000)
"#;

/// Redecorate room photos and list the furniture in the result.
#[derive(Parser, Debug)]
#[command(
    name = "restyle",
    version,
    about = "Redecorate room photos with an image-edit model and list the new furniture",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Service credential.
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Image-edit endpoint URL.
    #[arg(long, global = true, env = "RESTYLE_EDIT_URL")]
    edit_url: Option<String>,

    /// Chat-completions endpoint URL.
    #[arg(long, global = true, env = "RESTYLE_CHAT_URL")]
    chat_url: Option<String>,

    /// Image-edit model ID.
    #[arg(long, global = true, env = "RESTYLE_EDIT_MODEL")]
    edit_model: Option<String>,

    /// Vision chat model ID.
    #[arg(long, global = true, env = "RESTYLE_CHAT_MODEL")]
    chat_model: Option<String>,

    /// MIME type assumed for bare base64 input.
    #[arg(long, global = true, env = "RESTYLE_DEFAULT_MIME")]
    default_mime: Option<String>,

    /// Edit call timeout in seconds.
    #[arg(long, global = true, env = "RESTYLE_EDIT_TIMEOUT", default_value_t = 120)]
    edit_timeout: u64,

    /// Listing call timeout in seconds.
    #[arg(long, global = true, env = "RESTYLE_EXTRACT_TIMEOUT", default_value_t = 60)]
    extract_timeout: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "RESTYLE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "RESTYLE_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "RESTYLE_BIND", default_value = "0.0.0.0:3000")]
        bind: SocketAddr,

        /// Maximum request body size in bytes.
        #[arg(long, env = "RESTYLE_BODY_LIMIT", default_value_t = DEFAULT_BODY_LIMIT)]
        body_limit: usize,
    },

    /// Restyle a single local image.
    Transform {
        /// Input photo (png, jpg, webp).
        input: PathBuf,

        /// Where to write the edited image. Default: <stem>.restyled.png
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the full JSON result instead of the item list.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already reports progress for one-shot transforms, so the
    // library's INFO lines are only shown for the server.
    let spinner_active = matches!(cli.command, Command::Transform { json: false, .. }) && !cli.quiet;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || spinner_active {
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

    let config = build_config(&cli)?;

    match cli.command {
        Command::Serve { bind, body_limit } => {
            let restyler = Restyler::new(config).context("Failed to initialise pipeline")?;
            let app = server::router(Arc::new(restyler), body_limit);
            server::serve(bind, app)
                .await
                .with_context(|| format!("Server on {bind} failed"))?;
        }
        Command::Transform {
            ref input,
            ref output,
            json,
        } => {
            let mut restyler = Restyler::new(config).context("Failed to initialise pipeline")?;
            if spinner_active && !cli.verbose {
                restyler = restyler.with_observer(SpinnerObserver::new());
            }

            let request = load_image(input, &restyler.config().default_mime)
                .await
                .context("Failed to load input image")?;
            let result = restyler.run(request).await.context("Restyle failed")?;

            let output_path = output.clone().unwrap_or_else(|| default_output_path(input));
            let written = result
                .write_image(&output_path)
                .await
                .context("Failed to save edited image")?;

            if json {
                let text =
                    serde_json::to_string_pretty(&result).context("Failed to serialise result")?;
                println!("{text}");
            } else {
                for item in &result.items {
                    println!("{item}");
                }
            }

            if !cli.quiet && !json {
                eprintln!(
                    "{} {}  {}  {}",
                    green("✔"),
                    bold(&output_path.display().to_string()),
                    dim(&format!("{written} bytes")),
                    dim(&format!("{} items", result.items.len())),
                );
            }
        }
    }

    Ok(())
}

/// Map CLI args to `RestyleConfig`.
fn build_config(cli: &Cli) -> Result<RestyleConfig> {
    let mut builder = RestyleConfig::builder()
        .edit_timeout_secs(cli.edit_timeout)
        .extract_timeout_secs(cli.extract_timeout);

    if let Some(key) = cli.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        builder = builder.api_key(key);
    }
    if let Some(ref url) = cli.edit_url {
        builder = builder.edit_url(url);
    }
    if let Some(ref url) = cli.chat_url {
        builder = builder.chat_url(url);
    }
    if let Some(ref model) = cli.edit_model {
        builder = builder.edit_model(model);
    }
    if let Some(ref model) = cli.chat_model {
        builder = builder.chat_model(model);
    }
    if let Some(ref mime) = cli.default_mime {
        builder = builder.default_mime(mime);
    }

    builder.build().context("Invalid configuration")
}
