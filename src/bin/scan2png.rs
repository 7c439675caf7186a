//! CLI binary for scan2png.
//!
//! A thin shim over the library crate: `save` drives a [`ScanSession`],
//! `setup` writes the protocol installer bundle, and `login` fires the
//! custom-protocol login handoff.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use protocol_setup::{build_bundle, SetupParams, BUNDLE_FILE_NAME};
use scan2png::persist::archive::deliver;
use scan2png::{
    DirectoryPicker, FixedDirectory, LaunchConfig, LaunchOutcome, LogEntry, LogObserver,
    RunStatus, ScanSession, SessionConfig, Severity, SystemOpener,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── Run-log observer using indicatif ─────────────────────────────────────────

/// Prints each run-log line above a spinner, coloured by severity.
struct CliLogObserver {
    bar: ProgressBar,
}

impl CliLogObserver {
    fn new(prefix: &str) -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix(prefix.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl LogObserver for CliLogObserver {
    fn on_entry(&self, entry: &LogEntry) {
        let time = dim(&format!("[{}]", entry.timestamp.format("%H:%M:%S")));
        let line = match entry.severity {
            Severity::Error => format!("{time} {}", red(&entry.message)),
            Severity::Success => format!("{time} {}", green(&entry.message)),
            Severity::Info => format!("{time} {}", entry.message),
        };
        self.bar.println(line);
        self.bar.set_message(entry.message.clone());
    }
}

/// Plain stderr lines when the spinner is off.
struct PlainLogObserver;

impl LogObserver for PlainLogObserver {
    fn on_entry(&self, entry: &LogEntry) {
        eprintln!("{entry}");
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a PDF and save the pages into a folder
  scan2png save invoice.pdf --out-dir ./scan

  # No folder: scan-files.zip lands in ./downloads
  scan2png save photo.jpg --download-dir ./downloads

  # Pick the folder interactively (requires the `dialog` feature)
  scan2png save invoice.pdf --pick

  # Write the protocol installer bundle
  scan2png setup -o ie-setup.zip

  # Trigger the IE-mode login
  SCAN2PNG_PASSWORD=... scan2png login --id 12345

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to an existing libpdfium
  RUST_LOG                Override tracing filter (e.g. scan2png=debug)
  SCAN2PNG_*              Every flag has an env override, e.g. SCAN2PNG_OUT_DIR
"#;

/// Normalise scanned documents to PNG pages and save them.
#[derive(Parser, Debug)]
#[command(
    name = "scan2png",
    version,
    about = "Normalise scanned documents (PNG, JPEG, PDF) to numbered PNG pages",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "SCAN2PNG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "SCAN2PNG_QUIET")]
    quiet: bool,

    /// Disable the spinner.
    #[arg(long, global = true, env = "SCAN2PNG_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert one file and save the pages to a folder or scan-files.zip.
    Save {
        /// PNG, JPEG or PDF file.
        file: PathBuf,

        /// Save pages into this directory (created if missing).
        #[arg(long, env = "SCAN2PNG_OUT_DIR", conflicts_with = "pick")]
        out_dir: Option<PathBuf>,

        /// Choose the output folder with a native dialog.
        #[arg(long, env = "SCAN2PNG_PICK")]
        pick: bool,

        /// Where scan-files.zip is written when no folder is used.
        #[arg(long, env = "SCAN2PNG_DOWNLOAD_DIR", default_value = ".")]
        download_dir: PathBuf,

        /// Declared media type (e.g. image/jpeg) when the extension is missing.
        #[arg(long, env = "SCAN2PNG_MEDIA_TYPE")]
        media_type: Option<String>,

        /// Print the persistence outcome as JSON on stdout.
        #[arg(long, env = "SCAN2PNG_JSON")]
        json: bool,
    },

    /// Write the protocol installer bundle (ie-setup.zip).
    Setup {
        /// Output path for the bundle.
        #[arg(short, long, env = "SCAN2PNG_SETUP_OUTPUT", default_value = BUNDLE_FILE_NAME)]
        output: PathBuf,

        /// Custom URL scheme to register.
        #[arg(long, env = "SCAN2PNG_PROTOCOL", default_value = protocol_setup::DEFAULT_PROTOCOL)]
        protocol: String,

        /// Install directory on the Windows workstation.
        #[arg(long, env = "SCAN2PNG_INSTALL_DIR", default_value = protocol_setup::DEFAULT_INSTALL_DIR)]
        install_dir: String,

        /// Login page the launcher opens.
        #[arg(long, env = "SCAN2PNG_TARGET_URL", default_value = protocol_setup::DEFAULT_TARGET_URL)]
        target_url: String,
    },

    /// Open `<protocol>://login?id=..&pw=..` and report whether it was claimed.
    Login {
        /// Five-digit employee ID.
        #[arg(long, env = "SCAN2PNG_ID")]
        id: String,

        /// Password (prefer the environment variable).
        #[arg(long, env = "SCAN2PNG_PASSWORD", hide_env_values = true)]
        password: String,

        /// Custom URL scheme.
        #[arg(long, env = "SCAN2PNG_PROTOCOL", default_value = protocol_setup::DEFAULT_PROTOCOL)]
        protocol: String,

        /// Seconds to wait for a handler.
        #[arg(long, env = "SCAN2PNG_LAUNCH_TIMEOUT", default_value_t = 3)]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The run log already tells the user what happens; library tracing
    // stays at warn unless asked for.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let show_progress = !cli.quiet && !cli.no_progress;

    match cli.command {
        Command::Save {
            file,
            out_dir,
            pick,
            download_dir,
            media_type,
            json,
        } => {
            let picker = resolve_picker(out_dir, pick)?;
            run_save(&file, picker, download_dir, media_type, json, show_progress, cli.quiet).await
        }
        Command::Setup {
            output,
            protocol,
            install_dir,
            target_url,
        } => {
            let params = SetupParams {
                protocol,
                install_dir,
                target_url,
            };
            run_setup(&output, &params, cli.quiet).await
        }
        Command::Login {
            id,
            password,
            protocol,
            timeout,
        } => {
            let config = LaunchConfig::new(protocol).with_timeout(Duration::from_secs(timeout));
            run_login(&id, &password, &config, cli.quiet).await
        }
    }
}

fn resolve_picker(out_dir: Option<PathBuf>, pick: bool) -> Result<Option<Arc<dyn DirectoryPicker>>> {
    if let Some(dir) = out_dir {
        return Ok(Some(Arc::new(FixedDirectory::new(dir))));
    }
    if pick {
        #[cfg(feature = "dialog")]
        {
            return Ok(Some(Arc::new(
                scan2png::persist::folder::DialogPicker::new().with_title("Select a folder to save into"),
            )));
        }
        #[cfg(not(feature = "dialog"))]
        bail!("--pick needs a build with the `dialog` feature; use --out-dir instead");
    }
    Ok(None)
}

fn observer_for(show_progress: bool, quiet: bool, prefix: &str) -> Option<Arc<CliLogObserver>> {
    (show_progress && !quiet).then(|| CliLogObserver::new(prefix))
}

async fn run_save(
    file: &Path,
    picker: Option<Arc<dyn DirectoryPicker>>,
    download_dir: PathBuf,
    media_type: Option<String>,
    json: bool,
    show_progress: bool,
    quiet: bool,
) -> Result<()> {
    let spinner = observer_for(show_progress, quiet, "Saving");

    let mut builder = SessionConfig::builder().download_dir(download_dir);
    if let Some(picker) = picker {
        builder = builder.picker(picker);
    }
    if let Some(ref s) = spinner {
        builder = builder.observer(s.clone());
    } else if !quiet {
        builder = builder.observer(Arc::new(PlainLogObserver));
    }
    let config = builder.build().context("Invalid configuration")?;

    let mut session = ScanSession::new(config);
    let registered = session.register_path(file, media_type).await;
    let outcome = match registered {
        Ok(()) => session.save().await,
        Err(e) => Err(e),
    };
    if let Some(ref s) = spinner {
        s.finish();
    }
    let outcome = outcome.with_context(|| format!("Failed to save '{}'", file.display()))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?
        );
    } else if !quiet {
        let location = outcome
            .location
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        match outcome.status {
            RunStatus::Succeeded => eprintln!(
                "{} {} files saved  {}",
                green("✔"),
                bold(&outcome.written.to_string()),
                dim(&location)
            ),
            RunStatus::Cancelled => eprintln!("{} Save cancelled", dim("–")),
            RunStatus::Failed => {}
        }
    }

    match outcome.status {
        RunStatus::Failed => bail!(
            "{}",
            outcome.error.unwrap_or_else(|| "save failed".to_string())
        ),
        _ => Ok(()),
    }
}

async fn run_setup(output: &Path, params: &SetupParams, quiet: bool) -> Result<()> {
    let bytes = build_bundle(params).context("Failed to build installer bundle")?;

    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let name = output
        .file_name()
        .and_then(|n| n.to_str())
        .context("Output path has no file name")?;
    let written = deliver(dir, name, &bytes)
        .await
        .with_context(|| format!("Failed to write '{}'", output.display()))?;

    if !quiet {
        eprintln!(
            "{} Wrote {}  {}",
            green("✔"),
            bold(&written.display().to_string()),
            dim(&format!("({} bytes)", bytes.len()))
        );
        eprintln!("  Extract it on the workstation and run install.bat once.");
    }
    Ok(())
}

async fn run_login(id: &str, password: &str, config: &LaunchConfig, quiet: bool) -> Result<()> {
    let mut builder = SessionConfig::builder();
    if !quiet {
        builder = builder.observer(Arc::new(PlainLogObserver));
    }
    let mut session = ScanSession::new(builder.build()?);

    let outcome = session
        .trigger_login(id, password, config, &SystemOpener)
        .await
        .context("Login handoff failed")?;

    match outcome {
        LaunchOutcome::Claimed => Ok(()),
        LaunchOutcome::Unclaimed => bail!(
            "No handler for {}:// answered. Run `scan2png setup` and install the bundle first.",
            config.protocol
        ),
    }
}
