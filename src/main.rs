// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

// Use library instead of local modules
use receipt_scanner::client::DEFAULT_SERVER_URL;
use receipt_scanner::logging::init_logging;
use receipt_scanner::{ReceiptClient, ReceiptView, UploadController, ViewState};

#[derive(Parser)]
#[command(name = "receipt-scanner", version, about = "Scan receipts with the receipt server")]
struct Cli {
    /// Base URL of the receipt server
    #[arg(long, env = "RECEIPT_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    server: String,

    /// Log level (RUST_LOG overrides). Defaults to `info` for the UI, `warn` for scan.
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive terminal UI (default)
    Ui {
        /// Start uploading this file right away
        file: Option<PathBuf>,
    },
    /// Scan one file and print the result
    Scan { file: PathBuf },
}

impl Cli {
    /// `--log-level` if given, else `warn` for scan and `info` for the UI
    fn log_level(&self) -> &str {
        match (&self.log_level, &self.command) {
            (Some(level), _) => level.as_str(),
            (None, Some(Command::Scan { .. })) => "warn",
            (None, _) => "info",
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = ReceiptClient::new(&cli.server);
    let log_level = cli.log_level().to_string();

    match cli.command {
        Some(Command::Scan { file }) => {
            init_logging(&log_level);
            run_scan(client, file)
        }
        Some(Command::Ui { file }) => run_ui_mode(client, file, &log_level),
        None => run_ui_mode(client, None, &log_level),
    }
}

fn run_scan(client: ReceiptClient, file: PathBuf) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let mut controller = UploadController::new();

    let job = match controller.select_path(file) {
        Some(job) => job,
        None => return Ok(()),
    };

    println!("🧾 Analyzing {}...", job.preview.file_name());
    let outcome = runtime.block_on(job.run(&client));
    controller.finish(outcome);

    match controller.state() {
        ViewState::Result { receipt, .. } => {
            println!();
            print!("{}", ReceiptView::from(receipt).to_text());
            Ok(())
        }
        ViewState::Error { message } => {
            eprintln!("❌ Oops! Something went wrong.");
            eprintln!("   {}", message);
            std::process::exit(1);
        }
        _ => Ok(()),
    }
}

#[cfg(feature = "tui")]
fn run_ui_mode(client: ReceiptClient, file: Option<PathBuf>, log_level: &str) -> Result<()> {
    let log_path = std::env::temp_dir().join("receipt-scanner.log");
    receipt_scanner::logging::init_file_logging(&log_path, log_level)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let mut app = ui::App::new(client, runtime.handle().clone());

    if let Some(file) = file {
        app.submit_selection(&file.to_string_lossy());
    }

    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed (log: {})", log_path.display());

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_client: ReceiptClient, _file: Option<PathBuf>, _log_level: &str) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or scan a single file: receipt-scanner scan <FILE>");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("receipt-scanner").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_scan_honors_log_level() {
        assert_eq!(parse(&["--log-level", "debug", "scan", "r.png"]).log_level(), "debug");
    }

    #[test]
    fn test_log_level_defaults_per_command() {
        assert_eq!(parse(&["scan", "r.png"]).log_level(), "warn");
        assert_eq!(parse(&["ui"]).log_level(), "info");
        assert_eq!(parse(&[]).log_level(), "info");
    }
}
