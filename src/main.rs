//! archprov - main entry point

use archprov::app::App;
use archprov::catalog::SoftwareCatalog;
use archprov::cli::Cli;
use archprov::command_runner::{CommandRunner, DryRunRunner, SystemRunner};
use archprov::error::{ProvisionError, Result};
use archprov::hardware::HostInfo;
use archprov::process_guard;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::OpenOptions;
use std::io::stdout;
use std::path::Path;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Log to `path`; `RUST_LOG` overrides the default `info` level.
fn init_logging(path: &Path) -> std::io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .init();
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    if let Err(e) = init_logging(&cli.log_file) {
        // Still usable without a log; nothing else may write to the terminal once the TUI starts
        eprintln!("warning: cannot open log file {}: {}", cli.log_file.display(), e);
    }
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "archprov starting");

    if let Err(e) = process_guard::init_signal_handlers() {
        tracing::warn!(error = %e, "failed to install signal handlers, relying on drop cleanup");
    }

    let target = cli.target();
    if let Err(e) = target.validate() {
        eprintln!("✗ {}", e);
        return ExitCode::FAILURE;
    }

    let runner: Arc<dyn CommandRunner> = if cli.dry_run {
        tracing::info!("dry-run mode: commands will be logged, not executed");
        Arc::new(DryRunRunner)
    } else {
        Arc::new(SystemRunner::new(cli.command_timeout()))
    };

    let app = App::new(
        SoftwareCatalog::default(),
        runner,
        target,
        HostInfo::detect(),
        cli.dry_run,
    );

    match run_tui(app) {
        Ok(()) => {
            tracing::info!("archprov exiting normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "terminal UI failed");
            eprintln!("✗ {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_tui(mut app: App) -> Result<()> {
    enable_raw_mode().map_err(|e| ProvisionError::terminal(format!("Failed to enable raw mode: {}", e)))?;
    if let Err(e) = crossterm::execute!(stdout(), EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(ProvisionError::terminal(format!("Failed to enter alternate screen: {}", e)));
    }

    let result = Terminal::new(CrosstermBackend::new(stdout()))
        .map_err(|e| ProvisionError::terminal(format!("Failed to create terminal: {}", e)))
        .and_then(|mut terminal| {
            let result = app.run(&mut terminal);
            let _ = terminal.show_cursor();
            result
        });

    // Always restore the terminal, even if the app failed
    let _ = disable_raw_mode();
    let _ = crossterm::execute!(stdout(), LeaveAlternateScreen);

    result
}
