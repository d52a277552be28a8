//! Queue Kiosk Entry Point
//!
//! Launches the terminal queue display for one kiosk.
//!
//! Usage:
//!   queue-kiosk [OPTIONS]
//!
//! Configuration comes from `kiosk.toml`, then `KIOSK_*` environment
//! variables, then the flags below.

use std::fs::File;
use std::io;
use std::panic;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kiosk_core::config::default_config_path;
use kiosk_core::{load_config_from_path, ConfigOverrides, KioskConfig};
use kiosk_tui::App;

/// Live player queue display for a game kiosk
#[derive(Debug, Parser)]
#[command(name = "queue-kiosk", version, about)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, value_name = "PATH", env = "KIOSK_CONFIG")]
    config: Option<PathBuf>,

    /// Backend base URL
    #[arg(long, value_name = "URL")]
    server: Option<String>,

    /// Kiosk identifier
    #[arg(long, value_name = "ID")]
    kiosk_id: Option<String>,

    /// API key sent with mutating requests
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,

    /// Number of queue slots
    #[arg(long)]
    capacity: Option<usize>,

    /// Poll only; do not open the push channel
    #[arg(long)]
    no_push: bool,

    /// Do not connect to the local scanning agent
    #[arg(long)]
    no_agent: bool,

    /// Log file (the terminal belongs to the UI)
    #[arg(long, value_name = "PATH", env = "KIOSK_LOG_FILE")]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(url) = &self.server {
            overrides = overrides.with_base_url(url.as_str());
        }
        if let Some(id) = &self.kiosk_id {
            overrides = overrides.with_kiosk_id(id.as_str());
        }
        if let Some(key) = &self.api_key {
            overrides = overrides.with_api_key(key.as_str());
        }
        if let Some(capacity) = self.capacity {
            overrides = overrides.with_capacity(capacity);
        }
        if self.no_push {
            overrides = overrides.with_push_enabled(false);
        }
        if self.no_agent {
            overrides = overrides.with_agent_enabled(false);
        }
        overrides
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_path = cli
        .log_file
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("queue-kiosk.log"));
    let log_file = File::create(&log_path)?;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = resolve_config(&cli)?;

    // Check if we have a TTY before attempting initialization
    use std::io::IsTerminal;

    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("Error: queue-kiosk requires a terminal (TTY)");
        eprintln!();
        eprintln!("This usually means:");
        eprintln!("  - Running in a non-interactive environment (CI, container)");
        eprintln!("  - SSH without -t flag");
        eprintln!("  - Piped stdin/stdout");
        std::process::exit(1);
    }

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Run the app
    let result = run_app(&mut terminal, config).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    if result.is_ok() {
        println!("queue-kiosk stopped. Log: {}", log_path.display());
    }
    result
}

/// File, then environment, then flags
fn resolve_config(cli: &Cli) -> anyhow::Result<KioskConfig> {
    let path = cli.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(path)?;
    cli.overrides().apply(&mut config);
    config.validate()?;

    tracing::info!(
        source = ?config.source(),
        kiosk = %config.backend.kiosk_id,
        server = %config.backend.base_url,
        "configuration resolved"
    );
    Ok(config)
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: KioskConfig,
) -> anyhow::Result<()> {
    let size = crossterm::terminal::size()?;
    let mut app = App::connect(config, size)?;
    app.run(terminal).await
}
