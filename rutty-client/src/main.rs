//! RuTTY console client: entry point.
//!
//! ```text
//! rutty-client                      Connect to the configured origin
//! rutty-client http://host:3000     Connect to a specific server
//! rutty-client --config <path>      Use custom config TOML
//! rutty-client --gen-config         Dump default config and exit
//! ```
//!
//! Press Ctrl-] to detach.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rutty_core::{
    ConnectionStatusIndicator, StatusView, TerminalSurface, TerminalTransport, WsConnector,
};

use rutty_client::config::{ClientConfig, LoggingConfig};
use rutty_client::console::ConsoleSurface;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "rutty-client", about = "Attach this terminal to a RuTTY server")]
struct Cli {
    /// Server origin (overrides config). Example: http://127.0.0.1:3000
    origin: Option<String>,

    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "rutty-client.toml")]
    config: PathBuf,

    /// Reconnection delay in seconds until the server sends its own.
    #[arg(short, long)]
    reconnect: Option<u64>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        println!("{}", ClientConfig::default_toml()?);
        return Ok(());
    }

    let loaded = ClientConfig::read(&cli.config);
    let mut config = loaded.as_ref().cloned().unwrap_or_default();
    if let Some(origin) = cli.origin {
        config.network.origin = origin;
    }
    if let Some(seconds) = cli.reconnect {
        config.network.reconnect = Some(seconds);
    }

    init_tracing(&config.logging)?;
    info!("rutty-client v{}", env!("CARGO_PKG_VERSION"));
    match &loaded {
        Ok(_) => info!("config: {}", cli.config.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("no config at {}; using defaults", cli.config.display())
        }
        Err(e) => warn!("invalid config {}: {e}; using defaults", cli.config.display()),
    }

    let origin = config.origin()?;
    info!("server: {origin}");

    // ── 1. Transport ────────────────────────────────────────────

    let status = ConnectionStatusIndicator::new();
    let status_task = tokio::spawn(show_status(status.subscribe()));
    let mut transport = TerminalTransport::new(status, WsConnector::new(), &origin)
        .with_reconnect(config.network.reconnect);

    // ── 2. Console ──────────────────────────────────────────────

    let raw = RawModeGuard::enable()?;
    crossterm::execute!(io::stdout(), crossterm::event::EnableBracketedPaste)?;

    let mut surface = ConsoleSurface::new(transport.handle())?;
    surface.set_title(&config.terminal.title);

    // ── 3. Run until detached or closed for good ────────────────

    transport.activate(surface);
    transport.run().await;

    // ── 4. Shutdown ─────────────────────────────────────────────

    status_task.abort();
    let _ = status_task.await;
    drop(raw);
    println!();
    info!("session ended: {}", transport.status().view().text);

    Ok(())
}

/// Keeps the console in raw mode with bracketed paste; restores it when
/// dropped, including on early error returns.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(io::stdout(), crossterm::event::DisableBracketedPaste);
        if let Err(e) = crossterm::terminal::disable_raw_mode() {
            warn!("failed to restore terminal: {e}");
        }
    }
}

/// Initialise tracing: RUST_LOG first, then the configured level.
fn init_tracing(logging: &LoggingConfig) -> io::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.file.is_empty() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&logging.file)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

/// Print every status change on its own line, below the remote output.
async fn show_status(mut rx: watch::Receiver<StatusView>) {
    while rx.changed().await.is_ok() {
        let line = {
            let view = rx.borrow_and_update();
            format!("\r\n[{}] {}\r\n", view.state.class_name(), view.text)
        };
        let mut err = io::stderr().lock();
        let _ = err.write_all(line.as_bytes()).and_then(|()| err.flush());
    }
}
