//! cchat CLI - chat server and terminal client.
//!
//! This is the main binary entry point. See the `cchat` library for the
//! protocol and session logic.

use std::fs::File;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use cchat::{tui, Client, ClientConfig, Outcome, Server, ServerConfig};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;

/// Global allocator configured per M-MIMALLOC-APPS guideline.
/// mimalloc provides better multi-threaded performance than the system allocator.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

// CLI
#[derive(Parser)]
#[command(name = "cchat")]
#[command(version)]
#[command(about = "Terminal chat with offline mailboxes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the chat server
    Server {
        /// Port to listen on [env: CCHAT_PORT]
        #[arg(long)]
        port: Option<String>,
    },
    /// Connect to a server as a user
    Client {
        /// User name (letters and digits) [env: CCHAT_NAME]
        #[arg(long)]
        name: Option<String>,
        /// Server IPv4 address [env: CCHAT_HOST]
        #[arg(long)]
        host: Option<String>,
        /// Server port [env: CCHAT_PORT]
        #[arg(long)]
        port: Option<String>,
    },
}

/// Run the server until SIGINT/SIGTERM/SIGHUP.
fn run_server(port: Option<String>) -> Result<()> {
    let config = ServerConfig::resolve(port)?;
    let _log_worker = cchat::logging::init(std::io::stdout())?;

    let shutdown = Arc::new(AtomicBool::new(false));
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::flag;
    flag::register(SIGINT, Arc::clone(&shutdown))?;
    flag::register(SIGTERM, Arc::clone(&shutdown))?;
    flag::register(SIGHUP, Arc::clone(&shutdown))?;

    let server = Server::bind(&config)?;
    log::info!("cchat v{} server starting", env!("CARGO_PKG_VERSION"));
    server.run(&shutdown)
}

/// Run the terminal client. Logs go to a file so they never reach the TUI.
fn run_client(name: Option<String>, host: Option<String>, port: Option<String>) -> Result<()> {
    let config = ClientConfig::resolve(name, host, port)?;

    let log_path = ClientConfig::log_path();
    let log_file = File::create(&log_path)
        .with_context(|| format!("Failed to create log file at {}", log_path.display()))?;
    let _log_worker = cchat::logging::init(log_file)?;

    // Log panics and restore the terminal before the default report
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        log::error!("PANIC: {panic_info}");
        let _ = crossterm::terminal::disable_raw_mode();
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::cursor::Show
        );
        default_hook(panic_info);
    }));

    let client = Client::connect(&config)?;
    log::info!("cchat v{} client connected as {}", env!("CARGO_PKG_VERSION"), config.name);

    match client.run(Box::new(tui::TerminalFrontend)) {
        Outcome::Rejected => println!("Log in as {} cannot be performed.", config.name),
        Outcome::Ended => log::info!("client session ended"),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Server { port } => run_server(port),
        Commands::Client { name, host, port } => run_client(name, host, port),
    }
}
