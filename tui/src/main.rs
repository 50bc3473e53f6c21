//! Magic Man Entry Point
//!
//! Launches the terminal UI for Magic Man, the voice agent who may hang up
//! on you.
//!
//! # Usage
//!
//! ```bash
//! # Talk to the hosted agent
//! magic-man
//!
//! # Offline demo conversation, microphone always granted
//! magic-man --demo --microphone allow
//!
//! # Another agent, with a poof on exit
//! magic-man --agent-id agent_123 --exit-poof
//!
//! # Verbose logging (the terminal belongs to the UI, so logs go to a file)
//! RUST_LOG=debug magic-man --log-file /tmp/magic-man.log
//! ```

use std::fs;
use std::io;
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use magic_core::{ChannelKind, ConfigOverrides, ExitTransition, MagicConfig, MicrophonePolicy};
use magic_tui::App;

/// Magic Man - talk to a wizard in your terminal
#[derive(Parser, Debug)]
#[command(name = "magic-man")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Hosted agent identifier
    #[arg(long, value_name = "ID")]
    agent_id: Option<String>,

    /// Agent service WebSocket endpoint
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// Play the built-in demo conversation instead of connecting
    #[arg(long)]
    demo: bool,

    /// Configuration file path
    #[arg(short = 'c', long, env = "MAGIC_MAN_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Microphone permission policy (device, allow, deny)
    #[arg(long, value_name = "POLICY")]
    microphone: Option<MicrophonePolicy>,

    /// Vanish in a puff of smoke instead of disappearing at once
    #[arg(long)]
    exit_poof: bool,

    /// Log file path
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "MAGIC_MAN_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            agent_id: self.agent_id.clone(),
            endpoint: self.endpoint.clone(),
            channel: self.demo.then_some(ChannelKind::Scripted),
            microphone: self.microphone,
            exit_transition: self.exit_poof.then_some(ExitTransition::Poof),
        }
    }
}

/// Default log file (`$XDG_STATE_HOME/magic-man/magic-man.log`)
fn default_log_path() -> Option<PathBuf> {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|dir| dir.join("magic-man").join("magic-man.log"))
}

/// Initialize file logging
fn init_logging(path: &Path, level: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {parent:?}"))?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {path:?}"))?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "magic_man={level},magic_tui={level},magic_core={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = MagicConfig::load(args.config.as_deref(), &args.overrides())
        .context("Failed to load configuration")?;

    if let Some(log_path) = args.log_file.clone().or_else(default_log_path) {
        init_logging(&log_path, &args.log_level)?;
    }

    // Check if we have a TTY before attempting initialization
    use std::io::IsTerminal;

    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("Error: magic-man requires a terminal (TTY)");
        eprintln!();
        eprintln!("This usually means:");
        eprintln!("  - SSH without -t flag");
        eprintln!("  - Piped stdin/stdout");
        std::process::exit(1);
    }

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    // Initialize terminal
    let size = crossterm::terminal::size()?;
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut app = App::new(config, size);
    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result?;

    // Show goodbye message after TUI closes
    if let Some(goodbye) = app.goodbye() {
        println!("\n\x1b[35mMagic Man:\x1b[0m {goodbye}\n");
    }

    Ok(())
}
