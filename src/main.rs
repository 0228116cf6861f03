use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod app;
mod config;
mod conversation;
mod handler;
mod tui;
mod ui;

use api::ChatClient;
use app::App;
use config::Config;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "mjc-chat")]
#[command(version, about = "Terminal client for the MJC academic affairs chatbot")]
struct Cli {
    /// Base URL of the chat API server
    #[arg(long, env = "MJC_CHAT_API_URL")]
    api_url: Option<String>,

    /// Log filter (overridden by RUST_LOG)
    #[arg(long, env = "MJC_CHAT_LOG")]
    log_level: Option<String>,

    /// Write the effective settings to the config file and exit
    #[arg(long)]
    save_config: bool,
}

fn log_file_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("mjc-chat")
        .join("mjc-chat.log")
}

/// The terminal belongs to the UI, so logs go to a file.
fn init_logging(level: &str) -> Result<PathBuf> {
    let path = log_file_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let log_file = File::create(&path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .init();

    Ok(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load()?.merge(cli.api_url, cli.log_level);

    if cli.save_config {
        let path = config.save()?;
        println!("Saved settings to {}", path.display());
        return Ok(());
    }

    let log_path = init_logging(config.log_level())?;
    tracing::info!(
        api = %config.api_base_url(),
        log = %log_path.display(),
        "starting mjc-chat"
    );

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, &config).await;

    tui::restore()?;
    tracing::info!("mjc-chat exited");
    result
}

async fn run(terminal: &mut tui::Tui, config: &Config) -> Result<()> {
    let mut events = EventHandler::new();
    let mut app = App::new(ChatClient::new(&config.api_base_url()), events.sender());
    app.check_server();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(&mut app, event),
            None => break,
        }
    }

    Ok(())
}
