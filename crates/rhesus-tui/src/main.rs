use anyhow::Result;
use std::fs::{self, File};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use rhesus_core::config::Config;

mod app;
mod command;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

/// Log to a file under the config directory; the terminal belongs to the UI
fn init_logging() -> Result<()> {
    let dir = Config::config_dir()?;
    fs::create_dir_all(&dir)?;
    let log_file = File::create(dir.join("rhesus.log"))?;

    let filter = EnvFilter::try_from_env("RHESUS_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = init_logging() {
        eprintln!("Logging disabled: {}", e);
    }

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("could not load config, using defaults: {:#}", e);
        Config::new()
    });
    tracing::info!(provider = %config.provider().as_str(), "starting Dr. Rhesus");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut app = App::new(config);
    let mut events = EventHandler::new();
    let sender = events.sender();

    let result = run(&mut terminal, &mut app, &mut events, &sender).await;

    tui::restore()?;
    result
}

async fn run(
    terminal: &mut tui::Tui,
    app: &mut App,
    events: &mut EventHandler,
    sender: &tokio::sync::mpsc::UnboundedSender<tui::AppEvent>,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event, sender)?;
    }
    Ok(())
}
