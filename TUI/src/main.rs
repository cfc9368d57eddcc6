mod action;
mod api;
mod app;
mod attestation;
mod backup;
mod chat;
mod command;
mod config;
mod controller;
mod error;
mod event;
mod files;
mod logging;
mod search;
mod store;
mod templates;
mod ui;
mod ui_state;

use std::io;

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info};

use api::ApiClient;
use app::App;
use config::{Cli, Config};
use event::EventHandler;
use ui::draw;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_file = cli.log_file.clone().unwrap_or_else(Config::default_log_file);
    logging::init_logging(&log_file)?;

    let api = if cli.offline {
        info!("starting in offline mode");
        None
    } else {
        let client = ApiClient::new(&cli.base_url)
            .with_context(|| format!("invalid backend URL {:?}", cli.base_url))?;
        info!(base_url = client.base_url(), "backend configured");
        Some(client)
    };
    let config = Config::from_cli(&cli);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut events = EventHandler::new(config.tick_rate_ms);
    let mut app = App::new(config, api, events.sender());

    let result = run_app(&mut terminal, &mut app, &mut events).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        error!(error = %e, "event loop failed");
        eprintln!("Error: {}", e);
    }
    info!("bye");
    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &mut EventHandler,
) -> anyhow::Result<()> {
    terminal.draw(|frame| draw(frame, app))?;

    while let Some(event) = events.next().await {
        app.handle_event(event);
        if app.should_quit {
            break;
        }
        terminal.draw(|frame| draw(frame, app))?;
    }
    Ok(())
}
