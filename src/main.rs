use color_eyre::Result;
use crossterm::{cursor, execute, terminal};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info};
use tractive_tui::{
    app::App,
    client::TractiveClient,
    config::Config,
    events::{Event, EventHandler},
    loader, logging,
    session::Credentials,
    ui,
};

type Tui = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = logging::initialize_logging();
    color_eyre::install()?;
    restore_on_panic();

    let config = Config::load();
    let client = TractiveClient::with_options(
        Credentials::from_env(),
        &config.api.base_url,
        Duration::from_secs(config.api.timeout_seconds),
    )?;

    let mut terminal = enter_terminal()?;
    let mut events = EventHandler::new(config.ui.tick_rate_ms);
    let mut app = App::new(config);
    spawn_loader(&client, &app, events.sender());

    while !app.should_quit {
        terminal.draw(|f| ui::render(f, &app))?;

        if std::mem::take(&mut app.reload_requested) {
            spawn_loader(&client, &app, events.sender());
        }

        let Some(event) = events.next().await else {
            break;
        };
        match event {
            Event::Tick => app.on_tick(),
            Event::Input(key) => app.handle_key(key),
            Event::HistoryLoaded { pets, timestamp } => app.on_history_loaded(pets, timestamp),
            Event::LoadFailed(message) => app.on_load_failed(message),
        }
    }

    client.shutdown();
    leave_terminal()?;
    info!("Viewer closed.");
    Ok(())
}

/// Fetches every pet's history off the UI loop and posts the result back.
fn spawn_loader(client: &TractiveClient, app: &App, tx: UnboundedSender<Event>) {
    let client = client.clone();
    let days = app.config.history.days;
    tokio::spawn(async move {
        let event = match loader::load_pet_histories(&client, days).await {
            Ok(pets) => Event::HistoryLoaded {
                pets,
                timestamp: Instant::now(),
            },
            Err(e) => {
                error!("Loading pet histories failed: {}", e);
                Event::LoadFailed(e.to_string())
            }
        };
        let _ = tx.send(event);
    });
}

fn enter_terminal() -> Result<Tui> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen, cursor::Hide)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn leave_terminal() -> io::Result<()> {
    terminal::disable_raw_mode()?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen, cursor::Show)
}

/// A panic inside raw mode would otherwise leave the shell unusable.
fn restore_on_panic() {
    let report = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        leave_terminal().ok();
        report(panic_info);
    }));
}
