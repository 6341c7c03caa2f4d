//! Terminal Kanban client binary.
//!
//! Launches the TUI against a board server, or against built-in demo data
//! with `--offline`. Configuration via CLI flags, environment variables, or
//! config file (`~/.config/taskboard/config.toml`).
//!
//! ```bash
//! # Offline demo mode
//! cargo run --bin taskboard -- --offline
//!
//! # Connect to a server
//! cargo run --bin taskboard -- --base-url http://localhost:8080/api
//!
//! # Or via environment variables
//! TASKBOARD_API_URL=http://localhost:8080/api cargo run
//! ```

use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use taskboard::app::App;
use taskboard::board::BoardStore;
use taskboard::config::{CliArgs, ClientConfig};
use taskboard::gateway::Gateway;
use taskboard::gateway::fallback::FallbackGateway;
use taskboard::gateway::http::HttpGateway;
use taskboard::gateway::memory::MemoryGateway;
use taskboard::net::{self, NetCommand, NetContext, NetEvent};
use taskboard::notifications::{NotificationCache, NotificationPoller};
use taskboard::session::Session;
use taskboard::ui;

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    // Load and resolve configuration (CLI args > env > config file > defaults).
    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    // Initialize logging before terminal setup (logs go to file, not stdout).
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!(base_url = %config.base_url, offline = config.offline, "taskboard starting");

    let session = Arc::new(open_session(&config));

    // Set up terminal.
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app.
    let result = if config.offline {
        run_app(&mut terminal, Arc::new(MemoryGateway::demo()), session, &config, None).await
    } else {
        match HttpGateway::new(&config.base_url, config.request_timeout, Arc::clone(&session)) {
            Ok(gateway) => run_app(&mut terminal, Arc::new(gateway), session, &config, None).await,
            Err(e) => {
                tracing::warn!(error = %e, "invalid server address, using demo data");
                let notice = format!("Invalid server address ({e}), running in offline mode");
                run_app(
                    &mut terminal,
                    Arc::new(MemoryGateway::demo()),
                    session,
                    &config,
                    Some(notice),
                )
                .await
            }
        }
    };

    // Restore terminal.
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("taskboard exiting");
    result
}

/// Initialize file-based logging.
///
/// Logs are written to a file (never stdout, since ratatui owns the terminal).
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskboard.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Open the persisted client state, falling back to an in-memory session
/// when the file is unreadable.
fn open_session(config: &ClientConfig) -> Session {
    let Some(path) = config.state_file.clone().or_else(Session::default_path) else {
        tracing::warn!("no data directory, session will not be persisted");
        return Session::in_memory();
    };
    match Session::open(&path) {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not open session state");
            Session::in_memory()
        }
    }
}

/// Main application loop.
async fn run_app<G: Gateway>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    gateway: Arc<G>,
    session: Arc<Session>,
    config: &ClientConfig,
    notice: Option<String>,
) -> io::Result<()> {
    let online = !config.offline && notice.is_none();
    let board = Arc::new(BoardStore::new());
    let notifications = Arc::new(NotificationCache::new());
    let api = Arc::new(FallbackGateway::new(gateway, config.degraded_fallback));

    let mut app = App::new(
        Arc::clone(&board),
        Arc::clone(&notifications),
        Arc::clone(&session),
        online,
    )
    .with_timestamp_format(config.timestamp_format.clone());
    if let Some(notice) = notice {
        app.set_error(notice);
    }

    let poller = NotificationPoller::spawn(
        Arc::clone(&notifications),
        Arc::clone(&api),
        config.poll_interval,
    );
    let (cmd_tx, mut evt_rx) = net::spawn_net(
        NetContext::new(api, &board, notifications, Arc::clone(&session)),
        config.channel_capacity,
    );

    // Initial board load; the poller covers notifications.
    let _ = cmd_tx.try_send(NetCommand::Refresh);
    if !online || session.is_signed_in() {
        let _ = cmd_tx.try_send(NetCommand::FetchCurrentUser);
    } else {
        app.set_info("Not signed in. Use :login <email> <password> or :register <username> <email> <password>");
    }

    loop {
        // Step 1: Draw the UI frame.
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Step 2: Drain all pending NetEvents (non-blocking).
        drain_net_events(&mut app, &mut evt_rx);

        // Step 3: Poll for terminal input events.
        if event::poll(config.poll_timeout)?
            && let Event::Key(key) = event::read()?
        {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            // handle_key_event returns Some(NetCommand) when the action
            // needs the server (moves, edits, sign-in, ...).
            if let Some(net_cmd) = app.handle_key_event(key) {
                match cmd_tx.try_send(net_cmd) {
                    Ok(()) => {}
                    // A move that never reaches the server must not stay applied.
                    Err(mpsc::error::TrySendError::Full(cmd)) => {
                        tracing::warn!(?cmd, "command channel full");
                        app.set_error("Network busy, try again");
                        net::abandon_command(&board, cmd);
                    }
                    Err(mpsc::error::TrySendError::Closed(cmd)) => {
                        tracing::warn!(?cmd, "command channel closed");
                        app.set_error("Network task stopped");
                        net::abandon_command(&board, cmd);
                    }
                }
            }
        }

        if app.should_quit {
            // Send shutdown command to networking tasks.
            let _ = cmd_tx.try_send(NetCommand::Shutdown);
            poller.shutdown().await;
            return Ok(());
        }
    }
}

/// Drain all pending `NetEvent`s from the receiver and apply them to the app.
fn drain_net_events(app: &mut App, rx: &mut mpsc::Receiver<NetEvent>) {
    while let Ok(event) = rx.try_recv() {
        tracing::debug!(?event, "net event");
        app.apply_net_event(event);
    }
}
