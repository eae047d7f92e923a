use std::{
    io::{self, Stdout},
    time::Duration,
};

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::CrosstermBackend, Terminal};
use rusqlite::Connection;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use todo_week::{
    app::App,
    cli::{self, Cli},
    config::{AppConfig, LogConfig},
    database, ui,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("loading config")?;
    if let Some(path) = cli.database {
        config.database_path = path;
    }

    // The terminal UI owns stdout, so its logs go to a file.
    let _guard = match cli.command {
        Some(_) => {
            init_stderr_logging(&config.log);
            None
        }
        None => Some(init_file_logging(&config.log)?),
    };

    let conn = database::open_db(&config.database_path)
        .with_context(|| format!("opening {}", config.database_path.display()))?;

    match cli.command {
        Some(command) => {
            let mut stdout = io::stdout().lock();
            cli::execute(
                command,
                &conn,
                &config.defaults,
                &Local::now(),
                &mut rand::thread_rng(),
                &mut stdout,
            )
        }
        None => {
            info!(database = %config.database_path.display(), "starting terminal ui");
            let mut terminal = setup_terminal()?;
            let result = run(&mut terminal, &conn, App::new(config.defaults));
            restore_terminal(&mut terminal)?;
            result
        }
    }
}

fn env_filter(log: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level))
}

fn init_stderr_logging(log: &LogConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(log))
        .with_writer(io::stderr)
        .init();
}

fn init_file_logging(log: &LogConfig) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(&log.directory)
        .with_context(|| format!("creating log directory {}", log.directory.display()))?;
    let appender = tracing_appender::rolling::never(&log.directory, "todo-week.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(log))
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    Ok(terminal.show_cursor()?)
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    conn: &Connection,
    mut app: App,
) -> anyhow::Result<()> {
    let mut rng = rand::thread_rng();
    app.refresh(conn, &Local::now());
    loop {
        ui::draw(terminal, &mut app, &Local::now())?;

        if event::poll(Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code, conn, &Local::now(), &mut rng);
                }
            }
        }

        if app.should_quit {
            info!("leaving terminal ui");
            return Ok(());
        }
    }
}
