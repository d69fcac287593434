//! Blockfall terminal front end

use blockfall::autoplay::AutoPlayer;
use blockfall::evaluator::Heuristic;
use blockfall::game::{Engine, GameState};
use blockfall::input::{Action, KeyBindings};
use blockfall::scheduler::Scheduler;
use blockfall::settings::Settings;
use blockfall::ui::{self, View};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    io::{self, stdout},
    sync::Arc,
    time::{Duration, Instant},
};
use tracing_subscriber::EnvFilter;

/// Target frame rate
const TARGET_FPS: u64 = 60;
const FRAME_DURATION: Duration = Duration::from_micros(1_000_000 / TARGET_FPS);

/// How long the game over screen stays up before a new game starts
const GAME_OVER_RESTART_DELAY: Duration = Duration::from_secs(2);

/// Get the blockfall temp directory, creating it if needed
fn blockfall_temp_dir() -> std::path::PathBuf {
    let dir = std::env::temp_dir().join("blockfall");
    let _ = std::fs::create_dir_all(&dir);
    dir
}

fn main() -> io::Result<()> {
    // Generate session ID for this instance
    let session_id: u32 = rand::random();

    // Setup tracing to log file; the terminal belongs to the UI
    let log_dir = blockfall_temp_dir();
    let log_file = format!("{:08x}.log", session_id);
    let file_appender = tracing_appender::rolling::never(&log_dir, &log_file);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("blockfall=debug")),
        )
        .with_ansi(false)
        .init();

    tracing::info!(
        "Blockfall starting up, session={:08x}, log={}",
        session_id,
        log_dir.join(&log_file).display()
    );

    let mut settings = Settings::load();
    let engine = match Engine::new(settings.engine_config()) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            tracing::error!("Invalid board settings: {}", e);
            return Err(io::Error::new(io::ErrorKind::InvalidInput, e));
        }
    };

    // Async runtime for the automated player
    let runtime = tokio::runtime::Runtime::new()?;

    // Setup terminal
    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, &engine, &mut settings, runtime.handle());

    // Restore terminal
    disable_raw_mode()?;
    execute!(stdout(), LeaveAlternateScreen)?;

    // Save settings (including any new high scores)
    if let Err(e) = settings.save() {
        eprintln!("Warning: Could not save settings: {}", e);
    }

    if result.is_ok() {
        let score = engine.score();
        println!("\nThanks for playing Blockfall!");
        println!("Final Score: {} | Lines: {}", score.points, score.lines);
        if let Some(best) = settings.best_score() {
            println!("Best: {}", best);
        }
    }
    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    engine: &Arc<Engine>,
    settings: &mut Settings,
    rt: &tokio::runtime::Handle,
) -> io::Result<()> {
    let bindings = KeyBindings::from_settings(settings);
    let gravity = settings.gravity();
    let autoplay_config = settings.autoplay_config();
    let scheduler = Arc::new(Scheduler::new(
        Arc::new(Heuristic::new(settings.ai.weights)),
        autoplay_config.workers,
    ));

    let mut player: Option<AutoPlayer> = None;
    if settings.ai.enabled_on_start {
        player = Some(AutoPlayer::spawn(engine.clone(), scheduler.clone(), autoplay_config, rt));
    }
    // Whether the automated player touched the current game
    let mut automated = player.is_some();
    let mut last_gravity = Instant::now();
    let mut game_over_time: Option<Instant> = None;

    engine.start();

    loop {
        // A player whose search failed has already stopped itself
        if player.as_ref().is_some_and(|p| !p.is_running()) {
            tracing::warn!("Automated player is no longer running");
            player = None;
        }

        let snapshot = engine.snapshot();
        terminal.draw(|frame| {
            ui::render_game(
                frame,
                &View {
                    snapshot: &snapshot,
                    settings: &*settings,
                    ai_enabled: player.is_some(),
                },
            )
        })?;

        match snapshot.state {
            GameState::GameOver => match game_over_time {
                None => {
                    settings.add_score(snapshot.last_score, snapshot.last_lines, automated);
                    game_over_time = Some(Instant::now());
                }
                Some(t) if t.elapsed() >= GAME_OVER_RESTART_DELAY => {
                    game_over_time = None;
                    automated = player.is_some();
                    engine.start();
                }
                Some(_) => {}
            },
            GameState::Playing => {
                if last_gravity.elapsed() >= gravity {
                    engine.soft_drop();
                    last_gravity = Instant::now();
                }
            }
            GameState::Paused => last_gravity = Instant::now(),
        }

        if !event::poll(FRAME_DURATION)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match bindings.action_for(key) {
            Some(Action::Quit) => break,
            Some(Action::TogglePause) => {
                engine.toggle_pause();
            }
            Some(Action::ToggleAi) => match player.take() {
                Some(p) => p.stop(),
                None => {
                    automated = true;
                    player = Some(AutoPlayer::spawn(
                        engine.clone(),
                        scheduler.clone(),
                        autoplay_config,
                        rt,
                    ));
                }
            },
            Some(Action::Engine(command)) => {
                engine.apply(command);
            }
            None => {}
        }
    }

    if let Some(p) = player {
        p.stop();
    }
    Ok(())
}
