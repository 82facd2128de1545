/// Entry point and game loop.

mod config;
mod domain;
mod error;
mod sim;
mod ui;

use std::fs::File;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use config::{GameConfig, LogConfig};
use domain::difficulty::DifficultyLevel;
use sim::catalog::Catalog;
use sim::event::GameEvent;
use sim::session::Session;
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::{Banner, Renderer, Tone, ViewState};
use ui::sound::SoundEngine;

/// Minimum interval between cursor steps while a direction is held.
const CURSOR_REPEAT: Duration = Duration::from_millis(45);

fn main() -> ExitCode {
    let config = GameConfig::load();
    init_logging(&config.log);
    for w in &config.warnings {
        warn!("{w}");
    }

    let catalog = match Catalog::load(config.data.catalog.as_deref(), config.data.flags.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "could not load country data");
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let mut session = match Session::start(catalog, &config.game) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "could not start session");
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return ExitCode::FAILURE;
    }

    let sound = SoundEngine::new();
    let result = game_loop(&mut session, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        error!(error = %e, "game loop failed");
        eprintln!("Game error: {e}");
        return ExitCode::FAILURE;
    }

    let best = session.stats.max_score.max(session.stats.score);
    info!(best, "session ended");
    println!();
    println!("Thanks for playing Flag Hunt!");
    println!("Best streak: {best}");
    ExitCode::SUCCESS
}

/// Log to a file: stdout belongs to the alternate screen while playing.
/// `RUST_LOG` overrides the configured filter.
fn init_logging(cfg: &LogConfig) {
    if !cfg.enabled {
        return;
    }
    let file = match File::create(&cfg.file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Could not open log file {}: {e}", cfg.file.display());
            return;
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.filter))
        .unwrap_or_else(|_| EnvFilter::new("flaghunt=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
}

fn game_loop(
    session: &mut Session,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let frame = Duration::from_millis(config.display.frame_ms.max(1));
    let hold = Duration::from_millis(config.game.game_over_hold_ms);

    let mut view = ViewState::default();
    let mut cursor_placed = false;
    let mut last_move = Instant::now();

    loop {
        kb.drain_events();
        gp.update();
        view.gamepad_connected = gp.connected;

        if kb.ctrl_c_pressed() || kb.any_pressed(KEYS_QUIT) || gp.quit_pressed() {
            break;
        }

        view.hover = kb.hover.and_then(|(x, y)| renderer.screen_to_map(x, y));

        if view.banner_active() {
            // Only dismissal is accepted while the banner is up.
            if kb.any_pressed(KEYS_CONFIRM) || gp.confirm_pressed() {
                view.banner = None;
            }
        } else {
            view.banner = None;
            let mut events = Vec::new();

            if let Some(level) = detect_difficulty(&kb) {
                events.extend(session.set_difficulty(level));
            } else if kb.any_pressed(&[KeyCode::Tab]) || gp.difficulty_pressed() {
                events.extend(session.cycle_difficulty());
            }

            if last_move.elapsed() >= CURSOR_REPEAT && move_cursor(&mut view, renderer, &kb, &gp) {
                last_move = Instant::now();
            }

            if kb.any_pressed(KEYS_CONFIRM) || gp.confirm_pressed() {
                let (col, row) = view.cursor;
                let feature = renderer.raster().resolve(session.catalog(), col, row);
                events.extend(session.handle_click(&feature));
            }

            for &(x, y) in &kb.clicks {
                let Some((col, row)) = renderer.screen_to_map(x, y) else { continue };
                let feature = renderer.raster().resolve(session.catalog(), col, row);
                events.extend(session.handle_click(&feature));
            }

            process_events(&events, &mut view, sound, hold);
        }

        renderer.render(session, &mut view)?;
        if !cursor_placed && renderer.raster().width > 0 {
            view.cursor = (renderer.raster().width / 2, renderer.raster().height / 2);
            cursor_placed = true;
        }
        std::thread::sleep(frame);
    }

    Ok(())
}

fn process_events(events: &[GameEvent], view: &mut ViewState, sound: Option<&SoundEngine>, hold: Duration) {
    for event in events {
        match event {
            GameEvent::CorrectGuess { .. } => {
                view.tone = Tone::Good;
                if let Some(s) = sound { s.play_correct(); }
            }
            GameEvent::WrongGuess { .. } => {
                view.tone = Tone::Bad;
                if let Some(s) = sound { s.play_wrong(); }
            }
            GameEvent::GameOver { answer, streak, max_score } => {
                view.tone = Tone::Bad;
                if let Some(s) = sound { s.play_game_over(); }
                if !hold.is_zero() {
                    view.banner = Some(Banner {
                        text: format!("OUT OF LIVES  It was {answer}.  Streak {streak}  Best {max_score}  [Enter]"),
                        until: Instant::now() + hold,
                    });
                }
            }
            GameEvent::DifficultyChanged(_) => {
                if let Some(s) = sound { s.play_switch(); }
            }
            GameEvent::RoundStarted { .. } => {}
        }
    }
}

// ── Key Constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('q'), KeyCode::Char('Q')];

fn detect_difficulty(kb: &InputState) -> Option<DifficultyLevel> {
    ['1', '2', '3']
        .iter()
        .zip(DifficultyLevel::ALL)
        .find(|(key, _)| kb.was_pressed(KeyCode::Char(**key)))
        .map(|(_, level)| level)
}

/// Step the map cursor one cell. Returns true if a direction was active.
fn move_cursor(view: &mut ViewState, renderer: &Renderer, kb: &InputState, gp: &GamepadState) -> bool {
    let active = |keys: &[KeyCode]| kb.any_held(keys) || kb.any_pressed(keys);
    let (w, h) = (renderer.raster().width, renderer.raster().height);
    if w == 0 || h == 0 {
        return false;
    }

    let (mut dx, mut dy) = gp.cursor_delta();
    if active(KEYS_LEFT) { dx = -1; } else if active(KEYS_RIGHT) { dx = 1; }
    if active(KEYS_UP) { dy = -1; } else if active(KEYS_DOWN) { dy = 1; }
    if (dx, dy) == (0, 0) {
        return false;
    }

    // Columns wrap around the globe; rows stop at the map edge.
    let (col, row) = view.cursor;
    let col = (col as i64 + dx as i64).rem_euclid(w as i64) as usize;
    let row = (row as i64 + dy as i64).clamp(0, h as i64 - 1) as usize;
    view.cursor = (col, row);
    true
}
