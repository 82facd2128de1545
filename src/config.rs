/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
/// Problems found while loading are kept in `warnings` and logged once
/// the subscriber is up, since logging itself is configured here.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::difficulty::DifficultyLevel;
use crate::sim::round::RepeatPolicy;

/// Lives at session start and after every game-over reset.
pub const STARTING_LIVES: u32 = 3;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub game: GameSettings,
    pub data: DataConfig,
    pub display: DisplayConfig,
    pub gamepad: GamepadConfig,
    pub log: LogConfig,
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GameSettings {
    pub starting_lives: u32,
    pub repeat_policy: RepeatPolicy,
    pub difficulty: DifficultyLevel,
    pub game_over_hold_ms: u64,
    pub seed: Option<u64>,
}

impl Default for GameSettings {
    fn default() -> Self {
        GameSettings {
            starting_lives: STARTING_LIVES,
            repeat_policy: RepeatPolicy::Allow,
            difficulty: DifficultyLevel::Normal,
            game_over_hold_ms: 0,
            seed: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DataConfig {
    /// `None` = built-in catalog.
    pub catalog: Option<PathBuf>,
    /// `None` = built-in flag table.
    pub flags: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct DisplayConfig {
    pub frame_ms: u64,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub confirm: Vec<String>,
    pub difficulty: Vec<String>,
    pub quit: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct LogConfig {
    pub enabled: bool,
    pub file: PathBuf,
    pub filter: String,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    game: TomlGame,
    #[serde(default)]
    data: TomlData,
    #[serde(default)]
    display: TomlDisplay,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    log: TomlLog,
}

#[derive(Deserialize, Debug)]
struct TomlGame {
    #[serde(default = "default_lives")]
    starting_lives: u32,
    #[serde(default)]
    avoid_repeats: bool,
    #[serde(default)]
    difficulty: DifficultyLevel,
    #[serde(default)]
    game_over_hold_ms: u64,
    #[serde(default)]
    seed: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
struct TomlData {
    #[serde(default)]
    catalog: String,
    #[serde(default)]
    flags: String,
}

#[derive(Deserialize, Debug)]
struct TomlDisplay {
    #[serde(default = "default_frame_ms")]
    frame_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_difficulty_btn")]
    difficulty: Vec<String>,
    #[serde(default = "default_quit")]
    quit: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlLog {
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default = "default_log_file")]
    file: String,
    #[serde(default = "default_log_filter")]
    filter: String,
}

// ── Defaults ──

fn default_lives() -> u32 { STARTING_LIVES }
fn default_frame_ms() -> u64 { 16 }
fn default_true() -> bool { true }

fn default_confirm() -> Vec<String> { vec!["A".into(), "Start".into()] }
fn default_difficulty_btn() -> Vec<String> { vec!["Y".into()] }
fn default_quit() -> Vec<String> { vec!["Select".into()] }
fn default_log_file() -> String { "flaghunt.log".into() }
fn default_log_filter() -> String { "flaghunt=info".into() }

impl Default for TomlGame {
    fn default() -> Self {
        TomlGame {
            starting_lives: default_lives(),
            avoid_repeats: false,
            difficulty: DifficultyLevel::Normal,
            game_over_hold_ms: 0,
            seed: None,
        }
    }
}

impl Default for TomlDisplay {
    fn default() -> Self {
        TomlDisplay { frame_ms: default_frame_ms() }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            confirm: default_confirm(),
            difficulty: default_difficulty_btn(),
            quit: default_quit(),
        }
    }
}

impl Default for TomlLog {
    fn default() -> Self {
        TomlLog {
            enabled: true,
            file: default_log_file(),
            filter: default_log_filter(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let mut warnings = Vec::new();
        let toml_cfg = load_toml(&search_dirs, &mut warnings);
        Self::resolve(toml_cfg, &search_dirs, warnings)
    }

    /// Parse config text directly. Parse errors fall back to defaults.
    #[cfg(test)]
    pub fn from_toml_str(text: &str, search_dirs: &[PathBuf]) -> Self {
        let mut warnings = Vec::new();
        let toml_cfg = parse_toml(text, Path::new("config.toml"), &mut warnings);
        Self::resolve(toml_cfg, search_dirs, warnings)
    }

    fn resolve(toml_cfg: TomlConfig, search_dirs: &[PathBuf], mut warnings: Vec<String>) -> Self {
        let mut starting_lives = toml_cfg.game.starting_lives;
        if starting_lives == 0 {
            warnings.push(format!("starting_lives must be at least 1, using {STARTING_LIVES}"));
            starting_lives = STARTING_LIVES;
        }

        GameConfig {
            game: GameSettings {
                starting_lives,
                repeat_policy: if toml_cfg.game.avoid_repeats {
                    RepeatPolicy::AvoidPrevious
                } else {
                    RepeatPolicy::Allow
                },
                difficulty: toml_cfg.game.difficulty,
                game_over_hold_ms: toml_cfg.game.game_over_hold_ms,
                seed: toml_cfg.game.seed,
            },
            data: DataConfig {
                catalog: resolve_data_path(&toml_cfg.data.catalog, search_dirs),
                flags: resolve_data_path(&toml_cfg.data.flags, search_dirs),
            },
            display: DisplayConfig {
                frame_ms: toml_cfg.display.frame_ms.max(1),
            },
            gamepad: GamepadConfig {
                confirm: toml_cfg.gamepad.confirm,
                difficulty: toml_cfg.gamepad.difficulty,
                quit: toml_cfg.gamepad.quit,
            },
            log: LogConfig {
                enabled: toml_cfg.log.enabled,
                file: PathBuf::from(toml_cfg.log.file),
                filter: toml_cfg.log.filter,
            },
            warnings,
        }
    }
}

/// Empty = built-in. Relative paths are searched in the candidate dirs.
fn resolve_data_path(raw: &str, search_dirs: &[PathBuf]) -> Option<PathBuf> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        return Some(path);
    }
    Some(
        search_dirs
            .iter()
            .map(|d| d.join(&path))
            .find(|p| p.is_file())
            .unwrap_or(path),
    )
}

/// Candidate directories to search: exe dir + CWD + XDG data dir (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/flaghunt)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/flaghunt");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf], warnings: &mut Vec<String>) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => return parse_toml(&text, &path, warnings),
                Err(e) => warnings.push(format!("could not read {}: {e}", path.display())),
            }
        }
    }
    TomlConfig::default()
}

fn parse_toml(text: &str, path: &Path, warnings: &mut Vec<String>) -> TomlConfig {
    match toml::from_str::<TomlConfig>(text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warnings.push(format!("{} parse error, using default settings: {e}", path.display()));
            TomlConfig::default()
        }
    }
}
