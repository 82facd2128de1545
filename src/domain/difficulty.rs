/// Difficulty policy: how much visual help the map gives.
///
/// Pure mapping from level to render configuration. Difficulty never
/// touches scoring; switching it mid-round only changes the next frame.
///
/// ┌─────────┬──────────────────────────────────┬────────────────────────────┬────────┐
/// │ Level   │ Country fill / border            │ Base tiles                 │ Labels │
/// ├─────────┼──────────────────────────────────┼────────────────────────────┼────────┤
/// │ Normal  │ transparent fill, thin border    │ full basemap, place names  │ yes    │
/// │ Hard    │ opaque neutral fill, grey border │ labels stripped            │ no     │
/// │ Extreme │ fill + border = background       │ labels and borders stripped│ no     │
/// └─────────┴──────────────────────────────────┴────────────────────────────┴────────┘

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum DifficultyLevel {
    #[default]
    Normal,
    Hard,
    Extreme,
}

impl DifficultyLevel {
    pub const ALL: [DifficultyLevel; 3] =
        [DifficultyLevel::Normal, DifficultyLevel::Hard, DifficultyLevel::Extreme];

    /// Cycle Normal → Hard → Extreme → Normal (selector key).
    pub fn next(self) -> Self {
        match self {
            DifficultyLevel::Normal => DifficultyLevel::Hard,
            DifficultyLevel::Hard => DifficultyLevel::Extreme,
            DifficultyLevel::Extreme => DifficultyLevel::Normal,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DifficultyLevel::Normal => "Normal",
            DifficultyLevel::Hard => "Hard",
            DifficultyLevel::Extreme => "Extreme",
        }
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DifficultyLevel {
    type Err = String;

    /// Accepts English names and the legacy "dificil" / "extremo" labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(DifficultyLevel::Normal),
            "hard" | "dificil" | "difícil" => Ok(DifficultyLevel::Hard),
            "extreme" | "extremo" => Ok(DifficultyLevel::Extreme),
            other => Err(format!("unknown difficulty '{other}'")),
        }
    }
}

impl TryFrom<String> for DifficultyLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Base map layer under the country shapes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TileStyle {
    /// Graticule, coastline tint and ocean names.
    Full,
    /// Graticule only.
    NoLabels,
    /// Flat background.
    Blank,
}

impl TileStyle {
    /// Raster tile template a web map would use for the same level.
    pub fn tile_url(self) -> &'static str {
        match self {
            TileStyle::Full => "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png",
            TileStyle::NoLabels => "https://{s}.basemaps.cartocdn.com/light_nolabels/{z}/{x}/{y}{r}.png",
            TileStyle::Blank => "https://{s}.basemaps.cartocdn.com/rastertiles/voyager_nolabels/{z}/{x}/{y}{r}.png",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Paint {
    /// Let whatever is underneath show through.
    Transparent,
    /// Neutral land colour.
    Neutral,
    Grey,
    /// Same as the map background, i.e. invisible.
    Background,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CountryStyle {
    pub fill: Paint,
    pub border: Paint,
    /// Border weight in the web version's pixel units.
    pub border_weight: u8,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RenderConfig {
    pub tile_style: TileStyle,
    pub country_style: CountryStyle,
    pub show_labels: bool,
}

/// Total over all levels; no hidden state.
pub fn render_config_for(level: DifficultyLevel) -> RenderConfig {
    match level {
        DifficultyLevel::Normal => RenderConfig {
            tile_style: TileStyle::Full,
            country_style: CountryStyle {
                fill: Paint::Transparent,
                border: Paint::Neutral,
                border_weight: 1,
            },
            show_labels: true,
        },
        DifficultyLevel::Hard => RenderConfig {
            tile_style: TileStyle::NoLabels,
            country_style: CountryStyle {
                fill: Paint::Neutral,
                border: Paint::Grey,
                border_weight: 1,
            },
            show_labels: false,
        },
        DifficultyLevel::Extreme => RenderConfig {
            tile_style: TileStyle::Blank,
            country_style: CountryStyle {
                fill: Paint::Background,
                border: Paint::Background,
                border_weight: 0,
            },
            show_labels: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_shows_labels_and_borders() {
        let cfg = render_config_for(DifficultyLevel::Normal);
        assert!(cfg.show_labels);
        assert_eq!(cfg.tile_style, TileStyle::Full);
        assert_eq!(cfg.country_style.fill, Paint::Transparent);
        assert_ne!(cfg.country_style.border, Paint::Background);
    }

    #[test]
    fn hard_strips_labels_keeps_grey_borders() {
        let cfg = render_config_for(DifficultyLevel::Hard);
        assert!(!cfg.show_labels);
        assert_eq!(cfg.tile_style, TileStyle::NoLabels);
        assert_eq!(cfg.country_style.fill, Paint::Neutral);
        assert_eq!(cfg.country_style.border, Paint::Grey);
    }

    #[test]
    fn extreme_erases_borders() {
        let cfg = render_config_for(DifficultyLevel::Extreme);
        assert!(!cfg.show_labels);
        assert_eq!(cfg.tile_style, TileStyle::Blank);
        assert_eq!(cfg.country_style.fill, Paint::Background);
        assert_eq!(cfg.country_style.border, Paint::Background);
    }

    #[test]
    fn only_normal_has_labels() {
        let labelled: Vec<_> = DifficultyLevel::ALL
            .iter()
            .filter(|l| render_config_for(**l).show_labels)
            .collect();
        assert_eq!(labelled, vec![&DifficultyLevel::Normal]);
    }

    #[test]
    fn next_cycles_through_all_levels() {
        let mut lvl = DifficultyLevel::Normal;
        for expected in [DifficultyLevel::Hard, DifficultyLevel::Extreme, DifficultyLevel::Normal] {
            lvl = lvl.next();
            assert_eq!(lvl, expected);
        }
    }

    #[test]
    fn parses_legacy_labels() {
        assert_eq!("dificil".parse::<DifficultyLevel>(), Ok(DifficultyLevel::Hard));
        assert_eq!(" EXTREMO ".parse::<DifficultyLevel>(), Ok(DifficultyLevel::Extreme));
        assert_eq!("normal".parse::<DifficultyLevel>(), Ok(DifficultyLevel::Normal));
        assert!("insane".parse::<DifficultyLevel>().is_err());
    }

    #[test]
    fn tile_urls_differ_per_style() {
        assert!(TileStyle::NoLabels.tile_url().contains("light_nolabels"));
        assert_ne!(TileStyle::Full.tile_url(), TileStyle::Blank.tile_url());
    }
}
