/// Country catalog loader.
///
/// ## Sources (priority order):
///   1. GeoJSON file named by `[data] catalog` in config.toml
///   2. Built-in catalog embedded in the binary
///
/// ## Catalog format (GeoJSON `FeatureCollection`):
///   Each feature's display name is read from `properties.ADMIN`, falling
///   back to `name` / `NAME`. `Polygon` and `MultiPolygon` geometries are
///   read (outer rings only); any other geometry type yields an empty shape.
///   Features with no usable name are kept so the map can draw them, but
///   they are never offered as a target.
///
/// ## Flag table format:
///   A flat JSON object `{ "<display name>": "<flag ref>" }`.
///   Lookup is by normalized name; a missing entry is an empty flag ref.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::domain::country::{normalize_id, CountryRecord, Geometry, LonLat};
use crate::error::{GameError, Result};

const BUILTIN_CATALOG: &str = include_str!("../../assets/countries.geojson");
const BUILTIN_FLAGS: &str = include_str!("../../assets/flags.json");

const NAME_KEYS: &[&str] = &["ADMIN", "name", "NAME"];

// ── GeoJSON schema ──

#[derive(Deserialize, Debug)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize, Debug)]
struct Feature {
    #[serde(default)]
    properties: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    geometry: Option<RawGeometry>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
enum RawGeometry {
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
    #[serde(other)]
    Unsupported,
}

impl RawGeometry {
    fn into_geometry(self) -> Geometry {
        match self {
            RawGeometry::Polygon { coordinates } => {
                Geometry::new(coordinates.into_iter().take(1).map(to_ring).collect())
            }
            RawGeometry::MultiPolygon { coordinates } => Geometry::new(
                coordinates
                    .into_iter()
                    .filter_map(|poly| poly.into_iter().next())
                    .map(to_ring)
                    .collect(),
            ),
            RawGeometry::Unsupported => Geometry::default(),
        }
    }
}

fn to_ring(points: Vec<Vec<f64>>) -> Vec<LonLat> {
    points
        .into_iter()
        .filter(|p| p.len() >= 2)
        .map(|p| (p[0], p[1]))
        .collect()
}

fn feature_name(props: Option<&serde_json::Map<String, serde_json::Value>>) -> String {
    let props = match props {
        Some(p) => p,
        None => return String::new(),
    };
    NAME_KEYS
        .iter()
        .filter_map(|k| props.get(*k).and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

// ── Flag table ──

/// Display name → flag reference.
#[derive(Clone, Debug, Default)]
pub struct FlagTable {
    by_id: HashMap<String, String>,
}

impl FlagTable {
    pub fn from_json(text: &str) -> std::result::Result<Self, serde_json::Error> {
        let raw: HashMap<String, String> = serde_json::from_str(text)?;
        Ok(FlagTable {
            by_id: raw.into_iter().map(|(k, v)| (normalize_id(&k), v)).collect(),
        })
    }

    pub fn builtin() -> Self {
        Self::from_json(BUILTIN_FLAGS).unwrap_or_default()
    }

    /// Flag for a country name. Missing entries are the renderer's problem.
    pub fn lookup(&self, name: &str) -> &str {
        self.by_id.get(&normalize_id(name)).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }
}

// ── Catalog ──

/// Ordered, read-only collection of country records.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    records: Vec<CountryRecord>,
}

impl Catalog {
    /// Build from records, dropping later duplicates of an id.
    pub fn from_records(records: Vec<CountryRecord>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let mut kept = Vec::with_capacity(records.len());
        for rec in records {
            if rec.is_selectable() && !seen.insert(rec.id.clone()) {
                warn!(country = %rec.display_name, "duplicate country in catalog, skipped");
                continue;
            }
            kept.push(rec);
        }
        Catalog { records: kept }
    }

    pub fn from_geojson(text: &str, flags: &FlagTable) -> std::result::Result<Self, serde_json::Error> {
        let fc: FeatureCollection = serde_json::from_str(text)?;
        let records = fc
            .features
            .into_iter()
            .map(|f| {
                let name = feature_name(f.properties.as_ref());
                let geometry = f.geometry.map(RawGeometry::into_geometry).unwrap_or_default();
                let flag = flags.lookup(&name).to_string();
                CountryRecord::new(&name, geometry, &flag)
            })
            .collect();
        Ok(Self::from_records(records))
    }

    /// Load from optional files; `None` selects the built-in data.
    /// Fails with `GameError::Data` when nothing selectable remains.
    pub fn load(catalog_path: Option<&Path>, flags_path: Option<&Path>) -> Result<Self> {
        let flags = match flags_path {
            Some(p) => FlagTable::from_json(&read_file(p)?)
                .map_err(|source| GameError::Parse { path: p.to_path_buf(), source })?,
            None => FlagTable::builtin(),
        };

        let catalog = match catalog_path {
            Some(p) => Self::from_geojson(&read_file(p)?, &flags)
                .map_err(|source| GameError::Parse { path: p.to_path_buf(), source })?,
            None => Self::from_geojson(BUILTIN_CATALOG, &flags).map_err(|source| {
                GameError::Parse { path: Path::new("<built-in>").to_path_buf(), source }
            })?,
        };

        let selectable = catalog.selectable_indices().len();
        if selectable == 0 {
            return Err(GameError::Data("catalog has no named countries".into()));
        }
        let missing_flags = catalog
            .records
            .iter()
            .filter(|r| r.is_selectable() && r.flag_ref.is_empty())
            .count();
        if missing_flags > 0 {
            warn!(missing_flags, "some countries have no flag entry");
        }
        info!(features = catalog.len(), selectable, flags = flags.len(), "catalog loaded");
        Ok(catalog)
    }

    pub fn records(&self) -> &[CountryRecord] {
        &self.records
    }

    pub fn get(&self, idx: usize) -> Option<&CountryRecord> {
        self.records.get(idx)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Indices of records that may become a target.
    pub fn selectable_indices(&self) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_selectable())
            .map(|(i, _)| i)
            .collect()
    }

    /// Index of the record whose normalized id matches `name`.
    #[cfg(test)]
    pub fn find(&self, name: &str) -> Option<usize> {
        let id = normalize_id(name);
        if id.is_empty() { return None; }
        self.records.iter().position(|r| r.id == id)
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| GameError::Io {
        path: path.to_path_buf(),
        source,
    })
}
