/// Country records and their boundary geometry.
///
/// Records are immutable once the catalog is loaded. The core only ever
/// looks at `id` / `display_name`; geometry is carried for the map layer.

/// Normalize a country name for comparison: trim, then case-fold.
///
/// Upstream name casing and padding are inconsistent between the geometry
/// data and the flag table, so every comparison goes through here.
pub fn normalize_id(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A `(lon, lat)` pair in degrees.
pub type LonLat = (f64, f64);

/// Boundary shape: one or more outer rings. Holes are not modelled.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    pub polygons: Vec<Vec<LonLat>>,
}

impl Geometry {
    pub fn new(polygons: Vec<Vec<LonLat>>) -> Self {
        Geometry { polygons }
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.polygons.iter().all(|ring| ring.len() < 3)
    }

    /// Point-in-polygon (even-odd rule) over every ring.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.polygons.iter().any(|ring| ring_contains(ring, lon, lat))
    }

    /// Bounding box as `(min_lon, min_lat, max_lon, max_lat)`.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut pts = self.polygons.iter().flatten();
        let &(lon0, lat0) = pts.next()?;
        let init = (lon0, lat0, lon0, lat0);
        Some(pts.fold(init, |(a, b, c, d), &(lon, lat)| {
            (a.min(lon), b.min(lat), c.max(lon), d.max(lat))
        }))
    }

    /// Mean of all vertices; good enough to anchor a label.
    pub fn label_point(&self) -> Option<LonLat> {
        let (min_lon, min_lat, max_lon, max_lat) = self.bounds()?;
        Some(((min_lon + max_lon) / 2.0, (min_lat + max_lat) / 2.0))
    }
}

fn ring_contains(ring: &[LonLat], lon: f64, lat: f64) -> bool {
    if ring.len() < 3 { return false; }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > lat) != (yj > lat) {
            let x_cross = (xj - xi) * (lat - yi) / (yj - yi) + xi;
            if lon < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[derive(Clone, Debug, PartialEq)]
pub struct CountryRecord {
    /// `normalize_id(display_name)`. Unique within a catalog.
    pub id: String,
    pub display_name: String,
    pub geometry: Geometry,
    pub flag_ref: String,
}

impl CountryRecord {
    pub fn new(display_name: &str, geometry: Geometry, flag_ref: &str) -> Self {
        CountryRecord {
            id: normalize_id(display_name),
            display_name: display_name.to_string(),
            geometry,
            flag_ref: flag_ref.to_string(),
        }
    }

    /// Records with a blank display name are never offered as targets.
    pub fn is_selectable(&self) -> bool {
        !self.display_name.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Vec<LonLat> {
        vec![(x0, y0), (x0 + size, y0), (x0 + size, y0 + size), (x0, y0 + size)]
    }

    #[test]
    fn normalize_trims_and_folds_case() {
        assert_eq!(normalize_id("  FRANCE "), "france");
        assert_eq!(normalize_id("Côte d'Ivoire"), "côte d'ivoire");
    }

    #[test]
    fn contains_inside_and_outside() {
        let g = Geometry::new(vec![square(0.0, 0.0, 10.0)]);
        assert!(g.contains(5.0, 5.0));
        assert!(!g.contains(15.0, 5.0));
        assert!(!g.contains(-1.0, 5.0));
    }

    #[test]
    fn contains_any_ring_of_multipolygon() {
        let g = Geometry::new(vec![square(0.0, 0.0, 1.0), square(20.0, 20.0, 1.0)]);
        assert!(g.contains(20.5, 20.5));
        assert!(!g.contains(10.0, 10.0));
    }

    #[test]
    fn degenerate_ring_is_empty() {
        let g = Geometry::new(vec![vec![(0.0, 0.0), (1.0, 1.0)]]);
        assert!(g.is_empty());
        assert!(!g.contains(0.5, 0.5));
    }

    #[test]
    fn bounds_and_label_point() {
        let g = Geometry::new(vec![square(-10.0, 40.0, 20.0)]);
        assert_eq!(g.bounds(), Some((-10.0, 40.0, 10.0, 60.0)));
        assert_eq!(g.label_point(), Some((0.0, 50.0)));
        assert_eq!(Geometry::default().bounds(), None);
    }

    #[test]
    fn blank_name_not_selectable() {
        let rec = CountryRecord::new("   ", Geometry::default(), "");
        assert!(!rec.is_selectable());
        assert!(CountryRecord::new("Peru", Geometry::default(), "").is_selectable());
    }
}
