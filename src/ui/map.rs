/// Map surface: projects country geometry onto a character grid and
/// resolves grid cells back to features (hit-testing).
///
/// ## Projection
///
/// Plain equirectangular. The visible window spans all longitudes and
/// latitudes `LAT_TOP..LAT_BOTTOM`, which puts the view centre near
/// (20°N, 0°) and leaves Antarctica off-screen.
///
///   lon(col) = -180 + (col + 0.5) * 360 / width
///   lat(row) = LAT_TOP - (row + 0.5) * (LAT_TOP - LAT_BOTTOM) / height
///
/// ## Raster
///
/// `cells[row * width + col]` holds the catalog index of the first feature
/// whose geometry contains the cell centre, or `None` for open sea.
/// The raster is rebuilt only when the map area changes size.
///
/// A selectable country too small to cover any cell centre still gets one
/// cell near its label point, taken from open sea or from a neighbour that
/// keeps other cells. Every possible target stays clickable.

use crate::domain::country::LonLat;
use crate::sim::catalog::Catalog;
use crate::sim::guess::MapFeature;

const LAT_TOP: f64 = 85.0;
const LAT_BOTTOM: f64 = -57.0;

pub struct MapRaster {
    pub width: usize,
    pub height: usize,
    cells: Vec<Option<usize>>,
}

impl MapRaster {
    pub fn empty() -> Self {
        MapRaster { width: 0, height: 0, cells: vec![] }
    }

    pub fn build(catalog: &Catalog, width: usize, height: usize) -> Self {
        let boxes: Vec<_> = catalog.records().iter().map(|r| r.geometry.bounds()).collect();
        let mut cells = vec![None; width * height];

        for row in 0..height {
            for col in 0..width {
                let (lon, lat) = cell_center(col, row, width, height);
                cells[row * width + col] = catalog
                    .records()
                    .iter()
                    .zip(&boxes)
                    .position(|(rec, bbox)| match bbox {
                        Some((x0, y0, x1, y1)) => {
                            lon >= *x0 && lon <= *x1 && lat >= *y0 && lat <= *y1
                                && rec.geometry.contains(lon, lat)
                        }
                        None => false,
                    });
            }
        }

        claim_missing(&mut cells, catalog, width, height);
        MapRaster { width, height, cells }
    }

    /// Catalog index drawn at (col, row). `None` = sea or out of bounds.
    pub fn feature_at(&self, col: usize, row: usize) -> Option<usize> {
        if col < self.width && row < self.height {
            self.cells[row * self.width + col]
        } else {
            None
        }
    }

    pub fn is_land(&self, col: usize, row: usize) -> bool {
        self.feature_at(col, row).is_some()
    }

    /// A land cell whose right or lower neighbour belongs to something else.
    pub fn is_border(&self, col: usize, row: usize) -> bool {
        let here = match self.feature_at(col, row) {
            Some(f) => f,
            None => return false,
        };
        let right = if col + 1 < self.width { self.feature_at(col + 1, row) } else { Some(here) };
        let below = if row + 1 < self.height { self.feature_at(col, row + 1) } else { Some(here) };
        right != Some(here) || below != Some(here)
    }

    pub fn cell_to_lonlat(&self, col: usize, row: usize) -> LonLat {
        cell_center(col, row, self.width, self.height)
    }

    pub fn lonlat_to_cell(&self, lon: f64, lat: f64) -> Option<(usize, usize)> {
        if self.width == 0 || self.height == 0 { return None; }
        if !(-180.0..=180.0).contains(&lon) || lat > LAT_TOP || lat < LAT_BOTTOM {
            return None;
        }
        let col = ((lon + 180.0) / 360.0 * self.width as f64) as usize;
        let row = ((LAT_TOP - lat) / (LAT_TOP - LAT_BOTTOM) * self.height as f64) as usize;
        Some((col.min(self.width - 1), row.min(self.height - 1)))
    }

    /// Hit-test: the feature under (col, row) as the session sees it.
    /// Sea and nameless shapes both come back without a name.
    pub fn resolve(&self, catalog: &Catalog, col: usize, row: usize) -> MapFeature {
        match self.feature_at(col, row).and_then(|idx| catalog.get(idx)) {
            Some(rec) if rec.is_selectable() => MapFeature::named(&rec.display_name),
            _ => MapFeature::unnamed(),
        }
    }

    /// Is this cell on a 30° graticule line?
    pub fn on_graticule(&self, col: usize, row: usize) -> bool {
        let (lon, lat) = self.cell_to_lonlat(col, row);
        let step_lon = 360.0 / self.width.max(1) as f64;
        let step_lat = (LAT_TOP - LAT_BOTTOM) / self.height.max(1) as f64;
        near_multiple(lon, 30.0, step_lon / 2.0) || near_multiple(lat, 30.0, step_lat / 2.0)
    }
}

fn cell_center(col: usize, row: usize, width: usize, height: usize) -> LonLat {
    let w = width.max(1) as f64;
    let h = height.max(1) as f64;
    let lon = -180.0 + (col as f64 + 0.5) * 360.0 / w;
    let lat = LAT_TOP - (row as f64 + 0.5) * (LAT_TOP - LAT_BOTTOM) / h;
    (lon, lat)
}

fn claim_missing(cells: &mut [Option<usize>], catalog: &Catalog, width: usize, height: usize) {
    if width == 0 || height == 0 {
        return;
    }
    let mut counts = vec![0usize; catalog.len()];
    for idx in cells.iter().flatten() {
        counts[*idx] += 1;
    }

    for idx in catalog.selectable_indices() {
        if counts[idx] > 0 {
            continue;
        }
        let Some((lon, lat)) = catalog.get(idx).and_then(|r| r.geometry.label_point()) else {
            continue;
        };
        let (col, row) = clamped_cell(lon, lat, width, height);
        let free = |c: usize, r: usize, counts: &[usize]| match cells[r * width + c] {
            None => true,
            Some(owner) => counts[owner] > 1,
        };
        let Some((c, r)) = rings(col, row, width, height).find(|&(c, r)| free(c, r, &counts)) else {
            continue;
        };
        if let Some(owner) = cells[r * width + c] {
            counts[owner] -= 1;
        }
        cells[r * width + c] = Some(idx);
        counts[idx] = 1;
    }
}

/// Cells in growing square rings around (col, row), nearest first.
fn rings(col: usize, row: usize, width: usize, height: usize) -> impl Iterator<Item = (usize, usize)> {
    let reach = width.max(height) as i64;
    (0..=reach).flat_map(move |d| {
        (-d..=d).flat_map(move |dy| (-d..=d).map(move |dx| (dx, dy)))
            .filter(move |&(dx, dy)| dx.abs() == d || dy.abs() == d)
            .map(move |(dx, dy)| (col as i64 + dx, row as i64 + dy))
            .filter(move |&(c, r)| c >= 0 && r >= 0 && c < width as i64 && r < height as i64)
            .map(|(c, r)| (c as usize, r as usize))
    })
}

/// Like `lonlat_to_cell`, but clamps points outside the window to its edge.
fn clamped_cell(lon: f64, lat: f64, width: usize, height: usize) -> (usize, usize) {
    let fx = ((lon + 180.0) / 360.0).clamp(0.0, 1.0);
    let fy = ((LAT_TOP - lat) / (LAT_TOP - LAT_BOTTOM)).clamp(0.0, 1.0);
    let col = ((fx * width as f64) as usize).min(width - 1);
    let row = ((fy * height as f64) as usize).min(height - 1);
    (col, row)
}

fn near_multiple(v: f64, step: f64, tol: f64) -> bool {
    let r = v.rem_euclid(step);
    r < tol || step - r <= tol
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::country::{CountryRecord, Geometry};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Geometry {
        Geometry::new(vec![vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)]])
    }

    fn catalog() -> Catalog {
        Catalog::from_records(vec![
            CountryRecord::new("Westland", rect(-60.0, -20.0, -20.0, 40.0), ""),
            CountryRecord::new("Eastland", rect(20.0, -20.0, 60.0, 40.0), ""),
            CountryRecord::new("", rect(100.0, -20.0, 140.0, 40.0), ""),
        ])
    }

    #[test]
    fn click_inside_country_resolves() {
        let cat = catalog();
        let map = MapRaster::build(&cat, 72, 28);
        let (col, row) = map.lonlat_to_cell(-40.0, 10.0).unwrap();
        assert_eq!(map.resolve(&cat, col, row), MapFeature::named("Westland"));
        let (col, row) = map.lonlat_to_cell(40.0, 10.0).unwrap();
        assert_eq!(map.resolve(&cat, col, row), MapFeature::named("Eastland"));
    }

    #[test]
    fn sea_and_unnamed_resolve_without_name() {
        let cat = catalog();
        let map = MapRaster::build(&cat, 72, 28);
        let (col, row) = map.lonlat_to_cell(0.0, 10.0).unwrap();
        assert_eq!(map.resolve(&cat, col, row), MapFeature::unnamed());
        let (col, row) = map.lonlat_to_cell(120.0, 10.0).unwrap();
        assert!(map.is_land(col, row));
        assert_eq!(map.resolve(&cat, col, row), MapFeature::unnamed());
    }

    #[test]
    fn out_of_bounds_is_sea() {
        let cat = catalog();
        let map = MapRaster::build(&cat, 10, 5);
        assert_eq!(map.feature_at(10, 0), None);
        assert_eq!(map.resolve(&cat, 50, 50), MapFeature::unnamed());
        assert_eq!(map.lonlat_to_cell(0.0, -80.0), None);
    }

    #[test]
    fn cell_roundtrip_stays_in_cell() {
        let map = MapRaster::build(&Catalog::default(), 120, 40);
        for &(col, row) in &[(0, 0), (60, 20), (119, 39)] {
            let (lon, lat) = map.cell_to_lonlat(col, row);
            assert_eq!(map.lonlat_to_cell(lon, lat), Some((col, row)));
        }
    }

    #[test]
    fn borders_sit_on_edges() {
        let cat = catalog();
        let map = MapRaster::build(&cat, 72, 28);
        let (col, row) = map.lonlat_to_cell(-40.0, 10.0).unwrap();
        assert!(!map.is_border(col, row));
        let (edge_col, _) = map.lonlat_to_cell(-21.0, 10.0).unwrap();
        assert!(map.is_border(edge_col, row));
    }

    #[test]
    fn every_target_has_a_cell_on_small_maps() {
        let cat = Catalog::load(None, None).unwrap();
        for &(w, h) in &[(40, 8), (20, 6), (60, 12), (12, 4)] {
            let map = MapRaster::build(&cat, w, h);
            for idx in cat.selectable_indices() {
                assert!(
                    map.cells.contains(&Some(idx)),
                    "{} has no cell on {w}x{h}",
                    cat.records()[idx].display_name
                );
            }
        }
    }

    #[test]
    fn enclave_stays_clickable_beside_its_neighbour() {
        let cat = Catalog::from_records(vec![
            CountryRecord::new("France", rect(-5.0, 42.0, 8.0, 51.0), ""),
            CountryRecord::new("Luxembourg", rect(5.8, 49.4, 6.5, 50.2), ""),
        ]);
        let map = MapRaster::build(&cat, 60, 12);
        assert!(map.cells.contains(&Some(0)));
        assert!(map.cells.contains(&Some(1)));

        let (col, row) = map
            .cells
            .iter()
            .position(|c| *c == Some(1))
            .map(|i| (i % map.width, i / map.width))
            .unwrap();
        assert_eq!(map.resolve(&cat, col, row), MapFeature::named("Luxembourg"));
    }

    #[test]
    fn rings_start_at_centre_and_stay_in_bounds() {
        let cells: Vec<_> = rings(0, 0, 3, 2).collect();
        assert_eq!(cells[0], (0, 0));
        assert_eq!(cells.len(), 6);
        assert!(cells.iter().all(|&(c, r)| c < 3 && r < 2));
    }

    #[test]
    fn builtin_catalog_places_france_in_europe() {
        let cat = Catalog::load(None, None).unwrap();
        let map = MapRaster::build(&cat, 360, 142);
        let (col, row) = map.lonlat_to_cell(2.5, 46.5).unwrap();
        assert_eq!(map.resolve(&cat, col, row), MapFeature::named("France"));
    }
}
