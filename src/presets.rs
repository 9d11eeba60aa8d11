use crate::config::PresetEntry;
use crate::coords::Coordinate;
use crate::error::SyncError;
use rustc_hash::FxHashSet;
use tracing::warn;

/// Id of the sentinel entry meaning "not following a preset".
pub const CUSTOM_ID: &str = "custom";

const BUILTIN: &[(&str, &str, &str, &str)] = &[
    (CUSTOM_ID, "Custom (manual input)", "", ""),
    ("delhi", "New Delhi, India", "28.6139", "77.2090"),
    ("mumbai", "Mumbai, India", "19.0760", "72.8777"),
    ("bengaluru", "Bengaluru, India", "12.9716", "77.5946"),
    ("london", "London, UK", "51.5074", "-0.1278"),
    ("newyork", "New York, USA", "40.7128", "-74.0060"),
];

/// A named location. Coordinates are kept as their canonical text so that
/// selecting a preset writes exactly this text into the input fields.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetLocation {
    pub id: String,
    pub display_name: String,
    pub latitude: String,
    pub longitude: String,
}

impl PresetLocation {
    pub fn is_custom(&self) -> bool {
        self.id == CUSTOM_ID
    }

    /// `None` for the sentinel (empty text) and for anything unparseable.
    pub fn coordinate(&self) -> Option<Coordinate> {
        if self.latitude.is_empty() || self.longitude.is_empty() {
            return None;
        }
        Coordinate::parse(&self.latitude, &self.longitude).ok()
    }
}

/// Ordered, read-only table of presets. Built once at startup and shared
/// behind an `Arc`; there is no way to mutate it afterwards.
#[derive(Debug, Clone)]
pub struct PresetCatalog {
    entries: Vec<PresetLocation>,
}

impl PresetCatalog {
    pub fn builtin() -> Self {
        let entries = BUILTIN
            .iter()
            .map(|&(id, name, lat, lon)| PresetLocation {
                id: id.to_string(),
                display_name: name.to_string(),
                latitude: lat.to_string(),
                longitude: lon.to_string(),
            })
            .collect();
        Self { entries }
    }

    /// Built-in presets followed by the ones declared in the config file.
    /// Duplicate ids and entries without a usable coordinate are skipped.
    pub fn with_extra(extra: &[PresetEntry]) -> Self {
        let mut catalog = Self::builtin();
        let mut seen: FxHashSet<String> = catalog.entries.iter().map(|p| p.id.clone()).collect();

        for entry in extra {
            let preset = PresetLocation {
                id: entry.id.trim().to_string(),
                display_name: entry.name.clone(),
                latitude: entry.lat.trim().to_string(),
                longitude: entry.lon.trim().to_string(),
            };
            if preset.id.is_empty() || seen.contains(&preset.id) {
                warn!(id = %preset.id, "skipping preset with empty or duplicate id");
                continue;
            }
            if preset.coordinate().is_none() {
                warn!(id = %preset.id, lat = %preset.latitude, lon = %preset.longitude, "skipping preset with invalid coordinate");
                continue;
            }
            seen.insert(preset.id.clone());
            catalog.entries.push(preset);
        }
        catalog
    }

    pub fn find_by_id(&self, id: &str) -> Option<&PresetLocation> {
        self.entries.iter().find(|p| p.id == id)
    }

    pub fn get(&self, id: &str) -> Result<&PresetLocation, SyncError> {
        self.find_by_id(id).ok_or_else(|| SyncError::PresetNotFound(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PresetLocation> {
        self.entries.iter()
    }

    /// Presets that get a marker on the map: everything but the sentinel.
    pub fn located(&self) -> impl Iterator<Item = (&PresetLocation, Coordinate)> {
        self.entries
            .iter()
            .filter(|p| !p.is_custom())
            .filter_map(|p| p.coordinate().map(|c| (p, c)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Closest located preset with its geodesic distance (m) and bearing (deg).
    pub fn nearest(&self, to: Coordinate) -> Option<(&PresetLocation, f64, f64)> {
        if !crate::position::in_geographic_range(to.latitude, to.longitude) {
            return None;
        }
        self.located()
            .map(|(p, c)| {
                let (dist, bearing) =
                    crate::position::distance_and_bearing(to.as_lat_lon(), c.as_lat_lon());
                (p, dist, bearing)
            })
            .filter(|(_, dist, _)| dist.is_finite())
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, lat: &str, lon: &str) -> PresetEntry {
        PresetEntry { id: id.into(), name: format!("{} name", id), lat: lat.into(), lon: lon.into() }
    }

    #[test]
    fn builtin_catalog_layout() {
        let catalog = PresetCatalog::builtin();
        assert_eq!(catalog.len(), 6);
        assert!(catalog.iter().next().unwrap().is_custom());
        assert_eq!(catalog.located().count(), 5);

        let mumbai = catalog.find_by_id("mumbai").unwrap();
        assert_eq!(mumbai.latitude, "19.0760");
        assert_eq!(mumbai.coordinate(), Some(Coordinate::new(19.076, 72.8777)));
    }

    #[test]
    fn custom_sentinel_has_no_coordinate() {
        let catalog = PresetCatalog::builtin();
        let custom = catalog.find_by_id(CUSTOM_ID).unwrap();
        assert_eq!(custom.coordinate(), None);
    }

    #[test]
    fn unknown_id() {
        let catalog = PresetCatalog::builtin();
        assert!(catalog.find_by_id("atlantis").is_none());
        assert_eq!(catalog.get("atlantis"), Err(SyncError::PresetNotFound("atlantis".into())));
    }

    #[test]
    fn extra_presets_are_appended_and_filtered() {
        let catalog = PresetCatalog::with_extra(&[
            entry("tokyo", "35.6762", "139.6503"),
            entry("delhi", "0", "0"),
            entry("broken", "north", "1"),
            entry("  ", "1", "1"),
            entry("tokyo", "1", "1"),
        ]);
        assert_eq!(catalog.len(), 7);
        let last = catalog.iter().last().unwrap();
        assert_eq!(last.id, "tokyo");
        assert_eq!(catalog.find_by_id("delhi").unwrap().latitude, "28.6139");
        assert!(catalog.find_by_id("broken").is_none());
    }

    #[test]
    fn nearest_preset() {
        let catalog = PresetCatalog::builtin();
        let (preset, dist, _) = catalog.nearest(Coordinate::new(19.1, 72.9)).unwrap();
        assert_eq!(preset.id, "mumbai");
        assert!(dist < 5_000.0, "dist = {}", dist);
    }
}
