use crate::coords::{Coordinate, format_axis};
use crate::error::SyncError;
use crate::presets::{CUSTOM_ID, PresetCatalog};
use std::sync::Arc;
use tracing::debug;

/// Single source of truth for the picked coordinate.
///
/// The text fields are stored verbatim so a half-typed value survives
/// between frames; parsing happens only on [`CoordinateStore::committed`].
/// Every mutation goes through one of the operations below.
#[derive(Debug, Clone)]
pub struct CoordinateStore {
    catalog: Arc<PresetCatalog>,
    latitude: String,
    longitude: String,
    selected: String,
    revision: u64,
}

impl CoordinateStore {
    pub fn new(
        catalog: Arc<PresetCatalog>,
        latitude: impl Into<String>,
        longitude: impl Into<String>,
        selected: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            latitude: latitude.into(),
            longitude: longitude.into(),
            selected: selected.into(),
            revision: 0,
        }
    }

    /// Start on a preset. An unknown id leaves both fields empty.
    pub fn with_preset(catalog: Arc<PresetCatalog>, id: &str) -> Self {
        let mut store = Self::new(catalog, "", "", CUSTOM_ID);
        store.select_preset(id);
        store.revision = 0;
        store
    }

    pub fn set_latitude_text(&mut self, text: impl Into<String>) {
        self.latitude = text.into();
        self.selected = CUSTOM_ID.to_string();
        self.revision += 1;
    }

    pub fn set_longitude_text(&mut self, text: impl Into<String>) {
        self.longitude = text.into();
        self.selected = CUSTOM_ID.to_string();
        self.revision += 1;
    }

    /// The id is recorded even when it does not resolve to a coordinate
    /// (the sentinel, or an id missing from the catalog); the fields are
    /// only overwritten for a located preset.
    pub fn select_preset(&mut self, id: &str) {
        match self.catalog.get(id) {
            Ok(preset) if preset.coordinate().is_some() => {
                self.latitude = preset.latitude.clone();
                self.longitude = preset.longitude.clone();
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "preset selection left coordinate unchanged"),
        }
        self.selected = id.to_string();
        self.revision += 1;
    }

    pub fn set_from_click(&mut self, lat: f64, lon: f64) {
        self.latitude = format_axis(lat);
        self.longitude = format_axis(lon);
        self.selected = CUSTOM_ID.to_string();
        self.revision += 1;
    }

    pub fn latitude_text(&self) -> &str {
        &self.latitude
    }

    pub fn longitude_text(&self) -> &str {
        &self.longitude
    }

    pub fn selected_preset_id(&self) -> &str {
        &self.selected
    }

    pub fn catalog(&self) -> &Arc<PresetCatalog> {
        &self.catalog
    }

    /// Bumped by every mutating operation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Parse the current text into a coordinate.
    pub fn committed(&self) -> Result<Coordinate, SyncError> {
        Coordinate::parse(&self.latitude, &self.longitude)
    }
}
