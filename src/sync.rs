use crate::map::{MapBackend, MapSettings, MapWidgetAdapter, WalkersMap};
use crate::store::CoordinateStore;
use eframe::egui;
use tracing::{debug, trace};

/// User edits coming from the controls. They only ever reach the map
/// through the store.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncIntent {
    SelectPreset(String),
    SetLatitude(String),
    SetLongitude(String),
}

/// Preset selector, coordinate inputs and map viewport, all backed by one
/// [`CoordinateStore`].
pub struct MapSyncComponent {
    store: CoordinateStore,
    adapter: MapWidgetAdapter,
    settings: MapSettings,
}

impl MapSyncComponent {
    pub fn new(store: CoordinateStore, settings: MapSettings) -> Self {
        let adapter = MapWidgetAdapter::new(settings.clone());
        Self { store, adapter, settings }
    }

    pub fn store(&self) -> &CoordinateStore {
        &self.store
    }

    pub fn adapter(&self) -> &MapWidgetAdapter {
        &self.adapter
    }

    pub fn apply(&mut self, intent: SyncIntent) {
        trace!(?intent, "apply");
        match intent {
            SyncIntent::SelectPreset(id) => self.store.select_preset(&id),
            SyncIntent::SetLatitude(text) => self.store.set_latitude_text(text),
            SyncIntent::SetLongitude(text) => self.store.set_longitude_text(text),
        }
    }

    /// One render cycle for the map: allocate if possible, feed widget
    /// events into the store, then push the latest coordinate to the widget.
    pub fn frame<B: MapBackend>(&mut self, backend: &mut B) {
        if let Err(e) = self.adapter.mount(backend, &self.store) {
            trace!(error = %e, "map mount deferred");
        }
        self.adapter.dispatch(backend, &mut self.store);
        self.adapter.sync(backend, &self.store);
    }

    pub fn unmount<B: MapBackend>(&mut self, backend: &mut B) {
        self.adapter.unmount(backend);
    }

    /// Replace a disposed adapter with a fresh one. The store is kept.
    pub fn remount<B: MapBackend>(&mut self, backend: &mut B) {
        self.adapter.unmount(backend);
        self.adapter = MapWidgetAdapter::new(self.settings.clone());
        debug!("map adapter replaced");
    }

    pub fn show_controls(&mut self, ui: &mut egui::Ui) {
        let mut intents = Vec::new();
        let catalog = self.store.catalog().clone();
        let selected = self.store.selected_preset_id();
        let selected_name = catalog
            .find_by_id(selected)
            .map(|p| p.display_name.as_str())
            .unwrap_or(selected)
            .to_string();

        egui::Grid::new("coordinate_inputs").num_columns(2).spacing([8.0, 6.0]).show(ui, |ui| {
            ui.label("Preset location");
            egui::ComboBox::from_id_salt("preset_location")
                .selected_text(selected_name)
                .width(200.0)
                .show_ui(ui, |ui| {
                    for preset in catalog.iter() {
                        let is_selected = preset.id == selected;
                        if ui.selectable_label(is_selected, preset.display_name.as_str()).clicked()
                            && !is_selected
                        {
                            intents.push(SyncIntent::SelectPreset(preset.id.clone()));
                        }
                    }
                });
            ui.end_row();

            ui.label("Latitude");
            let mut lat = self.store.latitude_text().to_string();
            if ui.add(egui::TextEdit::singleline(&mut lat).desired_width(200.0)).changed() {
                intents.push(SyncIntent::SetLatitude(lat));
            }
            ui.end_row();

            ui.label("Longitude");
            let mut lon = self.store.longitude_text().to_string();
            if ui.add(egui::TextEdit::singleline(&mut lon).desired_width(200.0)).changed() {
                intents.push(SyncIntent::SetLongitude(lon));
            }
            ui.end_row();
        });

        if let Ok(at) = self.store.committed()
            && let Some((preset, dist, bearing)) = catalog.nearest(at)
        {
            ui.label(
                egui::RichText::new(format!(
                    "Nearest preset: {} ({} @ {})",
                    preset.display_name,
                    crate::position::format_distance(dist),
                    crate::position::format_bearing(bearing)
                ))
                .small()
                .weak(),
            );
        }

        for intent in intents {
            self.apply(intent);
        }
    }

    pub fn show_map(&mut self, ui: &mut egui::Ui, backend: &mut WalkersMap) {
        backend.attach(ui.ctx());
        self.frame(backend);
        if let Some(viewport) = self.adapter.viewport() {
            backend.show(ui, viewport);
        }
    }
}
