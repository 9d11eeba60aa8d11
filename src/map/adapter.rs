use super::{GroupId, MapBackend, MapEvent, MapSettings, MarkerId, MarkerStyle, ViewportId};
use crate::coords::Coordinate;
use crate::error::SyncError;
use crate::store::CoordinateStore;
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Ready,
    Disposed,
}

/// Everything allocated on the backend for one mounted adapter.
#[derive(Debug)]
struct MapHandle {
    viewport: ViewportId,
    preset_group: GroupId,
    /// Marker -> preset id, filled once at mount.
    preset_markers: FxHashMap<MarkerId, String>,
    /// Created on the first valid coordinate, then only moved.
    current_marker: Option<MarkerId>,
    /// Last coordinate pushed to the viewport.
    applied: Option<Coordinate>,
}

#[derive(Debug)]
enum AdapterState {
    Uninitialized,
    Ready(MapHandle),
    Disposed,
}

/// Bridges a [`MapBackend`] and a [`CoordinateStore`].
///
/// One instance allocates its map resources at most once. After
/// [`MapWidgetAdapter::unmount`] it stays disposed; remounting the map means
/// building a new adapter.
#[derive(Debug)]
pub struct MapWidgetAdapter {
    settings: MapSettings,
    state: AdapterState,
}

impl MapWidgetAdapter {
    pub fn new(settings: MapSettings) -> Self {
        Self { settings, state: AdapterState::Uninitialized }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        match self.state {
            AdapterState::Uninitialized => Lifecycle::Uninitialized,
            AdapterState::Ready(_) => Lifecycle::Ready,
            AdapterState::Disposed => Lifecycle::Disposed,
        }
    }

    pub fn viewport(&self) -> Option<ViewportId> {
        match &self.state {
            AdapterState::Ready(h) => Some(h.viewport),
            _ => None,
        }
    }

    pub fn current_marker(&self) -> Option<MarkerId> {
        match &self.state {
            AdapterState::Ready(h) => h.current_marker,
            _ => None,
        }
    }

    pub fn preset_marker_count(&self) -> usize {
        match &self.state {
            AdapterState::Ready(h) => h.preset_markers.len(),
            _ => 0,
        }
    }

    /// Allocate the map. Returns `MapResourceUnavailable` while the backend
    /// has no surface yet; the caller retries on the next frame. Calling it
    /// again once `Ready` (or after `Disposed`) does nothing.
    pub fn mount<B: MapBackend>(
        &mut self,
        backend: &mut B,
        store: &CoordinateStore,
    ) -> Result<(), SyncError> {
        if !matches!(self.state, AdapterState::Uninitialized) {
            return Ok(());
        }
        if !backend.surface_available() {
            return Err(SyncError::MapResourceUnavailable);
        }

        let center = match store.committed() {
            Ok(c) => c,
            Err(e) => {
                debug!(error = %e, "mounting map on fallback center");
                self.settings.fallback_center
            }
        };

        let viewport = backend.create_viewport(center, self.settings.zoom);
        backend.add_tile_layer(viewport, &self.settings.tiles);
        backend.listen_clicks(viewport);

        let preset_group = backend.create_group(viewport);
        let mut preset_markers = FxHashMap::default();
        for (preset, at) in store.catalog().located() {
            let marker = backend.add_marker(viewport, Some(preset_group), at, MarkerStyle::Preset);
            backend.listen_marker_clicks(marker);
            preset_markers.insert(marker, preset.id.clone());
        }

        debug!(
            viewport = viewport.0,
            presets = preset_markers.len(),
            lat = center.latitude,
            lon = center.longitude,
            "map mounted"
        );
        self.state = AdapterState::Ready(MapHandle {
            viewport,
            preset_group,
            preset_markers,
            current_marker: None,
            applied: None,
        });
        Ok(())
    }

    /// Translate queued widget events into store operations. Events are
    /// dropped unless the adapter is `Ready` and they belong to its viewport.
    /// Returns how many events changed the store.
    pub fn dispatch<B: MapBackend>(&mut self, backend: &mut B, store: &mut CoordinateStore) -> usize {
        let events = backend.drain_events();
        let AdapterState::Ready(handle) = &self.state else {
            if !events.is_empty() {
                trace!(count = events.len(), state = ?self.lifecycle(), "dropping map events");
            }
            return 0;
        };

        let mut applied = 0;
        for event in events {
            match event {
                MapEvent::Click { viewport, at } if viewport == handle.viewport => {
                    store.set_from_click(at.latitude, at.longitude);
                    applied += 1;
                }
                MapEvent::MarkerClick { viewport, marker } if viewport == handle.viewport => {
                    match handle.preset_markers.get(&marker) {
                        Some(id) => {
                            store.select_preset(id);
                            applied += 1;
                        }
                        None => trace!(marker = marker.0, "click on marker without preset"),
                    }
                }
                other => trace!(event = ?other, "event for foreign viewport"),
            }
        }
        applied
    }

    /// Bring viewport and current-location marker to the committed
    /// coordinate. Only the latest value is applied; invalid text is skipped.
    pub fn sync<B: MapBackend>(&mut self, backend: &mut B, store: &CoordinateStore) {
        let AdapterState::Ready(handle) = &mut self.state else {
            return;
        };
        let Ok(at) = store.committed() else {
            return;
        };
        if handle.applied == Some(at) {
            return;
        }

        backend.set_view(handle.viewport, at);
        match handle.current_marker {
            Some(marker) => backend.set_marker_position(marker, at),
            None => {
                let marker =
                    backend.add_marker(handle.viewport, None, at, MarkerStyle::CurrentLocation);
                handle.current_marker = Some(marker);
            }
        }
        handle.applied = Some(at);
        trace!(lat = at.latitude, lon = at.longitude, "map synced");
    }

    /// Release everything. Safe to call in any state.
    pub fn unmount<B: MapBackend>(&mut self, backend: &mut B) {
        match std::mem::replace(&mut self.state, AdapterState::Disposed) {
            AdapterState::Ready(handle) => {
                backend.remove_viewport(handle.viewport);
                debug!(viewport = handle.viewport.0, group = handle.preset_group.0, "map disposed");
            }
            AdapterState::Uninitialized => debug!("map unmounted before it was allocated"),
            AdapterState::Disposed => {}
        }
    }
}

impl Drop for MapWidgetAdapter {
    fn drop(&mut self) {
        if let AdapterState::Ready(handle) = &self.state {
            warn!(viewport = handle.viewport.0, "map adapter dropped while still mounted");
        }
    }
}
