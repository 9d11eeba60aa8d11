// Map widget abstraction: the imperative map resource behind a small trait,
// the lifecycle adapter that owns it, and the walkers/egui implementation.
use crate::coords::Coordinate;

pub mod adapter;
pub mod walkers_map;

#[cfg(test)]
pub mod testing;

pub use adapter::{Lifecycle, MapWidgetAdapter};
pub use walkers_map::WalkersMap;

pub const DEFAULT_ZOOM: f64 = 5.0;
pub const FALLBACK_CENTER: Coordinate = Coordinate::new(28.6139, 77.2090);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewportId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerStyle {
    CurrentLocation,
    Preset,
}

/// Raw input coming out of the widget. Only delivered for viewports and
/// markers that had a listener registered.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    Click { viewport: ViewportId, at: Coordinate },
    MarkerClick { viewport: ViewportId, marker: MarkerId },
}

/// Tile layer description. Configuration only.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    pub provider_name: String,
    pub url_template: String,
}

impl Default for TileLayer {
    fn default() -> Self {
        Self {
            provider_name: "OpenStreetMap".to_string(),
            url_template: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
        }
    }
}

/// Parameters used when the viewport is first allocated.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSettings {
    pub zoom: f64,
    pub fallback_center: Coordinate,
    pub tiles: TileLayer,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self { zoom: DEFAULT_ZOOM, fallback_center: FALLBACK_CENTER, tiles: TileLayer::default() }
    }
}

/// The external, stateful map widget. Handles are plain ids; the backend
/// owns the underlying objects until `remove_viewport` releases the
/// viewport together with every group and marker attached to it.
pub trait MapBackend {
    /// Whether a rendering surface exists to allocate a viewport on.
    fn surface_available(&self) -> bool;

    fn create_viewport(&mut self, center: Coordinate, zoom: f64) -> ViewportId;
    fn add_tile_layer(&mut self, viewport: ViewportId, layer: &TileLayer);
    fn listen_clicks(&mut self, viewport: ViewportId);
    /// Pan without re-creating the viewport; zoom is preserved.
    fn set_view(&mut self, viewport: ViewportId, center: Coordinate);

    fn create_group(&mut self, viewport: ViewportId) -> GroupId;
    fn add_marker(
        &mut self,
        viewport: ViewportId,
        group: Option<GroupId>,
        at: Coordinate,
        style: MarkerStyle,
    ) -> MarkerId;
    fn listen_marker_clicks(&mut self, marker: MarkerId);
    fn set_marker_position(&mut self, marker: MarkerId, at: Coordinate);

    fn remove_viewport(&mut self, viewport: ViewportId);

    fn drain_events(&mut self) -> Vec<MapEvent>;
}
