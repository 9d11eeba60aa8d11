use super::{GroupId, MapBackend, MapEvent, MarkerId, MarkerStyle, TileLayer, ViewportId};
use crate::coords::Coordinate;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
pub struct RecordedViewport {
    pub center: Coordinate,
    pub zoom: f64,
    pub tile_layers: usize,
    pub listening: bool,
}

#[derive(Debug, Clone)]
pub struct RecordedMarker {
    pub viewport: ViewportId,
    pub group: Option<GroupId>,
    pub at: Coordinate,
    pub style: MarkerStyle,
    pub listening: bool,
}

/// In-memory backend that keeps live objects and allocation counters.
#[derive(Debug)]
pub struct RecordingBackend {
    pub available: bool,
    next_id: u64,
    pub viewports: FxHashMap<ViewportId, RecordedViewport>,
    pub groups: FxHashMap<GroupId, ViewportId>,
    pub markers: FxHashMap<MarkerId, RecordedMarker>,
    pub events: Vec<MapEvent>,
    pub viewports_created: usize,
    pub groups_created: usize,
    pub markers_created: FxHashMap<MarkerStyle, usize>,
    pub set_view_calls: usize,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self {
            available: true,
            next_id: 1,
            viewports: FxHashMap::default(),
            groups: FxHashMap::default(),
            markers: FxHashMap::default(),
            events: Vec::new(),
            viewports_created: 0,
            groups_created: 0,
            markers_created: FxHashMap::default(),
            set_view_calls: 0,
        }
    }
}

impl RecordingBackend {
    pub fn without_surface() -> Self {
        Self { available: false, ..Default::default() }
    }

    fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn click(&mut self, viewport: ViewportId, lat: f64, lon: f64) {
        self.events.push(MapEvent::Click { viewport, at: Coordinate::new(lat, lon) });
    }

    pub fn click_marker(&mut self, viewport: ViewportId, marker: MarkerId) {
        self.events.push(MapEvent::MarkerClick { viewport, marker });
    }

    pub fn live_markers(&self, style: MarkerStyle) -> usize {
        self.markers.values().filter(|m| m.style == style).count()
    }

    pub fn live_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn current_markers_created(&self) -> usize {
        self.markers_created.get(&MarkerStyle::CurrentLocation).copied().unwrap_or(0)
    }
}

impl MapBackend for RecordingBackend {
    fn surface_available(&self) -> bool {
        self.available
    }

    fn create_viewport(&mut self, center: Coordinate, zoom: f64) -> ViewportId {
        let id = ViewportId(self.next());
        self.viewports
            .insert(id, RecordedViewport { center, zoom, tile_layers: 0, listening: false });
        self.viewports_created += 1;
        id
    }

    fn add_tile_layer(&mut self, viewport: ViewportId, _layer: &TileLayer) {
        if let Some(v) = self.viewports.get_mut(&viewport) {
            v.tile_layers += 1;
        }
    }

    fn listen_clicks(&mut self, viewport: ViewportId) {
        if let Some(v) = self.viewports.get_mut(&viewport) {
            v.listening = true;
        }
    }

    fn set_view(&mut self, viewport: ViewportId, center: Coordinate) {
        if let Some(v) = self.viewports.get_mut(&viewport) {
            v.center = center;
            self.set_view_calls += 1;
        }
    }

    fn create_group(&mut self, viewport: ViewportId) -> GroupId {
        let id = GroupId(self.next());
        self.groups.insert(id, viewport);
        self.groups_created += 1;
        id
    }

    fn add_marker(
        &mut self,
        viewport: ViewportId,
        group: Option<GroupId>,
        at: Coordinate,
        style: MarkerStyle,
    ) -> MarkerId {
        let id = MarkerId(self.next());
        self.markers.insert(id, RecordedMarker { viewport, group, at, style, listening: false });
        *self.markers_created.entry(style).or_insert(0) += 1;
        id
    }

    fn listen_marker_clicks(&mut self, marker: MarkerId) {
        if let Some(m) = self.markers.get_mut(&marker) {
            m.listening = true;
        }
    }

    fn set_marker_position(&mut self, marker: MarkerId, at: Coordinate) {
        if let Some(m) = self.markers.get_mut(&marker) {
            m.at = at;
        }
    }

    fn remove_viewport(&mut self, viewport: ViewportId) {
        self.viewports.remove(&viewport);
        self.groups.retain(|_, v| *v != viewport);
        self.markers.retain(|_, m| m.viewport != viewport);
    }

    fn drain_events(&mut self) -> Vec<MapEvent> {
        std::mem::take(&mut self.events)
    }
}
