// Map backend drawing with the walkers crate inside egui
use super::{GroupId, MapBackend, MapEvent, MarkerId, MarkerStyle, TileLayer, ViewportId};
use crate::coords::Coordinate;
use crossbeam_channel::{Receiver, Sender, unbounded};
use eframe::egui;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};
use walkers::sources::{Attribution, OpenStreetMap, TileSource};
use walkers::{HttpTiles, Map, MapMemory, Plugin, Position, Projector, TileId, Tiles};

/// Extra pixels around a marker that still count as a hit.
const HIT_SLOP: f32 = 3.0;

fn position(at: Coordinate) -> Position {
    walkers::lat_lon(at.latitude, at.longitude)
}

const OSM_NAME: &str = "OpenStreetMap";

/// Tiles fetched from a `{z}/{x}/{y}` URL template.
struct TemplateSource {
    template: String,
    osm: bool,
}

impl TemplateSource {
    /// Falls back to the OpenStreetMap template when a placeholder is missing.
    fn new(layer: &TileLayer) -> Self {
        let complete = ["{z}", "{x}", "{y}"].iter().all(|p| layer.url_template.contains(p));
        if complete {
            return Self {
                template: layer.url_template.clone(),
                osm: layer.provider_name == OSM_NAME,
            };
        }
        warn!(provider = %layer.provider_name, url = %layer.url_template, "tile url template lacks {{z}}/{{x}}/{{y}}, using OpenStreetMap");
        let fallback = TileLayer::default();
        Self { template: fallback.url_template, osm: true }
    }
}

impl TileSource for TemplateSource {
    fn tile_url(&self, tile_id: TileId) -> String {
        self.template
            .replace("{z}", &tile_id.zoom.to_string())
            .replace("{x}", &tile_id.x.to_string())
            .replace("{y}", &tile_id.y.to_string())
    }

    fn attribution(&self) -> Attribution {
        if self.osm {
            return OpenStreetMap.attribution();
        }
        Attribution { text: "Custom tile provider", url: "", logo_light: None, logo_dark: None }
    }
}

impl MarkerStyle {
    fn paint(self) -> (egui::Color32, f32) {
        match self {
            MarkerStyle::CurrentLocation => (egui::Color32::from_rgb(0x25, 0x63, 0xeb), 9.0),
            MarkerStyle::Preset => (egui::Color32::from_rgb(0x6b, 0x72, 0x80), 7.0),
        }
    }
}

struct ViewportSlot {
    memory: MapMemory,
    home: Position,
    tiles: Option<HttpTiles>,
    attribution: Option<String>,
    listening: bool,
}

struct MarkerSlot {
    viewport: ViewportId,
    position: Position,
    style: MarkerStyle,
    listening: bool,
}

/// The live map widget. Viewports only exist once an egui context has been
/// attached, which happens the first time the map panel is drawn.
pub struct WalkersMap {
    ctx: Option<egui::Context>,
    next_id: u64,
    viewports: FxHashMap<ViewportId, ViewportSlot>,
    groups: FxHashMap<GroupId, ViewportId>,
    markers: FxHashMap<MarkerId, MarkerSlot>,
    events_tx: Sender<MapEvent>,
    events_rx: Receiver<MapEvent>,
}

impl Default for WalkersMap {
    fn default() -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            ctx: None,
            next_id: 1,
            viewports: FxHashMap::default(),
            groups: FxHashMap::default(),
            markers: FxHashMap::default(),
            events_tx,
            events_rx,
        }
    }
}

impl WalkersMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provide the rendering surface.
    pub fn attach(&mut self, ctx: &egui::Context) {
        if self.ctx.is_none() {
            self.ctx = Some(ctx.clone());
            debug!("map surface attached");
        }
    }

    fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Draw one viewport into the remaining space of `ui`.
    pub fn show(&mut self, ui: &mut egui::Ui, viewport: ViewportId) {
        let Some(slot) = self.viewports.get_mut(&viewport) else {
            return;
        };

        if let Some(text) = &slot.attribution {
            ui.label(egui::RichText::new(text).small().weak());
        }

        let mut markers: Vec<PaintedMarker> = self
            .markers
            .iter()
            .filter(|(_, m)| m.viewport == viewport)
            .map(|(id, m)| PaintedMarker {
                id: *id,
                position: m.position,
                style: m.style,
                clickable: m.listening,
            })
            .collect();
        // Presets underneath, current location on top.
        markers.sort_by_key(|m| (m.style == MarkerStyle::CurrentLocation, m.id.0));

        let plugin = MarkersPlugin {
            viewport,
            markers,
            listening: slot.listening,
            events: self.events_tx.clone(),
        };

        let tiles = slot.tiles.as_mut().map(|t| t as &mut dyn Tiles);
        ui.add(Map::new(tiles, &mut slot.memory, slot.home).with_plugin(plugin));
    }
}

impl MapBackend for WalkersMap {
    fn surface_available(&self) -> bool {
        self.ctx.is_some()
    }

    fn create_viewport(&mut self, center: Coordinate, zoom: f64) -> ViewportId {
        let id = ViewportId(self.next());
        let home = position(center);
        let mut memory = MapMemory::default();
        memory.center_at(home);
        if memory.set_zoom(zoom).is_err() {
            warn!(zoom, "zoom level rejected by map, keeping default");
        }
        self.viewports.insert(
            id,
            ViewportSlot { memory, home, tiles: None, attribution: None, listening: false },
        );
        id
    }

    fn add_tile_layer(&mut self, viewport: ViewportId, layer: &TileLayer) {
        let Some(ctx) = self.ctx.clone() else {
            warn!("tile layer requested without a surface");
            return;
        };
        let Some(slot) = self.viewports.get_mut(&viewport) else {
            return;
        };
        let source = TemplateSource::new(layer);
        slot.attribution = Some(if source.osm {
            "© OpenStreetMap contributors".to_string()
        } else {
            format!("Tiles: {}", layer.provider_name)
        });
        debug!(url = %source.template, "tile layer added");
        slot.tiles = Some(HttpTiles::new(source, ctx));
    }

    fn listen_clicks(&mut self, viewport: ViewportId) {
        if let Some(slot) = self.viewports.get_mut(&viewport) {
            slot.listening = true;
        }
    }

    fn set_view(&mut self, viewport: ViewportId, center: Coordinate) {
        if let Some(slot) = self.viewports.get_mut(&viewport) {
            slot.memory.center_at(position(center));
        }
    }

    fn create_group(&mut self, viewport: ViewportId) -> GroupId {
        let id = GroupId(self.next());
        self.groups.insert(id, viewport);
        id
    }

    fn add_marker(
        &mut self,
        viewport: ViewportId,
        group: Option<GroupId>,
        at: Coordinate,
        style: MarkerStyle,
    ) -> MarkerId {
        if let Some(g) = group
            && self.groups.get(&g) != Some(&viewport)
        {
            warn!(group = g.0, viewport = viewport.0, "marker group belongs to another viewport");
        }
        let id = MarkerId(self.next());
        self.markers
            .insert(id, MarkerSlot { viewport, position: position(at), style, listening: false });
        id
    }

    fn listen_marker_clicks(&mut self, marker: MarkerId) {
        if let Some(m) = self.markers.get_mut(&marker) {
            m.listening = true;
        }
    }

    fn set_marker_position(&mut self, marker: MarkerId, at: Coordinate) {
        if let Some(m) = self.markers.get_mut(&marker) {
            m.position = position(at);
        }
    }

    fn remove_viewport(&mut self, viewport: ViewportId) {
        self.viewports.remove(&viewport);
        self.groups.retain(|_, v| *v != viewport);
        self.markers.retain(|_, m| m.viewport != viewport);
    }

    fn drain_events(&mut self) -> Vec<MapEvent> {
        self.events_rx.try_iter().collect()
    }
}

struct PaintedMarker {
    id: MarkerId,
    position: Position,
    style: MarkerStyle,
    clickable: bool,
}

/// Topmost clickable marker under `pointer`. `markers` is in paint order,
/// so the last one drawn wins.
fn hit_marker(
    markers: &[PaintedMarker],
    pointer: egui::Pos2,
    project: impl Fn(Position) -> egui::Pos2,
) -> Option<MarkerId> {
    markers
        .iter()
        .rev()
        .filter(|m| m.clickable)
        .find(|m| {
            let (_, radius) = m.style.paint();
            project(m.position).distance(pointer) <= radius + HIT_SLOP
        })
        .map(|m| m.id)
}

/// Paints markers and turns clicks into [`MapEvent`]s.
struct MarkersPlugin {
    viewport: ViewportId,
    markers: Vec<PaintedMarker>,
    listening: bool,
    events: Sender<MapEvent>,
}

impl Plugin for MarkersPlugin {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        response: &egui::Response,
        projector: &Projector,
        _memory: &MapMemory,
    ) {
        let painter = ui.painter();
        let screen = |p: Position| {
            let v = projector.project(p);
            egui::pos2(v.x, v.y)
        };

        for marker in &self.markers {
            let (color, radius) = marker.style.paint();
            let at = screen(marker.position);
            painter.circle_filled(at + egui::vec2(1.0, 1.0), radius, egui::Color32::from_black_alpha(90));
            painter.circle_filled(at, radius, color);
            painter.circle_stroke(at, radius, egui::Stroke::new(2.0, egui::Color32::WHITE));
        }

        if !response.clicked() {
            return;
        }
        let Some(pointer) = response.interact_pointer_pos() else {
            return;
        };

        let hit = hit_marker(&self.markers, pointer, screen);

        let event = match hit {
            Some(marker) => MapEvent::MarkerClick { viewport: self.viewport, marker },
            None if self.listening => {
                let at = projector.unproject(pointer.to_vec2());
                MapEvent::Click { viewport: self.viewport, at: Coordinate::new(at.y(), at.x()) }
            }
            None => return,
        };

        if self.events.send(event).is_ok() {
            ui.ctx().request_repaint();
        }
    }
}
