use super::RiskPanel;
use crate::config::AppConfig;
use crate::map::{Lifecycle, WalkersMap};
use crate::sync::MapSyncComponent;
use eframe::egui;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const APP_TITLE: &str = "TerraMap - Climate Risk Snapshot";
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

pub struct GuiApp {
    config: AppConfig,
    sync: MapSyncComponent,
    map: WalkersMap,
    risk: RiskPanel,
    map_visible: bool,
    initial_scale_applied: bool,
    // Track window size and panel width for saving on exit
    last_window_size: Option<(u32, u32)>,
    panel_width: f32,
    status: Option<(String, Instant)>,
}

impl GuiApp {
    pub fn new(config: AppConfig, sync: MapSyncComponent, risk: RiskPanel) -> Self {
        let gui = &config.config.gui;
        let last_window_size = Some((gui.width.unwrap_or(1280), gui.height.unwrap_or(800)));
        let panel_width = gui.panel_width.unwrap_or(380.0);
        Self {
            config,
            sync,
            map: WalkersMap::new(),
            risk,
            map_visible: true,
            initial_scale_applied: false,
            last_window_size,
            panel_width,
            status: None,
        }
    }

    pub fn run(self) -> Result<(), eframe::Error> {
        let (width, height) = self.last_window_size.unwrap_or((1280, 800));
        debug!(width, height, "opening window");

        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_title(APP_TITLE)
                .with_inner_size([width as f32, height as f32]),
            ..Default::default()
        };

        eframe::run_native(APP_TITLE, options, Box::new(move |_cc| Ok(Box::new(self))))
    }

    fn set_status(&mut self, msg: impl Into<String>) {
        self.status = Some((msg.into(), Instant::now()));
    }

    fn toggle_map(&mut self) {
        self.map_visible = !self.map_visible;
        if self.map_visible {
            self.sync.remount(&mut self.map);
            self.set_status("Map shown.");
        } else {
            self.sync.unmount(&mut self.map);
            self.set_status("Map hidden.");
        }
    }

    fn save_window_state(&self) {
        let mut gui = self.config.config.gui.clone();
        if let Some((w, h)) = self.last_window_size {
            gui.width = Some(w);
            gui.height = Some(h);
        }
        gui.panel_width = Some(self.panel_width);
        match self.config.save_gui_config(&gui) {
            Ok(()) => info!(width = ?gui.width, height = ?gui.height, panel_width = self.panel_width, "saved window state"),
            Err(e) => warn!(error = %e, "error saving config"),
        }
    }

    fn status_line(&self) -> String {
        if let Some((msg, _)) = &self.status {
            return msg.clone();
        }
        let store = self.sync.store();
        let committed = match store.committed() {
            Ok(c) => format!("{:.4}, {:.4}", c.latitude, c.longitude),
            Err(_) => "invalid".to_string(),
        };
        let adapter = self.sync.adapter();
        let map = match adapter.lifecycle() {
            Lifecycle::Uninitialized => "waiting for surface".to_string(),
            Lifecycle::Ready => format!("{} preset markers", adapter.preset_marker_count()),
            Lifecycle::Disposed => "hidden".to_string(),
        };
        format!(
            "Coordinate: {} | Preset: {} | Map: {} | [N] toggle map",
            committed,
            store.selected_preset_id(),
            map
        )
    }
}

impl eframe::App for GuiApp {
    // Required by eframe 0.34; all rendering happens in `update`, which eframe still calls each frame.
    fn ui(&mut self, _ui: &mut egui::Ui, _frame: &mut eframe::Frame) {}

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.initial_scale_applied {
            let user_scale = self.config.config.gui.font_scale.unwrap_or(1.0);
            ctx.set_pixels_per_point(ctx.pixels_per_point() * user_scale);
            self.initial_scale_applied = true;
        }

        if let Some((_, set_time)) = &self.status
            && set_time.elapsed() > STATUS_TIMEOUT
        {
            self.status = None;
        }

        self.risk.poll();
        if self.risk.is_loading() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        if !ctx.wants_keyboard_input() && ctx.input(|i| i.key_pressed(egui::Key::N)) {
            self.toggle_map();
        }

        if let Some(rect) = ctx.input(|i| i.viewport().inner_rect) {
            let ppp = ctx.pixels_per_point();
            self.last_window_size =
                Some(((rect.width() * ppp).round() as u32, (rect.height() * ppp).round() as u32));
        }

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.label(self.status_line());
        });

        let panel = egui::SidePanel::left("controls_panel")
            .resizable(true)
            .min_width(260.0)
            .default_width(self.panel_width)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    ui.heading("Climate Risk Snapshot");
                    ui.label(
                        egui::RichText::new(
                            "Pick a preset, type a coordinate or click the map.",
                        )
                        .small(),
                    );
                    ui.add_space(6.0);
                    self.sync.show_controls(ui);
                    ui.add_space(6.0);
                    self.risk.show(ui, self.sync.store());
                });
            });
        self.panel_width = panel.response.rect.width();

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.map_visible {
                self.sync.show_map(ui, &mut self.map);
            } else {
                ui.centered_and_justified(|ui| {
                    ui.label("Map hidden. Press N to show it.");
                });
            }
        });

        if ctx.input(|i| i.viewport().close_requested()) {
            self.sync.unmount(&mut self.map);
            self.save_window_state();
        }
    }
}
