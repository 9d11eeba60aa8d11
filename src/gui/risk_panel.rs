use crate::api::{HistoryEntry, RiskJob, RiskSnapshot, RiskUpdate, Stat, format_percent};
use crate::store::CoordinateStore;
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use egui_extras::{Column, TableBuilder};
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, PartialEq)]
enum PanelError {
    /// Bad coordinate text; hidden again as soon as the store changes.
    Validation { revision: u64, message: String },
    Request(String),
}

/// Sends the committed coordinate to the backend and shows what comes back.
/// Results never flow back into the store.
pub struct RiskPanel {
    jobs: Sender<RiskJob>,
    updates: Receiver<RiskUpdate>,
    seq: u64,
    loading: bool,
    error: Option<PanelError>,
    snapshot: Option<RiskSnapshot>,
    history: Option<Vec<HistoryEntry>>,
    pub selected_stat: Stat,
}

impl RiskPanel {
    pub fn new(jobs: Sender<RiskJob>, updates: Receiver<RiskUpdate>, selected_stat: Stat) -> Self {
        Self {
            jobs,
            updates,
            seq: 0,
            loading: false,
            error: None,
            snapshot: None,
            history: None,
            selected_stat,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error_message(&self, store: &CoordinateStore) -> Option<&str> {
        match &self.error {
            Some(PanelError::Validation { revision, message }) if *revision == store.revision() => {
                Some(message.as_str())
            }
            Some(PanelError::Validation { .. }) | None => None,
            Some(PanelError::Request(message)) => Some(message.as_str()),
        }
    }

    /// Commit the store and queue a request. Returns false when nothing was
    /// sent.
    pub fn request(&mut self, store: &CoordinateStore) -> bool {
        self.error = None;
        self.snapshot = None;
        self.history = None;

        let at = match store.committed() {
            Ok(at) => at,
            Err(e) => {
                debug!(error = %e, "not requesting risk for invalid coordinate");
                let message = e.user_message().unwrap_or("Invalid coordinate.").to_string();
                self.error = Some(PanelError::Validation { revision: store.revision(), message });
                self.loading = false;
                return false;
            }
        };

        self.seq += 1;
        if self.jobs.send(RiskJob { seq: self.seq, at }).is_err() {
            warn!("risk worker is gone");
            self.error = Some(PanelError::Request("Risk worker stopped.".to_string()));
            self.loading = false;
            return false;
        }
        self.loading = true;
        true
    }

    /// Drain finished requests. Responses to superseded requests are dropped.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(update) = self.updates.try_recv() {
            match update {
                RiskUpdate::Score { seq, .. } | RiskUpdate::History { seq, .. } if seq != self.seq => {
                    trace!(seq, current = self.seq, "dropping stale risk response");
                }
                RiskUpdate::Score { result, .. } => {
                    self.loading = false;
                    match result {
                        Ok(snapshot) => self.snapshot = Some(snapshot),
                        Err(e) => {
                            warn!(error = %e, "risk request failed");
                            self.error = Some(PanelError::Request(e.to_string()));
                        }
                    }
                    changed = true;
                }
                RiskUpdate::History { years, .. } => {
                    self.history = Some(years);
                    changed = true;
                }
            }
        }
        changed
    }

    pub fn show(&mut self, ui: &mut egui::Ui, store: &CoordinateStore) {
        let label = if self.loading { "Fetching..." } else { "Get Risk Score" };
        if ui.add_enabled(!self.loading, egui::Button::new(label)).clicked() {
            self.request(store);
        }

        if let Some(message) = self.error_message(store) {
            ui.colored_label(egui::Color32::from_rgb(0xf8, 0x71, 0x71), message);
        }

        let Some(snapshot) = &self.snapshot else {
            return;
        };

        ui.separator();
        ui.horizontal(|ui| {
            ui.label("Highlight statistic:");
            egui::ComboBox::from_id_salt("highlight_stat")
                .selected_text(self.selected_stat.label())
                .show_ui(ui, |ui| {
                    for stat in Stat::ALL {
                        ui.selectable_value(&mut self.selected_stat, stat, stat.label());
                    }
                });
        });

        ui.horizontal_wrapped(|ui| {
            for stat in Stat::ALL {
                let highlighted = stat == self.selected_stat;
                let stroke = if highlighted {
                    egui::Stroke::new(2.0, egui::Color32::from_rgb(0x60, 0xa5, 0xfa))
                } else {
                    ui.visuals().widgets.noninteractive.bg_stroke
                };
                egui::Frame::group(ui.style()).stroke(stroke).show(ui, |ui| {
                    ui.vertical(|ui| {
                        ui.label(egui::RichText::new(stat.key().replace('_', " ")).small());
                        ui.label(egui::RichText::new(format_percent(stat.value(&snapshot.scores))).heading().strong());
                    });
                });
            }
        });

        if !snapshot.summary.is_empty() {
            ui.add_space(4.0);
            ui.label(egui::RichText::new(&snapshot.summary).small());
        }

        if let Some(history) = self.history.as_ref().filter(|h| !h.is_empty()) {
            ui.separator();
            ui.label(egui::RichText::new("Last 10 years - Climate Risk Model").strong());
            show_history_table(ui, history);
        }
    }
}

fn show_history_table(ui: &mut egui::Ui, history: &[HistoryEntry]) {
    let columns = [
        ("Overall", Stat::OverallRisk),
        ("Heat", Stat::HeatRisk),
        ("Flood", Stat::FloodRisk),
        ("Vegetation", Stat::VegetationStress),
        ("Air Quality", Stat::AirQualityProxy),
    ];

    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto().at_least(48.0))
        .columns(Column::auto().at_least(56.0), columns.len())
        .header(18.0, |mut header| {
            header.col(|ui| {
                ui.strong("Year");
            });
            for (title, _) in columns {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|mut body| {
            for entry in history {
                body.row(16.0, |mut row| {
                    row.col(|ui| {
                        ui.label(entry.year.to_string());
                    });
                    for (_, stat) in columns {
                        row.col(|ui| {
                            ui.label(format_percent(stat.value(&entry.scores)));
                        });
                    }
                });
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, RiskScores};
    use crate::presets::PresetCatalog;
    use crossbeam_channel::unbounded;
    use std::sync::Arc;

    const SCORES: RiskScores = RiskScores {
        heat_risk: 0.5,
        flood_risk: 0.1,
        vegetation_stress: 0.2,
        air_quality_proxy: 0.3,
        overall_risk: 0.4,
    };

    fn snapshot(summary: &str) -> RiskSnapshot {
        RiskSnapshot { summary: summary.to_string(), scores: SCORES }
    }

    fn setup() -> (RiskPanel, Receiver<RiskJob>, Sender<RiskUpdate>, CoordinateStore) {
        let (job_tx, job_rx) = unbounded();
        let (update_tx, update_rx) = unbounded();
        let panel = RiskPanel::new(job_tx, update_rx, Stat::default());
        let store = CoordinateStore::with_preset(Arc::new(PresetCatalog::builtin()), "delhi");
        (panel, job_rx, update_tx, store)
    }

    #[test]
    fn invalid_text_sends_nothing() {
        let (mut panel, jobs, _updates, mut store) = setup();
        store.set_longitude_text("east");

        assert!(!panel.request(&store));
        assert!(jobs.try_recv().is_err());
        assert!(!panel.is_loading());
        assert_eq!(
            panel.error_message(&store),
            Some("Please enter valid numeric latitude and longitude.")
        );

        store.set_longitude_text("77.2");
        assert_eq!(panel.error_message(&store), None);
    }

    #[test]
    fn valid_request_and_response() {
        let (mut panel, jobs, updates, store) = setup();
        assert!(panel.request(&store));
        assert!(panel.is_loading());

        let job = jobs.try_recv().unwrap();
        assert_eq!(job.seq, 1);
        assert_eq!(job.at.as_lat_lon(), (28.6139, 77.2090));

        updates.send(RiskUpdate::Score { seq: 1, result: Ok(snapshot("ok")) }).unwrap();
        updates.send(RiskUpdate::History { seq: 1, years: vec![HistoryEntry { year: 2020, scores: SCORES }] }).unwrap();
        assert!(panel.poll());
        assert!(!panel.is_loading());
        assert_eq!(panel.snapshot.as_ref().unwrap().summary, "ok");
        assert_eq!(panel.history.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn stale_responses_are_dropped() {
        let (mut panel, _jobs, updates, store) = setup();
        panel.request(&store);
        panel.request(&store);

        updates.send(RiskUpdate::Score { seq: 1, result: Ok(snapshot("old")) }).unwrap();
        assert!(!panel.poll());
        assert!(panel.is_loading());
        assert!(panel.snapshot.is_none());

        updates.send(RiskUpdate::Score { seq: 2, result: Ok(snapshot("new")) }).unwrap();
        assert!(panel.poll());
        assert_eq!(panel.snapshot.as_ref().unwrap().summary, "new");
    }

    #[test]
    fn request_errors_are_shown() {
        let (mut panel, _jobs, updates, store) = setup();
        panel.request(&store);
        updates
            .send(RiskUpdate::Score {
                seq: 1,
                result: Err(ApiError::Status { status: 503, detail: None }),
            })
            .unwrap();
        panel.poll();
        assert_eq!(panel.error_message(&store), Some("Failed to fetch climate risk."));
        assert!(panel.snapshot.is_none());
    }
}
