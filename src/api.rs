use crate::coords::Coordinate;
use crossbeam_channel::{Receiver, Sender, unbounded};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unable to reach TerraViT backend at {base_url}. Is it running?")]
    Transport {
        base_url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{}", .detail.as_deref().unwrap_or("Failed to fetch climate risk."))]
    Status { status: u16, detail: Option<String> },
    #[error("unexpected response from backend: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct RiskRequest {
    pub lat: f64,
    pub lon: f64,
}

impl From<Coordinate> for RiskRequest {
    fn from(c: Coordinate) -> Self {
        Self { lat: c.latitude, lon: c.longitude }
    }
}

/// Risk fractions in 0..1.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct RiskScores {
    pub heat_risk: f64,
    pub flood_risk: f64,
    pub vegetation_stress: f64,
    pub air_quality_proxy: f64,
    pub overall_risk: f64,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RiskSnapshot {
    #[serde(default)]
    pub summary: String,
    pub scores: RiskScores,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub year: i32,
    pub scores: RiskScores,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
struct HistoryResponse {
    #[serde(default)]
    years: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stat {
    #[default]
    OverallRisk,
    HeatRisk,
    FloodRisk,
    VegetationStress,
    AirQualityProxy,
}

impl Stat {
    pub const ALL: [Stat; 5] =
        [Stat::OverallRisk, Stat::HeatRisk, Stat::FloodRisk, Stat::VegetationStress, Stat::AirQualityProxy];

    pub fn key(self) -> &'static str {
        match self {
            Stat::OverallRisk => "overall_risk",
            Stat::HeatRisk => "heat_risk",
            Stat::FloodRisk => "flood_risk",
            Stat::VegetationStress => "vegetation_stress",
            Stat::AirQualityProxy => "air_quality_proxy",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stat::OverallRisk => "Overall risk",
            Stat::HeatRisk => "Heat",
            Stat::FloodRisk => "Flood",
            Stat::VegetationStress => "Vegetation stress",
            Stat::AirQualityProxy => "Air quality proxy",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.key() == key)
    }

    pub fn value(self, scores: &RiskScores) -> f64 {
        match self {
            Stat::OverallRisk => scores.overall_risk,
            Stat::HeatRisk => scores.heat_risk,
            Stat::FloodRisk => scores.flood_risk,
            Stat::VegetationStress => scores.vegetation_stress,
            Stat::AirQualityProxy => scores.air_quality_proxy,
        }
    }
}

pub fn format_percent(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}

/// Pull FastAPI's `detail` out of an error body. It is usually a string but
/// validation errors carry a list.
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

pub struct RiskClient {
    http: Client,
    base_url: String,
}

impl RiskClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post(&self, path: &str, at: Coordinate) -> Result<String, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let transport = |source| ApiError::Transport { base_url: self.base_url.clone(), source };

        let resp = self.http.post(&url).json(&RiskRequest::from(at)).send().map_err(transport)?;
        let status = resp.status();
        let body = resp.text().map_err(transport)?;
        if !status.is_success() {
            return Err(ApiError::Status { status: status.as_u16(), detail: error_detail(&body) });
        }
        Ok(body)
    }

    pub fn score(&self, at: Coordinate) -> Result<RiskSnapshot, ApiError> {
        info!(lat = at.latitude, lon = at.longitude, "requesting risk score");
        let body = self.post("/risk/score", at)?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Yearly history, sorted by year.
    pub fn history(&self, at: Coordinate) -> Result<Vec<HistoryEntry>, ApiError> {
        let body = self.post("/risk/history", at)?;
        let mut resp: HistoryResponse = serde_json::from_str(&body)?;
        resp.years.sort_by_key(|e| e.year);
        Ok(resp.years)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RiskJob {
    pub seq: u64,
    pub at: Coordinate,
}

#[derive(Debug)]
pub enum RiskUpdate {
    Score { seq: u64, result: Result<RiskSnapshot, ApiError> },
    History { seq: u64, years: Vec<HistoryEntry> },
}

/// Run requests on a background thread. History is only fetched after a
/// successful score and its failures are logged, not reported.
pub fn spawn_risk_worker(client: RiskClient) -> (Sender<RiskJob>, Receiver<RiskUpdate>) {
    let (job_tx, job_rx) = unbounded::<RiskJob>();
    let (update_tx, update_rx) = unbounded();

    thread::spawn(move || {
        for job in job_rx {
            let result = client.score(job.at);
            let ok = result.is_ok();
            if update_tx.send(RiskUpdate::Score { seq: job.seq, result }).is_err() {
                break;
            }
            if !ok {
                continue;
            }
            match client.history(job.at) {
                Ok(years) => {
                    if update_tx.send(RiskUpdate::History { seq: job.seq, years }).is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "history request failed"),
            }
        }
    });

    (job_tx, update_rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCORE: &str = r#"{
        "summary": "Elevated heat exposure.",
        "scores": {"heat_risk": 0.81, "flood_risk": 0.2, "vegetation_stress": 0.45,
                   "air_quality_proxy": 0.6, "overall_risk": 0.5149}
    }"#;

    #[test]
    fn decodes_score() {
        let snap: RiskSnapshot = serde_json::from_str(SCORE).unwrap();
        assert_eq!(snap.summary, "Elevated heat exposure.");
        assert_eq!(Stat::HeatRisk.value(&snap.scores), 0.81);
        assert_eq!(format_percent(snap.scores.overall_risk), "51%");
        assert_eq!(format_percent(snap.scores.heat_risk), "81%");
    }

    #[test]
    fn decodes_history_without_years() {
        let resp: HistoryResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.years.is_empty());
    }

    #[test]
    fn request_body_shape() {
        let body = serde_json::to_value(RiskRequest::from(Coordinate::new(19.076, 72.8777))).unwrap();
        assert_eq!(body, serde_json::json!({"lat": 19.076, "lon": 72.8777}));
    }

    #[test]
    fn status_errors_prefer_detail() {
        let err = ApiError::Status { status: 422, detail: error_detail(r#"{"detail":"lat out of range"}"#) };
        assert_eq!(err.to_string(), "lat out of range");

        let err = ApiError::Status { status: 500, detail: error_detail("<html>oops</html>") };
        assert_eq!(err.to_string(), "Failed to fetch climate risk.");

        let detail = error_detail(r#"{"detail":[{"loc":["body","lat"]}]}"#).unwrap();
        assert!(detail.contains("lat"));
    }

    #[test]
    fn stat_keys_round_trip() {
        for stat in Stat::ALL {
            assert_eq!(Stat::from_key(stat.key()), Some(stat));
        }
        assert_eq!(Stat::from_key("wind"), None);
    }
}
