use anyhow::{Context, bail};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::api::{RiskClient, Stat, format_percent, spawn_risk_worker};
use crate::config::AppConfig;
use crate::presets::{CUSTOM_ID, PresetCatalog};
use crate::store::CoordinateStore;
use crate::sync::MapSyncComponent;

mod api;
mod config;
mod coords;
mod error;
mod gui;
mod map;
mod position;
mod presets;
mod store;
mod sync;

const DEFAULT_PRESET: &str = "delhi";

// --- CLI Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("APP_GIT_HASH"), ")"),
    about = "Pick a location on a map and fetch its climate risk snapshot.",
    long_about = None
)]
struct Cli {
    /// Risk backend base URL (overrides the config file)
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Initial preset id
    #[arg(long, value_name = "ID")]
    preset: Option<String>,

    /// Initial latitude text
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<String>,

    /// Initial longitude text
    #[arg(long, allow_hyphen_values = true)]
    lon: Option<String>,

    /// Highlighted statistic: overall_risk, heat_risk, flood_risk,
    /// vegetation_stress, air_quality_proxy
    #[arg(long, default_value = "overall_risk")]
    stat: String,

    /// Print the preset catalog and exit
    #[arg(long)]
    list_presets: bool,

    /// Fetch the snapshot for the initial coordinate and print it instead of
    /// opening the window
    #[arg(long)]
    no_gui: bool,
}

impl Cli {
    fn validate(&self, catalog: &PresetCatalog) -> Result<Stat, String> {
        let stat = Stat::from_key(&self.stat.to_lowercase()).ok_or_else(|| {
            let valid: Vec<_> = Stat::ALL.iter().map(|s| s.key()).collect();
            format!("Invalid stat '{}'. Use one of: {}", self.stat, valid.join(", "))
        })?;

        let manual = self.lat.is_some() || self.lon.is_some();
        if manual && self.preset.is_some() {
            return Err("Use either --preset or --lat/--lon, not both".to_string());
        }
        if manual && (self.lat.is_none() || self.lon.is_none()) {
            return Err("--lat and --lon must be given together".to_string());
        }
        if let Some(id) = &self.preset
            && catalog.find_by_id(id).is_none()
        {
            let ids: Vec<_> = catalog.iter().map(|p| p.id.as_str()).collect();
            return Err(format!("Unknown preset '{}'. Use one of: {}", id, ids.join(", ")));
        }
        Ok(stat)
    }

    fn initial_store(&self, catalog: Arc<PresetCatalog>) -> CoordinateStore {
        match (&self.lat, &self.lon) {
            (Some(lat), Some(lon)) => CoordinateStore::new(catalog, lat.as_str(), lon.as_str(), CUSTOM_ID),
            _ => CoordinateStore::with_preset(catalog, self.preset.as_deref().unwrap_or(DEFAULT_PRESET)),
        }
    }
}

fn print_presets(catalog: &PresetCatalog) {
    println!("{} preset locations:", catalog.len());
    for preset in catalog.iter() {
        if preset.is_custom() {
            println!("  {:<12} {}", preset.id, preset.display_name);
        } else {
            println!(
                "  {:<12} {:<28} {:>9} {:>10}",
                preset.id, preset.display_name, preset.latitude, preset.longitude
            );
        }
    }
}

fn run_report(client: &RiskClient, store: &CoordinateStore, highlight: Stat) -> anyhow::Result<()> {
    let at = match store.committed() {
        Ok(at) => at,
        Err(e) => bail!("{} ({})", e.user_message().unwrap_or("Invalid coordinate."), e),
    };

    let snapshot = client.score(at)?;
    let green = "\x1b[32m";
    let reset = "\x1b[0m";

    println!("Climate risk at {}, {} ({})", store.latitude_text(), store.longitude_text(), store.selected_preset_id());
    println!("========================================================");
    for stat in Stat::ALL {
        let value = format_percent(stat.value(&snapshot.scores));
        if stat == highlight {
            println!("{}* {:<20} {:>5}{}", green, stat.label(), value, reset);
        } else {
            println!("  {:<20} {:>5}", stat.label(), value);
        }
    }
    if !snapshot.summary.is_empty() {
        println!("\n{}", snapshot.summary);
    }

    match client.history(at) {
        Ok(years) if !years.is_empty() => {
            println!("\nLast 10 years - Climate Risk Model");
            println!("  {:<6} {:>8} {:>6} {:>6} {:>11} {:>12}", "Year", "Overall", "Heat", "Flood", "Vegetation", "Air Quality");
            for entry in years {
                let s = &entry.scores;
                println!(
                    "  {:<6} {:>8} {:>6} {:>6} {:>11} {:>12}",
                    entry.year,
                    format_percent(s.overall_risk),
                    format_percent(s.heat_risk),
                    format_percent(s.flood_risk),
                    format_percent(s.vegetation_stress),
                    format_percent(s.air_quality_proxy)
                );
            }
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "history request failed"),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .try_init();

    let args = Cli::parse();
    let app_config = AppConfig::load().context("loading config")?;
    let catalog = Arc::new(PresetCatalog::with_extra(&app_config.config.presets));

    let stat = match args.validate(&catalog) {
        Ok(stat) => stat,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if args.list_presets {
        print_presets(&catalog);
        return Ok(());
    }

    let api = &app_config.config.api;
    let base_url = args.api_url.clone().unwrap_or_else(|| api.base_url.clone());
    let client = RiskClient::new(&base_url, Duration::from_secs(api.timeout_secs))
        .context("building HTTP client")?;
    let store = args.initial_store(catalog);

    if args.no_gui {
        return run_report(&client, &store, stat);
    }

    info!(api = %client.base_url(), preset = %store.selected_preset_id(), "launching GUI");
    let (jobs, updates) = spawn_risk_worker(client);
    let risk = gui::RiskPanel::new(jobs, updates, stat);
    let sync = MapSyncComponent::new(store, app_config.config.map.settings());
    let app = gui::GuiApp::new(app_config, sync, risk);
    if let Err(e) = app.run() {
        eprintln!("GUI Error: {}", e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("terramap").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_to_delhi() {
        let catalog = Arc::new(PresetCatalog::builtin());
        let cli = parse(&[]);
        assert_eq!(cli.validate(&catalog), Ok(Stat::OverallRisk));
        let store = cli.initial_store(catalog);
        assert_eq!(store.selected_preset_id(), "delhi");
        assert_eq!(store.latitude_text(), "28.6139");
    }

    #[test]
    fn manual_coordinates_are_custom() {
        let catalog = Arc::new(PresetCatalog::builtin());
        let cli = parse(&["--lat", "-12.5", "--lon", "130", "--stat", "HEAT_RISK"]);
        assert_eq!(cli.validate(&catalog), Ok(Stat::HeatRisk));
        let store = cli.initial_store(catalog);
        assert_eq!(store.selected_preset_id(), CUSTOM_ID);
        assert_eq!(store.latitude_text(), "-12.5");
    }

    #[test]
    fn rejects_conflicts() {
        let catalog = PresetCatalog::builtin();
        assert!(parse(&["--lat", "1"]).validate(&catalog).is_err());
        assert!(parse(&["--preset", "london", "--lat", "1", "--lon", "2"]).validate(&catalog).is_err());
        assert!(parse(&["--preset", "paris"]).validate(&catalog).is_err());
        assert!(parse(&["--stat", "wind"]).validate(&catalog).is_err());
    }
}
