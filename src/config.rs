use crate::coords::Coordinate;
use crate::error::ConfigError;
use crate::map::{MapSettings, TileLayer};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CONFIG_FILE_NAME: &str = "terramap.conf";

// --- Backend ---
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { base_url: "http://localhost:8000".to_string(), timeout_secs: 30 }
    }
}

// --- Map ---
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MapConfig {
    pub provider_name: String,
    pub provider_url: String,
    pub default_zoom: f64,
    pub fallback_lat: f64,
    pub fallback_lon: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        let settings = MapSettings::default();
        Self {
            provider_name: settings.tiles.provider_name,
            provider_url: settings.tiles.url_template,
            default_zoom: settings.zoom,
            fallback_lat: settings.fallback_center.latitude,
            fallback_lon: settings.fallback_center.longitude,
        }
    }
}

impl MapConfig {
    pub fn settings(&self) -> MapSettings {
        MapSettings {
            zoom: self.default_zoom,
            fallback_center: Coordinate::new(self.fallback_lat, self.fallback_lon),
            tiles: TileLayer {
                provider_name: self.provider_name.clone(),
                url_template: self.provider_url.clone(),
            },
        }
    }
}

// --- GUI ---
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GuiConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub panel_width: Option<f32>,
    pub font_scale: Option<f32>,
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self { width: Some(1280), height: Some(800), panel_width: Some(380.0), font_scale: Some(1.0) }
    }
}

/// Extra preset declared by the user, appended to the built-in catalog.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PresetEntry {
    pub id: String,
    pub name: String,
    pub lat: String,
    pub lon: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub gui: GuiConfig,
    #[serde(default)]
    pub presets: Vec<PresetEntry>,
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// Sections absent from the raw file, which get written back with defaults.
fn missing_sections(content: &str) -> Vec<&'static str> {
    let raw: toml::Table = toml::from_str(content).unwrap_or_default();
    ["api", "map", "gui"].into_iter().filter(|s| !raw.contains_key(*s)).collect()
}

pub struct AppConfig {
    pub path: PathBuf,
    pub config: Config,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        fs::create_dir_all(&config_dir)?;
        Self::load_from(config_dir.join(CONFIG_FILE_NAME))
    }

    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        let config = if path.exists() {
            debug!(path = %path.display(), "loading config");
            let content = fs::read_to_string(&path)?;
            let cfg = Config::from_toml_str(&content)?;

            let missing = missing_sections(&content);
            if !missing.is_empty() {
                debug!(?missing, "writing back default sections");
                write_config(&path, &cfg)?;
            }
            cfg
        } else {
            let cfg = Config::default();
            write_config(&path, &cfg)?;
            info!(path = %path.display(), "created default config");
            cfg
        };
        Ok(Self { path, config })
    }

    /// Save updated gui config (window size, panel width) back to the file.
    pub fn save_gui_config(&self, gui: &GuiConfig) -> Result<(), ConfigError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "config file vanished, not saving");
            return Ok(());
        }
        let content = fs::read_to_string(&self.path)?;
        let mut cfg = Config::from_toml_str(&content)?;
        cfg.gui = gui.clone();
        write_config(&self.path, &cfg)
    }
}

fn write_config(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    let toml_str = toml::to_string_pretty(cfg)?;
    fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = Config::from_toml_str("").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.api.base_url, "http://localhost:8000");
        assert_eq!(cfg.map.settings(), MapSettings::default());
        assert_eq!(missing_sections(""), vec!["api", "map", "gui"]);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let content = r#"
            [api]
            base_url = "http://risk.internal:9000"

            [map]
            default_zoom = 8.0

            [[presets]]
            id = "tokyo"
            name = "Tokyo, Japan"
            lat = "35.6762"
            lon = "139.6503"
        "#;
        let cfg = Config::from_toml_str(content).unwrap();
        assert_eq!(cfg.api.base_url, "http://risk.internal:9000");
        assert_eq!(cfg.api.timeout_secs, 30);
        assert_eq!(cfg.map.default_zoom, 8.0);
        assert_eq!(cfg.map.fallback_lat, 28.6139);
        assert_eq!(cfg.presets.len(), 1);
        assert_eq!(cfg.presets[0].id, "tokyo");
        assert_eq!(missing_sections(content), vec!["gui"]);
    }

    #[test]
    fn custom_tile_url_reaches_map_settings() {
        let content = r#"
            [map]
            provider_name = "OpenStreetMap"
            provider_url = "https://osm.example.net/{z}/{x}/{y}.png"
        "#;
        let tiles = Config::from_toml_str(content).unwrap().map.settings().tiles;
        assert_eq!(tiles.provider_name, "OpenStreetMap");
        assert_eq!(tiles.url_template, "https://osm.example.net/{z}/{x}/{y}.png");
    }

    #[test]
    fn rejects_malformed_file() {
        assert!(matches!(Config::from_toml_str("[api\nbase_url = 1"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn load_writes_defaults_and_saves_gui() {
        let dir = std::env::temp_dir().join(format!("terramap-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE_NAME);
        let _ = fs::remove_file(&path);

        let loaded = AppConfig::load_from(path.clone()).unwrap();
        assert!(path.exists());
        assert_eq!(loaded.config, Config::default());

        let gui = GuiConfig { width: Some(1600), ..GuiConfig::default() };
        loaded.save_gui_config(&gui).unwrap();
        let reloaded = AppConfig::load_from(path.clone()).unwrap();
        assert_eq!(reloaded.config.gui.width, Some(1600));

        fs::remove_dir_all(&dir).unwrap();
    }
}
