use std::fmt;
use thiserror::Error;

/// Which half of a coordinate a piece of text belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Latitude => f.write_str("latitude"),
            Axis::Longitude => f.write_str("longitude"),
        }
    }
}

/// Errors raised while keeping the coordinate inputs and the map in step.
/// None of them are fatal; callers absorb them locally.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("invalid {axis} text {text:?}")]
    InvalidCoordinateText { axis: Axis, text: String },
    #[error("preset {0:?} not found")]
    PresetNotFound(String),
    #[error("map surface not available yet")]
    MapResourceUnavailable,
}

impl SyncError {
    /// Inline message shown next to the inputs. Only invalid text is ever
    /// surfaced to the user.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            SyncError::InvalidCoordinateText { .. } => {
                Some("Please enter valid numeric latitude and longitude.")
            }
            SyncError::PresetNotFound(_) | SyncError::MapResourceUnavailable => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no config dir found")]
    NoConfigDir,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config, format might have changed: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to write config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
