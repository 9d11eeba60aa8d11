use crate::error::{Axis, SyncError};

/// Decimal places used when a map click is written back into the text fields.
pub const CLICK_PRECISION: usize = 4;

/// A committed, numeric coordinate. Both parts are finite; the range is not
/// clamped, the backend decides what is geographically valid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Commit a pair of free-form text fields.
    pub fn parse(latitude: &str, longitude: &str) -> Result<Self, SyncError> {
        Ok(Self {
            latitude: parse_axis(Axis::Latitude, latitude)?,
            longitude: parse_axis(Axis::Longitude, longitude)?,
        })
    }

    pub fn as_lat_lon(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

/// Parse one text field. Surrounding whitespace is ignored; `NaN` and
/// infinities parse as `f64` but are rejected.
pub fn parse_axis(axis: Axis, text: &str) -> Result<f64, SyncError> {
    match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(SyncError::InvalidCoordinateText { axis, text: text.to_string() }),
    }
}

pub fn format_axis(value: f64) -> String {
    format!("{:.*}", CLICK_PRECISION, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trimmed_text() {
        let c = Coordinate::parse(" 28.6139", "77.2090 ").unwrap();
        assert_eq!(c, Coordinate::new(28.6139, 77.2090));
    }

    #[test]
    fn rejects_non_numeric_and_non_finite() {
        for bad in ["", "abc", "12,5", "NaN", "inf", "-infinity", "1e400"] {
            let err = Coordinate::parse(bad, "1.0").unwrap_err();
            assert_eq!(
                err,
                SyncError::InvalidCoordinateText { axis: Axis::Latitude, text: bad.to_string() },
                "input {:?}",
                bad
            );
        }
        let err = Coordinate::parse("1.0", "77.1x").unwrap_err();
        assert!(matches!(err, SyncError::InvalidCoordinateText { axis: Axis::Longitude, .. }));
    }

    #[test]
    fn out_of_range_values_are_kept() {
        let c = Coordinate::parse("123.5", "-400").unwrap();
        assert_eq!(c.as_lat_lon(), (123.5, -400.0));
    }

    #[test]
    fn formats_with_four_decimals() {
        assert_eq!(format_axis(12.34561), "12.3456");
        assert_eq!(format_axis(77.12345678), "77.1235");
        assert_eq!(format_axis(-0.1), "-0.1000");
        assert_eq!(format_axis(5.0), "5.0000");
    }
}
