use geo::{Bearing, Distance, Geodesic, Point};

pub fn in_geographic_range(lat: f64, lon: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

/// Meters between two `(lat, lon)` points on the WGS84 ellipsoid, plus the
/// heading from the first toward the second, normalized to `[0, 360)`.
pub fn distance_and_bearing(p1: (f64, f64), p2: (f64, f64)) -> (f64, f64) {
    let start = Point::new(p1.1, p1.0);
    let end = Point::new(p2.1, p2.0);
    let distance = Geodesic.distance(start, end);
    let raw_bearing = Geodesic.bearing(start, end);
    let bearing = (raw_bearing + 360.0) % 360.0;
    (distance, bearing)
}

/// Short distance label for the nearest-preset hint: "850 m", "12.35 km".
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 { format!("{:.0} m", meters) } else { format!("{:.2} km", meters / 1000.0) }
}

/// Heading in whole degrees followed by its eight-point compass sector.
pub fn format_bearing(degrees: f64) -> String {
    let directions = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    let idx = ((degrees + 22.5) / 45.0) as usize % 8;
    format!("{:.0}° {}", degrees, directions[idx])
}
