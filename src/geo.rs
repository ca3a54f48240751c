use serde::{Deserialize, Serialize};

/// Tolerance, in degrees, for treating two coordinates as the same place.
/// Matches the grouping precision of [`GroupKey`] (4 decimal places, about 11 m).
pub const COORDINATE_EPSILON: f64 = 1e-4;

const KEY_SCALE: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and inside the WGS84 degree ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    pub fn key(&self) -> GroupKey {
        GroupKey {
            lat: (self.lat * KEY_SCALE).round() as i64,
            lng: (self.lng * KEY_SCALE).round() as i64,
        }
    }

    pub fn approx_eq(&self, other: &Coordinate) -> bool {
        // Allow for binary representation noise right at the tolerance boundary.
        let tolerance = COORDINATE_EPSILON + 1e-9;
        (self.lat - other.lat).abs() <= tolerance && (self.lng - other.lng).abs() <= tolerance
    }
}

/// Coordinates rounded to 4 decimal places, used to merge near-duplicate locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    lat: i64,
    lng: i64,
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.4},{:.4}",
            self.lat as f64 / KEY_SCALE,
            self.lng as f64 / KEY_SCALE
        )
    }
}

/// A possibly partial coordinate, as received from assistant directives or bus payloads.
///
/// Missing or non-numeric fields are kept as `None` instead of rejecting the whole
/// list; consumers call [`LocationHint::to_coordinate`] and skip what does not resolve.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LocationHint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

impl LocationHint {
    /// Reads `lat`/`lng` from an arbitrary JSON value without failing.
    pub fn from_value(value: &serde_json::Value) -> Self {
        Self {
            lat: value.get("lat").and_then(serde_json::Value::as_f64),
            lng: value.get("lng").and_then(serde_json::Value::as_f64),
        }
    }

    pub fn to_coordinate(&self) -> Option<Coordinate> {
        let coordinate = Coordinate::new(self.lat?, self.lng?);
        coordinate.is_valid().then_some(coordinate)
    }
}

impl From<Coordinate> for LocationHint {
    fn from(coordinate: Coordinate) -> Self {
        Self {
            lat: Some(coordinate.lat),
            lng: Some(coordinate.lng),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// Smallest box containing every point; `None` for an empty input.
    pub fn enclosing<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Coordinate>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bounds = Bounds {
            south: first.lat,
            west: first.lng,
            north: first.lat,
            east: first.lng,
        };
        for point in points {
            bounds.south = bounds.south.min(point.lat);
            bounds.north = bounds.north.max(point.lat);
            bounds.west = bounds.west.min(point.lng);
            bounds.east = bounds.east.max(point.lng);
        }
        Some(bounds)
    }

    /// Center in Web-Mercator space, so the framed area is visually centered.
    pub fn center(&self) -> Coordinate {
        let y = (mercator_y(self.north) + mercator_y(self.south)) / 2.0;
        Coordinate::new(inverse_mercator_y(y), (self.west + self.east) / 2.0)
    }

    pub fn lng_span(&self) -> f64 {
        self.east - self.west
    }

    /// Height of the box in Web-Mercator radians.
    pub fn mercator_span(&self) -> f64 {
        (mercator_y(self.north) - mercator_y(self.south)).abs()
    }
}

const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

pub fn mercator_y(lat: f64) -> f64 {
    let phi = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    (std::f64::consts::FRAC_PI_4 + phi / 2.0).tan().ln()
}

fn inverse_mercator_y(y: f64) -> f64 {
    (2.0 * y.exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees()
}
