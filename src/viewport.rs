use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::MapConfig;
use crate::geo::{Bounds, Coordinate};

/// Web-Mercator tile edge, in pixels, at zoom 0.
const TILE_SIZE: f64 = 256.0;

/// The map widget's camera.
pub trait Camera {
    /// Width and height of the map view in pixels.
    fn viewport_size(&self) -> (f64, f64);
    /// Starts an animated move; returns immediately.
    fn fly_to(&self, center: Coordinate, zoom: f64, duration: Duration);
    /// Abandons the animation in progress, if any.
    fn halt(&self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub duration: Duration,
}

impl From<&MapConfig> for CameraSettings {
    fn from(config: &MapConfig) -> Self {
        Self {
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            duration: Duration::from_millis(config.camera_duration_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMove {
    pub center: Coordinate,
    pub zoom: f64,
}

/// Issues camera moves. A new move supersedes the one in flight.
pub struct ViewportController {
    camera: Rc<dyn Camera>,
    settings: CameraSettings,
    in_flight_until: Cell<Option<Instant>>,
    last_move: Cell<Option<CameraMove>>,
}

impl ViewportController {
    pub fn new(camera: Rc<dyn Camera>, settings: CameraSettings) -> Self {
        Self {
            camera,
            settings,
            in_flight_until: Cell::new(None),
            last_move: Cell::new(None),
        }
    }

    pub fn settings(&self) -> CameraSettings {
        self.settings
    }

    pub fn last_move(&self) -> Option<CameraMove> {
        self.last_move.get()
    }

    pub fn focus_on(&self, coordinate: Coordinate, zoom: f64) {
        if !coordinate.is_valid() || !zoom.is_finite() {
            warn!("Ignoring focus on {:?} at zoom {}", coordinate, zoom);
            return;
        }
        self.fly(CameraMove {
            center: coordinate,
            zoom: zoom.clamp(self.settings.min_zoom, self.settings.max_zoom),
        });
    }

    /// Frames every coordinate with `padding` pixels of margin on each side.
    ///
    /// `max_zoom` caps how far in the fit may go, which matters for tightly
    /// clustered points. A single point is focused at `max_zoom` (or the
    /// controller's maximum).
    pub fn fit_bounds(&self, coordinates: &[Coordinate], padding: f64, max_zoom: Option<f64>) {
        let valid: Vec<Coordinate> = coordinates
            .iter()
            .copied()
            .filter(Coordinate::is_valid)
            .collect();
        let Some(bounds) = Bounds::enclosing(&valid) else {
            debug!("Nothing to frame");
            return;
        };

        let cap = max_zoom
            .unwrap_or(self.settings.max_zoom)
            .min(self.settings.max_zoom);
        let zoom = if valid.len() == 1 {
            cap
        } else {
            fit_zoom(&bounds, self.camera.viewport_size(), padding).min(cap)
        };

        self.fly(CameraMove {
            center: bounds.center(),
            zoom: zoom.clamp(self.settings.min_zoom, self.settings.max_zoom),
        });
    }

    fn fly(&self, camera_move: CameraMove) {
        let now = Instant::now();
        if self.in_flight_until.get().is_some_and(|until| until > now) {
            debug!("Superseding camera animation in flight");
            self.camera.halt();
        }
        self.camera
            .fly_to(camera_move.center, camera_move.zoom, self.settings.duration);
        self.in_flight_until.set(Some(now + self.settings.duration));
        self.last_move.set(Some(camera_move));
    }
}

/// Largest whole zoom level at which `bounds` fits in `viewport` minus `padding`.
pub fn fit_zoom(bounds: &Bounds, viewport: (f64, f64), padding: f64) -> f64 {
    let width = (viewport.0 - 2.0 * padding).max(1.0);
    let height = (viewport.1 - 2.0 * padding).max(1.0);

    let lng_fraction = bounds.lng_span() / 360.0;
    let lat_fraction = bounds.mercator_span() / (2.0 * std::f64::consts::PI);

    let zoom_for = |pixels: f64, fraction: f64| {
        if fraction <= f64::EPSILON {
            f64::INFINITY
        } else {
            (pixels / (TILE_SIZE * fraction)).log2()
        }
    };

    zoom_for(width, lng_fraction)
        .min(zoom_for(height, lat_fraction))
        .floor()
}

/// Axis-aligned rectangle in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when the two rectangles share a non-empty area.
    pub fn intersects(&self, other: &ScreenRect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}
