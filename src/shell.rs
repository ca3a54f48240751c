//! GTK and libshumate implementations of the core's UI seams.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::Duration;

use gtk::prelude::*;
use gtk::{glib, Popover};

use footprint::animator::{Scheduler, TimerId};
use footprint::geo::Coordinate;
use footprint::marker::{MarkerStyle, MarkerSurface, ALL_STYLES};
use footprint::registry::MarkerId;
use footprint::tooltip::Tooltip;
use footprint::viewport::Camera;

use crate::style::marker_class;

/// The widgets behind one map marker.
pub struct MarkerWidgets {
    pub button: gtk::Button,
    pub popover: Popover,
    pub content: gtk::Label,
}

/// Marker buttons on a libshumate marker layer.
#[derive(Default)]
pub struct GtkMarkerSurface {
    widgets: RefCell<HashMap<MarkerId, MarkerWidgets>>,
}

impl GtkMarkerSurface {
    pub fn insert(&self, id: MarkerId, widgets: MarkerWidgets) {
        self.widgets.borrow_mut().insert(id, widgets);
    }

    pub fn clear(&self) {
        for (_, widgets) in self.widgets.borrow_mut().drain() {
            widgets.popover.unparent();
        }
    }
}

impl MarkerSurface for GtkMarkerSurface {
    fn apply_style(&self, id: MarkerId, style: &MarkerStyle) {
        let widgets = self.widgets.borrow();
        let Some(widgets) = widgets.get(&id) else {
            return;
        };
        for other in &ALL_STYLES {
            widgets.button.remove_css_class(&marker_class(other));
        }
        widgets.button.add_css_class(&marker_class(style));
        let size = (style.radius * 2.0).round() as i32;
        widgets.button.set_size_request(size, size);
    }

    fn set_tooltip(&self, id: MarkerId, tooltip: &Tooltip) {
        if let Some(widgets) = self.widgets.borrow().get(&id) {
            let markup = tooltip.to_markup();
            widgets.button.set_tooltip_markup(Some(&markup));
            widgets.content.set_markup(&markup);
        }
    }

    fn reveal_tooltip(&self, id: MarkerId) {
        if let Some(widgets) = self.widgets.borrow().get(&id) {
            widgets.popover.popup();
        }
    }
}

/// Repeating timers on the GLib main loop.
#[derive(Default)]
pub struct GlibScheduler {
    next_id: Cell<u64>,
    sources: RefCell<HashMap<TimerId, glib::SourceId>>,
}

impl Scheduler for GlibScheduler {
    fn every(&self, period: Duration, mut tick: Box<dyn FnMut()>) -> TimerId {
        let id = TimerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        let source = glib::timeout_add_local(period, move || {
            tick();
            glib::ControlFlow::Continue
        });
        self.sources.borrow_mut().insert(id, source);
        id
    }

    fn cancel(&self, timer: TimerId) {
        let source = self.sources.borrow_mut().remove(&timer);
        if let Some(source) = source {
            source.remove();
        }
    }
}

/// Camera moves on a libshumate map view.
pub struct ShumateCamera {
    map: libshumate::Map,
    fallback_size: (f64, f64),
}

impl ShumateCamera {
    pub fn new(map: libshumate::Map) -> Self {
        Self {
            map,
            fallback_size: (800.0, 600.0),
        }
    }
}

impl Camera for ShumateCamera {
    fn viewport_size(&self) -> (f64, f64) {
        let (width, height) = (self.map.width(), self.map.height());
        if width > 0 && height > 0 {
            (width as f64, height as f64)
        } else {
            // Not allocated yet.
            self.fallback_size
        }
    }

    fn fly_to(&self, center: Coordinate, zoom: f64, duration: Duration) {
        self.map
            .set_go_to_duration(duration.as_millis().min(u32::MAX as u128) as u32);
        self.map.go_to_full(center.lat, center.lng, zoom);
    }

    fn halt(&self) {
        self.map.stop_go_to();
    }
}
