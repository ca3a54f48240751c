use std::cell::Cell;
use std::rc::Rc;

use tracing::debug;

use crate::registry::{MarkerId, SharedMarkers};
use crate::resume::{Language, ResumeData};
use crate::tooltip::Tooltip;

/// Which category of records a marker currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayMode {
    Employment,
    Project,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::Employment => DisplayMode::Project,
            DisplayMode::Project => DisplayMode::Employment,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerStyle {
    pub name: &'static str,
    pub stroke: &'static str,
    pub fill: &'static str,
    pub fill_opacity: f64,
    pub radius: f64,
}

pub const EMPLOYMENT_STYLE: MarkerStyle = MarkerStyle {
    name: "employment",
    stroke: "#16a34a",
    fill: "#22c55e",
    fill_opacity: 0.8,
    radius: 8.0,
};

pub const PROJECT_STYLE: MarkerStyle = MarkerStyle {
    name: "project",
    stroke: "#2563eb",
    fill: "#3b82f6",
    fill_opacity: 0.8,
    radius: 10.0,
};

/// Pulse color, distinct from both display palettes.
pub const ALERT_STYLE: MarkerStyle = MarkerStyle {
    name: "alert",
    stroke: "#b91c1c",
    fill: "#ef4444",
    fill_opacity: 0.95,
    radius: 12.0,
};

pub const ALL_STYLES: [MarkerStyle; 3] = [EMPLOYMENT_STYLE, PROJECT_STYLE, ALERT_STYLE];

pub fn style_for(mode: DisplayMode) -> MarkerStyle {
    match mode {
        DisplayMode::Employment => EMPLOYMENT_STYLE,
        DisplayMode::Project => PROJECT_STYLE,
    }
}

/// The rendered side of the markers. Implemented by the map widget layer.
pub trait MarkerSurface {
    fn apply_style(&self, id: MarkerId, style: &MarkerStyle);
    fn set_tooltip(&self, id: MarkerId, tooltip: &Tooltip);
    /// Shows the tooltip now, without waiting for the pointer to hover again.
    fn reveal_tooltip(&self, id: MarkerId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Toggled(DisplayMode),
    Unchanged,
}

/// Owns the employment/project toggle of every marker in a [`SharedMarkers`] table.
pub struct MarkerController {
    markers: SharedMarkers,
    surface: Rc<dyn MarkerSurface>,
    resume: Rc<ResumeData>,
    language: Cell<Language>,
}

impl MarkerController {
    pub fn new(
        markers: SharedMarkers,
        surface: Rc<dyn MarkerSurface>,
        resume: Rc<ResumeData>,
        language: Language,
    ) -> Self {
        Self {
            markers,
            surface,
            resume,
            language: Cell::new(language),
        }
    }

    pub fn language(&self) -> Language {
        self.language.get()
    }

    pub fn set_language(&self, language: Language) {
        self.language.set(language);
    }

    /// Paints every marker with the style and tooltip of its current mode.
    pub fn render_all(&self) {
        let ids: Vec<MarkerId> = self.markers.borrow().ids().collect();
        for id in ids {
            self.refresh(id);
        }
    }

    /// Handles a click on a marker.
    pub fn activate(&self, id: MarkerId) -> Activation {
        let next = {
            let mut markers = self.markers.borrow_mut();
            let (Some(group), Some(mode)) = (markers.group(id), markers.mode(id)) else {
                debug!("Activation of unknown marker {:?}", id);
                return Activation::Unchanged;
            };
            if !group.supports_toggle() {
                return Activation::Unchanged;
            }
            let next = mode.toggled();
            markers.set_mode(id, next);
            next
        };

        self.refresh(id);
        self.surface.reveal_tooltip(id);
        debug!("Marker {:?} now shows {:?}", id, next);
        Activation::Toggled(next)
    }

    fn refresh(&self, id: MarkerId) {
        let rendered = {
            let markers = self.markers.borrow();
            markers.group(id).zip(markers.mode(id)).map(|(group, mode)| {
                (
                    style_for(mode),
                    Tooltip::build(group, mode, &self.resume, self.language.get()),
                )
            })
        };

        if let Some((style, tooltip)) = rendered {
            self.surface.apply_style(id, &style);
            self.surface.set_tooltip(id, &tooltip);
        }
    }
}
