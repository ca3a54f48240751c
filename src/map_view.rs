use std::rc::Rc;
use std::time::Duration;

use anyhow::Context;
use gtk::prelude::*;
use gtk::{Align, Label, Orientation, Popover};
use libshumate::prelude::{LocationExt, MarkerExt};
use tracing::{debug, info};

use footprint::animator::HighlightAnimator;
use footprint::bus::EventBus;
use footprint::config::MapConfig;
use footprint::coordinator::MapCoordinator;
use footprint::geo::Coordinate;
use footprint::marker::{DisplayMode, MarkerController, MarkerStyle, EMPLOYMENT_STYLE, PROJECT_STYLE};
use footprint::registry::{LocationRegistry, MarkerId, MarkerTable};
use footprint::resume::{Language, ResumeData};
use footprint::tooltip::{legend_label, legend_toggle_note};
use footprint::viewport::{CameraSettings, ScreenRect, ViewportController};

use crate::shell::{GlibScheduler, GtkMarkerSurface, MarkerWidgets, ShumateCamera};
use crate::style::marker_class;

struct Legend {
    root: gtk::Box,
    employment: Label,
    project: Label,
    note: Label,
}

impl Legend {
    fn new() -> Self {
        let root = gtk::Box::builder()
            .orientation(Orientation::Vertical)
            .spacing(4)
            .halign(Align::Start)
            .valign(Align::End)
            .margin_start(12)
            .margin_bottom(12)
            .build();
        root.add_css_class("map-legend");

        let employment = Self::row(&root, &EMPLOYMENT_STYLE);
        let project = Self::row(&root, &PROJECT_STYLE);
        let note = Label::builder().xalign(0.0).wrap(true).build();
        note.add_css_class("dim-label");
        root.append(&note);

        Self {
            root,
            employment,
            project,
            note,
        }
    }

    fn row(root: &gtk::Box, style: &MarkerStyle) -> Label {
        let row = gtk::Box::builder()
            .orientation(Orientation::Horizontal)
            .spacing(6)
            .build();
        let dot = gtk::Box::builder().valign(Align::Center).build();
        dot.add_css_class("legend-dot");
        dot.add_css_class(&marker_class(style));
        let label = Label::builder().xalign(0.0).build();
        row.append(&dot);
        row.append(&label);
        root.append(&row);
        label
    }

    fn update(&self, language: Language) {
        self.employment
            .set_label(legend_label(DisplayMode::Employment, language));
        self.project
            .set_label(legend_label(DisplayMode::Project, language));
        self.note.set_label(legend_toggle_note(language));
    }
}

/// The map card: libshumate map, marker layer, legend, and the coordinator
/// listening on the bus.
pub struct MapSection {
    root: gtk::Overlay,
    map: libshumate::SimpleMap,
    layer: libshumate::MarkerLayer,
    resume: Rc<ResumeData>,
    surface: Rc<GtkMarkerSurface>,
    controller: MarkerController,
    coordinator: Rc<MapCoordinator>,
    legend: Legend,
}

impl MapSection {
    pub fn new(
        config: &MapConfig,
        resume: Rc<ResumeData>,
        language: Language,
        bus: &EventBus,
    ) -> anyhow::Result<Rc<Self>> {
        let map = libshumate::SimpleMap::new();
        let map_source = libshumate::RasterRenderer::from_url(&config.tile_url);
        map.set_map_source(Some(&map_source));
        map.set_vexpand(true);
        map.set_hexpand(true);
        map.set_size_request(-1, 480);

        let map_view = map.map().context("map widget has no map view")?;
        let viewport = map_view
            .viewport()
            .context("map view has no viewport")?;
        viewport.set_min_zoom_level(config.min_zoom.max(0.0) as u32);
        viewport.set_max_zoom_level(config.max_zoom.max(0.0) as u32);

        let layer = libshumate::MarkerLayer::new(&viewport);
        map_view.add_layer(&layer);
        map_view.go_to_full(
            config.initial_center.lat,
            config.initial_center.lng,
            config.initial_zoom,
        );

        let markers = MarkerTable::shared(LocationRegistry::build(&resume.location_records()));
        let surface = Rc::new(GtkMarkerSurface::default());
        let controller =
            MarkerController::new(markers.clone(), surface.clone(), resume.clone(), language);
        let camera = ViewportController::new(
            Rc::new(ShumateCamera::new(map_view)),
            CameraSettings::from(config),
        );
        let animator = HighlightAnimator::new(
            markers.clone(),
            surface.clone(),
            Rc::new(GlibScheduler::default()),
            Duration::from_millis(config.pulse_interval_ms),
        );
        let coordinator = MapCoordinator::new(markers, camera, animator, config);
        coordinator.attach(bus);

        let legend = Legend::new();
        legend.update(language);

        let root = gtk::Overlay::new();
        root.set_child(Some(&map));
        root.add_overlay(&legend.root);
        root.add_css_class("card");

        let section = Rc::new(Self {
            root,
            map,
            layer,
            resume,
            surface,
            controller,
            coordinator,
            legend,
        });
        section.populate();

        let weak = Rc::downgrade(&section);
        section.root.connect_unmap(move |_| {
            if let Some(section) = weak.upgrade() {
                section.coordinator.animator().stop();
            }
        });
        let weak = Rc::downgrade(&section);
        section.root.connect_destroy(move |_| {
            if let Some(section) = weak.upgrade() {
                debug!("Map section destroyed, detaching from the bus");
                section.coordinator.detach();
                section.surface.clear();
            }
        });

        Ok(section)
    }

    pub fn widget(&self) -> &gtk::Overlay {
        &self.root
    }

    /// Recreates one marker widget per group and paints the initial modes.
    fn populate(self: &Rc<Self>) {
        self.surface.clear();
        self.layer.remove_all();

        let positions: Vec<(MarkerId, Coordinate, bool)> = {
            let markers = self.coordinator.markers().borrow();
            markers
                .ids()
                .filter_map(|id| {
                    let group = markers.group(id)?;
                    Some((id, group.position, group.supports_toggle()))
                })
                .collect()
        };

        for (id, position, toggleable) in positions {
            let button = gtk::Button::builder().valign(Align::Center).build();
            button.add_css_class("map-marker");

            let content = Label::builder()
                .xalign(0.0)
                .wrap(true)
                .max_width_chars(40)
                .build();
            let popover = Popover::builder().build();
            popover.add_css_class("map-popover");
            popover.set_child(Some(&content));
            popover.set_parent(&button);

            // Single-kind markers only carry the hover tooltip.
            if toggleable {
                let weak = Rc::downgrade(self);
                button.connect_clicked(move |_| {
                    if let Some(section) = weak.upgrade() {
                        section.controller.activate(id);
                    }
                });
            }

            let marker = libshumate::Marker::new();
            marker.set_child(Some(&button));
            marker.set_location(position.lat, position.lng);
            self.layer.add_marker(&marker);

            self.surface.insert(
                id,
                MarkerWidgets {
                    button,
                    popover,
                    content,
                },
            );
        }

        self.controller.render_all();
        debug!("Placed {} markers", self.coordinator.markers().borrow().len());
    }

    /// Rebuilds every marker with localized tooltips; all markers return to their
    /// initial mode.
    pub fn set_language(self: &Rc<Self>, language: Language) {
        if language == self.controller.language() {
            return;
        }
        info!("Switching map language to {}", language.code());
        self.coordinator
            .rebuild(LocationRegistry::build(&self.resume.location_records()));
        self.controller.set_language(language);
        self.populate();
        self.legend.update(language);
    }

    /// Stops the pulse whenever scrolling takes the map off screen.
    pub fn track_visibility(self: &Rc<Self>, scrolled: &gtk::ScrolledWindow) {
        let weak = Rc::downgrade(self);
        let scrolled_ref = scrolled.downgrade();
        scrolled.vadjustment().connect_value_changed(move |_| {
            if let (Some(section), Some(scrolled)) = (weak.upgrade(), scrolled_ref.upgrade()) {
                section.check_visibility(&scrolled);
            }
        });
    }

    fn check_visibility(&self, scrolled: &gtk::ScrolledWindow) {
        let Some(bounds) = self.map.compute_bounds(scrolled) else {
            return;
        };
        let map_rect = ScreenRect::new(
            bounds.x() as f64,
            bounds.y() as f64,
            bounds.width() as f64,
            bounds.height() as f64,
        );
        let screen = ScreenRect::new(0.0, 0.0, scrolled.width() as f64, scrolled.height() as f64);
        self.coordinator.set_map_visibility(map_rect, screen);
    }
}
