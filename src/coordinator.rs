use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, info};

use crate::animator::HighlightAnimator;
use crate::bus::{BusEvent, EventBus, FocusRequest, HighlightRequest, Subscription, Topic};
use crate::config::MapConfig;
use crate::registry::{MarkerGroup, SharedMarkers};
use crate::viewport::{ScreenRect, ViewportController};

/// What the map did with a highlight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightOutcome {
    /// No requested coordinate matched a marker; the map was left alone.
    NoTargets,
    Focused,
    Framed { targets: usize },
}

/// Connects the bus to the map: focus requests move the camera, highlight
/// requests move the camera and pulse the matching markers.
pub struct MapCoordinator {
    markers: SharedMarkers,
    viewport: ViewportController,
    animator: HighlightAnimator,
    highlight_zoom: f64,
    fit_padding: f64,
    subscriptions: RefCell<Vec<Subscription>>,
}

impl MapCoordinator {
    pub fn new(
        markers: SharedMarkers,
        viewport: ViewportController,
        animator: HighlightAnimator,
        config: &MapConfig,
    ) -> Rc<Self> {
        Rc::new(Self {
            markers,
            viewport,
            animator,
            highlight_zoom: config.highlight_zoom,
            fit_padding: config.fit_padding,
            subscriptions: RefCell::new(Vec::new()),
        })
    }

    /// Subscribes to `focus-request` and `highlight-request` on `bus`.
    pub fn attach(self: &Rc<Self>, bus: &EventBus) {
        let weak: Weak<Self> = Rc::downgrade(self);
        let focus = bus.subscribe(Topic::FocusRequest, move |event| {
            if let (Some(map), BusEvent::Focus(request)) = (weak.upgrade(), event) {
                map.handle_focus(request);
            }
            Ok(())
        });

        let weak: Weak<Self> = Rc::downgrade(self);
        let highlight = bus.subscribe(Topic::HighlightRequest, move |event| {
            if let (Some(map), BusEvent::Highlight(request)) = (weak.upgrade(), event) {
                map.handle_highlight(request);
            }
            Ok(())
        });

        self.subscriptions.borrow_mut().extend([focus, highlight]);
    }

    /// Unsubscribes and stops any running highlight. Used when the map view goes away.
    pub fn detach(&self) {
        for subscription in self.subscriptions.borrow_mut().drain(..) {
            subscription.unsubscribe();
        }
        self.animator.stop();
    }

    pub fn handle_focus(&self, request: &FocusRequest) {
        debug!("Focus on {:?} at zoom {}", request.coordinate(), request.zoom);
        self.viewport.focus_on(request.coordinate(), request.zoom);
    }

    pub fn handle_highlight(&self, request: &HighlightRequest) -> HighlightOutcome {
        let targets = self.markers.borrow().resolve(&request.coordinates());
        if targets.is_empty() {
            info!(
                "Highlight request for {} locations matched no marker",
                request.locations.len()
            );
            return HighlightOutcome::NoTargets;
        }

        let positions: Vec<_> = {
            let markers = self.markers.borrow();
            targets.iter().filter_map(|id| markers.position(*id)).collect()
        };

        let outcome = match positions.as_slice() {
            [single] => {
                self.viewport
                    .focus_on(*single, request.zoom.unwrap_or(self.highlight_zoom));
                HighlightOutcome::Focused
            }
            _ => {
                self.viewport
                    .fit_bounds(&positions, self.fit_padding, request.zoom);
                HighlightOutcome::Framed {
                    targets: positions.len(),
                }
            }
        };

        self.animator.start(targets);
        outcome
    }

    /// Stops the pulse when the map's on-screen rectangle no longer meets the screen.
    pub fn set_map_visibility(&self, map: ScreenRect, screen: ScreenRect) {
        self.animator.on_visibility_changed(map.intersects(&screen));
    }

    /// Replaces the marker set; any running pulse is stopped first.
    pub fn rebuild(&self, groups: Vec<MarkerGroup>) {
        self.animator.stop();
        self.markers.borrow_mut().rebuild(groups);
    }

    pub fn markers(&self) -> &SharedMarkers {
        &self.markers
    }

    pub fn animator(&self) -> &HighlightAnimator {
        &self.animator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animator::Scheduler;
    use crate::geo::{Coordinate, LocationHint};
    use crate::marker::MarkerSurface;
    use crate::registry::{LocationRegistry, MarkerTable};
    use crate::testing::{sample_resume, CameraCall, ManualScheduler, RecordingCamera, RecordingSurface};
    use crate::viewport::{Camera, CameraSettings};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const OSLO: Coordinate = Coordinate::new(59.9139, 10.7522);
    const COPENHAGEN: Coordinate = Coordinate::new(55.6761, 12.5683);

    struct Fixture {
        bus: EventBus,
        camera: Rc<RecordingCamera>,
        surface: Rc<RecordingSurface>,
        scheduler: Rc<ManualScheduler>,
        map: Rc<MapCoordinator>,
    }

    fn fixture() -> Fixture {
        let resume = sample_resume();
        let markers = MarkerTable::shared(LocationRegistry::build(&resume.location_records()));
        let camera = Rc::new(RecordingCamera::new(800.0, 600.0));
        let surface = Rc::new(RecordingSurface::default());
        let scheduler = Rc::new(ManualScheduler::default());
        let config = MapConfig::default();

        let viewport = ViewportController::new(
            camera.clone() as Rc<dyn Camera>,
            CameraSettings::from(&config),
        );
        let animator = HighlightAnimator::new(
            markers.clone(),
            surface.clone() as Rc<dyn MarkerSurface>,
            scheduler.clone() as Rc<dyn Scheduler>,
            Duration::from_millis(config.pulse_interval_ms),
        );
        let map = MapCoordinator::new(markers, viewport, animator, &config);
        let bus = EventBus::new();
        map.attach(&bus);

        Fixture {
            bus,
            camera,
            surface,
            scheduler,
            map,
        }
    }

    #[test]
    fn two_matching_coordinates_frame_and_pulse_both() {
        let f = fixture();
        let delivered = f.bus.publish(BusEvent::Highlight(HighlightRequest::at(
            &[OSLO, COPENHAGEN],
            None,
        )));
        assert_eq!(delivered, 1);

        let targets = f.map.animator().targets();
        assert_eq!(targets.len(), 2);
        let markers = f.map.markers().borrow();
        let positions: Vec<_> = targets.iter().map(|id| markers.position(*id).unwrap()).collect();
        assert_eq!(positions, vec![OSLO, COPENHAGEN]);

        let calls = f.camera.calls();
        assert_eq!(calls.len(), 1);
        let CameraCall::FlyTo(center, _) = calls[0] else {
            panic!("expected a camera move, got {:?}", calls[0]);
        };
        assert!(center.lat < OSLO.lat && center.lat > COPENHAGEN.lat);
        assert!(center.lng > OSLO.lng && center.lng < COPENHAGEN.lng);
    }

    #[test]
    fn unmatched_highlight_moves_nothing() {
        let f = fixture();
        let outcome = f.map.handle_highlight(&HighlightRequest::at(
            &[Coordinate::new(40.7128, -74.006)],
            Some(6.0),
        ));
        assert_eq!(outcome, HighlightOutcome::NoTargets);
        assert!(f.camera.calls().is_empty());
        assert!(!f.map.animator().is_running());
        assert!(f.surface.calls().is_empty());
    }

    #[test]
    fn single_match_focuses_at_requested_zoom() {
        let f = fixture();
        let request = HighlightRequest {
            locations: vec![
                LocationHint::from(Coordinate::new(59.91391, 10.75219)),
                LocationHint {
                    lat: Some(1.0),
                    lng: None,
                },
            ],
            zoom: Some(12.0),
        };
        assert_eq!(f.map.handle_highlight(&request), HighlightOutcome::Focused);
        assert_eq!(f.camera.calls(), vec![CameraCall::FlyTo(OSLO, 12.0)]);
        assert!(f.map.animator().is_running());
    }

    #[test]
    fn focus_request_only_moves_the_camera() {
        let f = fixture();
        f.bus.publish(BusEvent::Focus(FocusRequest {
            lat: 60.3913,
            lng: 5.3221,
            zoom: 11.0,
        }));
        assert_eq!(
            f.camera.calls(),
            vec![CameraCall::FlyTo(Coordinate::new(60.3913, 5.3221), 11.0)]
        );
        assert!(!f.map.animator().is_running());
    }

    #[test]
    fn scrolling_the_map_off_screen_stops_the_pulse() {
        let f = fixture();
        f.map.handle_highlight(&HighlightRequest::at(&[OSLO, COPENHAGEN], None));
        let screen = ScreenRect::new(0.0, 0.0, 1280.0, 800.0);

        f.map.set_map_visibility(ScreenRect::new(0.0, 200.0, 800.0, 480.0), screen);
        assert!(f.map.animator().is_running());

        f.map.set_map_visibility(ScreenRect::new(0.0, -500.0, 800.0, 480.0), screen);
        assert!(!f.map.animator().is_running());
        assert_eq!(f.scheduler.active_timers(), 0);
    }

    #[test]
    fn detach_unsubscribes_and_stops() {
        let f = fixture();
        f.map.handle_highlight(&HighlightRequest::at(&[OSLO], None));
        f.map.detach();

        assert!(!f.map.animator().is_running());
        assert_eq!(f.bus.subscriber_count(Topic::HighlightRequest), 0);
        assert_eq!(f.bus.subscriber_count(Topic::FocusRequest), 0);
        assert_eq!(
            f.bus.publish(BusEvent::Highlight(HighlightRequest::at(&[OSLO], None))),
            0
        );
    }

    #[test]
    fn rebuild_stops_running_session() {
        let f = fixture();
        f.map.handle_highlight(&HighlightRequest::at(&[OSLO], None));
        let groups = LocationRegistry::build(&sample_resume().location_records());
        f.map.rebuild(groups);
        assert!(!f.map.animator().is_running());
        assert_eq!(f.scheduler.active_timers(), 0);
    }
}
