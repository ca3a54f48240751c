//! Test doubles for the UI seams.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use crate::animator::{Scheduler, TimerId};
use crate::geo::Coordinate;
use crate::marker::{MarkerStyle, MarkerSurface};
use crate::registry::MarkerId;
use crate::resume::ResumeData;
use crate::tooltip::Tooltip;
use crate::viewport::Camera;

pub fn sample_resume() -> ResumeData {
    ResumeData::bundled().expect("bundled resume parses")
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Style(MarkerId, &'static str),
    /// Marker and tooltip heading.
    Tooltip(MarkerId, String),
    Reveal(MarkerId),
}

#[derive(Default)]
pub struct RecordingSurface {
    calls: RefCell<Vec<SurfaceCall>>,
}

impl RecordingSurface {
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.borrow().clone()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn style_calls(&self) -> Vec<(MarkerId, &'static str)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                SurfaceCall::Style(id, name) => Some((*id, *name)),
                _ => None,
            })
            .collect()
    }

    pub fn last_style(&self, id: MarkerId) -> Option<&'static str> {
        self.last_styles().get(&id).copied()
    }

    pub fn last_styles(&self) -> HashMap<MarkerId, &'static str> {
        self.style_calls().into_iter().collect()
    }
}

impl MarkerSurface for RecordingSurface {
    fn apply_style(&self, id: MarkerId, style: &MarkerStyle) {
        self.calls.borrow_mut().push(SurfaceCall::Style(id, style.name));
    }

    fn set_tooltip(&self, id: MarkerId, tooltip: &Tooltip) {
        self.calls
            .borrow_mut()
            .push(SurfaceCall::Tooltip(id, tooltip.heading.clone()));
    }

    fn reveal_tooltip(&self, id: MarkerId) {
        self.calls.borrow_mut().push(SurfaceCall::Reveal(id));
    }
}

type Tick = Rc<RefCell<Box<dyn FnMut()>>>;

/// Scheduler whose timers only fire when the test says so.
#[derive(Default)]
pub struct ManualScheduler {
    next_id: Cell<u64>,
    timers: RefCell<Vec<(TimerId, Tick)>>,
    cancelled: Cell<usize>,
}

impl ManualScheduler {
    pub fn active_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled.get()
    }

    /// Fires every live timer once.
    pub fn fire_all(&self) {
        let snapshot: Vec<(TimerId, Tick)> = self.timers.borrow().clone();
        for (id, tick) in snapshot {
            let live = self.timers.borrow().iter().any(|(timer, _)| *timer == id);
            if live {
                let mut tick = tick.borrow_mut();
                (*tick)();
            }
        }
    }
}

impl Scheduler for ManualScheduler {
    fn every(&self, _period: Duration, tick: Box<dyn FnMut()>) -> TimerId {
        let id = TimerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.timers
            .borrow_mut()
            .push((id, Rc::new(RefCell::new(tick))));
        id
    }

    fn cancel(&self, timer: TimerId) {
        self.cancelled.set(self.cancelled.get() + 1);
        self.timers.borrow_mut().retain(|(id, _)| *id != timer);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CameraCall {
    FlyTo(Coordinate, f64),
    Halt,
}

pub struct RecordingCamera {
    size: (f64, f64),
    calls: RefCell<Vec<CameraCall>>,
}

impl RecordingCamera {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            size: (width, height),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<CameraCall> {
        self.calls.borrow().clone()
    }
}

impl Camera for RecordingCamera {
    fn viewport_size(&self) -> (f64, f64) {
        self.size
    }

    fn fly_to(&self, center: Coordinate, zoom: f64, _duration: Duration) {
        self.calls.borrow_mut().push(CameraCall::FlyTo(center, zoom));
    }

    fn halt(&self) {
        self.calls.borrow_mut().push(CameraCall::Halt);
    }
}
