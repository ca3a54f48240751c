//! Pulsing highlight over a set of markers.
//!
//! A session flips between [`ALERT_STYLE`] and each target's display-mode style on
//! a fixed cadence. Only one session runs at a time. Stopping, for any reason,
//! repaints every target with the style of the mode it has *at that moment*, so a
//! marker toggled mid-pulse comes back in its new colors.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::debug;

use crate::marker::{style_for, MarkerSurface, ALERT_STYLE};
use crate::registry::{MarkerId, SharedMarkers};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// Repeating timers on the UI event loop.
pub trait Scheduler {
    /// Runs `tick` every `period` until cancelled.
    fn every(&self, period: Duration, tick: Box<dyn FnMut()>) -> TimerId;
    /// Releases the timer. Unknown or already-cancelled ids are ignored.
    fn cancel(&self, timer: TimerId);
}

#[derive(Debug)]
struct HighlightSession {
    targets: Vec<MarkerId>,
    phase: bool,
    timer: TimerId,
}

struct Inner {
    markers: SharedMarkers,
    surface: Rc<dyn MarkerSurface>,
    scheduler: Rc<dyn Scheduler>,
    period: Duration,
    session: RefCell<Option<HighlightSession>>,
}

impl Inner {
    fn tick(&self) {
        let (targets, phase) = {
            let mut session = self.session.borrow_mut();
            let Some(session) = session.as_mut() else {
                return;
            };
            session.phase = !session.phase;
            (session.targets.clone(), session.phase)
        };

        if phase {
            for id in targets {
                if self.markers.borrow().group(id).is_some() {
                    self.surface.apply_style(id, &ALERT_STYLE);
                }
            }
        } else {
            self.restore(&targets);
        }
    }

    /// Repaints with the current display mode, read fresh from the table.
    fn restore(&self, targets: &[MarkerId]) {
        for &id in targets {
            let mode = self.markers.borrow().mode(id);
            if let Some(mode) = mode {
                self.surface.apply_style(id, &style_for(mode));
            }
        }
    }

    fn stop(&self) -> bool {
        let Some(session) = self.session.borrow_mut().take() else {
            return false;
        };
        self.scheduler.cancel(session.timer);
        self.restore(&session.targets);
        debug!("Highlight stopped for {} markers", session.targets.len());
        true
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            self.scheduler.cancel(session.timer);
        }
    }
}

/// Cheap-clone handle; the running timer is released when the last handle drops.
#[derive(Clone)]
pub struct HighlightAnimator {
    inner: Rc<Inner>,
}

impl HighlightAnimator {
    pub fn new(
        markers: SharedMarkers,
        surface: Rc<dyn MarkerSurface>,
        scheduler: Rc<dyn Scheduler>,
        period: Duration,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                markers,
                surface,
                scheduler,
                period,
                session: RefCell::new(None),
            }),
        }
    }

    /// Begins pulsing `targets`, after fully stopping any running session.
    ///
    /// Ids that are not in the marker table are dropped; with nothing left the
    /// animator stays idle and `false` is returned.
    pub fn start(&self, targets: Vec<MarkerId>) -> bool {
        self.inner.stop();

        let mut resolved: Vec<MarkerId> = Vec::with_capacity(targets.len());
        {
            let markers = self.inner.markers.borrow();
            for id in targets {
                if markers.group(id).is_some() && !resolved.contains(&id) {
                    resolved.push(id);
                }
            }
        }
        if resolved.is_empty() {
            debug!("Highlight requested with no resolvable targets");
            return false;
        }

        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        let timer = self.inner.scheduler.every(
            self.inner.period,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.tick();
                }
            }),
        );

        debug!("Highlighting {} markers", resolved.len());
        *self.inner.session.borrow_mut() = Some(HighlightSession {
            targets: resolved,
            phase: false,
            timer,
        });
        self.inner.tick();
        true
    }

    /// Ends the running session, if any. Safe to call repeatedly.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Stops the pulse once the map has scrolled or been switched out of view.
    pub fn on_visibility_changed(&self, visible: bool) {
        if !visible && self.inner.stop() {
            debug!("Highlight cancelled: map left the viewport");
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.session.borrow().is_some()
    }

    pub fn targets(&self) -> Vec<MarkerId> {
        self.inner
            .session
            .borrow()
            .as_ref()
            .map(|session| session.targets.clone())
            .unwrap_or_default()
    }
}
