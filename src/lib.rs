//! Map coordination core for the footprint portfolio viewer.
//!
//! Location-tagged resume records are grouped onto map markers ([`registry`]), each
//! marker toggles between an employment and a project view ([`marker`]), and the
//! map, the assistant panel and the content panels talk to each other only through
//! the [`bus`]. Assistant replies may carry a location directive ([`directive`])
//! that ends up framing and pulsing markers ([`coordinator`], [`viewport`],
//! [`animator`]).
//!
//! Nothing here depends on a UI toolkit. The GTK shell implements the
//! [`marker::MarkerSurface`], [`viewport::Camera`] and [`animator::Scheduler`] seams.

pub mod animator;
pub mod assistant;
pub mod bus;
pub mod config;
pub mod coordinator;
pub mod directive;
pub mod error;
pub mod gemini;
pub mod geo;
pub mod logging;
pub mod marker;
pub mod registry;
pub mod resume;
pub mod tooltip;
pub mod viewport;

#[cfg(test)]
mod testing;

pub use animator::{HighlightAnimator, Scheduler, TimerId};
pub use assistant::{AssistantSession, ChatMessage, ChatRole, CompletionService};
pub use bus::{BusEvent, EventBus, Subscription, Topic};
pub use config::Config;
pub use coordinator::{HighlightOutcome, MapCoordinator};
pub use geo::{Coordinate, LocationHint};
pub use marker::{Activation, DisplayMode, MarkerController, MarkerSurface};
pub use registry::{LocationRecord, LocationRegistry, MarkerGroup, MarkerId, MarkerTable};
pub use resume::{Language, ResumeData};
pub use viewport::{Camera, ViewportController};
