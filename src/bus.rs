//! Page-wide publish/subscribe channel.
//!
//! The map, the assistant panel and the content panels never hold references to each
//! other; they publish typed [`BusEvent`]s and subscribe to the [`Topic`]s they care
//! about. Dispatch is synchronous, in subscription order, over a snapshot of the
//! handler list taken when `publish` is called.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::geo::{Coordinate, LocationHint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    FocusRequest,
    HighlightRequest,
    AssistantPromptRequest,
}

impl Topic {
    pub fn name(&self) -> &'static str {
        match self {
            Topic::FocusRequest => "focus-request",
            Topic::HighlightRequest => "highlight-request",
            Topic::AssistantPromptRequest => "assistant-prompt-request",
        }
    }
}

/// Move the camera to a single point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusRequest {
    pub lat: f64,
    pub lng: f64,
    pub zoom: f64,
}

impl FocusRequest {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// Frame and pulse the markers at these locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightRequest {
    pub locations: Vec<LocationHint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
}

impl HighlightRequest {
    pub fn at(coordinates: &[Coordinate], zoom: Option<f64>) -> Self {
        Self {
            locations: coordinates.iter().copied().map(LocationHint::from).collect(),
            zoom,
        }
    }

    /// Locations that carry a complete, valid coordinate.
    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.locations
            .iter()
            .filter_map(LocationHint::to_coordinate)
            .collect()
    }
}

/// Inject a prompt into the assistant panel as if the user had typed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantPromptRequest {
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    Focus(FocusRequest),
    Highlight(HighlightRequest),
    AssistantPrompt(AssistantPromptRequest),
}

impl BusEvent {
    pub fn topic(&self) -> Topic {
        match self {
            BusEvent::Focus(_) => Topic::FocusRequest,
            BusEvent::Highlight(_) => Topic::HighlightRequest,
            BusEvent::AssistantPrompt(_) => Topic::AssistantPromptRequest,
        }
    }
}

type Handler = Rc<dyn Fn(&BusEvent) -> anyhow::Result<()>>;

struct HandlerSlot {
    id: u64,
    topic: Topic,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    slots: Vec<HandlerSlot>,
}

/// Cheap-clone handle to a bus instance.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Rc<RefCell<Registry>>,
}

thread_local! {
    static SHARED_BUS: EventBus = EventBus::new();
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// The page-wide instance, created on first use. UI code runs on one thread, so
    /// "page-wide" means per thread.
    pub fn shared() -> Self {
        SHARED_BUS.with(EventBus::clone)
    }

    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> Subscription
    where
        F: Fn(&BusEvent) -> anyhow::Result<()> + 'static,
    {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.slots.push(HandlerSlot {
            id,
            topic,
            handler: Rc::new(handler),
        });
        debug!("Subscribed handler {} to {}", id, topic.name());

        Subscription {
            registry: Rc::downgrade(&self.registry),
            id,
        }
    }

    /// Delivers `event` to every handler subscribed to its topic and returns how many
    /// of them completed without error. A failing or panicking handler is logged and
    /// does not stop delivery to the rest.
    pub fn publish(&self, event: BusEvent) -> usize {
        let topic = event.topic();
        let handlers: Vec<(u64, Handler)> = self
            .registry
            .borrow()
            .slots
            .iter()
            .filter(|slot| slot.topic == topic)
            .map(|slot| (slot.id, slot.handler.clone()))
            .collect();

        if handlers.is_empty() {
            debug!("No subscribers for {}", topic.name());
            return 0;
        }

        let mut delivered = 0;
        for (id, handler) in handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(err)) => warn!("Handler {} for {} failed: {:#}", id, topic.name(), err),
                Err(_) => error!("Handler {} for {} panicked", id, topic.name()),
            }
        }
        delivered
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.registry
            .borrow()
            .slots
            .iter()
            .filter(|slot| slot.topic == topic)
            .count()
    }
}

/// Returned by [`EventBus::subscribe`]. The handler stays registered until
/// [`Subscription::unsubscribe`] is called; dropping the handle does not remove it.
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    registry: Weak<RefCell<Registry>>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().slots.retain(|slot| slot.id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    fn prompt(text: &str) -> BusEvent {
        BusEvent::AssistantPrompt(AssistantPromptRequest {
            prompt: text.to_string(),
        })
    }

    fn focus() -> BusEvent {
        BusEvent::Focus(FocusRequest {
            lat: 59.91,
            lng: 10.75,
            zoom: 10.0,
        })
    }

    #[test]
    fn delivers_in_subscription_order_to_matching_topic_only() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let log = log.clone();
            let _ = bus.subscribe(Topic::FocusRequest, move |_| {
                log.borrow_mut().push(name);
                Ok(())
            });
        }
        let other = log.clone();
        let _ = bus.subscribe(Topic::HighlightRequest, move |_| {
            other.borrow_mut().push("highlight");
            Ok(())
        });

        assert_eq!(bus.publish(focus()), 3);
        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn failing_handlers_do_not_block_later_ones() {
        let bus = EventBus::new();
        let reached = Rc::new(Cell::new(false));

        let _ = bus.subscribe(Topic::FocusRequest, |_| anyhow::bail!("boom"));
        let _ = bus.subscribe(Topic::FocusRequest, |_| panic!("handler panic"));
        let flag = reached.clone();
        let _ = bus.subscribe(Topic::FocusRequest, move |_| {
            flag.set(true);
            Ok(())
        });

        assert_eq!(bus.publish(focus()), 1);
        assert!(reached.get());
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let subscription = bus.subscribe(Topic::AssistantPromptRequest, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        bus.publish(prompt("hello"));
        subscription.unsubscribe();
        bus.publish(prompt("again"));

        assert_eq!(count.get(), 1);
        assert_eq!(bus.subscriber_count(Topic::AssistantPromptRequest), 0);
    }

    #[test]
    fn subscribing_and_unsubscribing_during_dispatch_uses_a_snapshot() {
        let bus = EventBus::new();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let late_subscription: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        {
            let bus_in_handler = bus.clone();
            let calls = calls.clone();
            let late_subscription = late_subscription.clone();
            let victim = victim.clone();
            let _ = bus.subscribe(Topic::FocusRequest, move |_| {
                calls.borrow_mut().push("mutator");
                if let Some(subscription) = victim.borrow_mut().take() {
                    subscription.unsubscribe();
                }
                let late_calls = calls.clone();
                *late_subscription.borrow_mut() =
                    Some(bus_in_handler.subscribe(Topic::FocusRequest, move |_| {
                        late_calls.borrow_mut().push("late");
                        Ok(())
                    }));
                Ok(())
            });
        }
        {
            let calls = calls.clone();
            *victim.borrow_mut() = Some(bus.subscribe(Topic::FocusRequest, move |_| {
                calls.borrow_mut().push("victim");
                Ok(())
            }));
        }

        bus.publish(focus());
        assert_eq!(*calls.borrow(), vec!["mutator", "victim"]);

        calls.borrow_mut().clear();
        late_subscription.borrow_mut().take().unwrap().unsubscribe();
        bus.publish(focus());
        assert_eq!(*calls.borrow(), vec!["mutator"]);
    }

    #[test]
    fn handlers_may_publish_reentrantly() {
        let bus = EventBus::new();
        let prompts = Rc::new(RefCell::new(Vec::new()));

        let inner = bus.clone();
        let _ = bus.subscribe(Topic::FocusRequest, move |_| {
            inner.publish(prompt("tell me about this place"));
            Ok(())
        });
        let seen = prompts.clone();
        let _ = bus.subscribe(Topic::AssistantPromptRequest, move |event| {
            if let BusEvent::AssistantPrompt(request) = event {
                seen.borrow_mut().push(request.prompt.clone());
            }
            Ok(())
        });

        bus.publish(focus());
        assert_eq!(*prompts.borrow(), vec!["tell me about this place".to_string()]);
    }

    #[test]
    fn shared_bus_is_one_instance_per_thread() {
        let bus = EventBus::shared();
        let subscription = bus.subscribe(Topic::HighlightRequest, |_| Ok(()));
        assert_eq!(
            EventBus::shared().subscriber_count(Topic::HighlightRequest),
            1
        );
        subscription.unsubscribe();
        assert_eq!(
            EventBus::shared().subscriber_count(Topic::HighlightRequest),
            0
        );
    }

    #[test]
    fn payloads_use_the_wire_field_names() {
        let request = HighlightRequest::at(&[Coordinate::new(60.1, 11.2)], None);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"locations": [{"lat": 60.1, "lng": 11.2}]})
        );

        let focus: FocusRequest =
            serde_json::from_str(r#"{"lat": 59.9, "lng": 10.7, "zoom": 12}"#).unwrap();
        assert_eq!(focus.coordinate(), Coordinate::new(59.9, 10.7));
    }
}
