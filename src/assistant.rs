use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::bus::{BusEvent, EventBus, HighlightRequest};
use crate::directive;
use crate::error::{AssistantError, CompletionError};

pub const GREETING: &str =
    "Hi! I am the portfolio assistant. Ask me anything about this experience and I will point out the places on the map.";
const OVERLOADED_REPLY: &str =
    "I'm currently experiencing high traffic (model overloaded). Please try again in a moment.";
const FAILURE_REPLY: &str = "Sorry, I encountered an error connecting to the AI service.";

/// The remote text-completion backend. Runs on the UI thread, hence `?Send`.
#[async_trait(?Send)]
pub trait CompletionService {
    async fn send_message(&self, text: &str) -> Result<String, CompletionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    pub is_error: bool,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            is_error: false,
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::model(text)
        }
    }
}

/// One conversation with the completion service. At most one request is in flight.
pub struct AssistantSession {
    service: Rc<dyn CompletionService>,
    bus: EventBus,
    transcript: RefCell<Vec<ChatMessage>>,
    pending: Cell<bool>,
}

impl AssistantSession {
    pub fn new(service: Rc<dyn CompletionService>, bus: EventBus) -> Rc<Self> {
        Rc::new(Self {
            service,
            bus,
            transcript: RefCell::new(vec![ChatMessage::model(GREETING)]),
            pending: Cell::new(false),
        })
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get()
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.transcript.borrow().clone()
    }

    /// Records the user's prompt and reserves the single request slot.
    ///
    /// The returned turn must be completed (or dropped) before another prompt is
    /// accepted.
    pub fn begin(self: &Rc<Self>, prompt: &str) -> Result<PendingTurn, AssistantError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(AssistantError::EmptyPrompt);
        }
        if self.pending.replace(true) {
            debug!("Rejecting prompt while a request is in flight");
            return Err(AssistantError::Busy);
        }

        self.transcript.borrow_mut().push(ChatMessage::user(prompt));
        Ok(PendingTurn {
            session: self.clone(),
            prompt: prompt.to_string(),
        })
    }

    pub async fn submit(self: &Rc<Self>, prompt: &str) -> Result<ChatMessage, AssistantError> {
        Ok(self.begin(prompt)?.complete().await)
    }
}

/// A prompt that has been accepted and is waiting for its reply.
pub struct PendingTurn {
    session: Rc<AssistantSession>,
    prompt: String,
}

impl PendingTurn {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Awaits the service, strips any location directive from the reply and
    /// publishes its coordinates as a `highlight-request`.
    pub async fn complete(self) -> ChatMessage {
        let result = self.session.service.send_message(&self.prompt).await;

        let message = match result {
            Ok(reply) => {
                let extraction = directive::extract(&reply);
                let locations = extraction.locations.unwrap_or_default();
                if !locations.is_empty() {
                    debug!("Reply references {} locations", locations.len());
                    self.session.bus.publish(BusEvent::Highlight(HighlightRequest {
                        locations,
                        zoom: None,
                    }));
                }
                ChatMessage::model(extraction.cleaned_text)
            }
            Err(err) if err.is_overloaded() => {
                warn!("Completion service overloaded: {}", err);
                ChatMessage::error(OVERLOADED_REPLY)
            }
            Err(err) => {
                warn!("Completion service failed: {}", err);
                ChatMessage::error(FAILURE_REPLY)
            }
        };

        self.session.transcript.borrow_mut().push(message.clone());
        message
    }
}

impl Drop for PendingTurn {
    fn drop(&mut self) {
        self.session.pending.set(false);
    }
}
