/*!
 * Process-wide notification bus.
 *
 * Every component of an engine shares one bus. Inbound requests from a
 * language picker and the engine's own outbound notifications travel over
 * the same broadcast channel; each subscriber sees every notification sent
 * after it subscribed.
 */

use std::sync::Arc;

use log::trace;
use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Default number of notifications buffered per subscriber
const DEFAULT_CAPACITY: usize = 256;

/// Notifications exchanged between the engine and its surroundings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Inbound: the user picked a language
    LanguageChangeRequested(String),

    /// Outbound: the current language actually changed
    LanguageChanged(String),

    /// Outbound: a language was confirmed, sent on every set, changed or not
    LanguageSet(String),

    /// Outbound: content under an observed root changed
    ContentChanged,
}

/// Cloneable handle to the broadcast channel
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Notification>,
    last_request: Arc<Mutex<Option<String>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Subscribe to every notification published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Publish a notification; having no subscribers is not an error
    pub fn publish(&self, notification: Notification) {
        trace!("Publishing {:?}", notification);
        if let Notification::LanguageChangeRequested(code) = &notification {
            *self.last_request.lock() = Some(code.clone());
        }
        let _ = self.sender.send(notification);
    }

    /// Most recent inbound language request, kept for receivers that lagged past it
    pub fn last_requested_language(&self) -> Option<String> {
        self.last_request.lock().clone()
    }

    /// Shorthand for the inbound "language changed by user" notification
    pub fn request_language(&self, code: impl Into<String>) {
        self.publish(Notification::LanguageChangeRequested(code.into()));
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
