//! Best-effort operator notifications.
//!
//! A [`Notifier`] never blocks its caller and never reports failure: events
//! are rendered to short text messages and handed off, and anything that
//! goes wrong afterwards is logged and dropped.

mod event;
mod webhook;

pub use {
    event::NotificationEvent,
    webhook::{DEFAULT_QUEUE_CAPACITY, WebhookNotifier},
};

/// Sink for operational events.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: NotificationEvent);
}

/// Notifier used when no destination is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _event: NotificationEvent) {}
}
