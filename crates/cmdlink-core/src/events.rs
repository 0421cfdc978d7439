//! Session lifecycle notifications.
//!
//! A [`TransferSession`](crate::session::TransferSession) reports milestones
//! through an injected [`SessionEvents`] implementation and never calls into
//! transport or application code directly. Every method has a no-op default,
//! so implementors only override the notifications they care about.

/// Lifecycle callbacks fired by a transfer session.
pub trait SessionEvents {
    /// A receive buffer was allocated and streaming begins.
    fn transfer_started(&mut self) {}

    /// The transfer finished, successfully or by idle timeout.
    fn transfer_ended(&mut self) {}

    /// Allocation failed, a reply could not be sent, or the transfer stalled.
    fn error(&mut self) {}

    /// All announced bytes have been received and verified.
    fn receive_complete(&mut self) {}

    /// Free-form trace of the state machine.
    fn debug(&mut self, _message: &str) {}
}

/// Ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl SessionEvents for NoopEvents {}

/// Forwards notifications to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEvents;

impl SessionEvents for TracingEvents {
    fn transfer_started(&mut self) {
        tracing::info!("Transmission started");
    }

    fn transfer_ended(&mut self) {
        tracing::info!("Transmission ended");
    }

    fn error(&mut self) {
        tracing::error!("Transmission error");
    }

    fn receive_complete(&mut self) {
        tracing::info!("Reception complete");
    }

    fn debug(&mut self, message: &str) {
        tracing::debug!("{message}");
    }
}

impl<E: SessionEvents + ?Sized> SessionEvents for Box<E> {
    fn transfer_started(&mut self) {
        (**self).transfer_started();
    }

    fn transfer_ended(&mut self) {
        (**self).transfer_ended();
    }

    fn error(&mut self) {
        (**self).error();
    }

    fn receive_complete(&mut self) {
        (**self).receive_complete();
    }

    fn debug(&mut self, message: &str) {
        (**self).debug(message);
    }
}

/// Records every notification in order. Useful in tests and for replaying
/// what a session did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    /// Notifications received, oldest first
    pub entries: Vec<Event>,
}

/// A single recorded notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// See [`SessionEvents::transfer_started`]
    TransferStarted,
    /// See [`SessionEvents::transfer_ended`]
    TransferEnded,
    /// See [`SessionEvents::error`]
    Error,
    /// See [`SessionEvents::receive_complete`]
    ReceiveComplete,
    /// See [`SessionEvents::debug`]
    Debug(String),
}

impl EventLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded notifications with debug traces filtered out.
    pub fn lifecycle(&self) -> Vec<Event> {
        self.entries
            .iter()
            .filter(|e| !matches!(e, Event::Debug(_)))
            .cloned()
            .collect()
    }
}

impl SessionEvents for EventLog {
    fn transfer_started(&mut self) {
        self.entries.push(Event::TransferStarted);
    }

    fn transfer_ended(&mut self) {
        self.entries.push(Event::TransferEnded);
    }

    fn error(&mut self) {
        self.entries.push(Event::Error);
    }

    fn receive_complete(&mut self) {
        self.entries.push(Event::ReceiveComplete);
    }

    fn debug(&mut self, message: &str) {
        self.entries.push(Event::Debug(message.to_string()));
    }
}
