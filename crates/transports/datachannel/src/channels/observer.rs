//! Lifecycle notifications delivered by a channel controller

use bytes::Bytes;
use tokio::sync::mpsc;

/// Kind of a [`ChannelEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEventKind {
    Open,
    CanSend,
    Error,
    Close,
    Message,
}

/// Immutable lifecycle record passed to observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Native open signal fired
    Open { label: String },
    /// Channel confirmed able to send (at most once per channel)
    CanSend { label: String },
    /// Native error signal fired; informational, the channel is not closed by it
    Error { label: String, error: String },
    /// Channel transitioned to closed (exactly once)
    Close { label: String },
    /// Binary frame received
    Message { label: String, data: Bytes },
}

impl ChannelEvent {
    pub fn kind(&self) -> ChannelEventKind {
        match self {
            ChannelEvent::Open { .. } => ChannelEventKind::Open,
            ChannelEvent::CanSend { .. } => ChannelEventKind::CanSend,
            ChannelEvent::Error { .. } => ChannelEventKind::Error,
            ChannelEvent::Close { .. } => ChannelEventKind::Close,
            ChannelEvent::Message { .. } => ChannelEventKind::Message,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ChannelEvent::Open { label }
            | ChannelEvent::CanSend { label }
            | ChannelEvent::Error { label, .. }
            | ChannelEvent::Close { label }
            | ChannelEvent::Message { label, .. } => label,
        }
    }
}

/// Receiver of controller lifecycle notifications
///
/// All methods default to no-ops; implement the ones you care about.
/// Callbacks are purely observational and may call back into the
/// controller, including `teardown()`.
pub trait ChannelObserver: Send + Sync {
    fn on_open(&self, _label: &str) {}

    fn on_can_send(&self, _label: &str) {}

    fn on_error(&self, _label: &str, _error: &str) {}

    fn on_close(&self, _label: &str) {}

    fn on_message(&self, _label: &str, _data: &Bytes) {}
}

/// Route an event to the matching observer slot
pub(crate) fn deliver(observer: &dyn ChannelObserver, event: &ChannelEvent) {
    match event {
        ChannelEvent::Open { label } => observer.on_open(label),
        ChannelEvent::CanSend { label } => observer.on_can_send(label),
        ChannelEvent::Error { label, error } => observer.on_error(label, error),
        ChannelEvent::Close { label } => observer.on_close(label),
        ChannelEvent::Message { label, data } => observer.on_message(label, data),
    }
}

/// Observer that ignores every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ChannelObserver for NoopObserver {}

/// Observer that forwards every notification as a [`ChannelEvent`] into an mpsc channel
///
/// Events sent after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct EventForwarder {
    tx: mpsc::UnboundedSender<ChannelEvent>,
}

impl EventForwarder {
    /// Create a forwarder and the receiver it feeds
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: ChannelEvent) {
        let _ = self.tx.send(event);
    }
}

impl ChannelObserver for EventForwarder {
    fn on_open(&self, label: &str) {
        self.forward(ChannelEvent::Open {
            label: label.to_string(),
        });
    }

    fn on_can_send(&self, label: &str) {
        self.forward(ChannelEvent::CanSend {
            label: label.to_string(),
        });
    }

    fn on_error(&self, label: &str, error: &str) {
        self.forward(ChannelEvent::Error {
            label: label.to_string(),
            error: error.to_string(),
        });
    }

    fn on_close(&self, label: &str) {
        self.forward(ChannelEvent::Close {
            label: label.to_string(),
        });
    }

    fn on_message(&self, label: &str, data: &Bytes) {
        self.forward(ChannelEvent::Message {
            label: label.to_string(),
            data: data.clone(),
        });
    }
}
