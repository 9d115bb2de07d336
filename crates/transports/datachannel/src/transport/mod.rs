//! Transport seam between the controller and a negotiated peer connection
//!
//! The controller never negotiates anything. It asks a [`TransportSession`]
//! for a channel and then consumes the channel's native signals through a
//! single [`SignalHandler`].

pub mod rtc;

use crate::config::ChannelOptions;
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// Native signal raised by a transport channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSignal {
    /// The channel reported open
    Open,
    /// The channel reported closed
    Close,
    /// A binary frame arrived
    Message(Bytes),
    /// The channel reported an error (implementation-defined descriptor)
    Error(String),
}

/// Native ready state sampled from a transport channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    /// Channel is being established
    Connecting,
    /// Channel reports that it can carry data
    Open,
    /// Channel is shutting down
    Closing,
    /// Channel is closed
    Closed,
    /// State could not be determined
    Unknown,
}

/// Sink for native channel signals
pub type SignalHandler = Arc<dyn Fn(ChannelSignal) + Send + Sync>;

/// A negotiated two-party connection able to host message channels
#[async_trait]
pub trait TransportSession: Send + Sync {
    /// Create a channel with the given label
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TransportUnavailable`] if the session cannot host new channels.
    async fn create_channel(
        &self,
        label: &str,
        options: &ChannelOptions,
    ) -> Result<Arc<dyn TransportChannel>>;
}

/// One message channel hosted by a [`TransportSession`]
#[async_trait]
pub trait TransportChannel: Send + Sync {
    /// Channel label
    fn label(&self) -> &str;

    /// Sample the native ready state. Never fails.
    fn ready_state(&self) -> ReadyState;

    /// Register the sink for native signals, replacing any previous one
    fn on_signal(&self, handler: SignalHandler);

    /// Send one binary frame, returning the number of bytes accepted
    async fn send(&self, data: Bytes) -> Result<usize>;

    /// Request the channel to close
    ///
    /// The request may complete asynchronously. Errors are reported for
    /// requests that could not be issued at all.
    fn close(&self) -> Result<()>;
}
