//! Data channel lifecycle management
//!
//! # Overview
//!
//! - [`ChannelController`] - Creates one ordered channel and tracks its lifecycle
//! - [`ChannelObserver`] - Hook slots for `Open`, `CanSend`, `Error`, `Close` and messages
//! - [`EventForwarder`] - Observer that forwards [`ChannelEvent`]s into an mpsc channel
//!
//! `CanSend` is fired at most once per channel, never before `Open` and never
//! after `Close`. "Open" alone is not trusted: readiness is re-sampled every
//! [`crate::config::ControllerConfig::poll_interval_ms`] until the transport
//! confirms it.
//!
//! # Example
//!
//! ```ignore
//! use pixelstream_datachannel::channels::{ChannelController, EventForwarder};
//! use pixelstream_datachannel::transport::rtc::RtcSession;
//!
//! let session = RtcSession::new(peer_connection);
//! let (forwarder, mut events) = EventForwarder::channel();
//! let controller =
//!     ChannelController::create(&session, "datachannel", None, Arc::new(forwarder)).await?;
//!
//! while let Some(event) = events.recv().await {
//!     if event.kind() == ChannelEventKind::CanSend {
//!         controller.send(vec![0x50, 0x01]).await?;
//!     }
//! }
//! ```

mod controller;
mod observer;
mod poller;

pub use controller::{ChannelController, DataChannelState, DataChannelStats};
pub use observer::{ChannelEvent, ChannelEventKind, ChannelObserver, EventForwarder, NoopObserver};
