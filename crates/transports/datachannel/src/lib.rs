//! Data channel lifecycle controller for Pixel Streaming clients
//!
//! A Pixel Streaming client receives video/audio from a remote rendering
//! server and sends input events, custom commands and console commands back
//! over an ordered data channel on the same peer connection. This crate owns
//! that channel: it creates it, tracks its lifecycle, and tells the
//! application exactly once when the channel can actually accept sends.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │  Application (input, commands, UI status)              │
//! │  ↑ ChannelObserver: Open / CanSend / Error / Close     │
//! │  ChannelController                                     │
//! │  ├─ lifecycle state machine (Created → Open → Closed)  │
//! │  └─ ReadinessPoller (samples ready state until sendable)│
//! │  ↓ TransportSession / TransportChannel                 │
//! │  transport::rtc (webrtc RTCPeerConnection/DataChannel) │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! Negotiation (ICE/SDP), media and the status UI live outside this crate.
//!
//! # Example
//!
//! ```
//! use pixelstream_datachannel::config::{ChannelOptions, ControllerConfig, DEFAULT_LABEL};
//!
//! let options = ChannelOptions::default();
//! assert!(options.ordered);
//! assert!(options.validate(DEFAULT_LABEL).is_ok());
//! assert_eq!(ControllerConfig::default().poll_interval_ms, 10);
//! ```

#![warn(clippy::all)]

pub mod channels;
pub mod config;
pub mod error;
pub mod logging;
pub mod transport;

pub use channels::{
    ChannelController, ChannelEvent, ChannelEventKind, ChannelObserver, DataChannelState,
    DataChannelStats, EventForwarder, NoopObserver,
};
pub use config::{ChannelOptions, ControllerConfig, DataChannelMode};
pub use error::{Error, Result};
pub use transport::{ChannelSignal, ReadyState, SignalHandler, TransportChannel, TransportSession};

/// Get the version of this crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
