//! Configuration types for data channel controllers

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Label used when a single bidirectional channel carries all application messages
pub const DEFAULT_LABEL: &str = "datachannel";

/// Label of the outbound half when a send/receive channel pair is used
pub const SEND_LABEL: &str = "send-datachannel";

/// Label of the inbound half when a send/receive channel pair is used
pub const RECV_LABEL: &str = "recv-datachannel";

/// Maximum length of a channel label or protocol in bytes (SCTP DCEP limit)
pub const MAX_LABEL_LEN: usize = 65535;

/// Default interval between readiness samples
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Default maximum outbound message size (16 MB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Data channel mode
///
/// Determines the reliability of message delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataChannelMode {
    /// Reliable, ordered delivery (default)
    ///
    /// Input events and console commands must arrive in order and without loss.
    Reliable,
    /// Unreliable, unordered delivery
    Unreliable,
}

impl DataChannelMode {
    /// Get the ordered setting for webrtc-rs
    pub fn ordered(&self) -> bool {
        match self {
            DataChannelMode::Reliable => true,
            DataChannelMode::Unreliable => false,
        }
    }

    /// Get the max retransmits setting for webrtc-rs
    pub fn max_retransmits(&self) -> Option<u16> {
        match self {
            DataChannelMode::Reliable => None,      // Unlimited retransmits
            DataChannelMode::Unreliable => Some(0), // No retransmits
        }
    }
}

/// Options passed to the transport when the channel is created
///
/// Frames are always raw binary; there is no text framing option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelOptions {
    /// Ordered delivery (default: true)
    pub ordered: bool,

    /// Retransmit limit, `None` for fully reliable delivery
    pub max_retransmits: Option<u16>,

    /// Sub-protocol name announced to the remote side (default: empty)
    pub protocol: String,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self::from(DataChannelMode::Reliable)
    }
}

impl From<DataChannelMode> for ChannelOptions {
    fn from(mode: DataChannelMode) -> Self {
        Self {
            ordered: mode.ordered(),
            max_retransmits: mode.max_retransmits(),
            protocol: String::new(),
        }
    }
}

impl ChannelOptions {
    /// Set the ordered flag
    pub fn with_ordered(mut self, ordered: bool) -> Self {
        self.ordered = ordered;
        self
    }

    /// Set the sub-protocol name
    pub fn with_protocol(mut self, protocol: &str) -> Self {
        self.protocol = protocol.to_string();
        self
    }

    /// Validate these options together with the label they will be created under
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `label` is empty
    /// - `label` or `protocol` is longer than 65535 bytes
    pub fn validate(&self, label: &str) -> Result<()> {
        if label.is_empty() {
            return Err(Error::InvalidConfig(
                "Data channel label must not be empty".to_string(),
            ));
        }

        if label.len() > MAX_LABEL_LEN {
            return Err(Error::InvalidConfig(format!(
                "Data channel label must be at most {} bytes, got {}",
                MAX_LABEL_LEN,
                label.len()
            )));
        }

        if self.protocol.len() > MAX_LABEL_LEN {
            return Err(Error::InvalidConfig(format!(
                "Data channel protocol must be at most {} bytes, got {}",
                MAX_LABEL_LEN,
                self.protocol.len()
            )));
        }

        Ok(())
    }
}

/// Tunables for a channel controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Interval between readiness samples in milliseconds (default: 10ms, range: 1-1000ms)
    pub poll_interval_ms: u64,

    /// Largest payload accepted by `send` in bytes (default: 16 MB)
    pub max_message_size: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl ControllerConfig {
    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `poll_interval_ms` is not in range 1-1000
    /// - `max_message_size` is zero
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 || self.poll_interval_ms > 1000 {
            return Err(Error::InvalidConfig(format!(
                "poll_interval_ms must be in range 1-1000, got {}",
                self.poll_interval_ms
            )));
        }

        if self.max_message_size == 0 {
            return Err(Error::InvalidConfig(
                "max_message_size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Readiness poll interval as a `Duration`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Create a configuration that samples readiness every millisecond
    ///
    /// # Example
    ///
    /// ```
    /// use pixelstream_datachannel::config::ControllerConfig;
    ///
    /// let config = ControllerConfig::low_latency_preset();
    /// assert_eq!(config.poll_interval_ms, 1);
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn low_latency_preset() -> Self {
        Self {
            poll_interval_ms: 1,
            ..Default::default()
        }
    }

    /// Set the poll interval
    pub fn with_poll_interval_ms(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Set the maximum outbound message size
    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }
}
