//! Error types for the data channel controller

/// Result type alias using the data channel Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while creating, using or tearing down a data channel
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The session cannot host a new channel (closed, failed or not negotiated)
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// Send attempted before the channel is able to send
    #[error("Data channel '{0}' is not ready to send")]
    NotReady(String),

    /// Native error signal raised by an open channel
    #[error("Data channel runtime error: {0}")]
    ChannelRuntime(String),

    /// Failure while closing a channel. Logged by teardown, never returned from it.
    #[error("Teardown error: {0}")]
    Teardown(String),

    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Outbound payload larger than the configured maximum
    #[error("Message size {size} exceeds maximum {max} bytes")]
    MessageTooLarge {
        /// Payload size in bytes
        size: usize,
        /// Configured maximum in bytes
        max: usize,
    },

    /// WebRTC library error
    #[error("WebRTC error: {0}")]
    WebRtcError(String),

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Check if the failed operation may succeed if repeated (on a fresh channel)
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::TransportUnavailable(_) | Error::WebRtcError(_))
    }

    /// Check if this error indicates misuse by the caller rather than a transport fault
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::NotReady(_) | Error::InvalidConfig(_) | Error::MessageTooLarge { .. }
        )
    }
}

impl From<webrtc::Error> for Error {
    fn from(err: webrtc::Error) -> Self {
        Error::WebRtcError(err.to_string())
    }
}
