//! `webrtc` crate backing for the transport traits

use super::{ChannelSignal, ReadyState, SignalHandler, TransportChannel, TransportSession};
use crate::config::ChannelOptions;
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, warn};
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::data_channel::RTCDataChannel;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::RTCPeerConnection;

/// Session backed by an `RTCPeerConnection`
#[derive(Clone)]
pub struct RtcSession {
    peer_connection: Arc<RTCPeerConnection>,
}

impl RtcSession {
    /// Wrap an existing peer connection
    pub fn new(peer_connection: Arc<RTCPeerConnection>) -> Self {
        Self { peer_connection }
    }

    /// Get the underlying peer connection
    pub fn peer_connection(&self) -> &Arc<RTCPeerConnection> {
        &self.peer_connection
    }
}

#[async_trait]
impl TransportSession for RtcSession {
    async fn create_channel(
        &self,
        label: &str,
        options: &ChannelOptions,
    ) -> Result<Arc<dyn TransportChannel>> {
        let state = self.peer_connection.connection_state();
        if matches!(
            state,
            RTCPeerConnectionState::Closed | RTCPeerConnectionState::Failed
        ) {
            return Err(Error::TransportUnavailable(format!(
                "Peer connection cannot host data channel '{}' (state: {})",
                label, state
            )));
        }

        let init = RTCDataChannelInit {
            ordered: Some(options.ordered),
            max_retransmits: options.max_retransmits,
            protocol: (!options.protocol.is_empty()).then(|| options.protocol.clone()),
            ..Default::default()
        };

        let rtc_channel = self
            .peer_connection
            .create_data_channel(label, Some(init))
            .await
            .map_err(|e| {
                Error::TransportUnavailable(format!(
                    "Failed to create data channel '{}': {}",
                    label, e
                ))
            })?;

        debug!("Created RTC data channel '{}'", label);
        Ok(Arc::new(RtcChannel::new(rtc_channel)))
    }
}

/// Channel backed by an `RTCDataChannel`
pub struct RtcChannel {
    label: String,
    rtc_channel: Arc<RTCDataChannel>,
}

impl RtcChannel {
    /// Wrap an existing data channel (e.g. one announced by the remote peer)
    pub fn new(rtc_channel: Arc<RTCDataChannel>) -> Self {
        Self {
            label: rtc_channel.label().to_string(),
            rtc_channel,
        }
    }

    /// Get the underlying RTCDataChannel
    pub fn rtc_channel(&self) -> &Arc<RTCDataChannel> {
        &self.rtc_channel
    }
}

impl From<RTCDataChannelState> for ReadyState {
    fn from(state: RTCDataChannelState) -> Self {
        match state {
            RTCDataChannelState::Connecting => ReadyState::Connecting,
            RTCDataChannelState::Open => ReadyState::Open,
            RTCDataChannelState::Closing => ReadyState::Closing,
            RTCDataChannelState::Closed => ReadyState::Closed,
            _ => ReadyState::Unknown,
        }
    }
}

#[async_trait]
impl TransportChannel for RtcChannel {
    fn label(&self) -> &str {
        &self.label
    }

    fn ready_state(&self) -> ReadyState {
        ReadyState::from(self.rtc_channel.ready_state())
    }

    fn on_signal(&self, handler: SignalHandler) {
        let on_open = Arc::clone(&handler);
        self.rtc_channel.on_open(Box::new(move || {
            on_open(ChannelSignal::Open);
            Box::pin(async {})
        }));

        let on_close = Arc::clone(&handler);
        self.rtc_channel.on_close(Box::new(move || {
            on_close(ChannelSignal::Close);
            Box::pin(async {})
        }));

        let on_message = Arc::clone(&handler);
        self.rtc_channel
            .on_message(Box::new(move |msg: DataChannelMessage| {
                on_message(ChannelSignal::Message(msg.data));
                Box::pin(async {})
            }));

        self.rtc_channel.on_error(Box::new(move |err| {
            handler(ChannelSignal::Error(err.to_string()));
            Box::pin(async {})
        }));
    }

    async fn send(&self, data: Bytes) -> Result<usize> {
        self.rtc_channel.send(&data).await.map_err(Error::from)
    }

    fn close(&self) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            Error::Teardown(format!(
                "No runtime available to close data channel '{}': {}",
                self.label, e
            ))
        })?;

        let rtc_channel = Arc::clone(&self.rtc_channel);
        let label = self.label.clone();
        runtime.spawn(async move {
            if let Err(e) = rtc_channel.close().await {
                warn!("Failed to close data channel '{}': {}", label, e);
            }
        });

        Ok(())
    }
}
