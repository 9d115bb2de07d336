//! Loopback probe for the data channel controller
//!
//! Negotiates two in-process peer connections, attaches a controller to the
//! offering side and reports how long the channel takes to become sendable.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin datachannel_probe -- --messages 20 --payload-bytes 256
//!
//! # Unordered channel, tighter readiness polling
//! RUST_LOG=debug cargo run --bin datachannel_probe -- --unordered --poll-interval-ms 2
//! ```

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use pixelstream_datachannel::config::DEFAULT_LABEL;
use pixelstream_datachannel::logging::init_tracing;
use pixelstream_datachannel::transport::rtc::RtcSession;
use pixelstream_datachannel::{
    ChannelController, ChannelEvent, ChannelOptions, ControllerConfig, EventForwarder,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::info;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::RTCDataChannel;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::RTCPeerConnection;

/// Data channel loopback probe
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Channel label
    #[arg(long, default_value = DEFAULT_LABEL, env = "PROBE_LABEL")]
    label: String,

    /// Number of messages to send once the channel can send
    #[arg(long, default_value_t = 10, env = "PROBE_MESSAGES")]
    messages: u64,

    /// Size of each message in bytes
    #[arg(long, default_value_t = 64, env = "PROBE_PAYLOAD_BYTES")]
    payload_bytes: usize,

    /// Readiness poll interval in milliseconds
    #[arg(long, default_value_t = 10, env = "PROBE_POLL_INTERVAL_MS")]
    poll_interval_ms: u64,

    /// Use an unordered channel
    #[arg(long, default_value_t = false)]
    unordered: bool,

    /// Give up if the channel is not sendable within this many seconds
    #[arg(long, default_value_t = 10, env = "PROBE_TIMEOUT_SECS")]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing("info");

    let timeout = Duration::from_secs(args.timeout_secs);
    let (offerer, answerer) = new_peer_pair().await?;

    let received = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&received);
    answerer.on_data_channel(Box::new(move |channel: Arc<RTCDataChannel>| {
        let counter = Arc::clone(&counter);
        channel.on_message(Box::new(move |_msg: DataChannelMessage| {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {})
        }));
        Box::pin(async {})
    }));

    let session = RtcSession::new(Arc::clone(&offerer));
    let options = ChannelOptions::default().with_ordered(!args.unordered);
    let config = ControllerConfig::default().with_poll_interval_ms(args.poll_interval_ms);
    let (forwarder, mut events) = EventForwarder::channel();

    let controller = ChannelController::create_with_config(
        &session,
        &args.label,
        Some(options),
        config,
        Arc::new(forwarder),
    )
    .await
    .context("creating data channel")?;

    let started = Instant::now();
    negotiate(&offerer, &answerer).await?;

    tokio::time::timeout(timeout, wait_for_can_send(&mut events))
        .await
        .map_err(|_| anyhow!("channel '{}' not sendable after {:?}", args.label, timeout))??;
    info!(
        "Channel '{}' can send after {:?}",
        controller.label(),
        started.elapsed()
    );

    for i in 0..args.messages {
        let mut payload = vec![0u8; args.payload_bytes.max(1)];
        payload[0] = (i % 256) as u8;
        controller.send(payload).await?;
    }

    let deadline = Instant::now() + timeout;
    while received.load(Ordering::SeqCst) < args.messages && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let stats = controller.stats();
    println!(
        "label={} sent={} ({} bytes) delivered={}",
        controller.label(),
        stats.messages_sent,
        stats.bytes_sent,
        received.load(Ordering::SeqCst)
    );

    controller.teardown();
    offerer.close().await?;
    answerer.close().await?;
    Ok(())
}

async fn new_peer_pair() -> anyhow::Result<(Arc<RTCPeerConnection>, Arc<RTCPeerConnection>)> {
    let mut media_engine = MediaEngine::default();
    media_engine.register_default_codecs()?;
    let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

    let api = APIBuilder::new()
        .with_media_engine(media_engine)
        .with_interceptor_registry(registry)
        .build();

    let offerer = Arc::new(api.new_peer_connection(RTCConfiguration::default()).await?);
    let answerer = Arc::new(api.new_peer_connection(RTCConfiguration::default()).await?);
    Ok((offerer, answerer))
}

/// Local offer/answer exchange with full ICE gathering (no trickle)
async fn negotiate(offerer: &RTCPeerConnection, answerer: &RTCPeerConnection) -> anyhow::Result<()> {
    let offer = offerer.create_offer(None).await?;
    let mut gathered = offerer.gathering_complete_promise().await;
    offerer.set_local_description(offer).await?;
    let _ = gathered.recv().await;
    let offer = offerer
        .local_description()
        .await
        .ok_or_else(|| anyhow!("offerer has no local description"))?;

    answerer.set_remote_description(offer).await?;
    let answer = answerer.create_answer(None).await?;
    let mut gathered = answerer.gathering_complete_promise().await;
    answerer.set_local_description(answer).await?;
    let _ = gathered.recv().await;
    let answer = answerer
        .local_description()
        .await
        .ok_or_else(|| anyhow!("answerer has no local description"))?;

    offerer.set_remote_description(answer).await?;
    Ok(())
}

async fn wait_for_can_send(events: &mut mpsc::UnboundedReceiver<ChannelEvent>) -> anyhow::Result<()> {
    while let Some(event) = events.recv().await {
        match event {
            ChannelEvent::CanSend { .. } => return Ok(()),
            ChannelEvent::Open { label } => info!("Channel '{}' opened", label),
            ChannelEvent::Error { label, error } => info!("Channel '{}' error: {}", label, error),
            ChannelEvent::Close { label } => bail!("channel '{}' closed before it could send", label),
            ChannelEvent::Message { .. } => {}
        }
    }
    bail!("event stream ended")
}
