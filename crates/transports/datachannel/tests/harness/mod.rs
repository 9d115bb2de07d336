//! Data channel controller test harness
//!
//! Provides an in-memory transport whose native signals and ready state are
//! driven by the test, plus an observer that records every notification.
//!
//! Basic usage pattern:
//!
//! 1. Create a `MockSession` and a `RecordingObserver`
//! 2. Create a controller on the session, grab the channel with `session.last_channel()`
//! 3. Drive `open()` / `emit()` / `set_ready_state()` on the channel
//! 4. Advance paused time with `advance_ticks()` and assert on `observer.kinds()`

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use pixelstream_datachannel::{
    ChannelController, ChannelEvent, ChannelEventKind, ChannelObserver, ChannelOptions,
    ChannelSignal, Error, ReadyState, Result, SignalHandler, TransportChannel, TransportSession,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default readiness poll interval used by the controller
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Initialize test logging (safe to call from every test)
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info,pixelstream_datachannel=debug")
        .with_test_writer()
        .try_init();
}

/// Let spawned tasks run to their next await point
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

/// Advance paused time by `n` poll intervals, letting the poller run after each
pub async fn advance_ticks(n: u32) {
    for _ in 0..n {
        tokio::time::advance(POLL_INTERVAL).await;
        settle().await;
    }
}

// ============================================================================
// Mock transport
// ============================================================================

/// Session that hands out [`MockChannel`]s
pub struct MockSession {
    available: AtomicBool,
    channels: Mutex<Vec<Arc<MockChannel>>>,
}

impl MockSession {
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            channels: Mutex::new(Vec::new()),
        }
    }

    /// A session that refuses to host channels (closed / not negotiated)
    pub fn unavailable() -> Self {
        let session = Self::new();
        session.available.store(false, Ordering::SeqCst);
        session
    }

    pub fn channel_count(&self) -> usize {
        self.channels.lock().len()
    }

    pub fn last_channel(&self) -> Arc<MockChannel> {
        self.channels
            .lock()
            .last()
            .cloned()
            .expect("no channel created")
    }

    pub fn channel(&self, label: &str) -> Arc<MockChannel> {
        self.channels
            .lock()
            .iter()
            .find(|channel| channel.label == label)
            .cloned()
            .expect("no channel with that label")
    }
}

#[async_trait]
impl TransportSession for MockSession {
    async fn create_channel(
        &self,
        label: &str,
        options: &ChannelOptions,
    ) -> Result<Arc<dyn TransportChannel>> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(Error::TransportUnavailable(format!(
                "mock session closed, cannot create '{}'",
                label
            )));
        }

        let channel = Arc::new(MockChannel::new(label, options.clone()));
        self.channels.lock().push(Arc::clone(&channel));
        Ok(channel)
    }
}

/// Channel whose ready state and signals are controlled by the test
pub struct MockChannel {
    label: String,
    options: ChannelOptions,
    ready_state: Mutex<ReadyState>,
    handler: Mutex<Option<SignalHandler>>,
    sent: Mutex<Vec<Bytes>>,
    ready_samples: AtomicUsize,
    close_calls: AtomicUsize,
    fail_close: AtomicBool,
}

impl MockChannel {
    fn new(label: &str, options: ChannelOptions) -> Self {
        Self {
            label: label.to_string(),
            options,
            ready_state: Mutex::new(ReadyState::Connecting),
            handler: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            ready_samples: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
            fail_close: AtomicBool::new(false),
        }
    }

    pub fn options(&self) -> &ChannelOptions {
        &self.options
    }

    pub fn set_ready_state(&self, state: ReadyState) {
        *self.ready_state.lock() = state;
    }

    /// Deliver a native signal to the registered handler
    pub fn emit(&self, signal: ChannelSignal) {
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler(signal);
        }
    }

    /// Native open where the channel is immediately drainable
    pub fn open(&self) {
        self.set_ready_state(ReadyState::Open);
        self.emit(ChannelSignal::Open);
    }

    /// Native open signal while the ready state still lags behind
    pub fn open_not_ready(&self) {
        self.set_ready_state(ReadyState::Connecting);
        self.emit(ChannelSignal::Open);
    }

    /// Native close
    pub fn close_natively(&self) {
        self.set_ready_state(ReadyState::Closed);
        self.emit(ChannelSignal::Close);
    }

    /// Make the next `close()` calls fail as on an already-broken channel
    pub fn fail_close(&self) {
        self.fail_close.store(true, Ordering::SeqCst);
    }

    pub fn has_handler(&self) -> bool {
        self.handler.lock().is_some()
    }

    pub fn sent(&self) -> Vec<Bytes> {
        self.sent.lock().clone()
    }

    pub fn ready_samples(&self) -> usize {
        self.ready_samples.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportChannel for MockChannel {
    fn label(&self) -> &str {
        &self.label
    }

    fn ready_state(&self) -> ReadyState {
        self.ready_samples.fetch_add(1, Ordering::SeqCst);
        *self.ready_state.lock()
    }

    fn on_signal(&self, handler: SignalHandler) {
        *self.handler.lock() = Some(handler);
    }

    async fn send(&self, data: Bytes) -> Result<usize> {
        let len = data.len();
        self.sent.lock().push(data);
        Ok(len)
    }

    fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(Error::ChannelRuntime(format!(
                "channel '{}' transport already broken",
                self.label
            )));
        }
        self.set_ready_state(ReadyState::Closed);
        Ok(())
    }
}

// ============================================================================
// Observers
// ============================================================================

/// Observer that records every notification in order
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ChannelEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ChannelEvent> {
        self.events.lock().clone()
    }

    pub fn kinds(&self) -> Vec<ChannelEventKind> {
        self.events.lock().iter().map(ChannelEvent::kind).collect()
    }

    pub fn count(&self, kind: ChannelEventKind) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.kind() == kind)
            .count()
    }

    fn record(&self, event: ChannelEvent) {
        self.events.lock().push(event);
    }
}

impl ChannelObserver for RecordingObserver {
    fn on_open(&self, label: &str) {
        self.record(ChannelEvent::Open {
            label: label.to_string(),
        });
    }

    fn on_can_send(&self, label: &str) {
        self.record(ChannelEvent::CanSend {
            label: label.to_string(),
        });
    }

    fn on_error(&self, label: &str, error: &str) {
        self.record(ChannelEvent::Error {
            label: label.to_string(),
            error: error.to_string(),
        });
    }

    fn on_close(&self, label: &str) {
        self.record(ChannelEvent::Close {
            label: label.to_string(),
        });
    }

    fn on_message(&self, label: &str, data: &Bytes) {
        self.record(ChannelEvent::Message {
            label: label.to_string(),
            data: data.clone(),
        });
    }
}

/// Observer that tears its controller down from inside a callback
pub struct TeardownObserver {
    pub recorder: Arc<RecordingObserver>,
    trigger: ChannelEventKind,
    controller: Mutex<Option<Arc<ChannelController>>>,
}

impl TeardownObserver {
    pub fn new(trigger: ChannelEventKind) -> Arc<Self> {
        Arc::new(Self {
            recorder: RecordingObserver::new(),
            trigger,
            controller: Mutex::new(None),
        })
    }

    pub fn attach(&self, controller: Arc<ChannelController>) {
        *self.controller.lock() = Some(controller);
    }

    fn maybe_teardown(&self, kind: ChannelEventKind) {
        if kind != self.trigger {
            return;
        }
        let controller = self.controller.lock().take();
        if let Some(controller) = controller {
            controller.teardown();
        }
    }
}

impl ChannelObserver for TeardownObserver {
    fn on_open(&self, label: &str) {
        self.recorder.on_open(label);
        self.maybe_teardown(ChannelEventKind::Open);
    }

    fn on_can_send(&self, label: &str) {
        self.recorder.on_can_send(label);
        self.maybe_teardown(ChannelEventKind::CanSend);
    }

    fn on_error(&self, label: &str, error: &str) {
        self.recorder.on_error(label, error);
        self.maybe_teardown(ChannelEventKind::Error);
    }

    fn on_close(&self, label: &str) {
        self.recorder.on_close(label);
    }
}
