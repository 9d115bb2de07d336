//! Data channel lifecycle controller
//!
//! Owns one named channel on a [`TransportSession`], translates its native
//! signals into [`ChannelEvent`]s and fires `CanSend` at most once, after a
//! secondary readiness confirmation by the [`ReadinessPoller`].
//!
//! ```text
//! Created --open--> Open --close--> Closed
//! Created --teardown----------------> Closed
//! Open ----error---> Open   (reported only)
//! Open ----ready---> Open   (CanSend fired once)
//! ```
//!
//! Observer callbacks run without the state lock held, so they may call
//! back into the controller. Every mutating path first takes a reentrant
//! dispatch lock, which serializes signals, poll ticks and teardown and
//! lets `teardown()` run from inside a callback on the same thread.

use super::observer::{deliver, ChannelEvent, ChannelObserver};
use super::poller::{PollStatus, ReadinessPoller, ReadinessProbe};
use crate::config::{ChannelOptions, ControllerConfig};
use crate::transport::{ChannelSignal, ReadyState, TransportChannel, TransportSession};
use crate::{Error, Result};
use bytes::Bytes;
use parking_lot::{Mutex, ReentrantMutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Lifecycle state of a controlled channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataChannelState {
    /// Channel requested, native open signal not yet seen
    Created,
    /// Native open signal seen
    Open,
    /// Terminal. A new controller is needed to reconnect.
    Closed,
}

/// Channel statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataChannelStats {
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Total bytes received
    pub bytes_received: u64,
    /// Messages sent count
    pub messages_sent: u64,
    /// Messages received count
    pub messages_received: u64,
}

#[derive(Debug, Default)]
struct Counters {
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
}

struct ControllerState {
    lifecycle: DataChannelState,
    /// Present from creation until teardown
    channel: Option<Arc<dyn TransportChannel>>,
    has_fired_ready_event: bool,
    close_delivered: bool,
    torn_down: bool,
    poller: ReadinessPoller,
}

impl ControllerState {
    /// Native readiness sample; anything but `Open` counts as not ready
    fn native_ready(&self) -> bool {
        self.channel
            .as_ref()
            .is_some_and(|channel| channel.ready_state() == ReadyState::Open)
    }

    fn can_send(&self) -> bool {
        self.lifecycle == DataChannelState::Open && self.native_ready()
    }
}

struct Shared {
    id: Uuid,
    label: String,
    config: ControllerConfig,
    observer: Arc<dyn ChannelObserver>,
    runtime: Handle,
    dispatch: ReentrantMutex<()>,
    state: Mutex<ControllerState>,
    counters: Counters,
}

/// Lifecycle controller for one data channel
///
/// Dropping the controller tears it down.
pub struct ChannelController {
    shared: Arc<Shared>,
}

impl ChannelController {
    /// Create a channel on `session` with the default controller configuration
    ///
    /// `options` defaults to ordered, reliable delivery.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransportUnavailable`] if the session cannot host the
    /// channel, or [`Error::InvalidConfig`] for an unusable label.
    pub async fn create(
        session: &dyn TransportSession,
        label: &str,
        options: Option<ChannelOptions>,
        observer: Arc<dyn ChannelObserver>,
    ) -> Result<Self> {
        Self::create_with_config(session, label, options, ControllerConfig::default(), observer)
            .await
    }

    /// Create a channel on `session` with an explicit controller configuration
    pub async fn create_with_config(
        session: &dyn TransportSession,
        label: &str,
        options: Option<ChannelOptions>,
        config: ControllerConfig,
        observer: Arc<dyn ChannelObserver>,
    ) -> Result<Self> {
        let options = options.unwrap_or_default();
        options.validate(label)?;
        config.validate()?;

        let runtime = Handle::try_current().map_err(|e| {
            Error::TransportUnavailable(format!("No async runtime to drive '{}': {}", label, e))
        })?;

        let channel = session.create_channel(label, &options).await?;

        let shared = Arc::new(Shared {
            id: Uuid::new_v4(),
            label: label.to_string(),
            observer,
            runtime,
            dispatch: ReentrantMutex::new(()),
            state: Mutex::new(ControllerState {
                lifecycle: DataChannelState::Created,
                channel: Some(Arc::clone(&channel)),
                has_fired_ready_event: false,
                close_delivered: false,
                torn_down: false,
                poller: ReadinessPoller::new(config.poll_interval()),
            }),
            config,
            counters: Counters::default(),
        });

        let weak = Arc::downgrade(&shared);
        channel.on_signal(Arc::new(move |signal: ChannelSignal| {
            if let Some(shared) = weak.upgrade() {
                shared.handle_signal(signal);
            }
        }));

        info!(
            controller_id = %shared.id,
            "Data channel '{}' created (ordered: {}, max_retransmits: {:?})",
            shared.label,
            options.ordered,
            options.max_retransmits
        );

        Ok(Self { shared })
    }

    /// Unique id of this controller, used in log fields
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Get the channel label
    pub fn label(&self) -> &str {
        &self.shared.label
    }

    /// Get the controller configuration
    pub fn config(&self) -> &ControllerConfig {
        &self.shared.config
    }

    /// Get current lifecycle state
    pub fn state(&self) -> DataChannelState {
        self.shared.state.lock().lifecycle
    }

    /// True iff the channel exists, has opened, has not closed and
    /// natively reports that it can carry data
    pub fn can_send(&self) -> bool {
        self.shared.state.lock().can_send()
    }

    /// Whether the readiness poller timer is armed
    pub fn is_polling(&self) -> bool {
        self.shared.state.lock().poller.is_active()
    }

    /// Whether `CanSend` has been delivered for this channel
    pub fn has_fired_ready_event(&self) -> bool {
        self.shared.state.lock().has_fired_ready_event
    }

    /// Send one binary frame
    ///
    /// Sends are not queued: calling before `CanSend` fired is a caller bug.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReady`] when [`Self::can_send`] is false (nothing is
    /// forwarded), [`Error::MessageTooLarge`] when the payload exceeds the
    /// configured maximum, or the transport's send error.
    pub async fn send(&self, data: impl Into<Bytes>) -> Result<usize> {
        let data = data.into();
        let shared = &self.shared;

        let channel = {
            let state = shared.state.lock();
            if !state.can_send() {
                return Err(Error::NotReady(shared.label.clone()));
            }
            state.channel.clone()
        };
        let Some(channel) = channel else {
            return Err(Error::NotReady(shared.label.clone()));
        };

        if data.len() > shared.config.max_message_size {
            return Err(Error::MessageTooLarge {
                size: data.len(),
                max: shared.config.max_message_size,
            });
        }

        let len = data.len();
        let sent = channel.send(data).await?;

        shared
            .counters
            .bytes_sent
            .fetch_add(len as u64, Ordering::Relaxed);
        shared.counters.messages_sent.fetch_add(1, Ordering::Relaxed);
        trace!("Sent {} bytes on data channel '{}'", len, shared.label);

        Ok(sent)
    }

    /// Tear the channel down
    ///
    /// Idempotent and infallible: cancels the poller, asks the transport to
    /// close the channel (logging any failure), and delivers `onClose` if the
    /// channel had not already closed. No observer callback for this
    /// controller runs after the first call returns. Safe to call from
    /// inside an observer callback.
    pub fn teardown(&self) {
        self.shared.teardown();
    }

    /// Get channel statistics
    pub fn stats(&self) -> DataChannelStats {
        let counters = &self.shared.counters;
        DataChannelStats {
            bytes_sent: counters.bytes_sent.load(Ordering::Relaxed),
            bytes_received: counters.bytes_received.load(Ordering::Relaxed),
            messages_sent: counters.messages_sent.load(Ordering::Relaxed),
            messages_received: counters.messages_received.load(Ordering::Relaxed),
        }
    }
}

impl Drop for ChannelController {
    fn drop(&mut self) {
        self.shared.teardown();
    }
}

impl std::fmt::Debug for ChannelController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelController")
            .field("id", &self.shared.id)
            .field("label", &self.shared.label)
            .field("state", &self.state())
            .finish()
    }
}

impl Shared {
    fn handle_signal(self: &Arc<Self>, signal: ChannelSignal) {
        match signal {
            ChannelSignal::Open => self.handle_open(),
            ChannelSignal::Close => self.handle_close(),
            ChannelSignal::Message(data) => self.handle_message(data),
            ChannelSignal::Error(error) => self.handle_error(error),
        }
    }

    fn handle_open(self: &Arc<Self>) {
        let _dispatch = self.dispatch.lock();

        {
            let mut state = self.state.lock();
            match state.lifecycle {
                DataChannelState::Created => state.lifecycle = DataChannelState::Open,
                lifecycle => {
                    debug!(
                        controller_id = %self.id,
                        "Ignoring open signal for data channel '{}' in state {:?}",
                        self.label,
                        lifecycle
                    );
                    return;
                }
            }
        }

        debug!(controller_id = %self.id, "Data channel '{}' opened", self.label);
        self.emit(ChannelEvent::Open {
            label: self.label.clone(),
        });

        self.begin_readiness_polling();
    }

    /// Immediate readiness check, then arm the poller if still pending
    fn begin_readiness_polling(self: &Arc<Self>) {
        if self.poll_readiness() != PollStatus::Pending {
            return;
        }

        let mut state = self.state.lock();
        if state.lifecycle == DataChannelState::Open && !state.has_fired_ready_event {
            state.poller.arm(&self.runtime, Arc::downgrade(self));
            debug!(
                controller_id = %self.id,
                "Data channel '{}' not ready yet, polling every {}ms",
                self.label,
                self.config.poll_interval_ms
            );
        }
    }

    fn handle_close(&self) {
        let _dispatch = self.dispatch.lock();

        {
            let mut state = self.state.lock();
            if state.lifecycle == DataChannelState::Closed {
                trace!("Data channel '{}' already closed", self.label);
                return;
            }
            state.lifecycle = DataChannelState::Closed;
            state.poller.stop();
        }

        debug!(controller_id = %self.id, "Data channel '{}' closed", self.label);
        self.emit(ChannelEvent::Close {
            label: self.label.clone(),
        });
    }

    fn handle_message(&self, data: Bytes) {
        let _dispatch = self.dispatch.lock();

        self.counters
            .bytes_received
            .fetch_add(data.len() as u64, Ordering::Relaxed);
        self.counters
            .messages_received
            .fetch_add(1, Ordering::Relaxed);
        trace!(
            "Received {} bytes on data channel '{}'",
            data.len(),
            self.label
        );

        self.emit(ChannelEvent::Message {
            label: self.label.clone(),
            data,
        });
    }

    fn handle_error(&self, error: String) {
        let _dispatch = self.dispatch.lock();

        let error = Error::ChannelRuntime(error);
        warn!(controller_id = %self.id, "Data channel '{}' error: {}", self.label, error);

        self.emit(ChannelEvent::Error {
            label: self.label.clone(),
            error: error.to_string(),
        });
    }

    fn teardown(&self) {
        let _dispatch = self.dispatch.lock();

        let (channel, notify_close) = {
            let mut state = self.state.lock();
            if state.torn_down {
                trace!("Data channel '{}' already torn down", self.label);
                return;
            }
            state.torn_down = true;
            state.poller.stop();

            let was_closed = state.lifecycle == DataChannelState::Closed;
            state.lifecycle = DataChannelState::Closed;
            (state.channel.take(), !was_closed)
        };

        if let Some(channel) = channel {
            if let Err(e) = channel.close() {
                let err = match e {
                    Error::Teardown(_) => e,
                    other => Error::Teardown(other.to_string()),
                };
                warn!(
                    controller_id = %self.id,
                    "Ignoring failure while closing data channel '{}': {}",
                    self.label,
                    err
                );
            }
        }

        debug!(controller_id = %self.id, "Data channel '{}' torn down", self.label);

        if notify_close {
            self.emit(ChannelEvent::Close {
                label: self.label.clone(),
            });
        }
    }

    /// Deliver an event unless `Close` has already been delivered.
    /// Callers hold the dispatch lock, never the state lock.
    fn emit(&self, event: ChannelEvent) {
        {
            let mut state = self.state.lock();
            if state.close_delivered {
                trace!(
                    "Suppressing {:?} event for closed data channel '{}'",
                    event.kind(),
                    self.label
                );
                return;
            }
            if matches!(event, ChannelEvent::Close { .. }) {
                state.close_delivered = true;
            }
        }

        deliver(self.observer.as_ref(), &event);
    }
}

impl ReadinessProbe for Shared {
    fn poll_readiness(&self) -> PollStatus {
        let _dispatch = self.dispatch.lock();

        {
            let mut state = self.state.lock();
            if state.lifecycle != DataChannelState::Open {
                state.poller.release();
                return PollStatus::Abandoned;
            }
            if state.has_fired_ready_event {
                state.poller.release();
                return PollStatus::Confirmed;
            }
            if !state.native_ready() {
                return PollStatus::Pending;
            }
            state.has_fired_ready_event = true;
            state.poller.release();
        }

        info!(
            controller_id = %self.id,
            "Data channel '{}' is ready to send messages",
            self.label
        );
        self.emit(ChannelEvent::CanSend {
            label: self.label.clone(),
        });

        PollStatus::Confirmed
    }
}
