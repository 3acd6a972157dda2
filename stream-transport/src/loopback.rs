//! In-process transport with call recording and fault injection.
//!
//! [`LoopbackTransport`] never touches the network. Streams are "delivered"
//! by whoever holds the transport calling [`LoopbackTransport::emit`], and
//! every `add`/`remove` attempt is recorded so callers can assert exactly how
//! the transport was driven.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use dashmap::DashSet;
use tokio::sync::broadcast;

use crate::error::{Result, TransportError};
use crate::transport::{FrameRenderer, StreamTransport};
use crate::types::{Frame, StreamName, TrackEvent};

/// Default capacity of the track event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// One recorded transport call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    /// `add(name)` was attempted
    Add(StreamName),
    /// `remove(name)` was attempted
    Remove(StreamName),
}

impl TransportCall {
    /// The stream this call targeted
    pub fn name(&self) -> &StreamName {
        match self {
            TransportCall::Add(name) | TransportCall::Remove(name) => name,
        }
    }
}

/// In-process [`StreamTransport`] and [`FrameRenderer`].
pub struct LoopbackTransport {
    tx: broadcast::Sender<TrackEvent>,
    calls: Mutex<Vec<TransportCall>>,
    active: DashSet<StreamName>,
    failing_adds: DashSet<StreamName>,
    failing_removes: DashSet<StreamName>,
    fail_render: AtomicBool,
    render_count: AtomicU32,
    yields: usize,
}

impl LoopbackTransport {
    /// Create a transport with the default event capacity that completes
    /// every call without suspending
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create a transport whose event channel buffers `capacity` events
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));

        Self {
            tx,
            calls: Mutex::new(Vec::new()),
            active: DashSet::new(),
            failing_adds: DashSet::new(),
            failing_removes: DashSet::new(),
            fail_render: AtomicBool::new(false),
            render_count: AtomicU32::new(0),
            yields: 0,
        }
    }

    /// Suspend `yields` times inside every call before completing it.
    ///
    /// Lets other tasks interleave with in-flight calls without real delays.
    pub fn with_yields(mut self, yields: usize) -> Self {
        self.yields = yields;
        self
    }

    /// Deliver an event to every current subscriber.
    ///
    /// Returns the number of subscribers that received it.
    pub fn emit(&self, event: TrackEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Number of live track event subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Make `add(name)` fail (or succeed again)
    pub fn fail_add(&self, name: impl Into<StreamName>, should_fail: bool) {
        set_flag(&self.failing_adds, name.into(), should_fail);
    }

    /// Make `remove(name)` fail (or succeed again)
    pub fn fail_remove(&self, name: impl Into<StreamName>, should_fail: bool) {
        set_flag(&self.failing_removes, name.into(), should_fail);
    }

    /// Make every `render_frame` call fail (or succeed again)
    pub fn fail_render(&self, should_fail: bool) {
        self.fail_render.store(should_fail, Ordering::Relaxed);
    }

    /// Every recorded call, in the order the calls completed
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded calls that targeted `name`
    pub fn calls_for(&self, name: &str) -> Vec<TransportCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.name().as_str() == name)
            .collect()
    }

    /// Number of `add(name)` attempts, failed ones included
    pub fn add_count(&self, name: &str) -> usize {
        self.calls_for(name)
            .iter()
            .filter(|call| matches!(call, TransportCall::Add(_)))
            .count()
    }

    /// Number of `remove(name)` attempts, failed ones included
    pub fn remove_count(&self, name: &str) -> usize {
        self.calls_for(name)
            .iter()
            .filter(|call| matches!(call, TransportCall::Remove(_)))
            .count()
    }

    /// Whether `name` was successfully added and not yet removed
    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains(&StreamName::new(name))
    }

    /// Number of `render_frame` calls
    pub fn render_count(&self) -> u32 {
        self.render_count.load(Ordering::Relaxed)
    }

    /// Forget every recorded call
    pub fn clear_calls(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    async fn suspend(&self) {
        for _ in 0..self.yields {
            tokio::task::yield_now().await;
        }
    }

    fn record(&self, call: TransportCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn set_flag(set: &DashSet<StreamName>, name: StreamName, enabled: bool) {
    if enabled {
        set.insert(name);
    } else {
        set.remove(&name);
    }
}

#[async_trait]
impl StreamTransport for LoopbackTransport {
    async fn add(&self, name: &StreamName) -> Result<()> {
        self.suspend().await;
        self.record(TransportCall::Add(name.clone()));

        if self.failing_adds.contains(name) {
            tracing::debug!("Loopback add({}) failing by request", name);
            return Err(TransportError::AddFailed {
                name: name.clone(),
                reason: "injected failure".to_string(),
            });
        }

        tracing::trace!("Loopback add({})", name);
        self.active.insert(name.clone());
        Ok(())
    }

    async fn remove(&self, name: &StreamName) -> Result<()> {
        self.suspend().await;
        self.record(TransportCall::Remove(name.clone()));

        if self.failing_removes.contains(name) {
            tracing::debug!("Loopback remove({}) failing by request", name);
            return Err(TransportError::RemoveFailed {
                name: name.clone(),
                reason: "injected failure".to_string(),
            });
        }

        tracing::trace!("Loopback remove({})", name);
        self.active.remove(name);
        Ok(())
    }

    fn track_events(&self) -> broadcast::Receiver<TrackEvent> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl FrameRenderer for LoopbackTransport {
    async fn render_frame(&self, name: &StreamName, mime_type: &str) -> Result<Frame> {
        self.suspend().await;
        self.render_count.fetch_add(1, Ordering::Relaxed);

        if self.fail_render.load(Ordering::Relaxed) {
            return Err(TransportError::RenderFailed {
                name: name.clone(),
                reason: "injected failure".to_string(),
            });
        }

        let payload = format!("{}:{}", name, mime_type);
        Ok(Frame::new(mime_type, payload.into_bytes()))
    }
}
