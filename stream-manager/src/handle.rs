//! Reference-counted handle for one named stream
//!
//! A [`StreamHandle`] turns uncoordinated `add`/`remove` calls from many
//! consumers into a single, well-ordered open/close sequence on the
//! transport:
//!
//! ```text
//!            add (0 -> 1): open sequence
//!   Closed ─────────────────────────────► Open ──┐ add / remove (n > 1)
//!     ▲                                    │  ◄───┘ count only
//!     └────────────────────────────────────┘
//!            remove (1 -> 0): close sequence
//! ```
//!
//! Every operation on a handle takes the handle's lifecycle lock before it
//! reads the refcount and keeps it until its transport call has completed,
//! so operations on one handle are applied strictly in the order they were
//! issued even though each of them may suspend.
//!
//! Open and close sequences run on their own task, which owns the lock guard.
//! A caller that drops its `add`/`remove` future gives up the result only;
//! the transport call still completes and the handle state stays consistent.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use stream_transport::{FrameRenderer, MediaStream, StreamName, StreamTransport, TrackEvent};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::callbacks::{FrameSink, StreamCallbacks};
use crate::config::ManagerConfig;
use crate::error::{Result, StreamError};
use crate::observable::{Observable, Watcher};

/// Where a handle stands relative to the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// No demand; the transport has no add outstanding
    Closed,
    /// Demand exists and the open sequence has been run
    Open,
    /// Demand exists but the stream was stopped by `stop()`
    Suspended,
}

/// Run a lifecycle sequence on its own task and wait for it.
///
/// The task is spawned before this returns, so dropping the returned future
/// detaches from the sequence without cancelling it.
fn detach<F>(sequence: F) -> impl Future<Output = Result<()>>
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    let task = tokio::spawn(sequence);
    async move {
        match task.await {
            Ok(result) => result,
            Err(join_error) if join_error.is_panic() => {
                std::panic::resume_unwind(join_error.into_panic())
            }
            Err(join_error) => Err(StreamError::SequenceAborted(join_error.to_string())),
        }
    }
}

/// State guarded by the lifecycle lock
struct Lifecycle {
    phase: StreamPhase,
    listener: Option<TrackListener>,
}

/// Live subscription to the transport's track events, filtered to one name.
///
/// Dropping it disables event handling and cancels the listening task.
struct TrackListener {
    live: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl TrackListener {
    fn spawn(handle: Weak<HandleInner>, events: broadcast::Receiver<TrackEvent>) -> Self {
        let live = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(listen(handle, Arc::clone(&live), events));
        Self { live, task }
    }
}

impl Drop for TrackListener {
    fn drop(&mut self) {
        self.live.store(false, Ordering::Release);
        self.task.abort();
    }
}

async fn listen(
    handle: Weak<HandleInner>,
    live: Arc<AtomicBool>,
    mut events: broadcast::Receiver<TrackEvent>,
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Track listener lagged, {} event(s) skipped", skipped);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("Track event channel closed, listener exiting");
                break;
            }
        };

        if !live.load(Ordering::Acquire) {
            break;
        }

        let Some(inner) = handle.upgrade() else {
            break;
        };

        if let Err(error) = inner.dispatch(&event) {
            error!("Stream {}: {}; dropping subscription", inner.name, error);
            inner.fault.set(Some(Arc::new(error)));
            break;
        }
    }
}

struct HandleInner {
    name: StreamName,
    transport: Arc<dyn StreamTransport>,
    renderer: Arc<dyn FrameRenderer>,
    callbacks: StreamCallbacks,
    config: Arc<ManagerConfig>,
    refcount: Observable<usize>,
    current: Observable<Option<MediaStream>>,
    fault: Observable<Option<Arc<StreamError>>>,
    lifecycle: Arc<Mutex<Lifecycle>>,
}

impl HandleInner {
    /// Route one track event. Runs synchronously inside the listener.
    ///
    /// Returns whether the event was for this stream.
    fn dispatch(&self, event: &TrackEvent) -> Result<bool> {
        let stream = event
            .first_stream()
            .ok_or_else(|| StreamError::EmptyTrackEvent {
                name: self.name.clone(),
            })?;

        // The channel is shared by every stream on the transport
        if stream.id != self.name {
            trace!("Stream {}: ignoring event for {}", self.name, stream.id);
            return Ok(false);
        }

        self.current.set(Some(stream.clone()));
        self.callbacks.fire_open(&self.name);
        Ok(true)
    }

    async fn open_sequence(self: &Arc<Self>, lifecycle: &mut Lifecycle) -> Result<()> {
        lifecycle.listener = None;
        lifecycle.phase = StreamPhase::Open;

        // Subscribe before adding so events racing the add's completion are kept
        let events = self.transport.track_events();

        info!("Opening stream {}", self.name);
        self.transport
            .add(&self.name)
            .await
            .map_err(|e| StreamError::transport(&self.name, e))?;

        self.fault.set(None);
        lifecycle.listener = Some(TrackListener::spawn(Arc::downgrade(self), events));
        Ok(())
    }

    async fn close_sequence(&self, lifecycle: &mut Lifecycle, next: StreamPhase) -> Result<()> {
        lifecycle.listener = None;

        info!("Closing stream {}", self.name);
        let removed = self.transport.remove(&self.name).await;
        if next == StreamPhase::Closed {
            // With no consumers left the handle is closed either way
            lifecycle.phase = StreamPhase::Closed;
        }
        removed.map_err(|e| StreamError::transport(&self.name, e))?;

        // A failed stop stays Open so a retry or the last remove closes it
        lifecycle.phase = next;
        self.callbacks.fire_close(&self.name);
        Ok(())
    }
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        let refcount = self.refcount.get();
        if refcount > 0 {
            debug!(
                "Handle for stream {} dropped with {} consumer(s) outstanding",
                self.name, refcount
            );
        }
    }
}

/// Shared handle to one named stream
///
/// Handles are cheap to clone; every clone refers to the same refcount,
/// media cell and transport subscription. Operations must be driven from a
/// tokio runtime since opening a stream spawns its event listener.
#[derive(Clone)]
pub struct StreamHandle {
    inner: Arc<HandleInner>,
}

impl StreamHandle {
    pub(crate) fn new(
        name: StreamName,
        transport: Arc<dyn StreamTransport>,
        renderer: Arc<dyn FrameRenderer>,
        callbacks: StreamCallbacks,
        config: Arc<ManagerConfig>,
    ) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                name,
                transport,
                renderer,
                callbacks,
                config,
                refcount: Observable::new(0),
                current: Observable::new(None),
                fault: Observable::new(None),
                lifecycle: Arc::new(Mutex::new(Lifecycle {
                    phase: StreamPhase::Closed,
                    listener: None,
                })),
            }),
        }
    }

    /// Register one more consumer of this stream.
    ///
    /// The first consumer opens the stream: the transport is asked to add it
    /// and the handle starts listening for its media. A transport failure is
    /// returned to this caller, but the consumer stays counted.
    ///
    /// Dropping the returned future does not cancel a transport call that has
    /// already started.
    pub async fn add(&self) -> Result<()> {
        let mut lifecycle = Arc::clone(&self.inner.lifecycle).lock_owned().await;
        let count = self.inner.refcount.update(|count| *count += 1);
        debug!(
            "Stream {} refcount: {} -> {}",
            self.inner.name,
            count - 1,
            count
        );

        if count > 1 {
            return Ok(());
        }

        let inner = Arc::clone(&self.inner);
        detach(async move { inner.open_sequence(&mut lifecycle).await }).await
    }

    /// Release one consumer of this stream.
    ///
    /// The last consumer closes the stream. Releasing a stream nobody holds
    /// is a no-op.
    pub async fn remove(&self) -> Result<()> {
        let mut lifecycle = Arc::clone(&self.inner.lifecycle).lock_owned().await;

        if self.inner.refcount.get() == 0 {
            if self.inner.config.warn_on_unbalanced_remove {
                warn!(
                    "Attempted to remove stream {} but no consumers hold it",
                    self.inner.name
                );
            }
            return Ok(());
        }

        let count = self.inner.refcount.update(|count| *count -= 1);
        debug!(
            "Stream {} refcount: {} -> {}",
            self.inner.name,
            count + 1,
            count
        );

        if count > 0 {
            return Ok(());
        }

        if lifecycle.phase == StreamPhase::Suspended {
            // stop() already removed it from the transport
            debug!("Stream {} was already stopped", self.inner.name);
            lifecycle.phase = StreamPhase::Closed;
            return Ok(());
        }

        let inner = Arc::clone(&self.inner);
        detach(async move {
            inner
                .close_sequence(&mut lifecycle, StreamPhase::Closed)
                .await
        })
        .await
    }

    /// Re-run the open sequence if the stream has consumers.
    ///
    /// Used after the transport reconnects. The refcount is left untouched
    /// and any previous subscription is replaced.
    pub async fn refresh(&self) -> Result<()> {
        let mut lifecycle = Arc::clone(&self.inner.lifecycle).lock_owned().await;
        if self.inner.refcount.get() == 0 {
            return Ok(());
        }

        let inner = Arc::clone(&self.inner);
        detach(async move { inner.open_sequence(&mut lifecycle).await }).await
    }

    /// Run the close sequence if the stream has consumers, keeping them
    /// counted.
    ///
    /// The handle stays suspended until `refresh()` reopens it or the last
    /// consumer leaves. If the transport refuses the remove, the handle stays
    /// open so the stop can be retried.
    pub async fn stop(&self) -> Result<()> {
        let mut lifecycle = Arc::clone(&self.inner.lifecycle).lock_owned().await;
        if self.inner.refcount.get() == 0 || lifecycle.phase == StreamPhase::Suspended {
            return Ok(());
        }

        let inner = Arc::clone(&self.inner);
        detach(async move {
            inner
                .close_sequence(&mut lifecycle, StreamPhase::Suspended)
                .await
        })
        .await
    }

    /// Render one still frame and hand it to `sink`.
    ///
    /// Works whether or not the stream is open.
    pub async fn set_src<S>(&self, sink: &S) -> Result<()>
    where
        S: FrameSink + ?Sized,
    {
        let frame = self
            .inner
            .renderer
            .render_frame(&self.inner.name, &self.inner.config.frame_mime_type)
            .await
            .map_err(|e| StreamError::transport(&self.inner.name, e))?;

        trace!(
            "Stream {}: rendered {} byte {} frame",
            self.inner.name,
            frame.len(),
            frame.mime_type
        );
        sink.set_frame(frame);
        Ok(())
    }

    /// Name of the stream
    pub fn name(&self) -> &StreamName {
        &self.inner.name
    }

    /// Current number of consumers
    pub fn refcount(&self) -> usize {
        self.inner.refcount.get()
    }

    /// Watch the number of consumers
    pub fn watch_refcount(&self) -> Watcher<usize> {
        self.inner.refcount.watch()
    }

    /// Most recently received media, or `None` before any arrived
    pub fn current(&self) -> Option<MediaStream> {
        self.inner.current.get()
    }

    /// Watch the received media
    pub fn watch_current(&self) -> Watcher<Option<MediaStream>> {
        self.inner.current.watch()
    }

    /// Protocol violation that ended the current subscription, if any
    pub fn fault(&self) -> Option<Arc<StreamError>> {
        self.inner.fault.get()
    }

    /// Watch for protocol violations
    pub fn watch_fault(&self) -> Watcher<Option<Arc<StreamError>>> {
        self.inner.fault.watch()
    }

    /// Where the handle stands relative to the transport.
    ///
    /// Waits for any in-flight operation on this handle to finish.
    pub async fn phase(&self) -> StreamPhase {
        self.inner.lifecycle.lock().await.phase
    }

    pub(crate) fn callbacks(&self) -> &StreamCallbacks {
        &self.inner.callbacks
    }

    /// Whether two handles refer to the same stream instance
    pub fn ptr_eq(a: &StreamHandle, b: &StreamHandle) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("name", &self.inner.name)
            .field("refcount", &self.inner.refcount.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use stream_transport::{LoopbackTransport, TransportCall};

    use crate::callbacks::FrameSlot;

    fn handle_on(transport: &Arc<LoopbackTransport>, name: &str) -> StreamHandle {
        handle_with(transport, name, StreamCallbacks::new())
    }

    fn handle_with(
        transport: &Arc<LoopbackTransport>,
        name: &str,
        callbacks: StreamCallbacks,
    ) -> StreamHandle {
        StreamHandle::new(
            StreamName::new(name),
            transport.clone(),
            transport.clone(),
            callbacks,
            Arc::new(ManagerConfig::default()),
        )
    }

    fn media(name: &str, track: &str) -> MediaStream {
        MediaStream::new(name, vec![track.to_string()])
    }

    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_add_remove_runs_one_open_and_one_close() {
        let transport = Arc::new(LoopbackTransport::new());
        let handle = handle_on(&transport, "cam1");

        handle.add().await.unwrap();
        handle.add().await.unwrap();
        assert_eq!(handle.refcount(), 2);
        handle.remove().await.unwrap();
        assert_eq!(transport.remove_count("cam1"), 0);
        handle.remove().await.unwrap();

        assert_eq!(handle.refcount(), 0);
        let name = StreamName::new("cam1");
        assert_eq!(
            transport.calls(),
            vec![TransportCall::Add(name.clone()), TransportCall::Remove(name)]
        );
        assert_eq!(handle.phase().await, StreamPhase::Closed);
    }

    #[tokio::test]
    async fn test_concurrent_adds_open_once() {
        let transport = Arc::new(LoopbackTransport::new().with_yields(4));
        let handle = handle_on(&transport, "cam1");

        let (first, second) = tokio::join!(handle.add(), handle.add());
        first.unwrap();
        second.unwrap();

        assert_eq!(transport.add_count("cam1"), 1);
        assert_eq!(handle.refcount(), 2);
    }

    #[tokio::test]
    async fn test_remove_waits_for_in_flight_add() {
        let transport = Arc::new(LoopbackTransport::new().with_yields(8));
        let handle = handle_on(&transport, "cam1");

        let (added, removed) = tokio::join!(handle.add(), handle.remove());
        added.unwrap();
        removed.unwrap();

        let name = StreamName::new("cam1");
        assert_eq!(
            transport.calls(),
            vec![TransportCall::Add(name.clone()), TransportCall::Remove(name)]
        );
        assert_eq!(handle.refcount(), 0);
    }

    #[tokio::test]
    async fn test_dropped_add_still_opens() {
        let transport = Arc::new(LoopbackTransport::new().with_yields(4));
        let handle = handle_on(&transport, "cam1");

        let mut adding = Box::pin(handle.add());
        assert!(futures::poll!(adding.as_mut()).is_pending());
        drop(adding);

        handle.add().await.unwrap();
        assert_eq!(handle.refcount(), 2);
        assert_eq!(transport.add_count("cam1"), 1);
        assert!(transport.is_active("cam1"));
        assert_eq!(transport.subscriber_count(), 1);
        assert_eq!(handle.phase().await, StreamPhase::Open);
    }

    #[tokio::test]
    async fn test_dropped_remove_still_closes() {
        let transport = Arc::new(LoopbackTransport::new().with_yields(4));
        let handle = handle_on(&transport, "cam1");
        handle.add().await.unwrap();

        let mut removing = Box::pin(handle.remove());
        assert!(futures::poll!(removing.as_mut()).is_pending());
        drop(removing);

        // phase() queues behind the detached close sequence
        assert_eq!(handle.phase().await, StreamPhase::Closed);
        assert_eq!(handle.refcount(), 0);
        assert_eq!(transport.remove_count("cam1"), 1);
        assert!(!transport.is_active("cam1"));
    }

    #[tokio::test]
    async fn test_remove_at_zero_is_noop() {
        let transport = Arc::new(LoopbackTransport::new());
        let handle = handle_on(&transport, "cam1");

        handle.remove().await.unwrap();
        assert_eq!(handle.refcount(), 0);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_add_keeps_demand() {
        let transport = Arc::new(LoopbackTransport::new());
        transport.fail_add("cam1", true);
        let handle = handle_on(&transport, "cam1");

        let error = handle.add().await.unwrap_err();
        assert!(matches!(error, StreamError::Transport { .. }));
        assert_eq!(handle.refcount(), 1);
        assert_eq!(transport.subscriber_count(), 0);

        // Later consumers only count; nothing retries behind their back
        handle.add().await.unwrap();
        assert_eq!(handle.refcount(), 2);
        assert_eq!(transport.add_count("cam1"), 1);
    }

    #[tokio::test]
    async fn test_matching_event_updates_current_and_fires_on_open() {
        let transport = Arc::new(LoopbackTransport::new());
        let opened = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&opened);
        let handle = handle_with(
            &transport,
            "cam1",
            StreamCallbacks::new().on_open(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        handle.add().await.unwrap();
        transport.emit(TrackEvent::single(media("cam1", "video0")));

        let mut current = handle.watch_current();
        let stream = current.wait_for(Option::is_some).await.unwrap().unwrap();
        assert_eq!(stream, media("cam1", "video0"));
        assert_eq!(opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_event_for_other_stream_is_ignored() {
        let transport = Arc::new(LoopbackTransport::new());
        let right = handle_on(&transport, "cam-right");
        right.add().await.unwrap();

        transport.emit(TrackEvent::single(media("cam-left", "left0")));
        transport.emit(TrackEvent::single(media("cam-right", "right0")));

        let mut current = right.watch_current();
        let stream = current.wait_for(Option::is_some).await.unwrap().unwrap();
        assert_eq!(stream, media("cam-right", "right0"));

        transport.emit(TrackEvent::single(media("cam-left", "left1")));
        settle().await;
        assert_eq!(right.current(), Some(media("cam-right", "right0")));
    }

    #[tokio::test]
    async fn test_empty_event_is_a_fault() {
        let transport = Arc::new(LoopbackTransport::new());
        let handle = handle_on(&transport, "cam1");
        handle.add().await.unwrap();

        transport.emit(TrackEvent::new(Vec::new()));

        let mut fault = handle.watch_fault();
        let error = fault.wait_for(Option::is_some).await.unwrap().unwrap();
        assert!(error.is_protocol_violation());
        assert!(handle.current().is_none());

        // The subscription is gone; later media is not applied
        transport.emit(TrackEvent::single(media("cam1", "video0")));
        settle().await;
        assert!(handle.current().is_none());

        // Refreshing resubscribes and clears the fault
        handle.refresh().await.unwrap();
        assert!(handle.fault().is_none());
        transport.emit(TrackEvent::single(media("cam1", "video1")));
        let mut current = handle.watch_current();
        let stream = current.wait_for(Option::is_some).await.unwrap().unwrap();
        assert_eq!(stream, media("cam1", "video1"));
    }

    #[test]
    fn test_dispatch_rejects_empty_event_without_touching_current() {
        let transport = Arc::new(LoopbackTransport::new());
        let handle = handle_on(&transport, "cam1");

        let result = handle.inner.dispatch(&TrackEvent::new(Vec::new()));
        assert!(matches!(result, Err(StreamError::EmptyTrackEvent { .. })));
        assert!(handle.current().is_none());

        assert!(!handle
            .inner
            .dispatch(&TrackEvent::single(media("other", "t")))
            .unwrap());
        assert!(handle
            .inner
            .dispatch(&TrackEvent::single(media("cam1", "t")))
            .unwrap());
        assert_eq!(handle.current(), Some(media("cam1", "t")));
    }

    #[test]
    fn test_trackless_media_is_still_media() {
        let transport = Arc::new(LoopbackTransport::new());
        let handle = handle_on(&transport, "cam1");
        assert!(handle.current().is_none());

        let bare = MediaStream::new("cam1", Vec::new());
        assert!(handle.inner.dispatch(&TrackEvent::single(bare.clone())).unwrap());
        assert_eq!(handle.current(), Some(bare));
    }

    #[tokio::test]
    async fn test_events_after_close_are_stale() {
        let transport = Arc::new(LoopbackTransport::new());
        let closed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&closed);
        let handle = handle_with(
            &transport,
            "cam1",
            StreamCallbacks::new().on_close(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        handle.add().await.unwrap();
        handle.remove().await.unwrap();
        assert_eq!(closed.load(Ordering::SeqCst), 1);

        transport.emit(TrackEvent::single(media("cam1", "late")));
        settle().await;
        assert!(handle.current().is_none());
        assert_eq!(transport.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_remove_still_closes_handle() {
        let transport = Arc::new(LoopbackTransport::new());
        let handle = handle_on(&transport, "cam1");
        handle.add().await.unwrap();

        transport.fail_remove("cam1", true);
        assert!(handle.remove().await.is_err());
        assert_eq!(handle.refcount(), 0);
        assert_eq!(handle.phase().await, StreamPhase::Closed);
    }

    #[tokio::test]
    async fn test_stop_suspends_without_touching_refcount() {
        let transport = Arc::new(LoopbackTransport::new());
        let handle = handle_on(&transport, "cam1");
        handle.add().await.unwrap();
        handle.add().await.unwrap();

        handle.stop().await.unwrap();
        assert_eq!(handle.refcount(), 2);
        assert_eq!(handle.phase().await, StreamPhase::Suspended);
        assert!(!transport.is_active("cam1"));

        // Stopping twice does not remove twice
        handle.stop().await.unwrap();
        assert_eq!(transport.remove_count("cam1"), 1);

        handle.refresh().await.unwrap();
        assert_eq!(handle.phase().await, StreamPhase::Open);
        assert!(transport.is_active("cam1"));
        assert_eq!(transport.add_count("cam1"), 2);
    }

    #[tokio::test]
    async fn test_failed_stop_leaves_handle_open() {
        let transport = Arc::new(LoopbackTransport::new());
        let handle = handle_on(&transport, "cam1");
        handle.add().await.unwrap();

        transport.fail_remove("cam1", true);
        assert!(handle.stop().await.is_err());
        assert_eq!(handle.phase().await, StreamPhase::Open);
        assert!(transport.is_active("cam1"));

        transport.fail_remove("cam1", false);
        handle.stop().await.unwrap();
        assert_eq!(transport.remove_count("cam1"), 2);
        assert_eq!(handle.phase().await, StreamPhase::Suspended);
        assert!(!transport.is_active("cam1"));
    }

    #[tokio::test]
    async fn test_last_remove_after_stop_skips_transport() {
        let transport = Arc::new(LoopbackTransport::new());
        let handle = handle_on(&transport, "cam1");
        handle.add().await.unwrap();
        handle.stop().await.unwrap();

        handle.remove().await.unwrap();
        assert_eq!(transport.remove_count("cam1"), 1);
        assert_eq!(handle.phase().await, StreamPhase::Closed);
    }

    #[tokio::test]
    async fn test_refresh_and_stop_are_noops_without_consumers() {
        let transport = Arc::new(LoopbackTransport::new());
        let handle = handle_on(&transport, "cam1");

        handle.refresh().await.unwrap();
        handle.stop().await.unwrap();
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_set_src_independent_of_open_state() {
        let transport = Arc::new(LoopbackTransport::new());
        let handle = handle_on(&transport, "cam1");
        let slot = FrameSlot::new();

        handle.set_src(&slot).await.unwrap();
        let frame = slot.get().unwrap();
        assert_eq!(frame.mime_type, "image/jpeg");
        assert_eq!(&frame.data[..], b"cam1:image/jpeg");
        assert_eq!(handle.refcount(), 0);
        assert!(transport.calls().is_empty());

        transport.fail_render(true);
        assert!(handle.set_src(&slot).await.is_err());
        assert_eq!(transport.render_count(), 2);
    }

    #[tokio::test]
    async fn test_refcount_watcher() {
        let transport = Arc::new(LoopbackTransport::new());
        let handle = handle_on(&transport, "cam1");
        let mut refcount = handle.watch_refcount();

        handle.add().await.unwrap();
        assert_eq!(refcount.changed().await.unwrap(), 1);
        handle.remove().await.unwrap();
        assert_eq!(refcount.changed().await.unwrap(), 0);
    }
}
