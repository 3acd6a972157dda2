//! Registry of stream handles for one transport connection
//!
//! The registry lazily creates one [`StreamHandle`] per stream name and keeps
//! it for as long as the registry lives. Idle handles are never evicted: a
//! zero-refcount handle is simply closed and ready to be reused by the next
//! consumer.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use stream_transport::{FrameRenderer, StreamName, StreamTransport};
use tracing::{debug, info, warn};

use crate::callbacks::StreamCallbacks;
use crate::config::{ManagerConfig, RebindPolicy};
use crate::error::{BulkError, BulkOperation, Result, StreamError};
use crate::handle::StreamHandle;

/// Owner of every stream handle on one transport connection
///
/// # Example
///
/// ```rust,ignore
/// let registry = StreamRegistry::for_connection(transport)?;
///
/// let camera = registry.get_or_create("cam1", StreamCallbacks::new())?;
/// camera.add().await?;
///
/// // after a reconnect
/// registry.refresh_all().await?;
/// ```
pub struct StreamRegistry {
    transport: Arc<dyn StreamTransport>,
    renderer: Arc<dyn FrameRenderer>,
    config: Arc<ManagerConfig>,
    handles: DashMap<StreamName, StreamHandle>,
}

impl StreamRegistry {
    /// Create a registry with default configuration
    pub fn new(
        transport: Arc<dyn StreamTransport>,
        renderer: Arc<dyn FrameRenderer>,
    ) -> Result<Self> {
        Self::with_config(transport, renderer, ManagerConfig::default())
    }

    /// Create a registry with custom configuration
    pub fn with_config(
        transport: Arc<dyn StreamTransport>,
        renderer: Arc<dyn FrameRenderer>,
        config: ManagerConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            transport,
            renderer,
            config: Arc::new(config),
            handles: DashMap::new(),
        })
    }

    /// Create a registry for a connection that both carries streams and
    /// renders frames
    pub fn for_connection<C>(connection: Arc<C>) -> Result<Self>
    where
        C: StreamTransport + FrameRenderer + 'static,
    {
        Self::new(connection.clone(), connection)
    }

    /// Get the handle for `name`, creating it with `callbacks` if absent.
    ///
    /// Callbacks are bound once, when the handle is created. Supplying
    /// different callbacks for an existing handle is ignored or rejected
    /// according to the configured [`RebindPolicy`].
    pub fn get_or_create(
        &self,
        name: impl Into<StreamName>,
        callbacks: StreamCallbacks,
    ) -> Result<StreamHandle> {
        let name = name.into();

        let existing = match self.handles.entry(name.clone()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                debug!("Creating handle for stream {}", name);
                let handle = self.create_handle(name, callbacks);
                entry.insert(handle.clone());
                return Ok(handle);
            }
        };

        self.check_rebind(&existing, &callbacks)?;
        Ok(existing)
    }

    /// Get the handle for `name` without binding callbacks, creating it if
    /// absent
    pub fn stream(&self, name: impl Into<StreamName>) -> StreamHandle {
        let name = name.into();
        self.handles
            .entry(name.clone())
            .or_insert_with(|| {
                debug!("Creating handle for stream {}", name);
                self.create_handle(name.clone(), StreamCallbacks::new())
            })
            .clone()
    }

    /// Get the handle for `name` if one was ever created
    pub fn get(&self, name: &str) -> Option<StreamHandle> {
        self.handles
            .get(&StreamName::new(name))
            .map(|entry| entry.value().clone())
    }

    /// Re-run the open sequence on every stream with consumers.
    ///
    /// Streams are reopened concurrently and every one of them is attempted;
    /// failures are collected into a single [`StreamError::Bulk`].
    pub async fn refresh_all(&self) -> Result<()> {
        self.run_bulk(BulkOperation::Refresh).await
    }

    /// Run the close sequence on every stream with consumers, keeping their
    /// refcounts.
    ///
    /// Same failure handling as [`refresh_all`](Self::refresh_all).
    pub async fn stop_all(&self) -> Result<()> {
        self.run_bulk(BulkOperation::Stop).await
    }

    /// Names of every stream with a handle, sorted
    pub fn names(&self) -> Vec<StreamName> {
        let mut names: Vec<StreamName> = self.handles.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Refcount of every stream that currently has consumers
    pub fn active_streams(&self) -> HashMap<StreamName, usize> {
        self.handles
            .iter()
            .filter_map(|entry| {
                let count = entry.value().refcount();
                (count > 0).then(|| (entry.key().clone(), count))
            })
            .collect()
    }

    /// Number of handles created so far
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether no handle was created yet
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// The transport this registry drives
    pub fn transport(&self) -> &Arc<dyn StreamTransport> {
        &self.transport
    }

    /// The configuration shared by every handle
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    fn create_handle(&self, name: StreamName, callbacks: StreamCallbacks) -> StreamHandle {
        StreamHandle::new(
            name,
            Arc::clone(&self.transport),
            Arc::clone(&self.renderer),
            callbacks,
            Arc::clone(&self.config),
        )
    }

    fn check_rebind(&self, handle: &StreamHandle, callbacks: &StreamCallbacks) -> Result<()> {
        if callbacks.is_empty() || handle.callbacks().same_as(callbacks) {
            return Ok(());
        }

        match self.config.rebind_policy {
            RebindPolicy::Ignore => {
                debug!(
                    "Stream {} already has callbacks bound; ignoring new ones",
                    handle.name()
                );
                Ok(())
            }
            RebindPolicy::Reject => Err(StreamError::CallbacksAlreadyBound {
                name: handle.name().clone(),
            }),
        }
    }

    /// Handles with consumers. Collected up front so no map guard is held
    /// across an await.
    fn active_handles(&self) -> Vec<StreamHandle> {
        self.handles
            .iter()
            .filter(|entry| entry.value().refcount() > 0)
            .map(|entry| entry.value().clone())
            .collect()
    }

    async fn run_bulk(&self, operation: BulkOperation) -> Result<()> {
        let handles = self.active_handles();
        info!(
            "Running {} across {} active stream(s)",
            operation,
            handles.len()
        );

        let results = join_all(handles.iter().map(|handle| async move {
            let result = match operation {
                BulkOperation::Refresh => handle.refresh().await,
                BulkOperation::Stop => handle.stop().await,
            };
            result.map_err(|error| (handle.name().clone(), error))
        }))
        .await;

        let failures: Vec<(StreamName, StreamError)> =
            results.into_iter().filter_map(|r| r.err()).collect();

        if failures.is_empty() {
            return Ok(());
        }

        warn!(
            "{} failed for {} of {} stream(s)",
            operation,
            failures.len(),
            handles.len()
        );
        Err(StreamError::Bulk(BulkError {
            operation,
            failures,
        }))
    }
}

impl Drop for StreamRegistry {
    fn drop(&mut self) {
        debug!(
            "StreamRegistry dropping, {} active stream(s)",
            self.active_streams().len()
        );
    }
}
