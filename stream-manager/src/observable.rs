//! Single-writer, multi-reader value cells
//!
//! A handle owns an [`Observable`] for each value it publishes and is the only
//! code able to change it. Everyone else gets a [`Watcher`], which can read the
//! latest value or wait for the next change.

use tokio::sync::watch;

use crate::error::{Result, StreamError};

/// Writer side of an observable value
#[derive(Debug)]
pub struct Observable<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone> Observable<T> {
    /// Create a cell holding `initial`
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Get the current value
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Create a new reader of this cell
    pub fn watch(&self) -> Watcher<T> {
        Watcher {
            rx: self.tx.subscribe(),
        }
    }

    /// Replace the value, notifying every watcher
    pub(crate) fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Modify the value in place, notifying watchers and returning the new
    /// value
    pub(crate) fn update(&self, f: impl FnOnce(&mut T)) -> T {
        self.tx.send_modify(f);
        self.get()
    }
}

/// Reader side of an observable value
#[derive(Debug, Clone)]
pub struct Watcher<T> {
    rx: watch::Receiver<T>,
}

impl<T: Clone> Watcher<T> {
    /// Get the current value
    pub fn get(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Wait for the value to change and return the new value
    pub async fn changed(&mut self) -> Result<T> {
        self.rx
            .changed()
            .await
            .map_err(|_| StreamError::WatcherClosed)?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Wait until the value satisfies `predicate` and return it
    ///
    /// Returns immediately if the current value already matches.
    pub async fn wait_for(&mut self, mut predicate: impl FnMut(&T) -> bool) -> Result<T> {
        let value = self
            .rx
            .wait_for(|value| predicate(value))
            .await
            .map_err(|_| StreamError::WatcherClosed)?;
        Ok(value.clone())
    }
}
