//! One-shot events for the display layer.
//!
//! An event is an observable optional value. The producer sets it when the
//! event happens; only an explicit acknowledgment clears it. Subscribing again
//! (a display that was torn down and rebuilt) therefore still sees a pending
//! event exactly once, and never sees it again after it was acknowledged.

use std::sync::Arc;

use tokio::sync::watch;

pub struct OneShot<T> {
    tx: watch::Sender<Option<T>>,
}

impl<T: Clone> Default for OneShot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> OneShot<T> {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Marks the event pending, replacing any unacknowledged value.
    pub fn fire(&self, value: T) {
        self.tx.send_replace(Some(value));
    }

    /// Consumes the pending event. Returns `false` when nothing was pending.
    pub fn acknowledge(&self) -> bool {
        self.tx.send_if_modified(|pending| pending.take().is_some())
    }

    pub fn pending(&self) -> Option<T> {
        self.tx.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn subscribe(&self) -> EventReceiver<T> {
        EventReceiver {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observer side of a [`OneShot`].
#[derive(Clone)]
pub struct EventReceiver<T> {
    rx: watch::Receiver<Option<T>>,
}

impl<T: Clone> EventReceiver<T> {
    /// Waits until an event is pending and returns it without consuming it.
    ///
    /// Returns `None` once the producer is gone.
    pub async fn next(&mut self) -> Option<T> {
        match self.rx.wait_for(Option::is_some).await {
            Ok(pending) => pending.clone(),
            Err(_) => None,
        }
    }

    pub fn peek(&self) -> Option<T> {
        self.rx.borrow().clone()
    }
}
