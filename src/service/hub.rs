//! Fan-out of the process-wide progress state to every open `/progress` stream.

use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use log::{debug, error};

use crate::models::progress::ProgressState;

pub type ProgressSender = UnboundedSender<Bytes>;

pub type SubscriberId = u64;

struct HubInner {
    state: ProgressState,
    subscribers: Vec<(SubscriberId, ProgressSender)>,
    next_id: SubscriberId,
}

pub struct ProgressHub {
    inner: Mutex<HubInner>,
}

impl Default for ProgressHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressHub {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HubInner {
                state: ProgressState::default(),
                subscribers: Vec::new(),
                next_id: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the shared state and push it to every subscriber.
    pub fn publish(&self, step: &str, percent: u8) {
        let mut inner = self.lock();
        inner.state = ProgressState::new(step, percent);
        Self::broadcast(&mut inner);
    }

    /// Publish `percent` under whichever step label is current.
    pub fn update_percent(&self, percent: u8) {
        let mut inner = self.lock();
        inner.state.percent = percent.min(100);
        Self::broadcast(&mut inner);
    }

    fn broadcast(inner: &mut HubInner) {
        let frame = match inner.state.to_event_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode progress event: {}", e);
                return;
            }
        };

        // Unbounded sends never wait; a send error means the stream was dropped.
        inner.subscribers.retain(|(id, tx)| match tx.unbounded_send(frame.clone()) {
            Ok(()) => true,
            Err(_) => {
                debug!("Dropping closed progress subscriber {}", id);
                false
            }
        });
    }

    /// Register a subscriber. The current state is queued as its first event.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (tx, rx) = unbounded();
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;

        match inner.state.to_event_frame() {
            Ok(frame) => {
                let _ = tx.unbounded_send(frame);
            }
            Err(e) => error!("Failed to encode progress event: {}", e),
        }
        inner.subscribers.push((id, tx));
        debug!("Progress subscriber {} connected ({} open)", id, inner.subscribers.len());

        Subscription {
            id,
            rx,
            hub: Arc::clone(self),
        }
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut inner = self.lock();
        inner.subscribers.retain(|(sid, _)| *sid != id);
        debug!("Progress subscriber {} disconnected ({} open)", id, inner.subscribers.len());
    }

    pub fn current(&self) -> ProgressState {
        self.lock().state.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }
}

/// Receiving end of one subscriber. Dropping it unsubscribes.
pub struct Subscription {
    id: SubscriberId,
    rx: UnboundedReceiver<Bytes>,
    hub: Arc<ProgressHub>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

impl Stream for Subscription {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        Pin::new(&mut self.rx).poll_next(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}
