//! Event pipeline between platform callbacks and the reactor.
//!
//! Producers may live on any thread; each queued event carries the span that
//! was current when it was sent. The queue is bounded: when it is full the
//! newest event is dropped and counted rather than blocking the producer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver as RawReceiver, Sender as RawSender, TryRecvError, TrySendError};
use tracing::{Span, warn};

pub mod reactor;

type Waker = Arc<dyn Fn() + Send + Sync>;

pub struct Sender<Event> {
    tx: RawSender<(Span, Event)>,
    dropped: Arc<AtomicU64>,
    waker: Option<Waker>,
}

pub struct Receiver<Event> {
    rx: RawReceiver<(Span, Event)>,
    dropped: Arc<AtomicU64>,
}

pub fn channel<Event>(capacity: usize) -> (Sender<Event>, Receiver<Event>) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        Sender {
            tx,
            dropped: dropped.clone(),
            waker: None,
        },
        Receiver { rx, dropped },
    )
}

impl<Event> Sender<Event> {
    /// Called after every successful send, e.g. to poke a run loop.
    pub fn with_waker(mut self, waker: impl Fn() + Send + Sync + 'static) -> Self {
        self.waker = Some(Arc::new(waker));
        self
    }

    /// Queues `event`, returning false if it was dropped.
    pub fn send(&self, event: Event) -> bool {
        match self.tx.try_send((Span::current(), event)) {
            Ok(()) => {
                if let Some(waker) = &self.waker {
                    waker();
                }
                true
            }
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(dropped, "event queue full, dropping newest event");
                false
            }
            // The reactor is gone; the process is shutting down.
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn dropped(&self) -> u64 { self.dropped.load(Ordering::Relaxed) }
}

impl<Event> Clone for Sender<Event> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            dropped: self.dropped.clone(),
            waker: self.waker.clone(),
        }
    }
}

impl<Event> Receiver<Event> {
    pub fn try_recv(&self) -> Option<(Span, Event)> {
        match self.rx.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Blocks until an event arrives. `None` once every sender is gone.
    pub fn recv(&self) -> Option<(Span, Event)> { self.rx.recv().ok() }

    pub fn len(&self) -> usize { self.rx.len() }

    pub fn is_empty(&self) -> bool { self.rx.is_empty() }

    pub fn dropped(&self) -> u64 { self.dropped.load(Ordering::Relaxed) }
}

static_assertions::assert_impl_all!(Sender<u32>: Send, Sync, Clone);
