//! Smart-pen feed boundary.
//!
//! The device interpreter runs outside the UI event cycle and pushes
//! completed strokes through a [`PenFeed`]. Exactly one subscriber may be
//! registered at a time; registration hands back a [`PenSubscription`] that
//! releases the slot when unsubscribed or dropped.

use crate::stroke::Stroke;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use thiserror::Error;

/// Pen feed errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PenFeedError {
    #[error("pen feed already has a subscriber")]
    AlreadySubscribed,
}

type StrokeCallback = Arc<dyn Fn(Stroke) + Send + Sync>;

struct Subscriber {
    token: u64,
    callback: StrokeCallback,
}

#[derive(Default)]
struct FeedSlot {
    subscriber: Option<Subscriber>,
}

fn lock(slot: &Mutex<FeedSlot>) -> MutexGuard<'_, FeedSlot> {
    // A panicking subscriber must not wedge the device thread.
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Registration point for the single stroke callback.
///
/// Clones share the same slot, so the device side can hold one clone and the
/// engine another. `emit` is safe to call from any thread.
#[derive(Clone, Default)]
pub struct PenFeed {
    slot: Arc<Mutex<FeedSlot>>,
    next_token: Arc<AtomicU64>,
}

impl std::fmt::Debug for PenFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PenFeed")
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

impl PenFeed {
    /// Create a feed with no subscriber.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the stroke callback.
    ///
    /// Fails if a subscription is already live. The callback runs on the
    /// emitting thread with the slot unlocked, so it may call back into the feed.
    pub fn subscribe<F>(&self, callback: F) -> Result<PenSubscription, PenFeedError>
    where
        F: Fn(Stroke) + Send + Sync + 'static,
    {
        let mut slot = lock(&self.slot);
        if slot.subscriber.is_some() {
            return Err(PenFeedError::AlreadySubscribed);
        }
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        slot.subscriber = Some(Subscriber {
            token,
            callback: Arc::new(callback),
        });
        log::debug!("pen feed subscriber {token} registered");
        Ok(PenSubscription {
            slot: Arc::downgrade(&self.slot),
            token,
        })
    }

    /// Deliver a stroke to the subscriber.
    ///
    /// Returns false if nobody is subscribed.
    pub fn emit(&self, stroke: Stroke) -> bool {
        let callback = lock(&self.slot)
            .subscriber
            .as_ref()
            .map(|subscriber| Arc::clone(&subscriber.callback));
        match callback {
            Some(callback) => {
                callback(stroke);
                true
            }
            None => {
                log::debug!("pen stroke {} emitted with no subscriber", stroke.id());
                false
            }
        }
    }

    pub fn is_subscribed(&self) -> bool {
        lock(&self.slot).subscriber.is_some()
    }
}

/// Handle for a live pen feed subscription.
///
/// Dropping the handle unsubscribes.
#[derive(Debug)]
pub struct PenSubscription {
    slot: Weak<Mutex<FeedSlot>>,
    token: u64,
}

impl PenSubscription {
    /// Release the callback slot.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }

    fn release(&self) {
        let Some(slot) = self.slot.upgrade() else {
            return;
        };
        let mut slot = lock(&slot);
        if slot.subscriber.as_ref().is_some_and(|s| s.token == self.token) {
            slot.subscriber = None;
            log::debug!("pen feed subscriber {} released", self.token);
        }
    }
}

impl Drop for PenSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Queue of pen strokes waiting to be appended on the UI thread.
///
/// Holds the subscription for as long as it lives.
#[derive(Debug)]
pub struct PenInbox {
    receiver: Receiver<Stroke>,
    _subscription: PenSubscription,
}

impl PenInbox {
    /// Subscribe to `feed`, forwarding every stroke into this inbox.
    pub fn connect(feed: &PenFeed) -> Result<Self, PenFeedError> {
        let (sender, receiver) = mpsc::channel();
        let subscription = feed.subscribe(move |stroke: Stroke| {
            if sender.send(stroke).is_err() {
                log::debug!("pen inbox closed, stroke dropped");
            }
        })?;
        Ok(Self {
            receiver,
            _subscription: subscription,
        })
    }

    /// Take every stroke received so far, in arrival order.
    pub fn drain(&self) -> Vec<Stroke> {
        let mut strokes = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(stroke) => strokes.push(stroke),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        strokes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::{SerializableColor, StrokePoint};
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    fn stroke() -> Stroke {
        Stroke::from_points(
            vec![StrokePoint::new(0.0, 0.0, 0.5, 0), StrokePoint::new(3.0, 4.0, 0.7, 8)],
            SerializableColor::black(),
            1.5,
        )
        .unwrap()
    }

    #[test]
    fn test_emit_without_subscriber() {
        let feed = PenFeed::new();
        assert!(!feed.is_subscribed());
        assert!(!feed.emit(stroke()));
    }

    #[test]
    fn test_subscribe_and_emit() {
        let feed = PenFeed::new();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let _subscription = feed
            .subscribe(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        assert!(feed.emit(stroke()));
        assert!(feed.emit(stroke()));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_callback_may_reenter_feed() {
        let feed = PenFeed::new();
        let inner = feed.clone();
        let forwarded = Arc::new(AtomicBool::new(false));
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let _subscription = feed
            .subscribe(move |stroke| {
                seen.fetch_add(1, Ordering::SeqCst);
                assert!(inner.is_subscribed());
                if !forwarded.swap(true, Ordering::SeqCst) {
                    assert!(inner.emit(stroke));
                }
            })
            .unwrap();

        assert!(feed.emit(stroke()));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_double_subscription_rejected() {
        let feed = PenFeed::new();
        let _first = feed.subscribe(|_| {}).unwrap();
        assert_eq!(feed.subscribe(|_| {}).unwrap_err(), PenFeedError::AlreadySubscribed);
    }

    #[test]
    fn test_drop_releases_slot() {
        let feed = PenFeed::new();
        let subscription = feed.subscribe(|_| {}).unwrap();
        assert!(feed.is_subscribed());

        drop(subscription);
        assert!(!feed.is_subscribed());
        assert!(feed.subscribe(|_| {}).is_ok());
    }

    #[test]
    fn test_unsubscribe() {
        let feed = PenFeed::new();
        feed.subscribe(|_| {}).unwrap().unsubscribe();
        assert!(!feed.is_subscribed());
    }

    #[test]
    fn test_stale_handle_keeps_new_subscriber() {
        let feed = PenFeed::new();
        let first = feed.subscribe(|_| {}).unwrap();
        // Simulate a slot that was taken over after the first handle lost it.
        lock(&feed.slot).subscriber = None;
        let _second = feed.subscribe(|_| {}).unwrap();

        drop(first);
        assert!(feed.is_subscribed());
    }

    #[test]
    fn test_inbox_preserves_arrival_order() {
        let feed = PenFeed::new();
        let inbox = PenInbox::connect(&feed).unwrap();
        let strokes: Vec<Stroke> = (0..3).map(|_| stroke()).collect();

        let device = feed.clone();
        let sent = strokes.clone();
        std::thread::spawn(move || {
            for s in sent {
                device.emit(s);
            }
        })
        .join()
        .unwrap();

        let ids: Vec<_> = inbox.drain().iter().map(Stroke::id).collect();
        let expected: Vec<_> = strokes.iter().map(Stroke::id).collect();
        assert_eq!(ids, expected);
        assert!(inbox.drain().is_empty());
    }

    #[test]
    fn test_inbox_drop_unsubscribes() {
        let feed = PenFeed::new();
        let inbox = PenInbox::connect(&feed).unwrap();
        assert!(PenInbox::connect(&feed).is_err());
        drop(inbox);
        assert!(!feed.is_subscribed());
    }
}
