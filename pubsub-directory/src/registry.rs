//! The type-erased seam between this crate's directories and `pubsub`'s
//! generic `Publisher<T>`/`Subscriber<T>`. A directory never needs to know
//! `T`; it only ever needs to update a subscriber address map or hand a raw
//! payload to something that knows how to deserialize and buffer it.

use bytes::Bytes;
use pubsub_common::{SubscriberInfo, TopicName, WorkerAddress};
use std::sync::{Arc, Weak};

/// The worker-side view of a local `Publisher`, as seen by `WorkerDirectory`.
pub trait AnyPublisher: Send + Sync {
    fn name(&self) -> &TopicName;
    fn set_subscriber(&self, address: WorkerAddress, info: SubscriberInfo);
    fn remove_subscriber(&self, address: &WorkerAddress);
    fn set_publish_to_scheduler(&self, publish: bool);
}

/// The worker/client-side view of a local `Subscriber`.
pub trait AnySubscriber: Send + Sync {
    fn name(&self) -> &TopicName;
    /// Deliver one raw payload. Deserialization failures are the
    /// subscriber's concern to log and drop; this never fails the caller.
    fn deliver(&self, payload: Bytes);
}

/// A weakly-held, compacting list of endpoints for one topic. Mirrors
/// Python's `weakref.WeakSet`: entries never keep their target alive, and
/// dead entries are dropped the next time the set is walked rather than
/// eagerly, since the only observers are the handful of directory
/// operations that already need to scan the whole set.
pub struct WeakRegistry<T: ?Sized> {
    entries: Vec<Weak<T>>,
}

impl<T: ?Sized> Default for WeakRegistry<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T: ?Sized> WeakRegistry<T> {
    pub fn insert(&mut self, entry: Weak<T>) {
        self.entries.push(entry);
    }

    /// Iterate over currently-live members, dropping dead weak references
    /// encountered along the way.
    pub fn for_each_live(&mut self, mut f: impl FnMut(Arc<T>)) {
        self.entries.retain(|w| {
            if let Some(strong) = w.upgrade() {
                f(strong);
                true
            } else {
                false
            }
        });
    }

    /// True if no live member remains. Compacts dead entries as a side
    /// effect, matching `trigger_cleanup`'s use of `len(weak_set) == 0`.
    pub fn is_empty(&mut self) -> bool {
        self.entries.retain(|w| w.strong_count() > 0);
        self.entries.is_empty()
    }
}
