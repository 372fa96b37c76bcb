//! The `Subscriber<T>` endpoint. One async primitive (`get_async`) backs
//! every other access pattern: the blocking shim and both iteration
//! surfaces are built on top of it rather than duplicating its logic.

use crate::host::Home;
use bytes::Bytes;
use futures::Stream;
use parking_lot::Mutex;
use pubsub_common::{Error, Result, SchedulerStreamEvent, TimeoutSpec, TopicName, Who};
use pubsub_directory::AnySubscriber;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::Notify;

struct SubscriberInner<T> {
    name: TopicName,
    home: Home,
    buffer: Mutex<VecDeque<Bytes>>,
    notify: Notify,
    /// Set once synchronous `Iterator::next` has yielded a terminal `Err`,
    /// so a caller that keeps calling `next()` past it gets `None` instead
    /// of attempting another `get_blocking` on a logically-closed stream.
    exhausted: std::sync::atomic::AtomicBool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> AnySubscriber for SubscriberInner<T> {
    fn name(&self) -> &TopicName {
        &self.name
    }

    fn deliver(&self, payload: Bytes) {
        self.buffer.lock().push_back(payload);
        self.notify.notify_one();
    }
}

impl<T> Drop for SubscriberInner<T> {
    fn drop(&mut self) {
        self.home.schedule_cleanup();
    }
}

/// A handle to receive messages on a topic. Cheap to clone; every clone
/// observes and drains the same buffer.
pub struct Subscriber<T> {
    inner: Arc<SubscriberInner<T>>,
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: DeserializeOwned + Send + Sync + 'static> Subscriber<T> {
    /// Construct against an explicit host. Inserts the endpoint into the
    /// host's local subscriber set and schedules `add-subscriber` on the
    /// scheduler stream immediately — there is no round trip to await.
    pub fn new(name: impl Into<TopicName>, home: impl Into<Home>) -> Self {
        let name = name.into();
        let home = home.into();
        let inner = Arc::new(SubscriberInner {
            name: name.clone(),
            home: home.clone(),
            buffer: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            exhausted: std::sync::atomic::AtomicBool::new(false),
            _marker: PhantomData,
        });

        let weak: std::sync::Weak<dyn AnySubscriber> = Arc::downgrade(&inner) as std::sync::Weak<dyn AnySubscriber>;
        match &home {
            Home::Worker(worker) => {
                worker.register_subscriber(name.clone(), weak);
                worker.scheduler_stream().send(SchedulerStreamEvent::AddSubscriber {
                    name,
                    who: Who::Worker(worker.address().clone()),
                });
            }
            Home::Client(client) => {
                client.register_subscriber(name.clone(), weak);
                client.scheduler_stream().send(SchedulerStreamEvent::AddSubscriber {
                    name,
                    who: Who::Client(client.id().clone()),
                });
            }
        }

        Self { inner }
    }

    pub fn with_context(
        name: impl Into<TopicName>,
        home: Option<Home>,
        ctx: &dyn crate::host::CurrentHost,
    ) -> Result<Self> {
        let name = name.into();
        let home = home.or_else(|| ctx.current_host()).ok_or_else(|| {
            Error::Misconfiguration(format!("no worker or client context available for topic {name}"))
        })?;
        Ok(Self::new(name, home))
    }

    pub fn name(&self) -> &TopicName {
        &self.inner.name
    }

    /// Pop the oldest buffered payload, waiting for arrival if empty. The
    /// `Notified` future is created before the buffer check so a
    /// `deliver` racing with this call is never missed.
    async fn next_payload(&self) -> Bytes {
        loop {
            let notified = self.inner.notify.notified();
            if let Some(payload) = self.inner.buffer.lock().pop_front() {
                return payload;
            }
            notified.await;
        }
    }

    fn decode(payload: Bytes) -> Result<T> {
        serde_json::from_slice(&payload).map_err(|err| Error::Serialization(err.to_string()))
    }

    /// Async surface. `timeout` accepts anything convertible into a
    /// [`TimeoutSpec`] — a bare number of seconds or a human-readable
    /// string such as `"200ms"`. A forever timeout never returns
    /// `Err(Error::Timeout(_))`.
    pub async fn get_async(&self, timeout: impl Into<TimeoutSpec>) -> Result<T> {
        let payload = match timeout.into().as_duration() {
            None => self.next_payload().await,
            Some(duration) => match tokio::time::timeout(duration, self.next_payload()).await {
                Ok(payload) => payload,
                Err(_) => return Err(Error::Timeout(duration)),
            },
        };
        Self::decode(payload)
    }

    /// Blocking shim over [`Self::get_async`] for callers on a thread
    /// outside the host's own event loop. Must be called from within a
    /// Tokio runtime context (e.g. via `spawn_blocking`), matching the
    /// `block_in_place` contract.
    pub fn get_blocking(&self, timeout: impl Into<TimeoutSpec>) -> Result<T> {
        let timeout = timeout.into();
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(self.get_async(timeout)))
    }

    /// Async iteration: each step is `get_async` with no timeout. The
    /// stream is unbounded and only ends if decoding fails.
    pub fn stream(&self) -> impl Stream<Item = Result<T>> + '_ {
        futures::stream::unfold(Some(self), |state| async move {
            let sub = state?;
            let item = sub.get_async(TimeoutSpec::forever()).await;
            if item.is_err() {
                Some((item, None))
            } else {
                Some((item, Some(sub)))
            }
        })
    }
}

/// Synchronous iteration: each step is `get_blocking` with no timeout.
/// Terminates only by error — the last item yielded is the `Err` itself,
/// matching [`Subscriber::stream`]'s behavior.
impl<T: DeserializeOwned + Send + Sync + 'static> Iterator for Subscriber<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        use std::sync::atomic::Ordering;
        if self.inner.exhausted.load(Ordering::Acquire) {
            return None;
        }
        let item = self.get_blocking(TimeoutSpec::forever());
        if item.is_err() {
            self.inner.exhausted.store(true, Ordering::Release);
        }
        Some(item)
    }
}

impl<T> fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Sub: {}>", self.inner.name)
    }
}
