//! Where a `Publisher`/`Subscriber` lives: exactly one of {worker, client}.
//! Resolution of the ambient "current host" when a caller does not supply
//! one explicitly is handed to a [`CurrentHost`] implementation rather than
//! a process-global singleton.

use pubsub_directory::{ClientHandle, WorkerHandle};

/// The host a `Publisher` or `Subscriber` is bound to.
#[derive(Clone)]
pub enum Home {
    Worker(WorkerHandle),
    Client(ClientHandle),
}

impl Home {
    pub(crate) fn schedule_cleanup(&self) {
        match self {
            Home::Worker(w) => w.schedule_cleanup(),
            Home::Client(c) => c.schedule_cleanup(),
        }
    }
}

impl From<WorkerHandle> for Home {
    fn from(w: WorkerHandle) -> Self {
        Home::Worker(w)
    }
}

impl From<ClientHandle> for Home {
    fn from(c: ClientHandle) -> Self {
        Home::Client(c)
    }
}

/// Resolves the ambient worker or client context for endpoints constructed
/// without an explicit host. Pass an implementation in from whatever
/// process-level state tracks "the worker/client this task is running
/// against" — this crate never reaches for a global.
pub trait CurrentHost: Send + Sync {
    fn current_host(&self) -> Option<Home>;
}

/// A [`CurrentHost`] that always resolves to the same, fixed host. Useful
/// for single-host processes and for tests.
pub struct FixedHost(Home);

impl FixedHost {
    pub fn new(home: impl Into<Home>) -> Self {
        Self(home.into())
    }
}

impl CurrentHost for FixedHost {
    fn current_host(&self) -> Option<Home> {
        Some(self.0.clone())
    }
}
