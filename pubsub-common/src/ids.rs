//! Opaque identities. Each is a cheap-to-clone, equality-comparable,
//! serializable key — never a resource handle. Holding one does not keep
//! anything alive and does not imply reachability.

use std::fmt;
use std::sync::Arc;

/// Identity of a worker process. Usable as a map key and as a destination
/// for `Direct` sends and scheduler `Stream` traffic.
#[derive(Clone, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct WorkerAddress(Arc<str>);

impl WorkerAddress {
    pub fn new(addr: impl Into<Arc<str>>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for WorkerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Worker({})", self.0)
    }
}

impl fmt::Display for WorkerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for WorkerAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for WorkerAddress {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Identity of a connected client. Usable as a map key and as a destination
/// for scheduler-to-client `Stream` traffic.
#[derive(Clone, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ClientId(Arc<str>);

impl ClientId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Client({})", self.0)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ClientId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Exactly one of {worker, client} — the host an endpoint is bound to, or
/// the source tag carried on a `pubsub-msg` event so the scheduler knows
/// whether to also relay to worker subscribers.
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Host {
    Worker(WorkerAddress),
    Client(ClientId),
}

impl Host {
    pub fn as_worker(&self) -> Option<&WorkerAddress> {
        match self {
            Host::Worker(w) => Some(w),
            Host::Client(_) => None,
        }
    }

    pub fn as_client(&self) -> Option<&ClientId> {
        match self {
            Host::Client(c) => Some(c),
            Host::Worker(_) => None,
        }
    }
}
