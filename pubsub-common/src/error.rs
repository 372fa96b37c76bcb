//! The central error type used throughout the pubsub ecosystem.
//!
//! Directory mutations never raise: removing something absent is a no-op,
//! and handlers are expected to log and continue rather than propagate.
//! This type exists for the operations that do have a caller waiting on
//! them: `Subscriber::get`, endpoint construction, and publisher
//! registration.

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// `Subscriber::get` exceeded its deadline with an empty buffer.
    #[error("timed out waiting for a message after {0:?}")]
    Timeout(std::time::Duration),

    /// An underlying stream send failed because the peer is gone.
    ///
    /// On the scheduler this is swallowed for worker destinations (the
    /// transport's disconnect notification is the authoritative cleanup
    /// signal) and converted into an implicit `remove-subscriber` for
    /// client destinations, since the scheduler owns the client stream
    /// and learns immediately that it is closed.
    #[error("peer is no longer reachable: {0}")]
    PeerGone(String),

    /// A `Publisher`/`Subscriber` was constructed with neither a worker nor
    /// a client context, and none could be resolved from the ambient
    /// environment.
    #[error("no worker or client context available to host this endpoint: {0}")]
    Misconfiguration(String),

    /// A message could not be serialized for transmission, or a received
    /// payload could not be deserialized into the expected type.
    #[error("serialization failure: {0}")]
    Serialization(String),

    /// The underlying transport has gone away entirely (not a single failed
    /// send, but the whole stream).
    #[error("transport disconnected")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, Error>;
