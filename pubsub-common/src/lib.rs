//! Shared types used throughout the pubsub ecosystem: opaque identities, the
//! wire events exchanged between scheduler/worker/client, the transport
//! traits each host is built against, and the central error type.
//!
//! Backends (an in-memory bus for tests, a real RPC/streaming transport in
//! production) implement the traits in [`traits`] against these events.
//! This crate carries no event loop and no directory state of its own; see
//! `pubsub-directory` for that.

pub mod error;
pub mod ids;
pub mod timeout;
pub mod traits;
pub mod wire;

pub use error::{Error, Result};
pub use ids::{ClientId, Host, WorkerAddress};
pub use timeout::TimeoutSpec;
pub use traits::{ControlRpc, Direct, Finalizer, ToClient, ToScheduler, ToWorker};
pub use wire::{
    AddPublisherResponse, ClientStreamEvent, SchedulerStreamEvent, SubscriberInfo, TopicName,
    Who, WorkerStreamEvent,
};
