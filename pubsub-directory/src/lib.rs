//! Scheduler/worker/client topic membership directories.
//!
//! Each of the three hosts runs its directory state behind a single
//! spawned task (an "actor"): all mutations arrive as [`Command`]s over an
//! unbounded channel and are applied one at a time, so no host ever needs a
//! lock around its own membership tables. Handles returned to callers are
//! cheap, `Clone` senders into that channel.
//!
//! This crate knows nothing about message types — publishers and
//! subscribers are referenced through the type-erased [`registry::AnyPublisher`]
//! and [`registry::AnySubscriber`] traits so one scheduler/worker/client can
//! host topics of unrelated payload types. `pubsub` implements those traits
//! for its generic endpoint internals.

pub mod client;
pub mod registry;
pub mod scheduler;
pub mod worker;

pub use client::{ClientActor, ClientDirectory, ClientHandle};
pub use registry::{AnyPublisher, AnySubscriber, WeakRegistry};
pub use scheduler::{SchedulerActor, SchedulerDirectory, SchedulerHandle};
pub use worker::{WorkerActor, WorkerDirectory, WorkerHandle};
