//! Generic `Publisher<T>`/`Subscriber<T>` endpoints layered over
//! `pubsub-directory`'s per-host membership tables.
//!
//! This is the only crate in the workspace that is generic over message
//! payload type; `pubsub-directory` sees every endpoint only through the
//! type-erased `AnyPublisher`/`AnySubscriber` traits, so one worker or
//! client process can host topics of unrelated payload types side by side.

pub mod host;
pub mod publisher;
pub mod subscriber;

pub use host::{CurrentHost, FixedHost, Home};
pub use publisher::Publisher;
pub use subscriber::Subscriber;

pub use pubsub_common::{ClientId, Error, Result, TimeoutSpec, WorkerAddress};
pub use pubsub_directory::{ClientActor, ClientHandle, SchedulerActor, SchedulerHandle, WorkerActor, WorkerHandle};
