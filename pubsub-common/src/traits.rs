//! The four black-box facilities this crate is built against. None of them
//! are implemented here — `pubsub-harness` provides an in-process instance
//! of each for tests and demos; a real deployment wires these to whatever
//! RPC/streaming transport the surrounding cluster already uses.

use crate::error::Result;
use crate::ids::WorkerAddress;
use crate::wire::{AddPublisherResponse, ClientStreamEvent, SchedulerStreamEvent, TopicName, WorkerStreamEvent};

/// Request/response channel to the scheduler. The only operation that
/// needs a reply is publisher registration; every other scheduler-bound
/// event is fire-and-forget (see [`ToScheduler`]).
#[async_trait::async_trait]
pub trait ControlRpc: Send + Sync {
    async fn add_publisher(
        &self,
        name: TopicName,
        worker: WorkerAddress,
    ) -> Result<AddPublisherResponse>;
}

/// Fire-and-forget stream from a worker or client to the scheduler.
/// Ordering is preserved per sender; failures are not reported back to the
/// caller (the transport's disconnect notification is the authoritative
/// signal that something needs cleaning up).
pub trait ToScheduler: Send + Sync {
    fn send(&self, event: SchedulerStreamEvent);
}

/// Scheduler-to-worker stream, used for control events and for relaying a
/// client-sourced message onward. Best-effort: a failed send is swallowed,
/// the worker's own disconnect is what eventually triggers cleanup.
pub trait ToWorker: Send + Sync {
    fn send(&self, event: WorkerStreamEvent);
}

/// Scheduler-to-client stream. Unlike `ToWorker`, a failed send here is
/// immediately actionable: the scheduler owns this stream and learns right
/// away that the client is gone, so it converts the failure into a
/// `remove-subscriber`.
pub trait ToClient: Send + Sync {
    fn send(&self, event: ClientStreamEvent) -> Result<()>;
}

/// Unreliable-but-usually-reliable worker-to-worker send of a single
/// message on the fast path. A destination address is a plain identity,
/// not a resource handle: a failed send here is simply dropped.
pub trait Direct: Send + Sync {
    fn send(&self, target: &WorkerAddress, event: WorkerStreamEvent);
}

/// A hook run when a local endpoint object becomes unreachable. Endpoint
/// `Drop` implementations call this instead of running cleanup inline, so
/// cleanup always happens on the owning host's event loop rather than on
/// whatever thread dropped the last reference.
pub trait Finalizer: Send + Sync {
    fn schedule_cleanup(&self);
}
