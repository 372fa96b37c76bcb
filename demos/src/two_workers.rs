//! Fast-path demo: a worker-hosted publisher and a worker-hosted subscriber
//! exchange messages over `Direct` sends, never touching the scheduler's
//! message stream.

use pubsub::{Home, Publisher, Subscriber, TimeoutSpec};
use pubsub_harness::LocalBus;
use std::time::Duration;

#[tokio::main]
async fn main() {
    env_logger::init();

    let bus = LocalBus::new();
    let worker_a = bus.spawn_worker("worker-a");
    let worker_b = bus.spawn_worker("worker-b");

    let sub: Subscriber<i32> = Subscriber::new("temperature", Home::from(worker_b));
    // Let the add-subscriber control event settle before the publisher
    // registers, so its initial snapshot already includes this subscriber.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let publisher: Publisher<i32> = Publisher::new("temperature", Home::from(worker_a));
    tokio::time::sleep(Duration::from_millis(20)).await;

    publisher.put(7);
    publisher.put(8);

    let first = sub.get_async(TimeoutSpec::forever()).await.unwrap();
    let second = sub.get_async(TimeoutSpec::forever()).await.unwrap();
    println!("received {first}, then {second} via the worker-direct fast path");
}
