//! End-to-end scenarios exercising `Publisher`/`Subscriber` over the
//! in-process harness transport.

use pubsub::{Home, Publisher, Subscriber, TimeoutSpec};
use pubsub_harness::LocalBus;
use std::time::Duration;

async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn worker_to_worker_fast_path() {
    let bus = LocalBus::new();
    let worker_a = bus.spawn_worker("a");
    let worker_b = bus.spawn_worker("b");

    let sub: Subscriber<i32> = Subscriber::new("t", Home::from(worker_b));
    settle().await;
    let publisher: Publisher<i32> = Publisher::new("t", Home::from(worker_a));
    settle().await;

    publisher.put(7);
    publisher.put(8);

    assert_eq!(sub.get_async(TimeoutSpec::forever()).await.unwrap(), 7);
    assert_eq!(sub.get_async(TimeoutSpec::forever()).await.unwrap(), 8);
}

#[tokio::test]
async fn pre_registration_emits_are_buffered_then_flushed_in_order() {
    let bus = LocalBus::new();
    let worker_a = bus.spawn_worker("a");
    let worker_b = bus.spawn_worker("b");

    let sub: Subscriber<String> = Subscriber::new("t", Home::from(worker_b));
    settle().await;

    let publisher: Publisher<String> = Publisher::new("t", Home::from(worker_a));
    // Put immediately, before the add_publisher round trip can possibly
    // have completed.
    publisher.put("x".to_string());
    publisher.put("y".to_string());

    assert_eq!(sub.get_async(TimeoutSpec::forever()).await.unwrap(), "x");
    assert_eq!(sub.get_async(TimeoutSpec::forever()).await.unwrap(), "y");
}

#[tokio::test]
async fn client_subscriber_turns_on_scheduler_copy() {
    let bus = LocalBus::new();
    let worker_a = bus.spawn_worker("a");
    let worker_b = bus.spawn_worker("b");
    let client = bus.spawn_client("c1");

    let publisher: Publisher<i32> = Publisher::new("t", Home::from(worker_a));
    settle().await;
    assert!(!publisher.publish_to_scheduler());

    let worker_sub: Subscriber<i32> = Subscriber::new("t", Home::from(worker_b));
    let client_sub: Subscriber<i32> = Subscriber::new("t", Home::from(client));
    settle().await;

    assert!(publisher.publish_to_scheduler());

    publisher.put(42);

    assert_eq!(client_sub.get_async(TimeoutSpec::forever()).await.unwrap(), 42);
    assert_eq!(worker_sub.get_async(TimeoutSpec::forever()).await.unwrap(), 42);
}

#[tokio::test]
async fn client_publisher_routes_through_scheduler_to_every_worker() {
    let bus = LocalBus::new();
    let worker_a = bus.spawn_worker("a");
    let worker_b = bus.spawn_worker("b");
    let client = bus.spawn_client("c1");

    let sub_a: Subscriber<String> = Subscriber::new("t", Home::from(worker_a));
    let sub_b: Subscriber<String> = Subscriber::new("t", Home::from(worker_b));
    settle().await;

    let publisher: Publisher<String> = Publisher::new("t", Home::from(client));
    publisher.put("hi".to_string());

    assert_eq!(sub_a.get_async(TimeoutSpec::forever()).await.unwrap(), "hi");
    assert_eq!(sub_b.get_async(TimeoutSpec::forever()).await.unwrap(), "hi");
}

#[tokio::test]
async fn get_times_out_on_an_empty_topic() {
    let bus = LocalBus::new();
    let worker = bus.spawn_worker("a");
    let sub: Subscriber<i32> = Subscriber::new("nobody-publishes-here", Home::from(worker));

    let err = sub.get_async("50ms").await.unwrap_err();
    assert!(matches!(err, pubsub::Error::Timeout(_)));
}

#[tokio::test]
async fn dropping_the_last_subscriber_reference_removes_it_from_the_publisher_view() {
    let bus = LocalBus::new();
    let worker_a = bus.spawn_worker("a");
    let worker_b = bus.spawn_worker("b");

    let publisher: Publisher<i32> = Publisher::new("t", Home::from(worker_a));
    let sub: Subscriber<i32> = Subscriber::new("t", Home::from(worker_b.clone()));
    settle().await;
    assert!(publisher.subscribers().contains_key(worker_b.address()));

    drop(sub);
    settle().await;

    assert!(!publisher.subscribers().contains_key(worker_b.address()));
}
