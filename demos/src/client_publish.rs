//! Slow-path demo: a client-hosted publisher always relays through the
//! scheduler, which fans the message out to every worker subscriber.

use pubsub::{Home, Publisher, Subscriber, TimeoutSpec};
use pubsub_harness::LocalBus;
use std::time::Duration;

#[tokio::main]
async fn main() {
    env_logger::init();

    let bus = LocalBus::new();
    let worker_a = bus.spawn_worker("worker-a");
    let worker_b = bus.spawn_worker("worker-b");
    let client = bus.spawn_client("client-1");

    let sub_a: Subscriber<String> = Subscriber::new("greetings", Home::from(worker_a));
    let sub_b: Subscriber<String> = Subscriber::new("greetings", Home::from(worker_b));
    tokio::time::sleep(Duration::from_millis(20)).await;

    let publisher: Publisher<String> = Publisher::new("greetings", Home::from(client));
    publisher.put("hi".to_string());

    let a = sub_a.get_async(TimeoutSpec::forever()).await.unwrap();
    let b = sub_b.get_async(TimeoutSpec::forever()).await.unwrap();
    println!("worker a: {a}, worker b: {b}, both via the scheduler relay");
}
