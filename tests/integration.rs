//! Integration tests for the update hub
//!
//! These exercise the publish/subscribe flow end to end: authorization,
//! retention, replay, and concurrent operation.

use std::sync::Arc;
use std::time::Duration;
use tidings::auth::{AuthGateway, Claims, TokenCodec};
use tidings::hub::{Hub, HubConfig, RetentionPolicy};
use tidings::Error;
use tokio::time::timeout;

const TEST_SECRET: &[u8] = b"test-secret-for-integration-tests";

fn codec() -> TokenCodec {
    TokenCodec::new(TEST_SECRET, "HS256").unwrap()
}

fn hub_with(capacity: usize, buffer: usize) -> Arc<Hub> {
    let config = HubConfig {
        public_url: "https://hub.example.com/.well-known/tidings".to_string(),
        retention: RetentionPolicy {
            capacity,
            max_age: None,
        },
        subscriber_buffer: buffer,
    };
    Arc::new(Hub::new(AuthGateway::new(codec()), config))
}

fn token(publish: &[&str], subscribe: &[&str]) -> String {
    let claims = Claims::new(
        (!publish.is_empty()).then(|| publish.iter().map(|s| s.to_string()).collect()),
        (!subscribe.is_empty()).then(|| subscribe.iter().map(|s| s.to_string()).collect()),
        None,
        Duration::from_secs(60),
    );
    codec().sign(&claims).unwrap()
}

fn topics(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

const BOOK_1: &str = "https://example.com/books/1";
const BOOK_2: &str = "https://example.com/books/2";

#[tokio::test]
async fn test_publish_reaches_live_subscriber() {
    let hub = hub_with(16, 8);

    let mut subscriber = hub
        .subscribe(&token(&[], &["*"]), &topics(&[BOOK_1]), None)
        .unwrap();

    let id = hub
        .publish(&token(&["*"], &[]), &topics(&[BOOK_1]), b"hello".to_vec(), false)
        .unwrap();

    let update = timeout(Duration::from_secs(1), subscriber.next())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(update.id, id);
    assert_eq!(update.payload, b"hello");
    assert_eq!(update.topics, topics(&[BOOK_1]));
}

#[tokio::test]
async fn test_subscriber_only_gets_topics_it_wants() {
    let hub = hub_with(16, 8);
    let publisher = token(&["*"], &[]);

    let mut subscriber = hub
        .subscribe(&token(&[], &["*"]), &topics(&[BOOK_1]), None)
        .unwrap();

    hub.publish(&publisher, &topics(&[BOOK_2]), b"other".to_vec(), false)
        .unwrap();
    hub.publish(&publisher, &topics(&[BOOK_1]), b"mine".to_vec(), false)
        .unwrap();

    let update = timeout(Duration::from_secs(1), subscriber.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.payload, b"mine");
}

#[tokio::test]
async fn test_authorization_limits_delivery() {
    let hub = hub_with(16, 8);

    // interested in everything, authorized only for book 1
    let mut subscriber = hub
        .subscribe(&token(&[], &[BOOK_1]), &topics(&["*"]), None)
        .unwrap();

    let publisher = token(&["*"], &[]);
    hub.publish(&publisher, &topics(&[BOOK_2]), b"secret".to_vec(), false)
        .unwrap();
    hub.publish(&publisher, &topics(&[BOOK_1]), b"allowed".to_vec(), false)
        .unwrap();

    let update = timeout(Duration::from_secs(1), subscriber.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.payload, b"allowed");
}

#[tokio::test]
async fn test_private_update_needs_explicit_claim() {
    let hub = hub_with(16, 8);
    let publisher = token(&["*"], &[]);

    let mut wildcard = hub
        .subscribe(&token(&[], &["*"]), &topics(&[BOOK_1]), None)
        .unwrap();
    let mut explicit = hub
        .subscribe(&token(&[], &[BOOK_1]), &topics(&[BOOK_1]), None)
        .unwrap();

    hub.publish(&publisher, &topics(&[BOOK_1]), b"private".to_vec(), true)
        .unwrap();
    hub.publish(&publisher, &topics(&[BOOK_1]), b"public".to_vec(), false)
        .unwrap();

    // explicit claim sees both, in id order
    let first = timeout(Duration::from_secs(1), explicit.next()).await.unwrap().unwrap();
    let second = timeout(Duration::from_secs(1), explicit.next()).await.unwrap().unwrap();
    assert_eq!(first.payload, b"private");
    assert_eq!(second.payload, b"public");

    // wildcard only sees the public one
    let update = timeout(Duration::from_secs(1), wildcard.next()).await.unwrap().unwrap();
    assert_eq!(update.payload, b"public");
}

#[tokio::test]
async fn test_forbidden_publish_appends_nothing() {
    let hub = hub_with(16, 8);

    let err = hub
        .publish(
            &token(&[BOOK_1], &[]),
            &topics(&[BOOK_1, BOOK_2]),
            b"x".to_vec(),
            false,
        )
        .unwrap_err();

    assert!(err.is_forbidden());
    assert_eq!(hub.retained_updates(), 0);
}

#[tokio::test]
async fn test_publish_without_claim_rejected() {
    let hub = hub_with(16, 8);

    let err = hub
        .publish(&token(&[], &["*"]), &topics(&[BOOK_1]), b"x".to_vec(), false)
        .unwrap_err();
    assert!(err.is_forbidden());

    let err = hub
        .publish("garbage-token", &topics(&[BOOK_1]), b"x".to_vec(), false)
        .unwrap_err();
    assert!(err.is_auth());
}

#[tokio::test]
async fn test_resume_replays_missed_updates_in_order() {
    let hub = hub_with(16, 8);
    let publisher = token(&["*"], &[]);

    let first = hub
        .publish(&publisher, &topics(&[BOOK_1]), b"1".to_vec(), false)
        .unwrap();
    hub.publish(&publisher, &topics(&[BOOK_1]), b"2".to_vec(), false)
        .unwrap();
    hub.publish(&publisher, &topics(&[BOOK_1]), b"3".to_vec(), false)
        .unwrap();

    let mut subscriber = hub
        .subscribe(
            &token(&[], &["*"]),
            &topics(&[BOOK_1]),
            Some(&first.to_string()),
        )
        .unwrap();

    // live updates published after the subscription continue the stream
    hub.publish(&publisher, &topics(&[BOOK_1]), b"4".to_vec(), false)
        .unwrap();

    let mut payloads = Vec::new();
    let mut ids = Vec::new();
    for _ in 0..3 {
        let update = timeout(Duration::from_secs(1), subscriber.next())
            .await
            .unwrap()
            .unwrap();
        payloads.push(update.payload.clone());
        ids.push(update.id);
    }

    assert_eq!(payloads, vec![b"2".to_vec(), b"3".to_vec(), b"4".to_vec()]);
    let mut sorted = ids.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted, ids, "ids must be ascending with no duplicates");
}

#[tokio::test]
async fn test_replay_respects_authorization() {
    let hub = hub_with(16, 8);
    let publisher = token(&["*"], &[]);

    hub.publish(&publisher, &topics(&[BOOK_1]), b"private".to_vec(), true)
        .unwrap();
    hub.publish(&publisher, &topics(&[BOOK_1]), b"public".to_vec(), false)
        .unwrap();

    // wildcard authorization: the private retained update must not replay
    let mut subscriber = hub
        .subscribe(&token(&[], &["*"]), &topics(&[BOOK_1]), Some("0"))
        .unwrap();

    let update = timeout(Duration::from_secs(1), subscriber.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.payload, b"public");
}

#[tokio::test]
async fn test_stale_cursor_rejected_and_nothing_registered() {
    let hub = hub_with(2, 8);
    let publisher = token(&["*"], &[]);

    for i in 0..5u8 {
        hub.publish(&publisher, &topics(&[BOOK_1]), vec![i], false)
            .unwrap();
    }

    let err = hub
        .subscribe(&token(&[], &["*"]), &topics(&[BOOK_1]), Some("1"))
        .unwrap_err();

    assert!(err.is_stale_cursor());
    assert_eq!(hub.subscription_count(), 0);
}

#[tokio::test]
async fn test_invalid_cursor_rejected() {
    let hub = hub_with(16, 8);
    let err = hub
        .subscribe(&token(&[], &["*"]), &topics(&[BOOK_1]), Some("not-an-id"))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[tokio::test]
async fn test_concurrent_publishes_get_unique_ordered_ids() {
    let hub = hub_with(128, 8);
    let publisher = token(&["*"], &[]);

    let mut handles = vec![];
    for _ in 0..50 {
        let hub = hub.clone();
        let publisher = publisher.clone();
        handles.push(tokio::spawn(async move {
            hub.publish(&publisher, &topics(&[BOOK_1]), b"x".to_vec(), false)
                .unwrap()
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().value());
    }

    ids.sort();
    let expected: Vec<u64> = (1..=50).collect();
    assert_eq!(ids, expected, "ids must be unique and gap-free");
}

#[tokio::test]
async fn test_slow_subscriber_is_closed_not_blocking() {
    let hub = hub_with(16, 1);
    let publisher = token(&["*"], &[]);

    let mut subscriber = hub
        .subscribe(&token(&[], &["*"]), &topics(&[BOOK_1]), None)
        .unwrap();
    assert_eq!(hub.subscription_count(), 1);

    // buffer of 1: second matching publish overflows and closes the
    // subscription instead of blocking the publisher
    hub.publish(&publisher, &topics(&[BOOK_1]), b"1".to_vec(), false)
        .unwrap();
    hub.publish(&publisher, &topics(&[BOOK_1]), b"2".to_vec(), false)
        .unwrap();

    assert_eq!(hub.subscription_count(), 0);

    // buffered update is still delivered, then the stream ends
    let update = timeout(Duration::from_secs(1), subscriber.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.payload, b"1");

    let end = timeout(Duration::from_secs(1), subscriber.next())
        .await
        .unwrap();
    assert!(end.is_none());
}

#[tokio::test]
async fn test_dropping_subscriber_releases_registration() {
    let hub = hub_with(16, 8);

    let subscriber = hub
        .subscribe(&token(&[], &["*"]), &topics(&[BOOK_1]), None)
        .unwrap();
    assert_eq!(hub.subscription_count(), 1);

    drop(subscriber);
    assert_eq!(hub.subscription_count(), 0);
}

#[tokio::test]
async fn test_reconnect_with_last_event_id() {
    let hub = hub_with(16, 8);
    let publisher = token(&["*"], &[]);
    let subscriber_token = token(&[], &["*"]);

    let mut subscriber = hub
        .subscribe(&subscriber_token, &topics(&[BOOK_1]), None)
        .unwrap();

    hub.publish(&publisher, &topics(&[BOOK_1]), b"1".to_vec(), false)
        .unwrap();
    let seen = timeout(Duration::from_secs(1), subscriber.next())
        .await
        .unwrap()
        .unwrap();
    drop(subscriber);

    // missed while disconnected
    hub.publish(&publisher, &topics(&[BOOK_1]), b"2".to_vec(), false)
        .unwrap();
    hub.publish(&publisher, &topics(&[BOOK_1]), b"3".to_vec(), false)
        .unwrap();

    let mut resumed = hub
        .subscribe(
            &subscriber_token,
            &topics(&[BOOK_1]),
            Some(&seen.id.to_string()),
        )
        .unwrap();

    let a = timeout(Duration::from_secs(1), resumed.next()).await.unwrap().unwrap();
    let b = timeout(Duration::from_secs(1), resumed.next()).await.unwrap().unwrap();
    assert_eq!(a.payload, b"2");
    assert_eq!(b.payload, b"3");
}

#[tokio::test]
async fn test_subscribe_requires_topic_and_claim() {
    let hub = hub_with(16, 8);

    let err = hub
        .subscribe(&token(&[], &["*"]), &[], None)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    let err = hub
        .subscribe(&token(&["*"], &[]), &topics(&[BOOK_1]), None)
        .unwrap_err();
    assert!(err.is_forbidden());
}

#[tokio::test]
async fn test_concurrent_subscribe_unsubscribe() {
    let hub = hub_with(16, 8);
    let subscriber_token = token(&[], &["*"]);

    let mut handles = vec![];
    for _ in 0..100 {
        let hub = hub.clone();
        let subscriber_token = subscriber_token.clone();
        handles.push(tokio::spawn(async move {
            let subscriber = hub
                .subscribe(&subscriber_token, &topics(&[BOOK_1]), None)
                .unwrap();
            tokio::time::sleep(Duration::from_micros(100)).await;
            drop(subscriber);
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(hub.subscription_count(), 0);
}
