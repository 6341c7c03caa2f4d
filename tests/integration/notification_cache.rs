//! Integration tests for the notification cache: read-flag merging across
//! polls, optimistic mark-as-read with per-item rollback, the degraded
//! fallback layer, and poller lifecycle.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use taskboard::gateway::fallback::FallbackGateway;
use taskboard::gateway::memory::MemoryGateway;
use taskboard::notifications::{NotificationCache, NotificationPoller};
use taskboard_proto::{Notification, NotificationId, UserId};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn note(id: &str, read: bool) -> Notification {
    Notification {
        id: NotificationId::from(id),
        user_id: UserId::from("u1"),
        message: format!("notification {id}"),
        read,
        created_at: Utc::now(),
    }
}

fn flags(cache: &NotificationCache) -> Vec<(String, bool)> {
    cache
        .snapshot()
        .iter()
        .map(|n| (n.id.to_string(), n.read))
        .collect()
}

fn expected(items: &[(&str, bool)]) -> Vec<(String, bool)> {
    items.iter().map(|(id, read)| ((*id).to_string(), *read)).collect()
}

async fn wait_for(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

// ===========================================================================
// Merging
// ===========================================================================

#[tokio::test]
async fn poll_keeps_local_read_flags() {
    let api = MemoryGateway::new();
    api.set_notifications(vec![note("n1", false), note("n2", true)]);
    let cache = NotificationCache::new();
    cache.refresh(&api).await.unwrap();

    // The server forgot that n2 was read and added n3.
    api.set_notifications(vec![note("n1", false), note("n2", false), note("n3", false)]);
    cache.refresh(&api).await.unwrap();

    assert_eq!(
        flags(&cache),
        expected(&[("n1", false), ("n2", true), ("n3", false)])
    );
    assert_eq!(cache.unread_count(), 2);
}

#[tokio::test]
async fn poll_drops_items_the_server_no_longer_lists() {
    let api = MemoryGateway::new();
    api.set_notifications(vec![note("n1", true), note("n2", false)]);
    let cache = NotificationCache::new();
    cache.refresh(&api).await.unwrap();

    api.set_notifications(vec![note("n2", false)]);
    cache.refresh(&api).await.unwrap();
    assert_eq!(flags(&cache), expected(&[("n2", false)]));
}

// ===========================================================================
// Mark as read
// ===========================================================================

#[tokio::test]
async fn mark_as_read_is_visible_before_confirmation() {
    let api = Arc::new(MemoryGateway::new());
    api.set_notifications(vec![note("n1", false)]);
    let cache = Arc::new(NotificationCache::new());
    cache.refresh(api.as_ref()).await.unwrap();
    api.set_latency(Duration::from_millis(100));

    let task = {
        let api = Arc::clone(&api);
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            cache
                .mark_as_read(api.as_ref(), &NotificationId::from("n1"))
                .await
        })
    };
    wait_for(|| cache.unread_count() == 0).await;
    assert!(!task.is_finished());
    assert!(task.await.unwrap());
    assert!(api.notifications()[0].read);
}

#[tokio::test]
async fn failed_mark_as_read_reverts_silently() {
    let api = MemoryGateway::new();
    api.set_notifications(vec![note("n1", false)]);
    api.fail_mark_read(NotificationId::from("n1"));
    let cache = NotificationCache::new();
    cache.refresh(&api).await.unwrap();

    assert!(!cache.mark_as_read(&api, &NotificationId::from("n1")).await);
    assert_eq!(flags(&cache), expected(&[("n1", false)]));
    assert!(cache.last_error().is_none());
}

#[tokio::test]
async fn mark_all_confirms_each_and_reverts_only_failures() {
    let api = MemoryGateway::new();
    api.set_notifications(vec![
        note("n1", false),
        note("n2", false),
        note("n3", false),
        note("n4", true),
    ]);
    api.fail_mark_read(NotificationId::from("n3"));
    let cache = NotificationCache::new();
    cache.refresh(&api).await.unwrap();

    assert_eq!(cache.mark_all_as_read(&api).await, 1);
    assert_eq!(
        flags(&cache),
        expected(&[("n1", true), ("n2", true), ("n3", false), ("n4", true)])
    );
    let mut confirms: Vec<String> = api
        .requests()
        .into_iter()
        .filter(|r| r.starts_with("PATCH"))
        .collect();
    confirms.sort();
    assert_eq!(
        confirms,
        [
            "PATCH /notifications/n1/read",
            "PATCH /notifications/n2/read",
            "PATCH /notifications/n3/read"
        ]
    );
}

// ===========================================================================
// Degraded fallback
// ===========================================================================

#[tokio::test]
async fn fallback_substitutes_placeholders_when_enabled() {
    let inner = Arc::new(MemoryGateway::new());
    inner.set_offline(true);
    let api = FallbackGateway::new(Arc::clone(&inner), true);
    let cache = NotificationCache::new();

    cache.refresh(&api).await.unwrap();
    assert_eq!(
        flags(&cache),
        expected(&[("n1", false), ("n2", false), ("n3", true)])
    );

    // Confirmation failures are swallowed, so the optimistic flag sticks.
    assert!(cache.mark_as_read(&api, &NotificationId::from("n1")).await);
    assert_eq!(cache.unread_count(), 1);
}

#[tokio::test]
async fn fallback_disabled_reports_errors() {
    let inner = Arc::new(MemoryGateway::new());
    inner.set_offline(true);
    let api = FallbackGateway::new(inner, false);
    let cache = NotificationCache::new();

    assert!(cache.refresh(&api).await.is_err());
    assert!(cache.snapshot().is_empty());
    assert!(cache.last_error().is_some());
}

// ===========================================================================
// Poller
// ===========================================================================

#[tokio::test]
async fn poller_picks_up_new_notifications_and_stops() {
    let api = Arc::new(MemoryGateway::new());
    let cache = Arc::new(NotificationCache::new());
    let poller = NotificationPoller::spawn(Arc::clone(&cache), Arc::clone(&api), Duration::from_millis(20));

    api.set_notifications(vec![note("n1", false)]);
    wait_for(|| cache.unread_count() == 1).await;

    poller.shutdown().await;
    api.set_notifications(vec![note("n1", false), note("n2", false)]);
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(cache.unread_count(), 1);
}
