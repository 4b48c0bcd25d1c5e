//! Integration tests for the shared session store.
//!
//! The store is written to by the frame path and the idle tick at the
//! same time. These tests drive it from several tasks at once and check
//! that the session invariants survive.

use std::time::{Duration, Instant};

use gatelink_protocol::{Snowflake, User};
use gatelink_session::{ConnectionState, Session, SessionStore};

fn store() -> SessionStore {
    SessionStore::new(Session::new("token"))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sequence_updates_keep_the_maximum() {
    let store = store();

    let mut tasks = Vec::new();
    for worker in 0..4u64 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            for i in 1..=250u64 {
                store.with(|s| s.record_sequence(Some(i * 4 + worker)));
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(store.sequence(), Some(250 * 4 + 3));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_heartbeat_and_frame_paths_share_one_session() {
    let store = store();
    let t0 = Instant::now();
    store.with(|s| s.start_heartbeat(Duration::from_millis(100), t0));

    // Tick path: sends a heartbeat once due.
    let tick = {
        let store = store.clone();
        tokio::spawn(async move {
            let now = t0 + Duration::from_millis(100);
            store.with(|s| {
                if s.heartbeat_due(now) {
                    s.mark_heartbeat_sent(now);
                }
            });
        })
    };
    tick.await.unwrap();

    // Frame path: the ack arrives 20ms later.
    store.with(|s| s.record_ack(t0 + Duration::from_millis(120)));

    assert_eq!(store.ping(), Some(Duration::from_millis(20)));
}

#[test]
fn test_store_clones_observe_the_same_state() {
    let store = store();
    let handle = store.clone();

    store.with(|s| {
        s.establish(
            "sid".into(),
            User {
                id: Snowflake(42),
                username: "gatelink".into(),
                ..User::default()
            },
        )
    });

    assert_eq!(handle.state(), ConnectionState::Connected);
    assert_eq!(handle.session_id().as_deref(), Some("sid"));
    assert_eq!(handle.current_user().map(|u| u.id), Some(Snowflake(42)));
}
