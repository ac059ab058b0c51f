// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Transit fence-in / fence-out delivery tests.
//!
//! These drive the sender tick by tick against the recording mock backend.

mod common;

use common::{north_of, settle, station, user_session, MockBackend};
use paypass_tracker::models::{FenceEvent, GeoPoint, TransitZone, Viewport};
use paypass_tracker::services::{DeliveryState, ExitBackoff, TransitGeofenceEventSender};
use std::sync::Arc;
use std::time::{Duration, Instant};

const STOP: GeoPoint = GeoPoint::new(37.6544, 127.0613);

fn catalog() -> Vec<TransitZone> {
    vec![
        station(101, "Nowon Station", STOP),
        station(102, "Junggye Station", north_of(STOP, 2_000.0)),
    ]
}

fn sender(backend: &Arc<MockBackend>) -> TransitGeofenceEventSender {
    TransitGeofenceEventSender::new(&user_session(), backend.clone())
}

#[tokio::test]
async fn test_enter_then_exit_sends_one_of_each() {
    let backend = MockBackend::new();
    let mut sender = sender(&backend);
    let stations = catalog();

    sender
        .tick(Some(north_of(STOP, 300.0)), &stations)
        .unwrap()
        .dispatch
        .settled()
        .await;
    assert_eq!(backend.fence_in_count(), 0);

    let tick = sender.tick(Some(STOP), &stations).unwrap();
    assert_eq!(tick.entered, vec![101]);
    tick.dispatch.settled().await;
    assert_eq!(backend.fence_in_count(), 1);
    assert_eq!(sender.delivery_state(101), Some(DeliveryState::Sent));

    let req = backend.fence_ins.lock().unwrap()[0].clone();
    assert_eq!(req.number, "01012345678");
    assert_eq!(req.station_identifier, "station-101");
    assert_eq!(req.name, "Nowon Station");

    let tick = sender.tick(Some(north_of(STOP, 300.0)), &stations).unwrap();
    assert_eq!(tick.exited, vec![101]);
    tick.dispatch.settled().await;
    assert_eq!(backend.fence_out_count(), 1);
    assert_eq!(sender.delivery_state(101), None);
    assert!(sender.pending_stations().is_empty());
}

#[tokio::test]
async fn test_stalled_fence_in_is_not_repeated() {
    let backend = MockBackend::new();
    backend.set(&backend.stall_fence_in, true);
    let mut sender = sender(&backend);
    let stations = catalog();

    for _ in 0..5 {
        // Dropping the dispatch detaches the stalled call.
        let _ = sender.tick(Some(STOP), &stations);
        settle().await;
    }

    assert_eq!(backend.fence_in_count(), 1);
    assert_eq!(
        sender.delivery_state(101),
        Some(DeliveryState::Entering { left: false })
    );
}

#[tokio::test]
async fn test_failed_fence_in_is_not_retried_within_streak() {
    let backend = MockBackend::new();
    backend.set(&backend.fail_fence_in, true);
    let mut sender = sender(&backend);
    let stations = catalog();
    let mut events = sender.subscribe();

    sender.tick(Some(STOP), &stations).unwrap().dispatch.settled().await;
    assert_eq!(backend.fence_in_count(), 1);
    assert_eq!(sender.delivery_state(101), None);
    assert!(events.try_recv().is_err(), "no toast for a failed fence-in");

    for _ in 0..3 {
        sender.tick(Some(STOP), &stations).unwrap().dispatch.settled().await;
    }
    assert_eq!(backend.fence_in_count(), 1);

    // Leaving a station that was never acknowledged sends no fence-out.
    sender
        .tick(Some(north_of(STOP, 300.0)), &stations)
        .unwrap()
        .dispatch
        .settled()
        .await;
    assert_eq!(backend.fence_out_count(), 0);

    // A fresh streak tries again.
    backend.set(&backend.fail_fence_in, false);
    sender.tick(Some(STOP), &stations).unwrap().dispatch.settled().await;
    assert_eq!(backend.fence_in_count(), 2);
    assert_eq!(sender.delivery_state(101), Some(DeliveryState::Sent));
}

#[tokio::test]
async fn test_entered_event_published_on_ack() {
    let backend = MockBackend::new();
    let mut sender = sender(&backend);
    let stations = catalog();
    let mut events = sender.subscribe();

    sender.tick(Some(STOP), &stations).unwrap().dispatch.settled().await;

    match events.try_recv() {
        Ok(FenceEvent::Entered(s)) => assert_eq!(s.name, "Nowon Station"),
        other => panic!("expected Entered, got {other:?}"),
    }

    sender
        .tick(Some(north_of(STOP, 300.0)), &stations)
        .unwrap()
        .dispatch
        .settled()
        .await;
    assert!(matches!(events.try_recv(), Ok(FenceEvent::Exited(_))));
}

#[tokio::test]
async fn test_failed_fence_out_stays_pending_and_retries_with_backoff() {
    let backend = MockBackend::new();
    let mut sender = sender(&backend).with_backoff(ExitBackoff {
        initial: Duration::from_secs(10),
        max: Duration::from_secs(60),
    });
    let stations = catalog();

    sender.tick(Some(STOP), &stations).unwrap().dispatch.settled().await;

    backend.set(&backend.fail_fence_out, true);
    let away = north_of(STOP, 300.0);
    sender.tick(Some(away), &stations).unwrap().dispatch.settled().await;
    assert_eq!(backend.fence_out_count(), 1);
    assert!(matches!(
        sender.delivery_state(101),
        Some(DeliveryState::ExitPending { attempts: 1, .. })
    ));
    assert_eq!(sender.pending_stations(), vec![101]);

    // Not due yet.
    let early = sender.retry_pending_exits(Instant::now());
    assert!(early.is_empty());

    // Due, but the backend is still down: backoff grows.
    sender
        .retry_pending_exits(Instant::now() + Duration::from_secs(11))
        .settled()
        .await;
    assert_eq!(backend.fence_out_count(), 2);
    assert!(matches!(
        sender.delivery_state(101),
        Some(DeliveryState::ExitPending { attempts: 2, .. })
    ));

    // Recovered.
    backend.set(&backend.fail_fence_out, false);
    let retry = sender.retry_pending_exits(Instant::now() + Duration::from_secs(3_600));
    assert_eq!(retry.len(), 1);
    retry.settled().await;
    assert_eq!(backend.fence_out_count(), 3);
    assert_eq!(sender.delivery_state(101), None);

    // No fence-in was ever duplicated along the way.
    assert_eq!(backend.fence_in_count(), 1);
}

#[tokio::test]
async fn test_reentering_with_exit_pending_does_not_fence_in_again() {
    let backend = MockBackend::new();
    let mut sender = sender(&backend);
    let stations = catalog();

    sender.tick(Some(STOP), &stations).unwrap().dispatch.settled().await;
    backend.set(&backend.fail_fence_out, true);
    sender
        .tick(Some(north_of(STOP, 300.0)), &stations)
        .unwrap()
        .dispatch
        .settled()
        .await;

    sender.tick(Some(STOP), &stations).unwrap().dispatch.settled().await;
    assert_eq!(backend.fence_in_count(), 1);
    assert_eq!(sender.delivery_state(101), Some(DeliveryState::Sent));
}

#[tokio::test]
async fn test_viewport_limits_candidates() {
    let backend = MockBackend::new();
    let mut sender = sender(&backend);
    let stations = catalog();

    // Looking at Junggye while standing at Nowon.
    sender.set_viewport(Some(Viewport::around(
        north_of(STOP, 2_000.0),
        0.01,
        0.01,
    )));
    let tick = sender.tick(Some(STOP), &stations).unwrap();
    assert!(tick.entered.is_empty());
    tick.dispatch.settled().await;
    assert_eq!(backend.fence_in_count(), 0);

    sender.set_viewport(Some(Viewport::around(STOP, 0.01, 0.01)));
    sender.tick(Some(STOP), &stations).unwrap().dispatch.settled().await;
    assert_eq!(backend.fence_in_count(), 1);
}

#[tokio::test]
async fn test_scrolling_away_is_not_an_exit() {
    let backend = MockBackend::new();
    let mut sender = sender(&backend);
    let stations = catalog();

    sender.tick(Some(STOP), &stations).unwrap().dispatch.settled().await;
    assert_eq!(backend.fence_in_count(), 1);

    // Nowon scrolls out of view; Junggye is still a candidate.
    sender.set_viewport(Some(Viewport::around(
        north_of(STOP, 2_000.0),
        0.01,
        0.01,
    )));
    let tick = sender.tick(Some(STOP), &stations).unwrap();
    assert!(tick.exited.is_empty());
    tick.dispatch.settled().await;
    assert_eq!(backend.fence_out_count(), 0);
    assert_eq!(sender.delivery_state(101), Some(DeliveryState::Sent));

    // Back in view: entered again from scratch, but no second fence-in.
    sender.set_viewport(None);
    let tick = sender.tick(Some(STOP), &stations).unwrap();
    assert_eq!(tick.entered, vec![101]);
    tick.dispatch.settled().await;
    assert_eq!(backend.fence_in_count(), 1);
}

#[tokio::test]
async fn test_no_visible_station_is_a_skip() {
    let backend = MockBackend::new();
    let mut sender = sender(&backend);
    let stations = catalog();

    sender.tick(Some(STOP), &stations).unwrap().dispatch.settled().await;

    sender.set_viewport(Some(Viewport::around(GeoPoint::new(35.1, 129.0), 0.01, 0.01)));
    assert!(sender.tick(Some(STOP), &stations).is_none());
    assert_eq!(sender.inside(), vec![101], "skipped tick keeps membership");
}

#[tokio::test]
async fn test_missing_fix_is_a_noop() {
    let backend = MockBackend::new();
    let mut sender = sender(&backend);
    let stations = catalog();

    sender.tick(Some(STOP), &stations).unwrap().dispatch.settled().await;
    let calls = backend.network_calls();

    for _ in 0..3 {
        assert!(sender.tick(None, &stations).is_none());
    }
    settle().await;

    assert_eq!(backend.network_calls(), calls);
    assert_eq!(sender.inside(), vec![101]);
}

#[tokio::test]
async fn test_exit_before_fence_in_ack_sends_fence_out_after_ack() {
    let backend = MockBackend::new();
    let mut sender = sender(&backend);
    let stations = catalog();

    // Enter and leave before the spawned fence-in gets to run.
    let enter = sender.tick(Some(STOP), &stations).unwrap();
    let leave = sender.tick(Some(north_of(STOP, 300.0)), &stations).unwrap();
    assert!(leave.dispatch.is_empty());
    assert_eq!(
        sender.delivery_state(101),
        Some(DeliveryState::Entering { left: true })
    );

    enter.dispatch.settled().await;
    assert_eq!(backend.fence_in_count(), 1);
    assert_eq!(backend.fence_out_count(), 1);
    assert_eq!(sender.delivery_state(101), None);
}
