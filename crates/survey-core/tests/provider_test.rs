#![allow(clippy::unwrap_used)]
// Provider fetch and mutation semantics against a scripted backend.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;

use common::{ScriptedBackend, building, gas_connection, of_kind, room, window};
use survey_core::model::Entity;
use survey_core::{
    Building, BuildingUpdate, CoreError, Fixture, FixtureKind, FixtureUpdate, Glazing, NewFixture,
    NewUtility, NotificationChannel, NotificationKind, Operation, Provider, ReloadCoordinator,
    Room, UpdateOutcome, Utility, UtilityKind,
};

// ── Helpers ─────────────────────────────────────────────────────────

struct Setup<E: Entity> {
    provider: Provider<E, ScriptedBackend>,
    backend: Arc<ScriptedBackend>,
    notifications: NotificationChannel,
}

async fn loaded<E: Entity>(backend: ScriptedBackend) -> Setup<E> {
    let backend = Arc::new(backend);
    let notifications = NotificationChannel::new();
    let reload = ReloadCoordinator::new(notifications.clone());
    let provider = Provider::new(Arc::clone(&backend), notifications.clone(), reload);
    provider.fetch_all().await.unwrap();
    notifications.reset();
    Setup {
        provider,
        backend,
        notifications,
    }
}

fn values<E: Clone>(snapshot: &[Arc<E>]) -> Vec<E> {
    snapshot.iter().map(|e| (**e).clone()).collect()
}

// ── Fetch ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_replaces_collection_and_notifies() {
    let backend = Arc::new(
        ScriptedBackend::new().with_rooms(vec![room(1, "B1", "Kitchen"), room(2, "B1", "Hall")]),
    );
    let notifications = NotificationChannel::new();
    let reload = ReloadCoordinator::new(notifications.clone());
    let rooms: Provider<Room, _> = Provider::new(backend, notifications.clone(), reload);

    assert_eq!(rooms.fetch_all().await.unwrap(), 2);

    assert_eq!(rooms.len(), 2);
    assert_eq!(
        of_kind(&notifications.snapshot(), NotificationKind::Success),
        vec!["Loaded 2 rooms".to_owned()]
    );
}

#[tokio::test]
async fn test_failed_fetch_keeps_previous_collection() {
    let s = loaded::<Fixture>(
        ScriptedBackend::new().with_fixtures(vec![window("B1", "A", 100.0, 120.0)]),
    )
    .await;
    let before = s.provider.snapshot();

    s.backend.fail("list_fixtures");
    let err = s.provider.fetch_all().await.unwrap_err();

    assert!(matches!(err, CoreError::Backend { .. }));
    assert!(Arc::ptr_eq(&before, &s.provider.snapshot()));
    assert_eq!(
        of_kind(&s.notifications.snapshot(), NotificationKind::Error),
        vec!["list_fixtures failed: scripted failure".to_owned()]
    );
    assert!(s.provider.last_error(Operation::Fetch).is_some());

    s.backend.recover("list_fixtures");
    s.provider.fetch_all().await.unwrap();
    assert!(s.provider.last_error(Operation::Fetch).is_none());
}

// ── Update ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_update_merges_authoritative_record() {
    let s = loaded::<Fixture>(ScriptedBackend::new().with_fixtures(vec![
        window("B1", "A", 100.0, 200.0),
        window("B1", "B", 80.0, 90.0),
    ]))
    .await;
    let untouched = Arc::clone(&s.provider.snapshot()[1]);

    let outcome = s
        .provider
        .update(&FixtureUpdate {
            building_key: "B1".into(),
            code: "A".into(),
            width_cm: Some(500.0),
            ..FixtureUpdate::default()
        })
        .await
        .unwrap();

    let UpdateOutcome::Updated(record) = outcome else {
        panic!("expected an updated record");
    };
    assert_eq!(*record, window("B1", "A", 500.0, 200.0));
    assert_eq!(
        values(&s.provider.snapshot()),
        vec![window("B1", "A", 500.0, 200.0), window("B1", "B", 80.0, 90.0)]
    );
    assert!(Arc::ptr_eq(&untouched, &s.provider.snapshot()[1]));
    assert_eq!(
        of_kind(&s.notifications.snapshot(), NotificationKind::Success),
        vec!["Window or door updated".to_owned()]
    );
}

#[tokio::test]
async fn test_update_with_no_rows_is_informational() {
    let s = loaded::<Building>(ScriptedBackend::new().with_buildings(vec![building("B1")])).await;
    s.backend.no_rows("update_building");
    let before = s.provider.snapshot();

    let outcome = s
        .provider
        .update(&BuildingUpdate {
            key: "B1".into(),
            name: Some("Town hall".into()),
            ..BuildingUpdate::default()
        })
        .await
        .unwrap();

    assert_eq!(outcome, UpdateOutcome::NoRowsUpdated);
    assert!(Arc::ptr_eq(&before, &s.provider.snapshot()));
    let queue = s.notifications.snapshot();
    assert_eq!(
        of_kind(&queue, NotificationKind::Info),
        vec!["update_building: nothing was changed".to_owned()]
    );
    assert!(of_kind(&queue, NotificationKind::Error).is_empty());
}

#[tokio::test]
async fn test_room_update_applies_sent_record() {
    let s = loaded::<Room>(
        ScriptedBackend::new().with_rooms(vec![room(1, "B1", "Kitchen"), room(2, "B1", "Hall")]),
    )
    .await;
    let mut edited = room(2, "B1", "Hallway");
    edited.area_m2 = Some(12.5);

    s.provider.update(&edited).await.unwrap();

    assert_eq!(
        values(&s.provider.snapshot()),
        vec![room(1, "B1", "Kitchen"), edited]
    );
}

#[tokio::test]
async fn test_invalid_update_is_not_sent_or_notified() {
    let s = loaded::<Fixture>(
        ScriptedBackend::new().with_fixtures(vec![window("B1", "A", 100.0, 200.0)]),
    )
    .await;

    let err = s
        .provider
        .update(&FixtureUpdate {
            building_key: "B1".into(),
            code: "A".into(),
            width_cm: Some(2.0),
            ..FixtureUpdate::default()
        })
        .await
        .unwrap_err();

    let CoreError::Validation(errors) = err else {
        panic!("expected a validation error");
    };
    assert!(errors.field("width_cm").is_some());
    assert_eq!(s.backend.calls("update_fixture"), 0);
    assert!(s.notifications.is_empty());
}

// ── Insert ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_insert_appends_backend_record() {
    let s = loaded::<Fixture>(
        ScriptedBackend::new().with_fixtures(vec![window("B1", "A", 100.0, 200.0)]),
    )
    .await;

    let stored = s
        .provider
        .insert(&NewFixture {
            building_key: "B1".into(),
            room_id: Some(1),
            kind: FixtureKind::Door,
            width_cm: 90.0,
            height_cm: 210.0,
            material: None,
            glazing: Glazing::None,
        })
        .await
        .unwrap();

    assert_eq!(stored.code, "B");
    assert_eq!(s.provider.len(), 2);
    assert!(Arc::ptr_eq(&stored, &s.provider.snapshot()[1]));
    assert_eq!(
        of_kind(&s.notifications.snapshot(), NotificationKind::Success),
        vec!["Window or door added".to_owned()]
    );
}

#[tokio::test]
async fn test_failed_insert_appends_nothing() {
    let s = loaded::<Utility>(ScriptedBackend::new().with_utilities(vec![gas_connection(1, "B1")]))
        .await;
    s.backend.fail("insert_utility");

    let err = s
        .provider
        .insert(&NewUtility {
            building_key: "B1".into(),
            kind: UtilityKind::Water,
            meter_number: None,
            supplier: Some("City works".into()),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Backend { .. }));
    assert_eq!(values(&s.provider.snapshot()), vec![gas_connection(1, "B1")]);
    assert_eq!(
        of_kind(&s.notifications.snapshot(), NotificationKind::Error),
        vec!["insert_utility failed: scripted failure".to_owned()]
    );
    assert!(s.provider.last_error(Operation::Insert).is_some());
}
