#![allow(clippy::unwrap_used)]
// Selected-building context: explicit selection, pushed events and
// selection-filtered views.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;

use common::{ScriptedBackend, building, eventually, of_kind, room};
use survey_api::BackendEvent;
use survey_core::{BuildingKey, CoreError, NotificationKind, Session};

// ── Helpers ─────────────────────────────────────────────────────────

async fn session_with(backend: ScriptedBackend) -> Session<ScriptedBackend> {
    let session = Session::new(backend, None);
    session.buildings().fetch_all().await.unwrap();
    session.rooms().fetch_all().await.unwrap();
    session.notifications().reset();
    session
}

fn keys(session: &Session<ScriptedBackend>) -> Vec<String> {
    session
        .buildings()
        .snapshot()
        .iter()
        .map(|b| b.key.to_string())
        .collect()
}

// ── Pushed events ───────────────────────────────────────────────────

#[tokio::test]
async fn test_new_building_is_appended_and_selected() {
    let session = session_with(ScriptedBackend::new().with_buildings(vec![building("B1")])).await;

    session
        .selection()
        .handle_event(BackendEvent::NewBuilding {
            buildings: vec![building("B2")],
            selected_key: "B2".into(),
        })
        .unwrap();

    assert_eq!(keys(&session), vec!["B1", "B2"]);
    let current = session.selection().current().unwrap();
    assert_eq!(*current, building("B2"));
    // The selection is the stored record itself, not a copy.
    let stored = session.buildings().find(&"B2".into()).unwrap();
    assert!(Arc::ptr_eq(&current, &stored));
}

#[tokio::test]
async fn test_new_building_with_known_key_replaces_the_stored_record() {
    let session = session_with(
        ScriptedBackend::new().with_buildings(vec![building("B1"), building("B2")]),
    )
    .await;

    let mut renamed = building("B1");
    renamed.name = "Town hall".into();
    session
        .selection()
        .handle_event(BackendEvent::NewBuilding {
            buildings: vec![renamed.clone(), building("B3")],
            selected_key: "B1".into(),
        })
        .unwrap();

    assert_eq!(keys(&session), vec!["B1", "B2", "B3"]);
    let current = session.selection().current().unwrap();
    assert_eq!(*current, renamed);
    let stored = session.buildings().find(&"B1".into()).unwrap();
    assert!(Arc::ptr_eq(&current, &stored));
}

#[tokio::test]
async fn test_unknown_building_change_is_reported_once() {
    let session = session_with(ScriptedBackend::new().with_buildings(vec![building("B1")])).await;
    session.select_building(&"B1".into()).await.unwrap();
    session.notifications().reset();

    let err = session
        .selection()
        .handle_event(BackendEvent::BuildingChanged { key: "ZZZ".into() })
        .unwrap_err();

    assert!(err.is_consistency());
    assert_eq!(
        of_kind(&session.notifications().snapshot(), NotificationKind::Error),
        vec!["Building not found: ZZZ".to_owned()]
    );
    assert_eq!(session.notifications().len(), 1);
    assert_eq!(session.selection().current().unwrap().key, BuildingKey::from("B1"));
    assert!(matches!(
        session.selection().last_error(),
        Some(CoreError::BuildingNotFound { .. })
    ));
    assert!(!session.reload().need_reload());
}

#[tokio::test]
async fn test_unrecognized_event_is_a_consistency_error() {
    let session = session_with(ScriptedBackend::new().with_buildings(vec![building("B1")])).await;

    let err = session
        .selection()
        .handle_event(BackendEvent::Unrecognized {
            tag: "meter_reading".into(),
        })
        .unwrap_err();

    assert!(matches!(err, CoreError::UnrecognizedEvent { .. }));
    assert_eq!(session.selection().current(), None);
    assert_eq!(session.notifications().len(), 1);
}

#[tokio::test]
async fn test_building_change_selects_and_reloads() {
    let session = session_with(
        ScriptedBackend::new().with_buildings(vec![building("B1"), building("B2")]),
    )
    .await;
    session.start().await;
    eventually("initial load", || session.reload().pending().is_empty()).await;
    let mut signals = session.reload().subscribe();

    session
        .backend()
        .emit(BackendEvent::BuildingChanged { key: "B2".into() });

    eventually("selection follows backend", || {
        session
            .selection()
            .current()
            .is_some_and(|b| b.key.as_str() == "B2")
    })
    .await;
    assert!(matches!(
        signals.recv().await.unwrap(),
        survey_core::ReloadSignal::Requested { .. }
    ));
    eventually("reload finished", || !session.is_loading()).await;
    assert_eq!(session.backend().calls("list_buildings"), 3);

    session.shutdown().await;
}

// ── Explicit selection ──────────────────────────────────────────────

#[tokio::test]
async fn test_select_persists_before_updating() {
    let session = session_with(ScriptedBackend::new().with_buildings(vec![building("B1")])).await;

    let selected = session.select_building(&"B1".into()).await.unwrap();

    assert_eq!(selected.key, BuildingKey::from("B1"));
    assert_eq!(session.backend().selected(), Some("B1".into()));
    assert_eq!(session.selection().current(), Some(selected));
}

#[tokio::test]
async fn test_failed_select_keeps_current() {
    let session = session_with(
        ScriptedBackend::new().with_buildings(vec![building("B1"), building("B2")]),
    )
    .await;
    session.select_building(&"B1".into()).await.unwrap();
    session.backend().fail("select_building");

    let err = session.select_building(&"B2".into()).await.unwrap_err();

    assert!(matches!(err, CoreError::Backend { .. }));
    assert_eq!(session.selection().current().unwrap().key, BuildingKey::from("B1"));
    assert_eq!(
        of_kind(&session.notifications().snapshot(), NotificationKind::Error),
        vec!["select_building failed: scripted failure".to_owned()]
    );
}

#[tokio::test]
async fn test_selection_cleared_when_building_disappears() {
    let session = session_with(ScriptedBackend::new().with_buildings(vec![building("B1")])).await;
    session.start().await;
    eventually("initial load", || session.reload().pending().is_empty()).await;
    session.select_building(&"B1".into()).await.unwrap();

    session.backend().set_buildings(vec![building("B9")]);
    session.request_switch("empty.db").await.unwrap();

    eventually("selection dropped", || session.selection().current().is_none()).await;
    assert!(!session.selection().loading());
    session.shutdown().await;
}

// ── Filtered views ──────────────────────────────────────────────────

#[tokio::test]
async fn test_rooms_follow_selected_building() {
    let session = session_with(
        ScriptedBackend::new()
            .with_buildings(vec![building("B1"), building("B2")])
            .with_rooms(vec![
                room(1, "B1", "Kitchen"),
                room(2, "B2", "Office"),
                room(3, "B1", "Hall"),
            ]),
    )
    .await;
    assert!(session.rooms().for_selected().is_empty());
    let mut view = session.rooms().watch_selected().unwrap();

    session.select_building(&"B1".into()).await.unwrap();
    let labels: Vec<String> = view
        .changed()
        .await
        .unwrap()
        .iter()
        .map(|r| r.label.clone())
        .collect();
    assert_eq!(labels, vec!["Kitchen", "Hall"]);

    session.select_building(&"B2".into()).await.unwrap();
    let rooms = session.rooms().for_selected();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].label, "Office");
}
