mod common;

use common::*;
use leashkit_core::{
    Actor, EngineConfig, EntityId, Error, Handled, LeashAccess, LeashEngine, LeashError,
    LeashEvent, LeashRequest, MoveEvent, Point, RingVisibility,
};

#[tokio::test]
async fn test_apply_and_remove_leash() {
    let scene = scene();
    place(&scene, "h", 0.0, 0.0);
    place(&scene, "t", 30.0, 0.0);
    let h = harness(scene, EngineConfig::default());
    let (t, handler) = (EntityId::new("t"), EntityId::new("h"));

    let relation = h.engine.apply_leash(&t, &handler, 5.0).await.unwrap();
    assert_eq!(relation.handler_id, handler);
    assert_eq!(relation.scene_id.as_str(), SCENE);
    assert_eq!(h.engine.leash_of(&t), Some(relation.clone()));

    let removed = h.engine.remove_leash(&t).await.unwrap();
    assert_eq!(removed, Some(relation));
    assert_eq!(h.engine.leash_of(&t), None);

    // Removing again is fine and reports nothing.
    assert_eq!(h.engine.remove_leash(&t).await.unwrap(), None);

    let events = h.events();
    assert!(matches!(events[0], LeashEvent::Applied { .. }));
    assert!(matches!(events[1], LeashEvent::Removed { .. }));
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn test_players_cannot_manage_leashes_when_gm_only() {
    let scene = scene();
    place(&scene, "h", 0.0, 0.0);
    place(&scene, "t", 30.0, 0.0);
    let h = harness(scene, EngineConfig::default());
    let (t, handler) = (EntityId::new("t"), EntityId::new("h"));

    let err = h
        .engine
        .apply_leash_as(Actor::Player, &t, &handler, 5.0)
        .await
        .unwrap_err();
    assert_eq!(err, Error::Leash(LeashError::NotPermitted));
    assert_eq!(h.engine.leash_of(&t), None);

    h.engine
        .apply_leash_as(Actor::Gm, &t, &handler, 5.0)
        .await
        .unwrap();
    let err = h
        .engine
        .remove_leash_as(Actor::Player, &t)
        .await
        .unwrap_err();
    assert!(err.is_configuration_error());
    assert!(h.engine.leash_of(&t).is_some());

    // Only the GM's leash produced an event.
    assert_eq!(h.events().len(), 1);
}

#[tokio::test]
async fn test_open_access_lets_players_manage_leashes() {
    let scene = scene();
    place(&scene, "h", 0.0, 0.0);
    place(&scene, "t", 30.0, 0.0);
    let engine = LeashEngine::new(scene).with_access(LeashAccess::Everyone);
    let (t, handler) = (EntityId::new("t"), EntityId::new("h"));

    engine
        .apply_leash_as(Actor::Player, &t, &handler, 5.0)
        .await
        .unwrap();
    let removed = engine.remove_leash_as(Actor::Player, &t).await.unwrap();
    assert_eq!(removed.map(|r| r.handler_id), Some(handler));
}

#[tokio::test]
async fn test_reapplying_replaces_relation() {
    let scene = scene();
    place(&scene, "h1", 0.0, 0.0);
    place(&scene, "h2", 500.0, 0.0);
    place(&scene, "t", 30.0, 0.0);
    let h = harness_cached(scene, EngineConfig::default());
    let t = EntityId::new("t");

    h.engine
        .apply_leash(&t, &EntityId::new("h1"), 5.0)
        .await
        .unwrap();
    h.drag("h1", 10.0, 0.0).await;
    h.engine
        .apply_leash(&t, &EntityId::new("h2"), 5.0)
        .await
        .unwrap();

    // The old handler no longer pulls the target.
    let report = h.drag("h1", 200.0, 0.0).await;
    assert!(report.updates.is_empty());

    let report = h.drag("h2", 600.0, 0.0).await;
    assert_eq!(report.updates.len(), 1);
}

#[tokio::test]
async fn test_apply_rejects_bad_input() {
    let scene = scene();
    place(&scene, "h", 0.0, 0.0);
    place(&scene, "t", 30.0, 0.0);
    let h = harness(scene, EngineConfig::default());
    let (t, handler) = (EntityId::new("t"), EntityId::new("h"));

    let err = h.engine.apply_leash(&t, &handler, 0.0).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Leash(LeashError::InvalidDistance { .. })
    ));

    let err = h.engine.apply_leash(&t, &t, 5.0).await.unwrap_err();
    assert!(matches!(err, Error::Leash(LeashError::SelfLeash { .. })));

    let err = h
        .engine
        .apply_leash(&t, &EntityId::new("ghost"), 5.0)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Leash(LeashError::HandlerNotFound { .. })
    ));

    assert!(h.engine.leash_of(&t).is_none());
    assert!(h.events().is_empty());
}

#[tokio::test]
async fn test_store_failure_is_surfaced() {
    let scene = scene();
    place(&scene, "h", 0.0, 0.0);
    place(&scene, "t", 30.0, 0.0);
    scene.fail_attribute_writes(true);
    let h = harness(scene, EngineConfig::default());

    let err = h
        .engine
        .apply_leash(&EntityId::new("t"), &EntityId::new("h"), 5.0)
        .await
        .unwrap_err();

    assert!(err.is_store_error());
    assert!(h.engine.leash_of(&EntityId::new("t")).is_none());
}

#[tokio::test]
async fn test_apply_form_request() {
    let scene = scene();
    place(&scene, "h", 0.0, 0.0);
    place(&scene, "t", 30.0, 0.0);
    let h = harness(scene, EngineConfig::default());
    let t = EntityId::new("t");

    let options = h.engine.candidate_handlers(&t);
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].id.as_str(), "h");

    assert!(LeashRequest::parse("h", "abc").is_err());
    let request = LeashRequest::parse("h", "7.5").unwrap();
    let relation = h.engine.apply_request(&t, &request).await.unwrap();
    assert_eq!(relation.distance, 7.5);
}

#[tokio::test]
async fn test_deleting_handler_removes_its_leashes() {
    let scene = scene();
    place(&scene, "h", 0.0, 0.0);
    place(&scene, "a", 30.0, 0.0);
    place(&scene, "b", 0.0, 30.0);
    place(&scene, "other", 900.0, 0.0);
    leash(&scene, "a", "h", 5.0);
    leash(&scene, "b", "h", 5.0);
    leash(&scene, "other", "a", 5.0);
    let h = harness(scene, EngineConfig::default());

    let handled = h
        .engine
        .handle(MoveEvent::Deleted {
            entity: EntityId::new("h"),
        })
        .await;

    assert_eq!(handled, Handled::Deleted(2));
    assert!(h.engine.leash_of(&EntityId::new("a")).is_none());
    assert!(h.engine.leash_of(&EntityId::new("b")).is_none());
    assert!(h.engine.leash_of(&EntityId::new("other")).is_some());
}

#[tokio::test]
async fn test_deleting_target_removes_its_leash() {
    let scene = scene();
    place(&scene, "h", 0.0, 0.0);
    place(&scene, "t", 30.0, 0.0);
    leash(&scene, "t", "h", 5.0);
    let h = harness(scene, EngineConfig::default());

    let removed = h.engine.on_entity_deleted(&EntityId::new("t")).await;

    assert_eq!(removed, 1);
    assert!(h.engine.leash_of(&EntityId::new("t")).is_none());
}

#[tokio::test]
async fn test_handle_validated_json_events() {
    let scene = scene();
    place(&scene, "h", 0.0, 0.0);
    place(&scene, "t", 30.0, 0.0);
    leash(&scene, "t", "h", 100.0);
    let h = harness(scene, EngineConfig::default());

    let propose = MoveEvent::from_json(&serde_json::json!({
        "kind": "propose",
        "entity": "h",
        "x": 50.0,
        "y": -50.0,
    }))
    .unwrap();
    let Handled::Proposal { proposal, .. } = h.engine.handle(propose).await else {
        panic!("expected a proposal outcome");
    };
    h.scene
        .set_position(&proposal.entity, proposal.x.unwrap(), proposal.y.unwrap());

    let commit = MoveEvent::from_json(&serde_json::json!({ "kind": "commit", "entity": "h" }))
        .unwrap();
    let Handled::Commit(Some(report)) = h.engine.handle(commit).await else {
        panic!("expected a successful commit");
    };

    assert_eq!(report.updates.len(), 1);
    assert_near(center(&h.scene, "t"), Point::new(130.0, 0.0));
}

#[tokio::test]
async fn test_rings_follow_visibility() {
    let scene = scene();
    place(&scene, "h", 0.0, 0.0);
    place(&scene, "t", 30.0, 0.0);
    leash(&scene, "t", "h", 5.0);
    let h = harness(scene, EngineConfig::default());

    assert!(h.engine.rings(RingVisibility::Hover, None).is_empty());
    let rings = h
        .engine
        .rings(RingVisibility::Hover, Some(&EntityId::new("h")));
    assert_eq!(rings.len(), 1);
    assert_eq!(rings[0].radius_px, 100.0);
    assert!(h.engine.rings(RingVisibility::Never, None).is_empty());
}

#[tokio::test]
async fn test_reset_drops_sessions() {
    let scene = scene();
    place(&scene, "h", 0.0, 0.0);
    place(&scene, "t", 30.0, 0.0);
    leash(&scene, "t", "h", 5.0);
    let h = harness(scene, EngineConfig::default());

    h.propose("h", 10.0, 0.0);
    assert_eq!(h.engine.session_count(), 1);

    h.engine.reset();
    assert_eq!(h.engine.session_count(), 0);
}
