#![allow(dead_code)]

use std::sync::Arc;

use leashkit_core::{
    CachedIndex, CommitMove, EngineConfig, Entity, EntityId, EventBusConfig, LeashEngine, LeashEvent,
    LeashEventBus, LeashRelation, ManualClock, MemoryScene, Point, PropagationReport, ProposeMove,
    SceneDimensions, SceneId, Verdict,
};

pub const SCENE: &str = "scene-1";

/// 100px cells measuring 5 units each: 1 unit = 20px.
pub fn dims() -> SceneDimensions {
    SceneDimensions::new(100.0, 5.0)
}

pub fn scene() -> Arc<MemoryScene> {
    Arc::new(MemoryScene::new(SCENE, dims()))
}

/// Inserts a one-cell entity whose center is at `(cx, cy)`.
pub fn place(scene: &MemoryScene, id: &str, cx: f64, cy: f64) {
    scene.insert(Entity::new(id, cx - 50.0, cy - 50.0));
}

pub fn leash(scene: &MemoryScene, target: &str, handler: &str, distance: f64) {
    scene.put_leash(
        &EntityId::new(target),
        &LeashRelation::new(EntityId::new(handler), SceneId::new(SCENE), distance),
    );
}

pub fn center(scene: &MemoryScene, id: &str) -> Point {
    let top_left = scene
        .position(&EntityId::new(id))
        .unwrap_or_else(|| panic!("{id} missing"));
    Point::new(top_left.x + 50.0, top_left.y + 50.0)
}

pub fn assert_near(actual: Point, expected: Point) {
    assert!(
        actual.distance_to(expected) < 1e-6,
        "expected {expected}, got {actual}"
    );
}

pub struct Harness {
    pub scene: Arc<MemoryScene>,
    pub clock: Arc<ManualClock>,
    pub bus: Arc<LeashEventBus>,
    pub engine: LeashEngine<MemoryScene>,
}

pub fn harness(scene: Arc<MemoryScene>, config: EngineConfig) -> Harness {
    build(scene, config, false)
}

/// Like [`harness`], with a [`CachedIndex`] instead of full scans.
pub fn harness_cached(scene: Arc<MemoryScene>, config: EngineConfig) -> Harness {
    build(scene, config, true)
}

fn build(scene: Arc<MemoryScene>, config: EngineConfig, cached: bool) -> Harness {
    let clock = Arc::new(ManualClock::new());
    let bus = Arc::new(LeashEventBus::with_config(
        EventBusConfig::default().with_history(1000),
    ));
    let engine = LeashEngine::new(scene.clone())
        .with_config(config)
        .with_clock(clock.clone())
        .with_event_bus(bus.clone());
    let engine = if cached {
        engine.with_index(Box::new(CachedIndex::new()))
    } else {
        engine
    };
    Harness {
        scene,
        clock,
        bus,
        engine,
    }
}

impl Harness {
    /// Proposes moving `id`'s center to `(cx, cy)` and applies whatever the
    /// engine allows, as a host would. Returns the verdict.
    pub fn propose(&self, id: &str, cx: f64, cy: f64) -> Verdict {
        let mut proposal = ProposeMove::new(id, cx - 50.0, cy - 50.0);
        let verdict = self.engine.on_propose(&mut proposal);
        if !matches!(verdict, Verdict::Block { .. }) {
            if let (Some(x), Some(y)) = (proposal.x, proposal.y) {
                self.scene.set_position(&proposal.entity, x, y);
            }
        }
        verdict
    }

    /// Full propose/commit cycle for `id`.
    pub async fn drag(&self, id: &str, cx: f64, cy: f64) -> PropagationReport {
        let verdict = self.propose(id, cx, cy);
        assert!(
            !matches!(verdict, Verdict::Block { .. }),
            "drag of {id} was blocked"
        );
        self.engine
            .on_commit(&CommitMove::new(id))
            .await
            .unwrap_or_else(|e| panic!("commit failed: {e}"))
    }

    pub fn events(&self) -> Vec<LeashEvent> {
        self.bus.history()
    }
}
