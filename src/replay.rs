//! Scenario replay
//!
//! Drives a [`LeashEngine`] over an in-memory scene from a JSON scenario and
//! reports where everything ended up. Scenario shape:
//!
//! ```json
//! {
//!   "scene": "demo",
//!   "dimensions": { "grid_size_px": 100, "grid_distance_units": 5 },
//!   "settings": "leash.toml",
//!   "entities": [ { "id": "h", "x": 0, "y": 0 }, { "id": "t", "x": 100, "y": 0 } ],
//!   "leashes": [ { "target": "t", "handler": "h", "distance": 10 } ],
//!   "events": [
//!     { "at_ms": 0, "kind": "propose", "entity": "h", "x": 300, "y": 0 },
//!     { "at_ms": 16, "kind": "commit", "entity": "h" }
//!   ]
//! }
//! ```
//!
//! `settings` is resolved relative to the scenario file. Events go through
//! the same validation as live host payloads; `at_ms` drives the engine clock.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use leashkit_core::{
    Actor, Clock, EngineConfig, Entity, EntityId, Error, EventBusConfig, Handled, LeashEngine,
    LeashError, LeashEvent, LeashEventBus, ManualClock, MemoryScene, MoveEvent, Point,
    SceneDimensions, SceneQuery, Verdict,
};
use leashkit_settings::LeashSettings;

fn default_scene_id() -> String {
    "scene".to_string()
}

/// A leash to create before the events run.
#[derive(Debug, Clone, Deserialize)]
pub struct LeashSpec {
    pub target: EntityId,
    pub handler: EntityId,
    /// Falls back to the settings' default distance.
    pub distance: Option<f64>,
    /// Who creates the leash; checked against the settings' `gm_only`.
    #[serde(default)]
    pub actor: Actor,
}

/// A recorded sequence of host events.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_scene_id")]
    pub scene: String,
    #[serde(default)]
    pub dimensions: Option<SceneDimensions>,
    /// Settings file, relative to the scenario.
    #[serde(default)]
    pub settings: Option<PathBuf>,
    /// Overrides the engine section of the settings.
    #[serde(default)]
    pub engine: Option<EngineConfig>,
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub leashes: Vec<LeashSpec>,
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
}

impl Scenario {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parsing scenario {}", path.display()))
    }
}

/// Outcome of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    /// Final top-left corner of every entity.
    pub positions: BTreeMap<EntityId, Point>,
    /// Leashes whose actor was not allowed to create them.
    pub refused_leashes: usize,
    pub blocked: usize,
    pub clamped: usize,
    pub failed_commits: usize,
    pub events: Vec<LeashEvent>,
}

/// Runs `scenario`. `base_dir` resolves the settings path.
pub async fn run(scenario: Scenario, base_dir: &Path) -> anyhow::Result<ReplayReport> {
    let settings = match &scenario.settings {
        Some(path) => {
            let path = base_dir.join(path);
            LeashSettings::load_from_file(&path)
                .with_context(|| format!("loading settings {}", path.display()))?
        }
        None => LeashSettings::default(),
    };
    let config = scenario.engine.unwrap_or_else(|| settings.to_engine_config());

    let scene = Arc::new(match scenario.dimensions {
        Some(dims) => MemoryScene::new(scenario.scene.clone(), dims),
        None => MemoryScene::without_dimensions(scenario.scene.clone()),
    });
    for entity in scenario.entities {
        scene.insert(entity);
    }

    let clock = Arc::new(ManualClock::new());
    let start = clock.now();
    let bus = Arc::new(LeashEventBus::with_config(
        EventBusConfig::default().with_history(100_000),
    ));
    let engine = LeashEngine::new(scene.clone())
        .with_config(config)
        .with_access(settings.leash_access())
        .with_clock(clock.clone())
        .with_event_bus(bus.clone());

    let mut report = ReplayReport {
        positions: BTreeMap::new(),
        refused_leashes: 0,
        blocked: 0,
        clamped: 0,
        failed_commits: 0,
        events: Vec::new(),
    };

    for leash in &scenario.leashes {
        let distance = leash.distance.unwrap_or(settings.default_distance);
        match engine
            .apply_leash_as(leash.actor, &leash.target, &leash.handler, distance)
            .await
        {
            Ok(_) => {}
            Err(Error::Leash(LeashError::NotPermitted)) => {
                tracing::warn!("{:?} may not leash {}", leash.actor, leash.target);
                report.refused_leashes += 1;
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("leashing {} to {}", leash.target, leash.handler));
            }
        }
    }

    for (i, raw) in scenario.events.iter().enumerate() {
        if let Some(at_ms) = raw.get("at_ms").and_then(serde_json::Value::as_u64) {
            let target = start + Duration::from_millis(at_ms);
            let now = clock.now();
            if target > now {
                clock.advance(target - now);
            }
        }

        let event = MoveEvent::from_json(raw).with_context(|| format!("event #{}", i))?;
        if let MoveEvent::Deleted { entity } = &event {
            scene.remove(entity);
        }

        match engine.handle(event).await {
            Handled::Proposal { verdict, proposal } => {
                match verdict {
                    Verdict::Block { .. } => {
                        report.blocked += 1;
                        continue;
                    }
                    Verdict::Clamp { .. } => report.clamped += 1,
                    Verdict::Allow => {}
                }
                if let Some(entity) = scene.entity(&proposal.entity) {
                    let (x, y) = proposal.resolve(&entity);
                    scene.set_position(&proposal.entity, x, y);
                }
            }
            Handled::Commit(None) => report.failed_commits += 1,
            Handled::Commit(Some(_)) | Handled::Deleted(_) => {}
        }
    }

    for entity in scene.entities() {
        report
            .positions
            .insert(entity.id.clone(), Point::new(entity.x, entity.y));
    }
    report.events = bus.take_history();
    tracing::info!(
        "Replayed {} event(s): {} blocked, {} clamped",
        scenario.events.len(),
        report.blocked,
        report.clamped
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scenario(value: serde_json::Value) -> Scenario {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_replay_drag() {
        let scenario = scenario(json!({
            "dimensions": { "grid_size_px": 100, "grid_distance_units": 5 },
            "entities": [
                { "id": "h", "x": -50, "y": -50 },
                { "id": "t", "x": -20, "y": -50 }
            ],
            "leashes": [ { "target": "t", "handler": "h", "distance": 100 } ],
            "events": [
                { "at_ms": 0, "kind": "propose", "entity": "h", "x": 50, "y": -50 },
                { "at_ms": 16, "kind": "commit", "entity": "h" }
            ]
        }));

        let report = run(scenario, Path::new(".")).await.unwrap();

        assert_eq!(report.positions[&EntityId::new("t")], Point::new(80.0, -50.0));
        assert_eq!(report.blocked, 0);
    }

    #[tokio::test]
    async fn test_replay_counts_blocked_moves() {
        let scenario = scenario(json!({
            "dimensions": { "grid_size_px": 100, "grid_distance_units": 5 },
            "entities": [
                { "id": "h", "x": 0, "y": 0 },
                { "id": "t", "x": 100, "y": 0 }
            ],
            "leashes": [ { "target": "t", "handler": "h" } ],
            "events": [ { "kind": "propose", "entity": "t", "x": 900, "y": 0 } ]
        }));

        let report = run(scenario, Path::new(".")).await.unwrap();

        assert_eq!(report.blocked, 1);
        assert_eq!(report.positions[&EntityId::new("t")], Point::new(100.0, 0.0));
    }

    #[tokio::test]
    async fn test_replay_refuses_player_leash_when_gm_only() {
        let scenario = scenario(json!({
            "dimensions": { "grid_size_px": 100, "grid_distance_units": 5 },
            "entities": [
                { "id": "h", "x": 0, "y": 0 },
                { "id": "t", "x": 100, "y": 0 },
                { "id": "u", "x": 0, "y": 100 }
            ],
            "leashes": [
                { "target": "t", "handler": "h", "actor": "player" },
                { "target": "u", "handler": "h", "actor": "gm" }
            ],
            "events": [
                { "kind": "propose", "entity": "t", "x": 900, "y": 0 },
                { "kind": "propose", "entity": "u", "x": 0, "y": 900 }
            ]
        }));

        let report = run(scenario, Path::new(".")).await.unwrap();

        assert_eq!(report.refused_leashes, 1);
        assert_eq!(report.blocked, 1);
        assert_eq!(report.positions[&EntityId::new("t")], Point::new(900.0, 0.0));
        assert_eq!(report.positions[&EntityId::new("u")], Point::new(0.0, 100.0));
    }

    #[tokio::test]
    async fn test_replay_rejects_malformed_event() {
        let scenario = scenario(json!({
            "entities": [ { "id": "h", "x": 0, "y": 0 } ],
            "events": [ { "kind": "teleport", "entity": "h" } ]
        }));

        assert!(run(scenario, Path::new(".")).await.is_err());
    }

    #[tokio::test]
    async fn test_replay_reads_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("leash.toml"),
            "default_distance = 5.0\n\n[engine]\nexceed_policy = \"clamp\"\n",
        )
        .unwrap();
        let scenario = scenario(json!({
            "dimensions": { "grid_size_px": 100, "grid_distance_units": 5 },
            "settings": "leash.toml",
            "entities": [
                { "id": "h", "x": 0, "y": 0 },
                { "id": "t", "x": 100, "y": 0 }
            ],
            "leashes": [ { "target": "t", "handler": "h" } ],
            "events": [ { "kind": "propose", "entity": "t", "x": 900, "y": 0 } ]
        }));

        let report = run(scenario, dir.path()).await.unwrap();

        assert_eq!(report.clamped, 1);
        let t = report.positions[&EntityId::new("t")];
        assert!((t.x - 100.0).abs() < 0.01, "x = {}", t.x);
    }
}
