//! In-memory host
//!
//! A complete [`LeashHost`](crate::host::LeashHost) backed by maps. Used by
//! tests, benchmarks, and the replay tool. Attribute and batch write failures
//! can be injected to exercise the engine's error paths.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;

use crate::error::{SceneError, StoreError};
use crate::geometry::{Point, SceneDimensions};
use crate::host::{
    AttributeStore, Entity, EntityId, PositionUpdate, PositionWriter, SceneId, SceneQuery,
    UpdateOrigin,
};
use crate::relation::{LeashRelation, LEASH_ATTRIBUTE};

#[derive(Debug, Default)]
struct Failures {
    /// Number of upcoming batch writes to reject.
    writes: usize,
    attributes: bool,
}

/// A recorded batch write.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedBatch {
    pub updates: Vec<PositionUpdate>,
    pub origin: UpdateOrigin,
}

/// Scene held entirely in memory.
#[derive(Debug)]
pub struct MemoryScene {
    id: SceneId,
    dims: RwLock<Option<SceneDimensions>>,
    entities: RwLock<Vec<Entity>>,
    attributes: RwLock<HashMap<EntityId, HashMap<String, serde_json::Value>>>,
    failures: Mutex<Failures>,
    batches: Mutex<Vec<RecordedBatch>>,
}

impl MemoryScene {
    pub fn new(id: impl Into<String>, dims: SceneDimensions) -> Self {
        Self {
            id: SceneId::new(id),
            dims: RwLock::new(Some(dims)),
            entities: RwLock::new(Vec::new()),
            attributes: RwLock::new(HashMap::new()),
            failures: Mutex::new(Failures::default()),
            batches: Mutex::new(Vec::new()),
        }
    }

    /// A scene that reports no grid dimensions.
    pub fn without_dimensions(id: impl Into<String>) -> Self {
        let scene = Self::new(id, SceneDimensions::new(0.0, 0.0));
        *scene.dims.write() = None;
        scene
    }

    pub fn set_dimensions(&self, dims: Option<SceneDimensions>) {
        *self.dims.write() = dims;
    }

    /// Adds an entity, replacing one with the same id.
    pub fn insert(&self, entity: Entity) {
        let mut entities = self.entities.write();
        match entities.iter_mut().find(|e| e.id == entity.id) {
            Some(existing) => *existing = entity,
            None => entities.push(entity),
        }
    }

    /// Removes an entity and its attributes.
    pub fn remove(&self, id: &EntityId) -> Option<Entity> {
        self.attributes.write().remove(id);
        let mut entities = self.entities.write();
        let pos = entities.iter().position(|e| &e.id == id)?;
        Some(entities.remove(pos))
    }

    /// Moves an entity's top-left corner. Returns `false` for unknown ids.
    pub fn set_position(&self, id: &EntityId, x: f64, y: f64) -> bool {
        let mut entities = self.entities.write();
        match entities.iter_mut().find(|e| &e.id == id) {
            Some(entity) => {
                entity.x = x;
                entity.y = y;
                true
            }
            None => false,
        }
    }

    /// Current top-left corner of an entity.
    pub fn position(&self, id: &EntityId) -> Option<Point> {
        self.entities
            .read()
            .iter()
            .find(|e| &e.id == id)
            .map(|e| Point::new(e.x, e.y))
    }

    /// Stores a relation directly, bypassing validation. For fixtures.
    pub fn put_leash(&self, target: &EntityId, relation: &LeashRelation) {
        if let Ok(value) = serde_json::to_value(relation) {
            self.attributes
                .write()
                .entry(target.clone())
                .or_default()
                .insert(LEASH_ATTRIBUTE.to_string(), value);
        }
    }

    /// Rejects the next `count` batch writes.
    pub fn fail_next_writes(&self, count: usize) {
        self.failures.lock().writes = count;
    }

    /// Makes every attribute write and removal fail.
    pub fn fail_attribute_writes(&self, fail: bool) {
        self.failures.lock().attributes = fail;
    }

    /// Batches applied so far, oldest first.
    pub fn batches(&self) -> Vec<RecordedBatch> {
        self.batches.lock().clone()
    }
}

impl SceneQuery for MemoryScene {
    fn scene_id(&self) -> SceneId {
        self.id.clone()
    }

    fn entities(&self) -> Vec<Entity> {
        self.entities.read().clone()
    }

    fn entity(&self, id: &EntityId) -> Option<Entity> {
        self.entities.read().iter().find(|e| &e.id == id).cloned()
    }

    fn dimensions(&self) -> Option<SceneDimensions> {
        *self.dims.read()
    }
}

#[async_trait]
impl AttributeStore for MemoryScene {
    fn get_attribute(&self, entity: &EntityId, key: &str) -> Option<serde_json::Value> {
        self.attributes.read().get(entity)?.get(key).cloned()
    }

    async fn set_attribute(
        &self,
        entity: &EntityId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StoreError> {
        if self.failures.lock().attributes {
            return Err(StoreError::SetFailed {
                entity_id: entity.to_string(),
                key: key.to_string(),
                reason: "store unavailable".to_string(),
            });
        }
        if self.entity(entity).is_none() {
            return Err(StoreError::UnknownEntity {
                entity_id: entity.to_string(),
            });
        }
        self.attributes
            .write()
            .entry(entity.clone())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_attribute(&self, entity: &EntityId, key: &str) -> Result<(), StoreError> {
        if self.failures.lock().attributes {
            return Err(StoreError::RemoveFailed {
                entity_id: entity.to_string(),
                key: key.to_string(),
                reason: "store unavailable".to_string(),
            });
        }
        if let Some(attrs) = self.attributes.write().get_mut(entity) {
            attrs.remove(key);
        }
        Ok(())
    }
}

#[async_trait]
impl PositionWriter for MemoryScene {
    async fn apply_updates(
        &self,
        updates: Vec<PositionUpdate>,
        origin: UpdateOrigin,
    ) -> Result<(), SceneError> {
        {
            let mut failures = self.failures.lock();
            if failures.writes > 0 {
                failures.writes -= 1;
                return Err(SceneError::BatchFailed {
                    count: updates.len(),
                    reason: "injected failure".to_string(),
                });
            }
        }
        {
            let mut entities = self.entities.write();
            for update in &updates {
                if let Some(entity) = entities.iter_mut().find(|e| e.id == update.id) {
                    entity.x = update.x;
                    entity.y = update.y;
                }
            }
        }
        self.batches.lock().push(RecordedBatch { updates, origin });
        Ok(())
    }
}
