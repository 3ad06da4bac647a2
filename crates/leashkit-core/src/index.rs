//! Handler lookup
//!
//! Relations live on targets, so finding everything leashed to a handler
//! means scanning the scene. [`ScanIndex`] does that on every query;
//! [`CachedIndex`] keeps a derived `handler -> targets` map that the engine
//! updates whenever it creates or removes a relation or an entity disappears.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use crate::host::{AttributeStore, EntityId, SceneQuery};
use crate::relation::{read_leash, LeashRelation};

/// A target and the relation binding it to a handler.
pub type LeashedTarget = (EntityId, LeashRelation);

/// Finds the targets leashed to a handler.
pub trait HandlerIndex: Send + Sync {
    /// Targets whose relation names `handler` and belongs to the scene.
    fn targets_of(
        &self,
        scene: &dyn SceneQuery,
        store: &dyn AttributeStore,
        handler: &EntityId,
    ) -> Vec<LeashedTarget>;

    /// Whether `handler` has at least one target.
    fn has_targets(
        &self,
        scene: &dyn SceneQuery,
        store: &dyn AttributeStore,
        handler: &EntityId,
    ) -> bool {
        !self.targets_of(scene, store, handler).is_empty()
    }

    /// A relation was stored on `target` (`Some`) or removed (`None`).
    fn relation_changed(&self, _target: &EntityId, _relation: Option<&LeashRelation>) {}

    /// An entity left the scene.
    fn entity_removed(&self, _entity: &EntityId) {}

    /// Discards any derived state.
    fn invalidate(&self) {}
}

/// Scans the whole scene on every query.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanIndex;

impl HandlerIndex for ScanIndex {
    fn targets_of(
        &self,
        scene: &dyn SceneQuery,
        store: &dyn AttributeStore,
        handler: &EntityId,
    ) -> Vec<LeashedTarget> {
        let scene_id = scene.scene_id();
        scene
            .entities()
            .into_iter()
            .filter_map(|entity| {
                let relation = read_leash(store, &entity.id)?;
                (&relation.handler_id == handler && relation.belongs_to(&scene_id))
                    .then_some((entity.id, relation))
            })
            .collect()
    }
}

type HandlerMap = HashMap<EntityId, BTreeMap<EntityId, LeashRelation>>;

/// Derived `handler -> targets` map, built by one scan and then maintained
/// incrementally.
#[derive(Debug, Default)]
pub struct CachedIndex {
    map: RwLock<Option<HandlerMap>>,
}

impl CachedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn build(scene: &dyn SceneQuery, store: &dyn AttributeStore) -> HandlerMap {
        let scene_id = scene.scene_id();
        let mut map: HandlerMap = HashMap::new();
        for entity in scene.entities() {
            if let Some(relation) = read_leash(store, &entity.id) {
                if relation.belongs_to(&scene_id) {
                    map.entry(relation.handler_id.clone())
                        .or_default()
                        .insert(entity.id, relation);
                }
            }
        }
        tracing::debug!("Built handler index with {} handlers", map.len());
        map
    }

    /// Whether the map has been built.
    pub fn is_built(&self) -> bool {
        self.map.read().is_some()
    }
}

impl HandlerIndex for CachedIndex {
    fn targets_of(
        &self,
        scene: &dyn SceneQuery,
        store: &dyn AttributeStore,
        handler: &EntityId,
    ) -> Vec<LeashedTarget> {
        if let Some(map) = self.map.read().as_ref() {
            return collect_targets(map, handler);
        }
        let mut guard = self.map.write();
        let map = guard.get_or_insert_with(|| Self::build(scene, store));
        collect_targets(map, handler)
    }

    fn relation_changed(&self, target: &EntityId, relation: Option<&LeashRelation>) {
        let mut guard = self.map.write();
        let Some(map) = guard.as_mut() else {
            return;
        };
        // A target has at most one handler; drop any previous binding.
        for targets in map.values_mut() {
            targets.remove(target);
        }
        if let Some(relation) = relation {
            map.entry(relation.handler_id.clone())
                .or_default()
                .insert(target.clone(), relation.clone());
        }
        map.retain(|_, targets| !targets.is_empty());
    }

    fn entity_removed(&self, entity: &EntityId) {
        let mut guard = self.map.write();
        if let Some(map) = guard.as_mut() {
            map.remove(entity);
            for targets in map.values_mut() {
                targets.remove(entity);
            }
            map.retain(|_, targets| !targets.is_empty());
        }
    }

    fn invalidate(&self) {
        *self.map.write() = None;
    }
}

fn collect_targets(map: &HandlerMap, handler: &EntityId) -> Vec<LeashedTarget> {
    map.get(handler)
        .map(|targets| {
            targets
                .iter()
                .map(|(id, relation)| (id.clone(), relation.clone()))
                .collect()
        })
        .unwrap_or_default()
}
