//! Leash relations
//!
//! A relation is stored as an attribute on its target entity. Handlers do not
//! store anything; they are found by scanning targets (see [`crate::index`]).

use serde::{Deserialize, Serialize};

use crate::error::{LeashError, StoreError};
use crate::host::{AttributeStore, Entity, EntityId, SceneId};

/// Attribute key the relation is stored under.
pub const LEASH_ATTRIBUTE: &str = "leashkit.leash";

/// `{ handlerId, sceneId, distance }` as persisted on the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeashRelation {
    pub handler_id: EntityId,
    pub scene_id: SceneId,
    /// Maximum distance in scene units.
    pub distance: f64,
}

impl LeashRelation {
    pub fn new(handler_id: EntityId, scene_id: SceneId, distance: f64) -> Self {
        Self {
            handler_id,
            scene_id,
            distance,
        }
    }

    /// Checks the distance invariant.
    pub fn validate(&self) -> Result<(), LeashError> {
        validate_distance(self.distance)
    }

    /// Whether this relation applies inside `scene`.
    pub fn belongs_to(&self, scene: &SceneId) -> bool {
        &self.scene_id == scene
    }
}

fn validate_distance(distance: f64) -> Result<(), LeashError> {
    if distance.is_finite() && distance > 0.0 {
        Ok(())
    } else {
        Err(LeashError::InvalidDistance { distance })
    }
}

/// Reads the relation stored on `entity`.
///
/// Undecodable values are treated as absent.
pub fn read_leash<S>(store: &S, entity: &EntityId) -> Option<LeashRelation>
where
    S: AttributeStore + ?Sized,
{
    let value = store.get_attribute(entity, LEASH_ATTRIBUTE)?;
    match serde_json::from_value::<LeashRelation>(value) {
        Ok(relation) => Some(relation),
        Err(e) => {
            tracing::debug!("Ignoring malformed leash on {}: {}", entity, e);
            None
        }
    }
}

/// Stores `relation` on `entity`.
pub async fn write_leash<S>(
    store: &S,
    entity: &EntityId,
    relation: &LeashRelation,
) -> Result<(), StoreError>
where
    S: AttributeStore + ?Sized,
{
    let value = serde_json::to_value(relation).map_err(|e| StoreError::Encoding {
        key: LEASH_ATTRIBUTE.to_string(),
        reason: e.to_string(),
    })?;
    store.set_attribute(entity, LEASH_ATTRIBUTE, value).await
}

/// Removes any relation stored on `entity`.
pub async fn clear_leash<S>(store: &S, entity: &EntityId) -> Result<(), StoreError>
where
    S: AttributeStore + ?Sized,
{
    store.remove_attribute(entity, LEASH_ATTRIBUTE).await
}

/// Validated output of the leash form.
#[derive(Debug, Clone, PartialEq)]
pub struct LeashRequest {
    pub handler_id: EntityId,
    pub distance: f64,
}

impl LeashRequest {
    pub fn new(handler_id: EntityId, distance: f64) -> Result<Self, LeashError> {
        if handler_id.as_str().trim().is_empty() {
            return Err(LeashError::MissingHandler);
        }
        validate_distance(distance)?;
        Ok(Self {
            handler_id,
            distance,
        })
    }

    /// Parses raw form fields.
    pub fn parse(handler_id: &str, distance: &str) -> Result<Self, LeashError> {
        let handler_id = handler_id.trim();
        if handler_id.is_empty() {
            return Err(LeashError::MissingHandler);
        }
        let distance: f64 = distance
            .trim()
            .parse()
            .map_err(|_| LeashError::UnparsableDistance {
                input: distance.to_string(),
            })?;
        Self::new(EntityId::new(handler_id), distance)
    }
}

/// Who is asking to change a leash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    #[default]
    Gm,
    Player,
}

/// Who may create or remove leashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeashAccess {
    #[default]
    GmOnly,
    Everyone,
}

impl LeashAccess {
    pub fn permits(&self, actor: Actor) -> bool {
        matches!((self, actor), (Self::Everyone, _) | (Self::GmOnly, Actor::Gm))
    }
}

/// A choice offered by the leash form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerOption {
    pub id: EntityId,
    pub name: String,
}

/// Every entity other than `target`, as form choices.
pub fn candidate_handlers(entities: &[Entity], target: &EntityId) -> Vec<HandlerOption> {
    entities
        .iter()
        .filter(|e| &e.id != target)
        .map(|e| HandlerOption {
            id: e.id.clone(),
            name: e.display_name().to_string(),
        })
        .collect()
}
