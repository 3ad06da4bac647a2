//! Host interfaces
//!
//! The leash engine never owns entities. It reads them through
//! [`SceneQuery`], stores leash relations through [`AttributeStore`], and
//! writes derived positions through [`PositionWriter`]. A host implements all
//! three; [`LeashHost`] is the combined bound the engine is generic over.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{SceneError, StoreError};
use crate::geometry::SceneDimensions;

/// Identifier of an entity within its scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of a scene (the container indexing entities).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(pub String);

impl SceneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Snapshot of a positioned, sized rectangular entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    /// Display name, used by the leash form.
    #[serde(default)]
    pub name: Option<String>,
    /// Top-left x in pixels.
    pub x: f64,
    /// Top-left y in pixels.
    pub y: f64,
    /// Width in grid cells; one cell when unset.
    #[serde(default)]
    pub width: Option<f64>,
    /// Height in grid cells; one cell when unset.
    #[serde(default)]
    pub height: Option<f64>,
}

impl Entity {
    /// Creates a one-cell entity at the given top-left position.
    pub fn new(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: EntityId::new(id),
            name: None,
            x,
            y,
            width: None,
            height: None,
        }
    }

    /// Sets the size in grid cells.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name to show in UI, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }
}

/// One record of a batched position write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: EntityId,
    pub x: f64,
    pub y: f64,
}

/// Who originated a position change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateOrigin {
    /// A user or external system moved the entity.
    #[default]
    External,
    /// The leash engine wrote a derived position; self-movement enforcement
    /// must not intercept it.
    Internal,
}

/// Read access to a scene's entities and scale.
pub trait SceneQuery: Send + Sync {
    /// The scene this host serves.
    fn scene_id(&self) -> SceneId;

    /// All entities currently in the scene.
    fn entities(&self) -> Vec<Entity>;

    /// Looks up an entity by id.
    fn entity(&self, id: &EntityId) -> Option<Entity>;

    /// Grid scale constants, if the scene has them.
    fn dimensions(&self) -> Option<SceneDimensions>;
}

/// Per-entity key-value attribute storage.
#[async_trait]
pub trait AttributeStore: Send + Sync {
    /// Reads an attribute. Missing entities and missing keys both yield `None`.
    fn get_attribute(&self, entity: &EntityId, key: &str) -> Option<serde_json::Value>;

    /// Writes an attribute.
    async fn set_attribute(
        &self,
        entity: &EntityId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StoreError>;

    /// Removes an attribute. Removing a missing key succeeds.
    async fn remove_attribute(&self, entity: &EntityId, key: &str) -> Result<(), StoreError>;
}

/// Batched position writes.
#[async_trait]
pub trait PositionWriter: Send + Sync {
    /// Applies every update as one operation.
    async fn apply_updates(
        &self,
        updates: Vec<PositionUpdate>,
        origin: UpdateOrigin,
    ) -> Result<(), SceneError>;
}

/// Everything the leash engine needs from its host.
pub trait LeashHost: SceneQuery + AttributeStore + PositionWriter {}

impl<T> LeashHost for T where T: SceneQuery + AttributeStore + PositionWriter {}
