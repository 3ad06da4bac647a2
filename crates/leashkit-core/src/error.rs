//! Error handling for Leashkit
//!
//! Provides error types for every layer the leash engine touches:
//! - Leash errors (invalid relation requests, rejected at creation time)
//! - Store errors (the host's per-entity attribute store failed)
//! - Scene errors (batched position writes)
//! - Event errors (malformed host event payloads)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Leash configuration error type
///
/// Raised when a leash relation cannot be created as requested.
/// No state is mutated when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LeashError {
    /// Leash distance must be a positive, finite number
    #[error("Leash distance must be positive, got {distance}")]
    InvalidDistance {
        /// The rejected distance in scene units.
        distance: f64,
    },

    /// Distance field could not be parsed as a number
    #[error("Leash distance '{input}' is not a number")]
    UnparsableDistance {
        /// The raw form input.
        input: String,
    },

    /// No handler was chosen
    #[error("A handler must be chosen")]
    MissingHandler,

    /// Handler does not exist in the target's scene
    #[error("Handler {handler_id} not found in scene {scene_id}")]
    HandlerNotFound {
        /// The handler entity id.
        handler_id: String,
        /// The scene that was searched.
        scene_id: String,
    },

    /// Target does not exist in the scene
    #[error("Target {target_id} not found in scene {scene_id}")]
    TargetNotFound {
        /// The target entity id.
        target_id: String,
        /// The scene that was searched.
        scene_id: String,
    },

    /// An entity cannot be its own handler
    #[error("Entity {entity_id} cannot be leashed to itself")]
    SelfLeash {
        /// The entity id.
        entity_id: String,
    },

    /// The acting user is not allowed to manage leashes
    #[error("Only game masters may apply or remove leashes")]
    NotPermitted,
}

/// Attribute store error type
///
/// Represents failures of the host's per-entity key-value store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Writing the attribute failed
    #[error("Failed to set attribute '{key}' on {entity_id}: {reason}")]
    SetFailed {
        /// The entity whose attribute was written.
        entity_id: String,
        /// The attribute key.
        key: String,
        /// The reason reported by the store.
        reason: String,
    },

    /// Removing the attribute failed
    #[error("Failed to remove attribute '{key}' from {entity_id}: {reason}")]
    RemoveFailed {
        /// The entity whose attribute was removed.
        entity_id: String,
        /// The attribute key.
        key: String,
        /// The reason reported by the store.
        reason: String,
    },

    /// The entity does not exist in the store
    #[error("Entity {entity_id} has no attribute storage")]
    UnknownEntity {
        /// The entity id.
        entity_id: String,
    },

    /// The stored value could not be encoded or decoded
    #[error("Attribute '{key}' has an invalid encoding: {reason}")]
    Encoding {
        /// The attribute key.
        key: String,
        /// The reason for the encoding failure.
        reason: String,
    },
}

/// Scene error type
///
/// Represents failures of the host's batched position writes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// A batched position update was rejected by the host
    #[error("Batched update of {count} entities failed: {reason}")]
    BatchFailed {
        /// Number of updates in the rejected batch.
        count: usize,
        /// The reason reported by the host.
        reason: String,
    },
}

/// Host event error type
///
/// Raised while validating a raw event payload at the host boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventError {
    /// Required field is missing
    #[error("Event is missing field '{field}'")]
    MissingField {
        /// The field name.
        field: String,
    },

    /// Field has the wrong type or an invalid value
    #[error("Event field '{field}' is invalid: {reason}")]
    InvalidField {
        /// The field name.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Event kind is not recognised
    #[error("Unknown event kind '{kind}'")]
    UnknownKind {
        /// The unrecognised kind string.
        kind: String,
    },
}

/// Main error type for Leashkit
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Leash configuration error
    #[error(transparent)]
    Leash(#[from] LeashError),

    /// Attribute store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Scene error
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// Event validation error
    #[error(transparent)]
    Event(#[from] EventError),
}

impl Error {
    /// Check if this error was raised while validating a leash request
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Error::Leash(_))
    }

    /// Check if this is an attribute store error
    pub fn is_store_error(&self) -> bool {
        matches!(self, Error::Store(_))
    }

    /// Check if this is a batched write error
    pub fn is_scene_error(&self) -> bool {
        matches!(self, Error::Scene(_))
    }

    /// Check if this is an event validation error
    pub fn is_event_error(&self) -> bool {
        matches!(self, Error::Event(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
