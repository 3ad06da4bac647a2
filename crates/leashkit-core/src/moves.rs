//! Movement events at the host boundary
//!
//! Hosts deliver loosely shaped payloads; [`MoveEvent::from_json`] validates
//! them once into a strict tagged union used everywhere inside the engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EventError;
use crate::host::{Entity, EntityId, UpdateOrigin};

/// An entity's position is about to change. Vetoable and mutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposeMove {
    pub entity: EntityId,
    /// New top-left x; `None` keeps the current value.
    pub x: Option<f64>,
    /// New top-left y; `None` keeps the current value.
    pub y: Option<f64>,
    #[serde(default)]
    pub origin: UpdateOrigin,
}

impl ProposeMove {
    pub fn new(entity: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            entity: EntityId::new(entity),
            x: Some(x),
            y: Some(y),
            origin: UpdateOrigin::External,
        }
    }

    pub fn with_origin(mut self, origin: UpdateOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Whether the proposal touches the position at all.
    pub fn changes_position(&self) -> bool {
        self.x.is_some() || self.y.is_some()
    }

    /// The proposed top-left corner, filling unset axes from `current`.
    pub fn resolve(&self, current: &Entity) -> (f64, f64) {
        (self.x.unwrap_or(current.x), self.y.unwrap_or(current.y))
    }
}

/// An entity's position change has been committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitMove {
    pub entity: EntityId,
}

impl CommitMove {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: EntityId::new(entity),
        }
    }
}

/// Every event the engine reacts to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MoveEvent {
    Propose(ProposeMove),
    Commit(CommitMove),
    Deleted { entity: EntityId },
}

impl MoveEvent {
    pub fn entity(&self) -> &EntityId {
        match self {
            MoveEvent::Propose(p) => &p.entity,
            MoveEvent::Commit(c) => &c.entity,
            MoveEvent::Deleted { entity } => entity,
        }
    }

    /// Validates a raw host payload.
    ///
    /// Expected shape: `{ "kind": "propose" | "commit" | "deleted",
    /// "entity": "<id>", "x"?: number, "y"?: number, "internal"?: bool }`.
    /// Coordinates and `internal` only matter for proposals.
    pub fn from_json(value: &Value) -> Result<Self, EventError> {
        let kind = required_str(value, "kind")?;
        let entity = EntityId::new(required_str(value, "entity")?);
        if entity.as_str().is_empty() {
            return Err(EventError::InvalidField {
                field: "entity".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        let origin = match value.get("internal") {
            None | Some(Value::Null) => UpdateOrigin::External,
            Some(Value::Bool(true)) => UpdateOrigin::Internal,
            Some(Value::Bool(false)) => UpdateOrigin::External,
            Some(_) => {
                return Err(EventError::InvalidField {
                    field: "internal".to_string(),
                    reason: "must be a boolean".to_string(),
                })
            }
        };

        match kind {
            "propose" => Ok(MoveEvent::Propose(ProposeMove {
                entity,
                x: optional_coord(value, "x")?,
                y: optional_coord(value, "y")?,
                origin,
            })),
            "commit" => Ok(MoveEvent::Commit(CommitMove { entity })),
            "deleted" => Ok(MoveEvent::Deleted { entity }),
            other => Err(EventError::UnknownKind {
                kind: other.to_string(),
            }),
        }
    }
}

fn required_str<'a>(value: &'a Value, field: &str) -> Result<&'a str, EventError> {
    match value.get(field) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(EventError::InvalidField {
            field: field.to_string(),
            reason: "must be a string".to_string(),
        }),
        None => Err(EventError::MissingField {
            field: field.to_string(),
        }),
    }
}

fn optional_coord(value: &Value, field: &str) -> Result<Option<f64>, EventError> {
    match value.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => match v.as_f64() {
            Some(n) if n.is_finite() => Ok(Some(n)),
            _ => Err(EventError::InvalidField {
                field: field.to_string(),
                reason: "must be a finite number".to_string(),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_propose() {
        let event = MoveEvent::from_json(&json!({
            "kind": "propose", "entity": "t1", "x": 40.0, "internal": true
        }));
        assert_eq!(
            event,
            Ok(MoveEvent::Propose(ProposeMove {
                entity: EntityId::new("t1"),
                x: Some(40.0),
                y: None,
                origin: UpdateOrigin::Internal,
            }))
        );
    }

    #[test]
    fn test_parse_commit_and_deleted() {
        assert_eq!(
            MoveEvent::from_json(&json!({ "kind": "commit", "entity": "h" })),
            Ok(MoveEvent::Commit(CommitMove::new("h")))
        );
        assert_eq!(
            MoveEvent::from_json(&json!({ "kind": "deleted", "entity": "h" })),
            Ok(MoveEvent::Deleted {
                entity: EntityId::new("h")
            })
        );
    }

    #[test]
    fn test_reject_malformed() {
        assert_eq!(
            MoveEvent::from_json(&json!({ "entity": "h" })),
            Err(EventError::MissingField {
                field: "kind".to_string()
            })
        );
        assert!(matches!(
            MoveEvent::from_json(&json!({ "kind": "propose", "entity": "h", "x": "left" })),
            Err(EventError::InvalidField { .. })
        ));
        assert!(matches!(
            MoveEvent::from_json(&json!({ "kind": "spin", "entity": "h" })),
            Err(EventError::UnknownKind { .. })
        ));
        assert!(matches!(
            MoveEvent::from_json(&json!({ "kind": "commit", "entity": "" })),
            Err(EventError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_resolve_fills_missing_axis() {
        let entity = Entity::new("t", 10.0, 20.0);
        let propose = ProposeMove {
            entity: entity.id.clone(),
            x: Some(50.0),
            y: None,
            origin: UpdateOrigin::External,
        };
        assert_eq!(propose.resolve(&entity), (50.0, 20.0));
        assert!(propose.changes_position());
    }
}
