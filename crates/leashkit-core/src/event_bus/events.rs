//! Event type definitions for the event bus.
//!
//! Events are cloneable and serializable for logging/replay.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::host::EntityId;

/// Everything the engine reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LeashEvent {
    /// A relation was stored on a target.
    Applied {
        target: EntityId,
        handler: EntityId,
        /// Radius in scene units.
        distance: f64,
    },
    /// A relation was removed from a target.
    Removed {
        target: EntityId,
        handler: EntityId,
    },
    /// A leashed entity's own move was rejected.
    MoveBlocked {
        entity: EntityId,
        handler: EntityId,
        /// Attempted distance in scene units.
        attempted: f64,
        /// Allowed radius in scene units.
        limit: f64,
    },
    /// A leashed entity's own move was shortened to the boundary.
    MoveClamped {
        entity: EntityId,
        handler: EntityId,
        /// Requested top-left corner.
        requested: Point,
        /// Top-left corner actually allowed.
        allowed: Point,
    },
    /// A handler's commit moved its targets.
    TargetsPulled {
        handler: EntityId,
        /// Handler displacement applied, in pixels.
        displacement: Point,
        count: usize,
    },
    /// A handler/target pair was skipped during propagation.
    PairSkipped {
        handler: EntityId,
        target: EntityId,
        reason: String,
    },
    /// The batched write of derived positions failed.
    PropagationFailed {
        handler: EntityId,
        reason: String,
    },
    /// A leash ring should be redrawn around a handler's new center.
    RingMoved {
        handler: EntityId,
        target: EntityId,
        center: Point,
        radius_px: f64,
    },
}

impl LeashEvent {
    /// Get the category of this event
    pub fn category(&self) -> EventCategory {
        match self {
            LeashEvent::Applied { .. } | LeashEvent::Removed { .. } => EventCategory::Relation,
            LeashEvent::MoveBlocked { .. } | LeashEvent::MoveClamped { .. } => {
                EventCategory::Movement
            }
            LeashEvent::TargetsPulled { .. }
            | LeashEvent::PairSkipped { .. }
            | LeashEvent::PropagationFailed { .. } => EventCategory::Propagation,
            LeashEvent::RingMoved { .. } => EventCategory::Ring,
        }
    }

    /// Get a short description of this event for logging
    pub fn description(&self) -> String {
        match self {
            LeashEvent::Applied {
                target,
                handler,
                distance,
            } => format!("Leashed {} to {} at {}", target, handler, distance),
            LeashEvent::Removed { target, handler } => {
                format!("Unleashed {} from {}", target, handler)
            }
            LeashEvent::MoveBlocked {
                entity,
                attempted,
                limit,
                ..
            } => format!(
                "Blocked {} at {:.2} (limit {:.2})",
                entity, attempted, limit
            ),
            LeashEvent::MoveClamped {
                entity, allowed, ..
            } => format!("Clamped {} to {}", entity, allowed),
            LeashEvent::TargetsPulled {
                handler,
                displacement,
                count,
            } => format!(
                "{} pulled {} target(s) by {}",
                handler, count, displacement
            ),
            LeashEvent::PairSkipped {
                handler,
                target,
                reason,
            } => format!("Skipped {} -> {}: {}", handler, target, reason),
            LeashEvent::PropagationFailed { handler, reason } => {
                format!("Propagation from {} failed: {}", handler, reason)
            }
            LeashEvent::RingMoved {
                handler, center, ..
            } => format!("Ring of {} moved to {}", handler, center),
        }
    }
}

/// Event category for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Leash creation and removal.
    Relation,
    /// Enforcement of a target's own moves.
    Movement,
    /// Handler-driven target updates.
    Propagation,
    /// Ring redraw hints.
    Ring,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::Relation => write!(f, "Relation"),
            EventCategory::Movement => write!(f, "Movement"),
            EventCategory::Propagation => write!(f, "Propagation"),
            EventCategory::Ring => write!(f, "Ring"),
        }
    }
}
