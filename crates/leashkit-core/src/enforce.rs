//! Self-movement enforcement
//!
//! Decides what happens to a leashed entity's own proposed move, independent
//! of anything its handler does.

use crate::config::{EngineConfig, ExceedPolicy};
use crate::geometry::{center_of, current_center, Point, SceneDimensions};
use crate::host::Entity;
use crate::relation::LeashRelation;
use crate::solver::ConstraintSolver;

/// Outcome for a proposed move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// The move is within the leash.
    Allow,
    /// The move is rejected.
    Block {
        /// Attempted distance from the handler, in scene units.
        attempted: f64,
        /// Leash radius in scene units.
        limit: f64,
    },
    /// The move is replaced by this top-left corner.
    Clamp { x: f64, y: f64 },
}

/// Evaluates a target's proposed top-left corner against its leash.
///
/// Distance is measured with the configured enforcement strategy, which is
/// also the strategy used to find the clamped point.
pub fn evaluate(
    target: &Entity,
    proposed: (f64, f64),
    handler: &Entity,
    relation: &LeashRelation,
    dims: &SceneDimensions,
    config: &EngineConfig,
) -> Verdict {
    let target_center = center_of(target, proposed.0, proposed.1, Some(dims));
    let handler_center = current_center(handler, Some(dims)).point;
    let solver = ConstraintSolver::new(*dims, config.enforcement_strategy);

    let attempted = solver.distance_units(handler_center, target_center.point);
    if attempted <= relation.distance {
        return Verdict::Allow;
    }

    match config.exceed_policy {
        ExceedPolicy::Block => Verdict::Block {
            attempted,
            limit: relation.distance,
        },
        ExceedPolicy::Clamp => {
            let clamped = solver.solve(handler_center, target_center.point, relation.distance);
            let Point { x, y } = target_center.top_left_for(clamped.point);
            Verdict::Clamp { x, y }
        }
    }
}
