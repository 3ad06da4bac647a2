//! # Leashkit Core
//!
//! Leash relations between entities on a 2D scene, the geometry and
//! constraint solving behind them, and the engine that enforces a target's
//! radius and pulls targets along when their handler moves.
//!
//! The engine talks to its host only through the traits in [`host`], so any
//! scene model that can list entities, store per-entity attributes, and apply
//! batched position writes can drive it. [`memory::MemoryScene`] is a complete
//! in-process host.

pub mod clock;
pub mod config;
pub mod enforce;
pub mod engine;
pub mod error;
pub mod event_bus;
pub mod geometry;
pub mod host;
pub mod index;
pub mod memory;
pub mod moves;
pub mod relation;
pub mod rings;
pub mod solver;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DisplacementMode, EngineConfig, ExceedPolicy, PullMode};
pub use enforce::Verdict;
pub use engine::{Handled, LeashEngine, PropagationReport, SkipReason, SkippedPair};
pub use error::{Error, EventError, LeashError, Result, SceneError, StoreError};

// Re-export event bus for convenience
pub use event_bus::{
    EventBusConfig, EventCategory, EventFilter, LeashEvent, LeashEventBus, SubscriptionId,
};

pub use geometry::{Center, DiagonalRule, GridKind, Point, SceneDimensions};
pub use host::{
    AttributeStore, Entity, EntityId, LeashHost, PositionUpdate, PositionWriter, SceneId,
    SceneQuery, UpdateOrigin,
};
pub use index::{CachedIndex, HandlerIndex, ScanIndex};
pub use memory::MemoryScene;
pub use moves::{CommitMove, MoveEvent, ProposeMove};
pub use relation::{
    Actor, HandlerOption, LeashAccess, LeashRelation, LeashRequest, LEASH_ATTRIBUTE,
};
pub use rings::{Ring, RingVisibility};
pub use solver::{ClampStrategy, ConstraintSolver};
