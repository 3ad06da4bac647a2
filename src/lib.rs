//! # Leashkit
//!
//! Leash constraints between moving entities on a 2D scene:
//! - A target may not move further than its leash radius from its handler
//! - When a handler moves, its targets are dragged along and kept in range
//! - Square, hex, and gridless scenes, each measured by its own rules
//!
//! ## Architecture
//!
//! Leashkit is organized as a workspace with multiple crates:
//!
//! 1. **leashkit-core** - Geometry, constraint solving, movement tracking, and the engine
//! 2. **leashkit-settings** - Behaviour toggles and their persistence
//! 3. **leashkit** - This crate: logging setup, scenario replay, and the CLI

pub mod replay;

pub use leashkit_core::{
    Actor, CachedIndex, ClampStrategy, CommitMove, DisplacementMode, EngineConfig, Entity,
    EntityId, Error, EventCategory, EventFilter, ExceedPolicy, GridKind, Handled, HandlerIndex,
    LeashAccess, LeashEngine, LeashError, LeashEvent, LeashEventBus, LeashHost, LeashRelation,
    LeashRequest, MemoryScene, MoveEvent, Point, PropagationReport, ProposeMove, PullMode, Result,
    Ring, RingVisibility, ScanIndex, SceneDimensions, SceneError, SceneId, StoreError,
    UpdateOrigin, Verdict,
};

pub use leashkit_settings::{
    ConfigError, LeashSettings, SettingsController, SettingsError, SettingsManager,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Environment variable that switches log output to JSON lines.
pub const LOG_JSON_ENV: &str = "LEASHKIT_LOG_JSON";

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Output on stderr, so stdout stays free for command results
/// - RUST_LOG environment variable support (INFO when unset)
/// - JSON lines instead of pretty text when `LEASHKIT_LOG_JSON` is set
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if std::env::var_os(LOG_JSON_ENV).is_some() {
        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_current_span(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_thread_names(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}
