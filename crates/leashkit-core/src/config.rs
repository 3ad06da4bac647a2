//! Engine behaviour configuration
//!
//! Both clamp strategies and both displacement modes are valid; which one is
//! authoritative is a deployment choice made here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::solver::ClampStrategy;

/// Inactivity window after which a handler's drag session is discarded.
pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 250;

/// What happens when a leashed entity tries to move beyond its radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExceedPolicy {
    /// Reject the move; the entity stays put.
    #[default]
    Block,
    /// Move the entity to the boundary instead.
    Clamp,
}

impl fmt::Display for ExceedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block => write!(f, "block"),
            Self::Clamp => write!(f, "clamp"),
        }
    }
}

impl FromStr for ExceedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "block" => Ok(Self::Block),
            "clamp" => Ok(Self::Clamp),
            _ => Err(format!("Unknown exceed policy: {}", s)),
        }
    }
}

/// How targets respond when their handler moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullMode {
    /// Move targets with the handler, then clamp.
    #[default]
    Drag,
    /// Leave targets in place; only clamp those left outside the radius.
    ClampOnly,
}

impl fmt::Display for PullMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drag => write!(f, "drag"),
            Self::ClampOnly => write!(f, "clamp_only"),
        }
    }
}

impl FromStr for PullMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drag" => Ok(Self::Drag),
            "clamp_only" | "clamp" => Ok(Self::ClampOnly),
            _ => Err(format!("Unknown pull mode: {}", s)),
        }
    }
}

/// How a handler's displacement is measured when pulling targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplacementMode {
    /// Total displacement since the drag session opened, applied to the
    /// targets' session-start centers.
    #[default]
    Session,
    /// The last single-step delta, applied to the targets' current centers.
    Incremental,
}

impl fmt::Display for DisplacementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session => write!(f, "session"),
            Self::Incremental => write!(f, "incremental"),
        }
    }
}

impl FromStr for DisplacementMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "session" => Ok(Self::Session),
            "incremental" | "delta" => Ok(Self::Incremental),
            _ => Err(format!("Unknown displacement mode: {}", s)),
        }
    }
}

fn default_session_timeout_ms() -> u64 {
    DEFAULT_SESSION_TIMEOUT_MS
}

/// Behaviour switches read by the engine on every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub exceed_policy: ExceedPolicy,
    /// Strategy used to enforce a target's own moves.
    #[serde(default)]
    pub enforcement_strategy: ClampStrategy,
    #[serde(default)]
    pub pull_mode: PullMode,
    #[serde(default)]
    pub displacement_mode: DisplacementMode,
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            exceed_policy: ExceedPolicy::default(),
            enforcement_strategy: ClampStrategy::default(),
            pull_mode: PullMode::default(),
            displacement_mode: DisplacementMode::default(),
            session_timeout_ms: DEFAULT_SESSION_TIMEOUT_MS,
        }
    }
}

impl EngineConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    pub fn with_exceed_policy(mut self, policy: ExceedPolicy) -> Self {
        self.exceed_policy = policy;
        self
    }

    pub fn with_enforcement_strategy(mut self, strategy: ClampStrategy) -> Self {
        self.enforcement_strategy = strategy;
        self
    }

    pub fn with_pull_mode(mut self, mode: PullMode) -> Self {
        self.pull_mode = mode;
        self
    }

    pub fn with_displacement_mode(mut self, mode: DisplacementMode) -> Self {
        self.displacement_mode = mode;
        self
    }
}
