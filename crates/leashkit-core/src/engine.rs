//! Propagation engine
//!
//! Drives the two-phase move protocol for one scene:
//!
//! 1. **Propose** ([`LeashEngine::on_propose`]): enforce the leash on a
//!    target's own move, record the mover's delta, and open or refresh a drag
//!    session if the mover is a handler.
//! 2. **Commit** ([`LeashEngine::on_commit`]): compute a new position for
//!    every target of the committed handler against one snapshot of the
//!    handler's center, clamp each to its radius, and write them in a single
//!    batch tagged [`UpdateOrigin::Internal`].
//!
//! Commits for the same handler are serialized so overlapping cycles cannot
//! interleave their batches.

use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::{DisplacementMode, EngineConfig, PullMode};
use crate::enforce::{self, Verdict};
use crate::error::{LeashError, Result};
use crate::event_bus::{LeashEvent, LeashEventBus};
use crate::geometry::{current_center, units_to_pixels, Point, SceneDimensions, EPSILON};
use crate::host::{Entity, EntityId, LeashHost, PositionUpdate, UpdateOrigin};
use crate::index::{HandlerIndex, ScanIndex};
use crate::moves::{CommitMove, MoveEvent, ProposeMove};
use crate::relation::{
    candidate_handlers, clear_leash, read_leash, write_leash, Actor, HandlerOption, LeashAccess,
    LeashRelation, LeashRequest,
};
use crate::rings::{rings_to_show, Ring, RingVisibility};
use crate::solver::clamp_pixel;
use crate::tracker::{LastDelta, MoveSession, PropagationState};

/// Why a handler/target pair produced no update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The handler is no longer in the scene.
    HandlerMissing,
    /// The target is no longer in the scene.
    TargetMissing,
    /// The stored relation has an unusable distance.
    InvalidDistance,
    /// The scene cannot convert units to pixels.
    NoDimensions,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HandlerMissing => write!(f, "handler missing"),
            Self::TargetMissing => write!(f, "target missing"),
            Self::InvalidDistance => write!(f, "invalid leash distance"),
            Self::NoDimensions => write!(f, "scene has no dimensions"),
        }
    }
}

/// A pair that was skipped during a commit cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPair {
    pub target: Option<EntityId>,
    pub reason: SkipReason,
}

/// What one commit cycle did.
#[derive(Debug, Clone, PartialEq)]
pub struct PropagationReport {
    pub handler: EntityId,
    /// Handler displacement applied to the targets, in pixels.
    pub displacement: Point,
    /// Derived positions written in the batch.
    pub updates: Vec<PositionUpdate>,
    pub skipped: Vec<SkippedPair>,
}

impl PropagationReport {
    fn idle(handler: &EntityId) -> Self {
        Self {
            handler: handler.clone(),
            displacement: Point::ZERO,
            updates: Vec::new(),
            skipped: Vec::new(),
        }
    }

    fn skipped_all(handler: &EntityId, reason: SkipReason) -> Self {
        let mut report = Self::idle(handler);
        report.skipped.push(SkippedPair {
            target: None,
            reason,
        });
        report
    }
}

/// Result of [`LeashEngine::handle`].
#[derive(Debug, Clone, PartialEq)]
pub enum Handled {
    /// A proposal was evaluated; the possibly rewritten proposal is returned.
    Proposal {
        verdict: Verdict,
        proposal: ProposeMove,
    },
    /// A commit ran; `None` when its batch write failed.
    Commit(Option<PropagationReport>),
    /// An entity was deleted; number of relations removed.
    Deleted(usize),
}

/// Handler displacement for one commit and where targets start from.
#[derive(Debug, Clone, Copy)]
struct Pull {
    displacement: Point,
    from_session_origin: bool,
}

fn handler_pull(
    mode: DisplacementMode,
    session: Option<&MoveSession>,
    delta: Option<&LastDelta>,
    previous: Point,
    handler_now: Point,
) -> Pull {
    let incremental = handler_now - previous;
    match (mode, session) {
        (DisplacementMode::Session, Some(session)) => {
            let total = session.displacement(handler_now);
            // A session baseline captured after the handler had already moved
            // sees no displacement; fall back to the incremental step.
            if total.is_negligible() && !incremental.is_negligible() {
                Pull {
                    displacement: incremental,
                    from_session_origin: false,
                }
            } else {
                Pull {
                    displacement: total,
                    from_session_origin: true,
                }
            }
        }
        (DisplacementMode::Session, None) => Pull {
            displacement: delta.map_or(incremental, LastDelta::displacement),
            from_session_origin: false,
        },
        (DisplacementMode::Incremental, _) => Pull {
            displacement: incremental,
            from_session_origin: false,
        },
    }
}

enum CommitPlan {
    Idle,
    Ready(PropagationReport, Vec<LeashEvent>),
}

/// Leash engine for one scene.
pub struct LeashEngine<H: LeashHost> {
    host: Arc<H>,
    config: RwLock<EngineConfig>,
    access: LeashAccess,
    state: Mutex<PropagationState>,
    index: Box<dyn HandlerIndex>,
    clock: Arc<dyn Clock>,
    bus: Arc<LeashEventBus>,
    handler_locks: Mutex<HashMap<EntityId, Arc<tokio::sync::Mutex<()>>>>,
    internal_writes: Mutex<HashSet<EntityId>>,
}

impl<H: LeashHost> LeashEngine<H> {
    /// Creates an engine with default configuration, a full-scan index, and
    /// the wall clock.
    pub fn new(host: Arc<H>) -> Self {
        Self {
            host,
            config: RwLock::new(EngineConfig::default()),
            access: LeashAccess::default(),
            state: Mutex::new(PropagationState::new()),
            index: Box::new(ScanIndex),
            clock: Arc::new(SystemClock),
            bus: Arc::new(LeashEventBus::new()),
            handler_locks: Mutex::new(HashMap::new()),
            internal_writes: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_config(self, config: EngineConfig) -> Self {
        *self.config.write() = config;
        self
    }

    pub fn with_access(mut self, access: LeashAccess) -> Self {
        self.access = access;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_index(mut self, index: Box<dyn HandlerIndex>) -> Self {
        self.index = index;
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<LeashEventBus>) -> Self {
        self.bus = bus;
        self
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    pub fn config(&self) -> EngineConfig {
        *self.config.read()
    }

    /// Replaces the configuration; takes effect on the next event.
    pub fn set_config(&self, config: EngineConfig) {
        *self.config.write() = config;
    }

    pub fn events(&self) -> &Arc<LeashEventBus> {
        &self.bus
    }

    /// Number of open drag sessions.
    pub fn session_count(&self) -> usize {
        self.state.lock().session_count()
    }

    /// Whether `handler` has an open drag session.
    pub fn has_session(&self, handler: &EntityId) -> bool {
        self.state.lock().session(handler).is_some()
    }

    /// Drops all transient state.
    pub fn reset(&self) {
        self.state.lock().clear();
        self.index.invalidate();
        self.internal_writes.lock().clear();
        tracing::debug!("Leash engine state reset");
    }

    // ---------------------------------------------------------------------
    // Leash relations
    // ---------------------------------------------------------------------

    /// The relation stored on `target`, if any.
    pub fn leash_of(&self, target: &EntityId) -> Option<LeashRelation> {
        read_leash(self.host.as_ref(), target)
    }

    /// Every other entity in the scene, as leash form choices.
    pub fn candidate_handlers(&self, target: &EntityId) -> Vec<HandlerOption> {
        candidate_handlers(&self.host.entities(), target)
    }

    /// Leashes `target` to `handler` at `distance` scene units, replacing any
    /// existing relation.
    pub async fn apply_leash(
        &self,
        target: &EntityId,
        handler: &EntityId,
        distance: f64,
    ) -> Result<LeashRelation> {
        let scene_id = self.host.scene_id();
        let relation = LeashRelation::new(handler.clone(), scene_id.clone(), distance);
        relation.validate()?;
        if target == handler {
            return Err(LeashError::SelfLeash {
                entity_id: target.to_string(),
            }
            .into());
        }
        if self.host.entity(target).is_none() {
            return Err(LeashError::TargetNotFound {
                target_id: target.to_string(),
                scene_id: scene_id.to_string(),
            }
            .into());
        }
        if self.host.entity(handler).is_none() {
            return Err(LeashError::HandlerNotFound {
                handler_id: handler.to_string(),
                scene_id: scene_id.to_string(),
            }
            .into());
        }

        if let Err(e) = write_leash(self.host.as_ref(), target, &relation).await {
            tracing::warn!("Failed to store leash on {}: {}", target, e);
            return Err(e.into());
        }
        self.index.relation_changed(target, Some(&relation));

        tracing::info!("Leashed {} to {} at {}", target, handler, distance);
        self.bus.publish(LeashEvent::Applied {
            target: target.clone(),
            handler: handler.clone(),
            distance,
        });
        Ok(relation)
    }

    /// [`apply_leash`](Self::apply_leash) on behalf of `actor`.
    pub async fn apply_leash_as(
        &self,
        actor: Actor,
        target: &EntityId,
        handler: &EntityId,
        distance: f64,
    ) -> Result<LeashRelation> {
        self.authorize(actor)?;
        self.apply_leash(target, handler, distance).await
    }

    /// [`remove_leash`](Self::remove_leash) on behalf of `actor`.
    pub async fn remove_leash_as(
        &self,
        actor: Actor,
        target: &EntityId,
    ) -> Result<Option<LeashRelation>> {
        self.authorize(actor)?;
        self.remove_leash(target).await
    }

    fn authorize(&self, actor: Actor) -> Result<()> {
        if self.access.permits(actor) {
            Ok(())
        } else {
            tracing::debug!("{:?} may not manage leashes under {:?}", actor, self.access);
            Err(LeashError::NotPermitted.into())
        }
    }

    /// Applies a validated form request.
    pub async fn apply_request(
        &self,
        target: &EntityId,
        request: &LeashRequest,
    ) -> Result<LeashRelation> {
        self.apply_leash(target, &request.handler_id, request.distance)
            .await
    }

    /// Removes the relation on `target`. Returns the removed relation, or
    /// `None` if there was none.
    pub async fn remove_leash(&self, target: &EntityId) -> Result<Option<LeashRelation>> {
        let existing = self.leash_of(target);
        if let Err(e) = clear_leash(self.host.as_ref(), target).await {
            tracing::warn!("Failed to remove leash from {}: {}", target, e);
            return Err(e.into());
        }
        self.index.relation_changed(target, None);

        if let Some(relation) = &existing {
            tracing::info!("Unleashed {} from {}", target, relation.handler_id);
            self.bus.publish(LeashEvent::Removed {
                target: target.clone(),
                handler: relation.handler_id.clone(),
            });
        }
        Ok(existing)
    }

    /// Rings a renderer should draw for the given visibility and focus.
    pub fn rings(&self, visibility: RingVisibility, focus: Option<&EntityId>) -> Vec<Ring> {
        rings_to_show(self.host.as_ref(), visibility, focus)
    }

    // ---------------------------------------------------------------------
    // Event handling
    // ---------------------------------------------------------------------

    /// Dispatches a validated host event. Never fails; errors are logged.
    pub async fn handle(&self, event: MoveEvent) -> Handled {
        match event {
            MoveEvent::Propose(mut proposal) => {
                let verdict = self.on_propose(&mut proposal);
                Handled::Proposal { verdict, proposal }
            }
            MoveEvent::Commit(commit) => match self.on_commit(&commit).await {
                Ok(report) => Handled::Commit(Some(report)),
                Err(e) => {
                    tracing::warn!("Commit of {} left targets unchanged: {}", commit.entity, e);
                    Handled::Commit(None)
                }
            },
            MoveEvent::Deleted { entity } => Handled::Deleted(self.on_entity_deleted(&entity).await),
        }
    }

    /// Handles a proposed move. May rewrite `proposal` (clamp) or return
    /// [`Verdict::Block`], in which case the host must not apply the move.
    pub fn on_propose(&self, proposal: &mut ProposeMove) -> Verdict {
        if !proposal.changes_position() {
            return Verdict::Allow;
        }
        let Some(entity) = self.host.entity(&proposal.entity) else {
            tracing::debug!("Proposal for unknown entity {}", proposal.entity);
            return Verdict::Allow;
        };
        let dims = self.host.dimensions();
        let internal = proposal.origin == UpdateOrigin::Internal
            || self.internal_writes.lock().contains(&entity.id);

        let verdict = if internal {
            Verdict::Allow
        } else {
            self.enforce(&entity, proposal, dims.as_ref())
        };
        if let Verdict::Clamp { x, y } = verdict {
            proposal.x = Some(x);
            proposal.y = Some(y);
        }

        let (new_x, new_y) = proposal.resolve(&entity);
        let now = self.clock.now();

        if matches!(verdict, Verdict::Block { .. }) {
            let mut state = self.state.lock();
            state.record_delta(&entity.id, new_x - entity.x, new_y - entity.y, now);
            state.veto_delta(&entity.id);
            return verdict;
        }

        let targets: Vec<EntityId> = self
            .index
            .targets_of(self.host.as_ref(), self.host.as_ref(), &entity.id)
            .into_iter()
            .map(|(id, _)| id)
            .collect();

        let mut state = self.state.lock();
        state.record_delta(&entity.id, new_x - entity.x, new_y - entity.y, now);
        if !targets.is_empty() {
            let host = self.host.as_ref();
            let opened = state.open_or_refresh_session(
                &entity.id,
                now,
                |id| {
                    host.entity(id)
                        .map(|e| current_center(&e, dims.as_ref()).point)
                },
                &targets,
            );
            if opened {
                tracing::debug!(
                    "Opened drag session for {} with {} target(s)",
                    entity.id,
                    targets.len()
                );
            }
        }
        verdict
    }

    fn enforce(
        &self,
        entity: &Entity,
        proposal: &ProposeMove,
        dims: Option<&SceneDimensions>,
    ) -> Verdict {
        let Some(relation) = self.leash_of(&entity.id) else {
            return Verdict::Allow;
        };
        if !relation.belongs_to(&self.host.scene_id()) {
            return Verdict::Allow;
        }
        if let Err(e) = relation.validate() {
            tracing::debug!("Ignoring stored leash on {}: {}", entity.id, e);
            return Verdict::Allow;
        }
        let Some(handler) = self.host.entity(&relation.handler_id) else {
            return Verdict::Allow;
        };
        let Some(dims) = dims else {
            tracing::debug!("Scene cannot measure; not enforcing leash on {}", entity.id);
            return Verdict::Allow;
        };

        let config = self.config();
        let verdict = enforce::evaluate(
            entity,
            proposal.resolve(entity),
            &handler,
            &relation,
            dims,
            &config,
        );
        match verdict {
            Verdict::Allow => {}
            Verdict::Block { attempted, limit } => {
                tracing::debug!(
                    "Blocked {}: {:.2} exceeds leash {:.2}",
                    entity.id,
                    attempted,
                    limit
                );
                self.bus.publish(LeashEvent::MoveBlocked {
                    entity: entity.id.clone(),
                    handler: handler.id.clone(),
                    attempted,
                    limit,
                });
            }
            Verdict::Clamp { x, y } => {
                let (req_x, req_y) = proposal.resolve(entity);
                tracing::debug!("Clamped {} to ({:.2}, {:.2})", entity.id, x, y);
                self.bus.publish(LeashEvent::MoveClamped {
                    entity: entity.id.clone(),
                    handler: handler.id.clone(),
                    requested: Point::new(req_x, req_y),
                    allowed: Point::new(x, y),
                });
            }
        }
        verdict
    }

    fn handler_lock(&self, handler: &EntityId) -> Arc<tokio::sync::Mutex<()>> {
        self.handler_locks
            .lock()
            .entry(handler.clone())
            .or_default()
            .clone()
    }

    /// Handles a committed move of `commit.entity`, pulling every target
    /// leashed to it.
    pub async fn on_commit(&self, commit: &CommitMove) -> Result<PropagationReport> {
        let handler_id = &commit.entity;
        let lock = self.handler_lock(handler_id);
        let _serial = lock.lock().await;

        let (report, rings) = match self.plan_commit(handler_id) {
            CommitPlan::Idle => return Ok(PropagationReport::idle(handler_id)),
            CommitPlan::Ready(report, rings) => (report, rings),
        };

        for ring in rings {
            self.bus.publish(ring);
        }
        for skipped in &report.skipped {
            if let Some(target) = &skipped.target {
                self.bus.publish(LeashEvent::PairSkipped {
                    handler: handler_id.clone(),
                    target: target.clone(),
                    reason: skipped.reason.to_string(),
                });
            }
        }

        if report.updates.is_empty() {
            self.prune_sessions();
            return Ok(report);
        }

        {
            let mut internal = self.internal_writes.lock();
            internal.extend(report.updates.iter().map(|u| u.id.clone()));
        }
        let written = self
            .host
            .apply_updates(report.updates.clone(), UpdateOrigin::Internal)
            .await;
        {
            let mut internal = self.internal_writes.lock();
            for update in &report.updates {
                internal.remove(&update.id);
            }
        }
        self.prune_sessions();

        match written {
            Ok(()) => {
                tracing::debug!(
                    "{} pulled {} target(s) by {}",
                    handler_id,
                    report.updates.len(),
                    report.displacement
                );
                self.bus.publish(LeashEvent::TargetsPulled {
                    handler: handler_id.clone(),
                    displacement: report.displacement,
                    count: report.updates.len(),
                });
                Ok(report)
            }
            Err(e) => {
                tracing::warn!("Failed to write pulled targets of {}: {}", handler_id, e);
                self.bus.publish(LeashEvent::PropagationFailed {
                    handler: handler_id.clone(),
                    reason: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    fn prune_sessions(&self) {
        let timeout = self.config().session_timeout();
        let now = self.clock.now();
        let pruned = self.state.lock().prune_stale(now, timeout);
        if pruned > 0 {
            tracing::trace!("Pruned {} stale session(s)", pruned);
        }
    }

    fn plan_commit(&self, handler_id: &EntityId) -> CommitPlan {
        let now = self.clock.now();
        let config = self.config();

        let (delta, has_session) = {
            let mut state = self.state.lock();
            let delta = state.consume_delta(handler_id);
            let has_session = state.touch_session(handler_id, now);
            (delta, has_session)
        };
        if delta.is_none() && !has_session {
            return CommitPlan::Idle;
        }

        let Some(handler) = self.host.entity(handler_id) else {
            tracing::debug!("Handler {} vanished before commit; skipping", handler_id);
            self.state.lock().forget(handler_id);
            return CommitPlan::Ready(
                PropagationReport::skipped_all(handler_id, SkipReason::HandlerMissing),
                Vec::new(),
            );
        };
        let Some(dims) = self.host.dimensions() else {
            tracing::debug!("Scene has no dimensions; not pulling targets of {}", handler_id);
            return CommitPlan::Ready(
                PropagationReport::skipped_all(handler_id, SkipReason::NoDimensions),
                Vec::new(),
            );
        };

        let handler_now = current_center(&handler, Some(&dims)).point;
        let targets = self
            .index
            .targets_of(self.host.as_ref(), self.host.as_ref(), handler_id);

        let (previous, session) = {
            let mut state = self.state.lock();
            let previous = state.previous_center(handler_id).unwrap_or_else(|| {
                delta.map_or(handler_now, |d| handler_now - d.displacement())
            });
            state.set_previous_center(handler_id, handler_now);
            (previous, state.session(handler_id).cloned())
        };

        let pull = handler_pull(
            config.displacement_mode,
            session.as_ref(),
            delta.as_ref(),
            previous,
            handler_now,
        );

        let mut report = PropagationReport::idle(handler_id);
        report.displacement = match config.pull_mode {
            PullMode::Drag => pull.displacement,
            PullMode::ClampOnly => Point::ZERO,
        };
        let mut rings = Vec::new();

        for (target_id, relation) in targets {
            let Some(target) = self.host.entity(&target_id) else {
                report.skipped.push(SkippedPair {
                    target: Some(target_id),
                    reason: SkipReason::TargetMissing,
                });
                continue;
            };
            if relation.validate().is_err() {
                report.skipped.push(SkippedPair {
                    target: Some(target_id),
                    reason: SkipReason::InvalidDistance,
                });
                continue;
            }

            let current = current_center(&target, Some(&dims));
            let proposed = match config.pull_mode {
                PullMode::ClampOnly => current.point,
                PullMode::Drag => {
                    let baseline = if pull.from_session_origin {
                        session
                            .as_ref()
                            .and_then(|s| s.original_centers.get(&target_id).copied())
                            .unwrap_or(current.point)
                    } else {
                        current.point
                    };
                    baseline + pull.displacement
                }
            };

            let radius_px = units_to_pixels(relation.distance, Some(&dims));
            let final_center = clamp_pixel(handler_now, proposed, radius_px);
            tracing::trace!(
                "{} -> {}: current={} proposed={} final={} radius={:.2}",
                handler_id,
                target_id,
                current.point,
                proposed,
                final_center,
                radius_px
            );

            rings.push(LeashEvent::RingMoved {
                handler: handler_id.clone(),
                target: target_id.clone(),
                center: handler_now,
                radius_px,
            });

            if final_center.distance_to(current.point) < EPSILON {
                continue;
            }
            let top_left = current.top_left_for(final_center);
            report.updates.push(PositionUpdate {
                id: target_id,
                x: top_left.x,
                y: top_left.y,
            });
        }

        CommitPlan::Ready(report, rings)
    }

    /// Cleans up after an entity left the scene: drops its tracker state and
    /// removes its own relation and every relation naming it as handler.
    /// Returns the number of relations removed.
    pub async fn on_entity_deleted(&self, entity: &EntityId) -> usize {
        let orphaned = self
            .index
            .targets_of(self.host.as_ref(), self.host.as_ref(), entity);
        self.state.lock().forget(entity);
        self.handler_locks.lock().remove(entity);

        let mut removed = 0;
        let own = self.leash_of(entity);
        if let Some(relation) = own {
            match clear_leash(self.host.as_ref(), entity).await {
                Ok(()) => {
                    removed += 1;
                    self.bus.publish(LeashEvent::Removed {
                        target: entity.clone(),
                        handler: relation.handler_id,
                    });
                }
                Err(e) => tracing::warn!("Failed to clear leash of deleted {}: {}", entity, e),
            }
        }

        for (target, _) in orphaned {
            match clear_leash(self.host.as_ref(), &target).await {
                Ok(()) => {
                    removed += 1;
                    self.index.relation_changed(&target, None);
                    self.bus.publish(LeashEvent::Removed {
                        target: target.clone(),
                        handler: entity.clone(),
                    });
                }
                Err(e) => tracing::warn!("Failed to clear orphaned leash on {}: {}", target, e),
            }
        }
        self.index.entity_removed(entity);

        if removed > 0 {
            tracing::info!("Removed {} leash(es) after {} was deleted", removed, entity);
        }
        removed
    }
}

impl<H: LeashHost> fmt::Debug for LeashEngine<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeashEngine")
            .field("scene", &self.host.scene_id())
            .field("config", &self.config())
            .field("access", &self.access)
            .field("sessions", &self.session_count())
            .finish()
    }
}
