//! Movement session tracker
//!
//! Transient state read and written by the propagation engine:
//! - the last single-step displacement proposed for each entity,
//! - an open drag session per handler, holding the handler's center and
//!   every leashed target's center at the start of the gesture,
//! - the handler center seen at the previous commit.
//!
//! Targets are displaced relative to the session start rather than by summing
//! per-step deltas, so a single teleport and many small steps end in the same
//! place and rounding does not accumulate.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::geometry::Point;
use crate::host::EntityId;

/// Displacement between an entity's position and its latest proposal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastDelta {
    pub dx: f64,
    pub dy: f64,
    pub at: Instant,
    /// The proposal was rejected; the entity did not move.
    pub vetoed: bool,
}

impl LastDelta {
    /// Displacement the entity actually underwent.
    pub fn displacement(&self) -> Point {
        if self.vetoed {
            Point::ZERO
        } else {
            Point::new(self.dx, self.dy)
        }
    }
}

/// A handler's drag gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveSession {
    /// Handler center when the session opened.
    pub start_center: Point,
    /// Target centers when the session opened.
    pub original_centers: HashMap<EntityId, Point>,
    pub last_activity: Instant,
}

impl MoveSession {
    /// Displacement of the handler since the session opened.
    pub fn displacement(&self, handler_now: Point) -> Point {
        handler_now - self.start_center
    }
}

/// Per-engine tracker state. Owned by one engine; never global.
#[derive(Debug, Default)]
pub struct PropagationState {
    deltas: HashMap<EntityId, LastDelta>,
    sessions: HashMap<EntityId, MoveSession>,
    previous_centers: HashMap<EntityId, Point>,
}

impl PropagationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts the last-delta record for an entity.
    pub fn record_delta(&mut self, entity: &EntityId, dx: f64, dy: f64, now: Instant) {
        self.deltas.insert(
            entity.clone(),
            LastDelta {
                dx,
                dy,
                at: now,
                vetoed: false,
            },
        );
    }

    /// Marks the entity's pending delta as rejected.
    pub fn veto_delta(&mut self, entity: &EntityId) {
        if let Some(delta) = self.deltas.get_mut(entity) {
            delta.vetoed = true;
        }
    }

    /// Returns and removes the last-delta record.
    pub fn consume_delta(&mut self, entity: &EntityId) -> Option<LastDelta> {
        self.deltas.remove(entity)
    }

    /// Peeks at the last-delta record.
    pub fn delta(&self, entity: &EntityId) -> Option<&LastDelta> {
        self.deltas.get(entity)
    }

    /// Opens a session for `handler` or refreshes its activity time.
    ///
    /// Original centers are captured only when the session opens; refreshing
    /// keeps the baseline for the whole gesture. Returns `true` when a new
    /// session was opened.
    pub fn open_or_refresh_session<F>(
        &mut self,
        handler: &EntityId,
        now: Instant,
        current_center_of: F,
        leashed_targets: &[EntityId],
    ) -> bool
    where
        F: Fn(&EntityId) -> Option<Point>,
    {
        if let Some(session) = self.sessions.get_mut(handler) {
            session.last_activity = now;
            return false;
        }
        let Some(start_center) = current_center_of(handler) else {
            return false;
        };
        let original_centers = leashed_targets
            .iter()
            .filter_map(|target| current_center_of(target).map(|c| (target.clone(), c)))
            .collect();
        self.sessions.insert(
            handler.clone(),
            MoveSession {
                start_center,
                original_centers,
                last_activity: now,
            },
        );
        true
    }

    pub fn session(&self, handler: &EntityId) -> Option<&MoveSession> {
        self.sessions.get(handler)
    }

    /// Refreshes an existing session's activity time. Returns whether one
    /// existed.
    pub fn touch_session(&mut self, handler: &EntityId, now: Instant) -> bool {
        match self.sessions.get_mut(handler) {
            Some(session) => {
                session.last_activity = now;
                true
            }
            None => false,
        }
    }

    /// Deletes sessions idle for longer than `timeout`. Returns how many were
    /// removed.
    pub fn prune_stale(&mut self, now: Instant, timeout: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, s| now.saturating_duration_since(s.last_activity) <= timeout);
        before - self.sessions.len()
    }

    /// Handler center recorded at its previous commit.
    pub fn previous_center(&self, handler: &EntityId) -> Option<Point> {
        self.previous_centers.get(handler).copied()
    }

    pub fn set_previous_center(&mut self, handler: &EntityId, center: Point) {
        self.previous_centers.insert(handler.clone(), center);
    }

    /// Drops all state for an entity, including its entry in other handlers'
    /// sessions.
    pub fn forget(&mut self, entity: &EntityId) {
        self.deltas.remove(entity);
        self.sessions.remove(entity);
        self.previous_centers.remove(entity);
        for session in self.sessions.values_mut() {
            session.original_centers.remove(entity);
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn delta_count(&self) -> usize {
        self.deltas.len()
    }

    pub fn clear(&mut self) {
        self.deltas.clear();
        self.sessions.clear();
        self.previous_centers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> EntityId {
        EntityId::new(s)
    }

    #[test]
    fn test_delta_is_consumed_once() {
        let mut state = PropagationState::new();
        let now = Instant::now();
        state.record_delta(&id("a"), 3.0, 4.0, now);
        state.record_delta(&id("a"), 5.0, 6.0, now);

        let delta = state.consume_delta(&id("a"));
        assert_eq!(delta.map(|d| d.displacement()), Some(Point::new(5.0, 6.0)));
        assert!(state.consume_delta(&id("a")).is_none());
    }

    #[test]
    fn test_vetoed_delta_has_no_displacement() {
        let mut state = PropagationState::new();
        state.record_delta(&id("a"), 3.0, 4.0, Instant::now());
        state.veto_delta(&id("a"));
        let delta = state.consume_delta(&id("a"));
        assert_eq!(delta.map(|d| d.displacement()), Some(Point::ZERO));
    }

    #[test]
    fn test_session_baseline_survives_refresh() {
        let mut state = PropagationState::new();
        let t0 = Instant::now();
        let centers: HashMap<EntityId, Point> = [
            (id("h"), Point::new(0.0, 0.0)),
            (id("t"), Point::new(30.0, 0.0)),
        ]
        .into_iter()
        .collect();
        let lookup = |e: &EntityId| centers.get(e).copied();

        assert!(state.open_or_refresh_session(&id("h"), t0, lookup, &[id("t")]));

        // Entities move; a refresh must not recapture.
        let moved: HashMap<EntityId, Point> = [
            (id("h"), Point::new(50.0, 0.0)),
            (id("t"), Point::new(80.0, 0.0)),
        ]
        .into_iter()
        .collect();
        let t1 = t0 + Duration::from_millis(50);
        assert!(!state.open_or_refresh_session(
            &id("h"),
            t1,
            |e| moved.get(e).copied(),
            &[id("t")]
        ));

        let session = state.session(&id("h")).cloned();
        assert_eq!(session.as_ref().map(|s| s.start_center), Some(Point::ZERO));
        assert_eq!(
            session.as_ref().and_then(|s| s.original_centers.get(&id("t")).copied()),
            Some(Point::new(30.0, 0.0))
        );
        assert_eq!(session.map(|s| s.last_activity), Some(t1));
    }

    #[test]
    fn test_prune_stale_sessions() {
        let mut state = PropagationState::new();
        let t0 = Instant::now();
        let lookup = |_: &EntityId| Some(Point::ZERO);
        state.open_or_refresh_session(&id("old"), t0, lookup, &[]);
        state.open_or_refresh_session(&id("fresh"), t0 + Duration::from_millis(200), lookup, &[]);

        let removed = state.prune_stale(t0 + Duration::from_millis(300), Duration::from_millis(250));
        assert_eq!(removed, 1);
        assert!(state.session(&id("old")).is_none());
        assert!(state.session(&id("fresh")).is_some());
    }

    #[test]
    fn test_session_not_opened_without_handler_center() {
        let mut state = PropagationState::new();
        assert!(!state.open_or_refresh_session(&id("ghost"), Instant::now(), |_| None, &[]));
        assert_eq!(state.session_count(), 0);
    }

    #[test]
    fn test_forget_removes_entity_everywhere() {
        let mut state = PropagationState::new();
        let now = Instant::now();
        let lookup = |_: &EntityId| Some(Point::ZERO);
        state.open_or_refresh_session(&id("h"), now, lookup, &[id("t")]);
        state.record_delta(&id("t"), 1.0, 1.0, now);
        state.set_previous_center(&id("t"), Point::ZERO);

        state.forget(&id("t"));
        assert!(state.delta(&id("t")).is_none());
        assert!(state.previous_center(&id("t")).is_none());
        assert!(state
            .session(&id("h"))
            .is_some_and(|s| s.original_centers.is_empty()));
    }
}
