//! Leash ring model
//!
//! Works out which leash rings a renderer should draw. Drawing them is the
//! host's business.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::geometry::{current_center, units_to_pixels, Point};
use crate::host::{AttributeStore, EntityId, SceneQuery};
use crate::relation::read_leash;

/// When rings are displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RingVisibility {
    /// While a handler or target is hovered or controlled.
    #[default]
    Hover,
    /// Whenever a leash exists.
    Always,
    /// Never.
    Never,
}

impl fmt::Display for RingVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hover => write!(f, "hover"),
            Self::Always => write!(f, "always"),
            Self::Never => write!(f, "never"),
        }
    }
}

impl FromStr for RingVisibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hover" => Ok(Self::Hover),
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            _ => Err(format!("Unknown ring visibility: {}", s)),
        }
    }
}

/// A circle of the leash radius around a handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ring {
    pub handler: EntityId,
    pub target: EntityId,
    pub center: Point,
    pub radius_px: f64,
}

/// Rings to display given the visibility mode and the entity currently
/// hovered or controlled, if any.
pub fn rings_to_show<S>(host: &S, visibility: RingVisibility, focus: Option<&EntityId>) -> Vec<Ring>
where
    S: SceneQuery + AttributeStore + ?Sized,
{
    if visibility == RingVisibility::Never {
        return Vec::new();
    }
    if visibility == RingVisibility::Hover && focus.is_none() {
        return Vec::new();
    }

    let dims = host.dimensions();
    let scene_id = host.scene_id();
    let mut rings = Vec::new();
    for target in host.entities() {
        let Some(relation) = read_leash(host, &target.id) else {
            continue;
        };
        if !relation.belongs_to(&scene_id) {
            continue;
        }
        let involved = focus.is_some_and(|f| f == &relation.handler_id || f == &target.id);
        if visibility == RingVisibility::Hover && !involved {
            continue;
        }
        let Some(handler) = host.entity(&relation.handler_id) else {
            continue;
        };
        rings.push(Ring {
            handler: handler.id.clone(),
            target: target.id.clone(),
            center: current_center(&handler, dims.as_ref()).point,
            radius_px: units_to_pixels(relation.distance, dims.as_ref()),
        });
    }
    rings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SceneDimensions;
    use crate::host::{Entity, SceneId};
    use crate::memory::MemoryScene;
    use crate::relation::LeashRelation;

    fn scene() -> MemoryScene {
        let scene = MemoryScene::new("s", SceneDimensions::new(100.0, 5.0));
        scene.insert(Entity::new("h", 0.0, 0.0));
        scene.insert(Entity::new("t", 100.0, 0.0));
        scene.insert(Entity::new("h2", 500.0, 0.0));
        scene.insert(Entity::new("t2", 600.0, 0.0));
        scene.put_leash(
            &EntityId::new("t"),
            &LeashRelation::new(EntityId::new("h"), SceneId::new("s"), 5.0),
        );
        scene.put_leash(
            &EntityId::new("t2"),
            &LeashRelation::new(EntityId::new("h2"), SceneId::new("s"), 2.0),
        );
        scene
    }

    #[test]
    fn test_never_shows_nothing() {
        let scene = scene();
        assert!(rings_to_show(&scene, RingVisibility::Never, Some(&EntityId::new("h"))).is_empty());
    }

    #[test]
    fn test_hover_shows_pairs_involving_focus() {
        let scene = scene();
        assert!(rings_to_show(&scene, RingVisibility::Hover, None).is_empty());

        let rings = rings_to_show(&scene, RingVisibility::Hover, Some(&EntityId::new("t")));
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].handler.as_str(), "h");
        assert_eq!(rings[0].center, Point::new(50.0, 50.0));
        assert_eq!(rings[0].radius_px, 100.0);
    }

    #[test]
    fn test_always_shows_every_pair() {
        let scene = scene();
        let rings = rings_to_show(&scene, RingVisibility::Always, None);
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[1].radius_px, 40.0);
    }
}
