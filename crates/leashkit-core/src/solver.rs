//! Constraint solver
//!
//! Finds the nearest allowed point to a proposed position given a handler
//! center and a maximum radius. Two strategies:
//!
//! - [`ClampStrategy::Pixel`]: closed-form projection onto the circle of
//!   radius `R` pixels. Cheap; used for drag propagation.
//! - [`ClampStrategy::Grid`]: bisection along the segment from handler to
//!   proposal under the scene's own distance rules, which are not invertible
//!   in closed form once diagonals cost differently.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::geometry::{units_to_pixels, Point, SceneDimensions, EPSILON};

/// Bisection steps for the grid strategy. 2^-24 of the segment is well below
/// a pixel at any realistic grid size.
pub const BISECTION_ITERATIONS: usize = 24;

/// Which metric decides the leash boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClampStrategy {
    /// Euclidean distance in pixels.
    Pixel,
    /// The scene's grid metric.
    #[default]
    Grid,
}

impl fmt::Display for ClampStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pixel => write!(f, "pixel"),
            Self::Grid => write!(f, "grid"),
        }
    }
}

impl FromStr for ClampStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pixel" => Ok(Self::Pixel),
            "grid" => Ok(Self::Grid),
            _ => Err(format!("Unknown clamp strategy: {}", s)),
        }
    }
}

/// Projects `proposed` onto the circle of `radius_px` around `handler` when it
/// lies outside.
pub fn clamp_pixel(handler: Point, proposed: Point, radius_px: f64) -> Point {
    let offset = proposed - handler;
    let distance = offset.length();
    if distance <= radius_px {
        return proposed;
    }
    if distance < EPSILON {
        return handler;
    }
    handler + offset * (radius_px / distance)
}

/// Largest point along `handler -> proposed` whose `measure` from the handler
/// stays within `radius_units`.
///
/// `measure` must be monotonic along the ray.
pub fn clamp_grid<F>(handler: Point, proposed: Point, radius_units: f64, measure: F) -> Point
where
    F: Fn(Point, Point) -> f64,
{
    if measure(handler, proposed) <= radius_units {
        return proposed;
    }
    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    for _ in 0..BISECTION_ITERATIONS {
        let mid = (lo + hi) / 2.0;
        if measure(handler, handler.lerp(proposed, mid)) <= radius_units {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    handler.lerp(proposed, lo)
}

/// Result of solving one constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clamped {
    /// The allowed point.
    pub point: Point,
    /// Whether the proposal had to be moved.
    pub clamped: bool,
}

/// Applies a strategy using a scene's dimensions.
#[derive(Debug, Clone, Copy)]
pub struct ConstraintSolver {
    dims: SceneDimensions,
    strategy: ClampStrategy,
}

impl ConstraintSolver {
    pub fn new(dims: SceneDimensions, strategy: ClampStrategy) -> Self {
        Self { dims, strategy }
    }

    pub fn strategy(&self) -> ClampStrategy {
        self.strategy
    }

    /// Distance from `handler` to `point` in scene units under this solver's
    /// strategy.
    pub fn distance_units(&self, handler: Point, point: Point) -> f64 {
        match self.strategy {
            ClampStrategy::Pixel => {
                let px = handler.distance_to(point);
                self.dims.pixels_per_unit().map_or(0.0, |scale| px / scale)
            }
            ClampStrategy::Grid => self.dims.measure(handler, point),
        }
    }

    /// Whether `point` lies within `radius_units` of `handler`.
    pub fn is_within(&self, handler: Point, point: Point, radius_units: f64) -> bool {
        self.distance_units(handler, point) <= radius_units
    }

    /// Nearest allowed point to `proposed`.
    pub fn solve(&self, handler: Point, proposed: Point, radius_units: f64) -> Clamped {
        let point = match self.strategy {
            ClampStrategy::Pixel => {
                clamp_pixel(handler, proposed, units_to_pixels(radius_units, Some(&self.dims)))
            }
            ClampStrategy::Grid => {
                let dims = self.dims;
                clamp_grid(handler, proposed, radius_units, |a, b| dims.measure(a, b))
            }
        };
        Clamped {
            point,
            clamped: point != proposed,
        }
    }
}
