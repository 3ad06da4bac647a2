//! Scene geometry
//!
//! Unit/pixel conversion, entity center computation, and the distance
//! functions a scene can measure with. Positions are top-left corners in
//! pixels; entity sizes are in grid cells.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};

use crate::host::Entity;

/// Cell size assumed when a scene reports no dimensions.
pub const DEFAULT_GRID_SIZE_PX: f64 = 100.0;

/// Displacements and distances below this are treated as zero.
pub const EPSILON: f64 = 1e-6;

/// A point or vector on the scene plane, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// The origin.
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    /// Creates a new point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length of this point taken as a vector.
    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: Point) -> f64 {
        (other - *self).length()
    }

    /// 2D cross product (z component).
    pub fn cross(&self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Dot product.
    pub fn dot(&self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// True when both components are below [`EPSILON`] in magnitude.
    pub fn is_negligible(&self) -> bool {
        self.x.abs() < EPSILON && self.y.abs() < EPSILON
    }

    /// Linear interpolation: `self + (other - self) * t`.
    pub fn lerp(&self, other: Point, t: f64) -> Point {
        *self + (other - *self) * t
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// Center of an entity's bounding box together with its pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Center {
    pub point: Point,
    pub width_px: f64,
    pub height_px: f64,
}

impl Center {
    /// Top-left corner of a box of this size centered on `center`.
    pub fn top_left_for(&self, center: Point) -> Point {
        Point::new(
            center.x - self.width_px / 2.0,
            center.y - self.height_px / 2.0,
        )
    }
}

/// Diagonal movement rule on square grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagonalRule {
    /// Diagonal steps cost the same as orthogonal ones (Chebyshev).
    #[default]
    Equidistant,
    /// Every second diagonal step costs double (1-2-1).
    Alternating,
    /// No diagonal steps; distance is the sum of both axes.
    Manhattan,
    /// True Euclidean distance measured in cells.
    Exact,
}

/// Grid layout of a scene, which determines its native distance function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GridKind {
    /// No grid; distances are Euclidean.
    Gridless,
    /// Square cells.
    Square {
        #[serde(default)]
        diagonals: DiagonalRule,
    },
    /// Pointy-top hexagons; `grid_size_px` is the center spacing of
    /// horizontally adjacent cells.
    Hex,
}

impl Default for GridKind {
    fn default() -> Self {
        Self::Square {
            diagonals: DiagonalRule::default(),
        }
    }
}

impl fmt::Display for GridKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gridless => write!(f, "gridless"),
            Self::Square { diagonals } => write!(f, "square ({:?})", diagonals),
            Self::Hex => write!(f, "hex"),
        }
    }
}

/// Scene-wide scale constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneDimensions {
    /// Size of one grid cell in pixels.
    pub grid_size_px: f64,
    /// Distance one grid cell represents, in scene units.
    pub grid_distance_units: f64,
    /// Grid layout.
    #[serde(default)]
    pub grid: GridKind,
}

impl SceneDimensions {
    /// Creates square-grid dimensions with equidistant diagonals.
    pub fn new(grid_size_px: f64, grid_distance_units: f64) -> Self {
        Self {
            grid_size_px,
            grid_distance_units,
            grid: GridKind::default(),
        }
    }

    /// Replaces the grid layout.
    pub fn with_grid(mut self, grid: GridKind) -> Self {
        self.grid = grid;
        self
    }

    /// Pixels per scene unit, or `None` when the dimensions are unusable.
    pub fn pixels_per_unit(&self) -> Option<f64> {
        if self.grid_distance_units > 0.0 && self.grid_size_px > 0.0 {
            Some(self.grid_size_px / self.grid_distance_units)
        } else {
            None
        }
    }

    /// Distance between two pixel positions under this scene's grid rules,
    /// in scene units.
    pub fn measure(&self, a: Point, b: Point) -> f64 {
        if self.grid_size_px <= 0.0 {
            return 0.0;
        }
        let dx = (b.x - a.x) / self.grid_size_px;
        let dy = (b.y - a.y) / self.grid_size_px;
        let cells = match self.grid {
            GridKind::Gridless => dx.hypot(dy),
            GridKind::Square { diagonals } => square_cells(dx.abs(), dy.abs(), diagonals),
            GridKind::Hex => hex_cells(dx, dy),
        };
        cells * self.grid_distance_units
    }
}

fn square_cells(dx: f64, dy: f64, rule: DiagonalRule) -> f64 {
    let (long, short) = if dx >= dy { (dx, dy) } else { (dy, dx) };
    match rule {
        DiagonalRule::Equidistant => long,
        DiagonalRule::Alternating => long + short / 2.0,
        DiagonalRule::Manhattan => long + short,
        DiagonalRule::Exact => dx.hypot(dy),
    }
}

// Cube distance over fractional axial coordinates. Inputs are in units of
// the horizontal center spacing.
fn hex_cells(dx: f64, dy: f64) -> f64 {
    let radius = 1.0 / 3f64.sqrt();
    let q = (3f64.sqrt() / 3.0 * dx - dy / 3.0) / radius;
    let r = (2.0 / 3.0 * dy) / radius;
    let s = -q - r;
    q.abs().max(r.abs()).max(s.abs())
}

/// Converts scene units to pixels. Returns 0 when the scene has no usable
/// dimensions.
pub fn units_to_pixels(units: f64, dims: Option<&SceneDimensions>) -> f64 {
    dims.and_then(SceneDimensions::pixels_per_unit)
        .map_or(0.0, |scale| units * scale)
}

/// Converts pixels to scene units. Returns 0 when the scene has no usable
/// dimensions.
pub fn pixels_to_units(pixels: f64, dims: Option<&SceneDimensions>) -> f64 {
    dims.and_then(SceneDimensions::pixels_per_unit)
        .map_or(0.0, |scale| pixels / scale)
}

/// Center of `entity` if its top-left corner were placed at `(x, y)`.
///
/// Width and height default to one cell when unset.
pub fn center_of(entity: &Entity, x: f64, y: f64, dims: Option<&SceneDimensions>) -> Center {
    let size_px = dims.map_or(DEFAULT_GRID_SIZE_PX, |d| d.grid_size_px);
    let width_px = entity.width.unwrap_or(1.0) * size_px;
    let height_px = entity.height.unwrap_or(1.0) * size_px;
    Center {
        point: Point::new(x + width_px / 2.0, y + height_px / 2.0),
        width_px,
        height_px,
    }
}

/// Center of `entity` at its current position.
pub fn current_center(entity: &Entity, dims: Option<&SceneDimensions>) -> Center {
    center_of(entity, entity.x, entity.y, dims)
}

/// Distance between two points under the scene's native metric, in scene
/// units. `None` when the scene cannot measure.
pub fn metric_distance(dims: Option<&SceneDimensions>, a: Point, b: Point) -> Option<f64> {
    dims.filter(|d| d.grid_size_px > 0.0)
        .map(|d| d.measure(a, b))
}

/// Straight-line pixel distance.
pub fn pixel_distance(a: Point, b: Point) -> f64 {
    a.distance_to(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> SceneDimensions {
        SceneDimensions::new(100.0, 5.0)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_units_to_pixels() {
        let d = dims();
        assert!(approx(units_to_pixels(1.0, Some(&d)), 20.0));
        assert!(approx(units_to_pixels(5.0, Some(&d)), 100.0));
        assert!(approx(pixels_to_units(40.0, Some(&d)), 2.0));
    }

    #[test]
    fn test_units_to_pixels_fails_closed() {
        assert_eq!(units_to_pixels(5.0, None), 0.0);
        let broken = SceneDimensions::new(100.0, 0.0);
        assert_eq!(units_to_pixels(5.0, Some(&broken)), 0.0);
    }

    #[test]
    fn test_center_of_defaults_to_one_cell() {
        let entity = Entity::new("a", 10.0, 20.0);
        let c = center_of(&entity, 10.0, 20.0, Some(&dims()));
        assert_eq!(c.point, Point::new(60.0, 70.0));
        assert_eq!(c.width_px, 100.0);
        assert_eq!(c.height_px, 100.0);
        assert_eq!(c.top_left_for(c.point), Point::new(10.0, 20.0));
    }

    #[test]
    fn test_center_of_large_entity() {
        let entity = Entity::new("big", 0.0, 0.0).with_size(2.0, 3.0);
        let c = current_center(&entity, Some(&dims()));
        assert_eq!(c.point, Point::new(100.0, 150.0));
        assert_eq!(c.width_px, 200.0);
        assert_eq!(c.height_px, 300.0);
    }

    #[test]
    fn test_center_without_dimensions_uses_default_cell() {
        let entity = Entity::new("a", 0.0, 0.0);
        let c = current_center(&entity, None);
        assert_eq!(c.point, Point::new(50.0, 50.0));
    }

    #[test]
    fn test_square_diagonal_rules() {
        let a = Point::ZERO;
        let b = Point::new(300.0, 100.0);
        let eq = dims();
        assert!(approx(eq.measure(a, b), 15.0));

        let alt = dims().with_grid(GridKind::Square {
            diagonals: DiagonalRule::Alternating,
        });
        assert!(approx(alt.measure(a, b), 17.5));

        let manhattan = dims().with_grid(GridKind::Square {
            diagonals: DiagonalRule::Manhattan,
        });
        assert!(approx(manhattan.measure(a, b), 20.0));

        let exact = dims().with_grid(GridKind::Square {
            diagonals: DiagonalRule::Exact,
        });
        assert!(approx(exact.measure(a, b), 10f64.sqrt() * 5.0));
    }

    #[test]
    fn test_hex_neighbours_are_one_cell() {
        let hex = dims().with_grid(GridKind::Hex);
        let a = Point::ZERO;
        assert!(approx(hex.measure(a, Point::new(100.0, 0.0)), 5.0));
        // Row spacing for pointy-top hexes is 1.5 * radius.
        let radius = 100.0 / 3f64.sqrt();
        assert!(approx(hex.measure(a, Point::new(50.0, 1.5 * radius)), 5.0));
        assert!(approx(hex.measure(a, Point::new(-200.0, 0.0)), 10.0));
    }

    #[test]
    fn test_metric_distance_requires_dimensions() {
        assert_eq!(metric_distance(None, Point::ZERO, Point::new(1.0, 1.0)), None);
        let d = dims().with_grid(GridKind::Gridless);
        let measured = metric_distance(Some(&d), Point::ZERO, Point::new(60.0, 80.0));
        assert!(measured.is_some_and(|m| approx(m, 5.0)));
    }

    #[test]
    fn test_point_ops() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(4.0, 6.0);
        assert_eq!(b - a, Point::new(3.0, 4.0));
        assert_eq!((b - a).length(), 5.0);
        assert_eq!(a.lerp(b, 0.5), Point::new(2.5, 4.0));
        assert!(Point::new(1e-8, -1e-8).is_negligible());
    }
}
