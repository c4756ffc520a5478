//! Axis-aligned square regions used to bound Barnes-Hut tree nodes.

use ultraviolet::DVec2;

/// Sub-quadrant indices returned by [`Quadrant::subdivide`], in a fixed NW/NE/SW/SE order.
pub const NW: usize = 0;
pub const NE: usize = 1;
pub const SW: usize = 2;
pub const SE: usize = 3;

/// An axis-aligned square region of space, centered at `center` with side length `size`.
///
/// Quadrants are value-like and immutable: every operation returns a new `Quadrant`
/// rather than mutating one in place.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quadrant {
    pub center: DVec2,
    pub size: f64,
}

impl Quadrant {
    /// Builds a quadrant of the given `size` centered at `center`. `size` must be positive.
    pub fn new(center: DVec2, size: f64) -> Self {
        debug_assert!(size > 0.0, "quadrant size must be positive");
        Self { center, size }
    }

    /// The side length of this quadrant.
    pub fn length(&self) -> f64 {
        self.size
    }

    /// Whether `point` lies inside this quadrant (inclusive of the boundary).
    pub fn contains(&self, point: DVec2) -> bool {
        let half = self.size * 0.5;
        (point.x - self.center.x).abs() <= half && (point.y - self.center.y).abs() <= half
    }

    /// Splits this quadrant into its four children, in `[NW, NE, SW, SE]` order.
    ///
    /// Each child has half the side length; its center is offset by a quarter of this
    /// quadrant's side length along each axis.
    pub fn subdivide(&self) -> [Quadrant; 4] {
        let half = self.size * 0.5;
        let quarter = self.size * 0.25;
        [
            Quadrant::new(self.center + DVec2::new(-quarter, quarter), half), // NW
            Quadrant::new(self.center + DVec2::new(quarter, quarter), half),  // NE
            Quadrant::new(self.center + DVec2::new(-quarter, -quarter), half), // SW
            Quadrant::new(self.center + DVec2::new(quarter, -quarter), half), // SE
        ]
    }

    /// Which of the four sub-quadrants `point` belongs to, per [`Quadrant::subdivide`]'s ordering.
    ///
    /// `point` is assumed to lie inside `self`; behavior for points outside the bounds of
    /// `self` is still well defined (it's resolved purely by comparison against `center`) but
    /// callers that need a strict quadrant should check [`Quadrant::contains`] first.
    pub fn quadrant_of(&self, point: DVec2) -> usize {
        match (point.x >= self.center.x, point.y >= self.center.y) {
            (false, true) => NW,
            (true, true) => NE,
            (false, false) => SW,
            (true, false) => SE,
        }
    }
}
