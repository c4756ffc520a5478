//! Point masses: the unit the rest of the simulation operates on.

use ultraviolet::DVec2;

use crate::quadrant::Quadrant;

/// Gravitational constant, in SI units (m^3 kg^-1 s^-2).
pub const G: f64 = 6.67e-11;

/// Softening length. Added (squared) to the denominator of Newton's law so that two
/// near-coincident bodies produce a large but finite force instead of a singularity.
pub const EPSILON: f64 = 3.0e4;

/// Identity token distinguishing distinct physical bodies within a process.
///
/// This exists solely so [`crate::quadtree::BHTree::update_force`] can exclude a body from
/// exerting force on itself; it never crosses the wire and plays no role in the physics.
pub type BodyId = u64;

/// Sentinel id assigned to every probe body built from remote ring data. No locally-owned
/// body is ever assigned this id, so the self-force identity check can never spuriously
/// match a remote probe.
pub const PROBE_ID: BodyId = u64::MAX;

/// A flat RGB color tag, used only by the [`crate::render::Renderer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Color(pub u8, pub u8, pub u8);

/// A point mass: position, velocity, accumulated force, mass, and a display color.
#[derive(Clone, Copy, Debug)]
pub struct Body {
    pub id: BodyId,
    pub pos: DVec2,
    pub vel: DVec2,
    pub force: DVec2,
    pub mass: f64,
    pub color: Color,
}

impl Body {
    pub fn new(id: BodyId, pos: DVec2, vel: DVec2, mass: f64, color: Color) -> Self {
        Self {
            id,
            pos,
            vel,
            force: DVec2::zero(),
            mass,
            color,
        }
    }

    /// Builds a probe body for the ring protocol: zero velocity, the [`PROBE_ID`] sentinel
    /// identity, and a default color (probes are never rendered).
    pub fn probe(pos: DVec2, mass: f64) -> Self {
        Self::new(PROBE_ID, pos, DVec2::zero(), mass, Color::default())
    }

    /// Whether this body's position lies inside `quadrant`.
    pub fn inside(&self, quadrant: &Quadrant) -> bool {
        quadrant.contains(self.pos)
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: &Body) -> f64 {
        (other.pos - self.pos).mag()
    }

    /// Zeroes the accumulated force. Called once per body at the start of each force pass.
    pub fn reset_force(&mut self) {
        self.force = DVec2::zero();
    }

    /// Accumulates a raw force contribution.
    pub fn add_force(&mut self, df: DVec2) {
        self.force += df;
    }

    /// The Newtonian gravitational force `other` exerts on `self`, softened by [`EPSILON`].
    /// Zero when `self` and `other` are the same physical body. Also used by
    /// [`crate::quadtree::BHTree`] to apply the same force law to both leaf bodies and
    /// internal-node aggregates.
    pub(crate) fn gravity_from(&self, other: &Body) -> DVec2 {
        if self.id == other.id {
            return DVec2::zero();
        }
        let delta = other.pos - self.pos;
        let dist_sq = delta.mag_sq();
        if dist_sq == 0.0 {
            // Exactly coincident and distinct: no well-defined direction to push along.
            return DVec2::zero();
        }
        let denom = (dist_sq + EPSILON * EPSILON).powf(1.5);
        let scale = G * self.mass * other.mass / denom;
        delta * scale
    }

    /// Sets this body's force to the contribution from `other`, replacing any prior value.
    pub fn compute_force_from(&mut self, other: &Body) {
        self.force = self.gravity_from(other);
    }

    /// Adds the contribution from `other` to this body's running force.
    pub fn accumulate_force_from(&mut self, other: &Body) {
        self.force += self.gravity_from(other);
    }

    /// Advances position and velocity by `dt` using semi-implicit (symplectic) Euler:
    /// velocity updates from the current force first, then position updates from the new
    /// velocity.
    pub fn update(&mut self, dt: f64) {
        if self.mass > 0.0 {
            self.vel += (self.force / self.mass) * dt;
        }
        self.pos += self.vel * dt;
    }

    /// Returns the pseudo-body at the mass-weighted midpoint of `self` and `other`, with
    /// their summed mass. Used only when aggregating tree nodes; the result carries the
    /// [`PROBE_ID`] sentinel since it is not a real tracked body.
    pub fn plus(&self, other: &Body) -> Body {
        let total_mass = self.mass + other.mass;
        let pos = if total_mass > 0.0 {
            (self.pos * self.mass + other.pos * other.mass) / total_mass
        } else {
            (self.pos + other.pos) * 0.5
        };
        Body::new(PROBE_ID, pos, DVec2::zero(), total_mass, Color::default())
    }
}
