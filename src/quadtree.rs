//! The Barnes-Hut quadtree: insertion, center-of-mass aggregation, and approximate
//! force evaluation against the multipole acceptance criterion.

use ultraviolet::DVec2;

use crate::body::Body;
use crate::quadrant::Quadrant;

/// Maximum subdivision depth. Two bodies that still share a leaf at this depth are merged
/// into a single External node carrying their combined mass at the shared position, rather
/// than recursing forever. In practice this cutoff is never hit: epsilon-softening and
/// randomized initial conditions make exact coincidence surviving 64 halvings of the root
/// quadrant negligible.
const MAX_DEPTH: u32 = 64;

enum NodeKind {
    Empty,
    External(Body),
    Internal {
        aggregate: Body,
        children: Box<[Node; 4]>,
    },
}

struct Node {
    quadrant: Quadrant,
    kind: NodeKind,
}

impl Node {
    fn empty(quadrant: Quadrant) -> Self {
        Self {
            quadrant,
            kind: NodeKind::Empty,
        }
    }

    fn insert(&mut self, body: Body, depth: u32) {
        match &mut self.kind {
            NodeKind::Empty => {
                self.kind = NodeKind::External(body);
            }
            NodeKind::External(occupant) => {
                if depth >= MAX_DEPTH {
                    // Cutoff reached: merge rather than subdivide further.
                    *occupant = occupant.plus(&body);
                    return;
                }
                let occupant = *occupant;
                let aggregate = occupant.plus(&body);
                let quadrants = self.quadrant.subdivide();
                let mut children = Box::new([
                    Node::empty(quadrants[0]),
                    Node::empty(quadrants[1]),
                    Node::empty(quadrants[2]),
                    Node::empty(quadrants[3]),
                ]);
                let occ_idx = self.quadrant.quadrant_of(occupant.pos);
                children[occ_idx].insert(occupant, depth + 1);
                let new_idx = self.quadrant.quadrant_of(body.pos);
                children[new_idx].insert(body, depth + 1);
                self.kind = NodeKind::Internal { aggregate, children };
            }
            NodeKind::Internal { aggregate, children } => {
                *aggregate = aggregate.plus(&body);
                let idx = self.quadrant.quadrant_of(body.pos);
                children[idx].insert(body, depth + 1);
            }
        }
    }

    fn update_force(&self, probe: &Body, theta: f64, out: &mut DVec2) {
        match &self.kind {
            NodeKind::Empty => {}
            NodeKind::External(b) => {
                *out += probe.gravity_from(b);
            }
            NodeKind::Internal { aggregate, children } => {
                let d = probe.distance_to(aggregate);
                if d > 0.0 && self.quadrant.length() / d < theta {
                    *out += probe.gravity_from(aggregate);
                } else {
                    for child in children.iter() {
                        child.update_force(probe, theta, out);
                    }
                }
            }
        }
    }

    fn mass_and_weighted_pos(&self) -> (f64, DVec2) {
        match &self.kind {
            NodeKind::Empty => (0.0, DVec2::zero()),
            NodeKind::External(b) => (b.mass, b.pos * b.mass),
            NodeKind::Internal { aggregate, .. } => (aggregate.mass, aggregate.pos * aggregate.mass),
        }
    }
}

/// A Barnes-Hut quadtree built fresh, each step, from one process's owned bodies.
///
/// `theta` is the multipole acceptance ratio: a subtree is treated as a single pseudo-body
/// once its angular size (side length / distance) falls below `theta`.
pub struct BHTree {
    root: Node,
    theta: f64,
}

impl BHTree {
    /// Builds an empty tree governing `root_quadrant`. `theta` must be in `(0, 1]`.
    pub fn new(root_quadrant: Quadrant, theta: f64) -> Self {
        debug_assert!(theta > 0.0 && theta <= 1.0, "theta must be in (0, 1]");
        Self {
            root: Node::empty(root_quadrant),
            theta,
        }
    }

    /// The quadrant governing the root of this tree.
    pub fn root_quadrant(&self) -> Quadrant {
        self.root.quadrant
    }

    /// Inserts `body` into the tree. `body` must lie inside the root quadrant; callers are
    /// expected to filter with [`Body::inside`] beforehand.
    pub fn insert(&mut self, body: Body) {
        debug_assert!(
            body.inside(&self.root.quadrant),
            "body inserted outside the root quadrant"
        );
        self.root.insert(body, 0);
    }

    /// Builds a tree from an iterator of bodies, skipping any that fall outside
    /// `root_quadrant` (callers rely on this for the "bodies that have drifted outside the
    /// root region are silently excluded this step" rule).
    pub fn build<'a>(root_quadrant: Quadrant, theta: f64, bodies: impl Iterator<Item = &'a Body>) -> Self {
        let mut tree = Self::new(root_quadrant, theta);
        for body in bodies {
            if body.inside(&root_quadrant) {
                tree.insert(*body);
            }
        }
        tree
    }

    /// The total mass and mass-weighted-mean position aggregated at the root. Returns
    /// `(0.0, zero)` for an empty tree.
    pub fn total_mass_and_center(&self) -> (f64, DVec2) {
        let (mass, weighted) = self.root.mass_and_weighted_pos();
        if mass > 0.0 {
            (mass, weighted / mass)
        } else {
            (0.0, DVec2::zero())
        }
    }

    /// Recursively accumulates the gravitational force this tree's mass distribution exerts
    /// on `probe`, applying the multipole acceptance criterion at each internal node.
    pub fn update_force(&self, probe: &Body) -> DVec2 {
        let mut out = DVec2::zero();
        self.root.update_force(probe, self.theta, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Color;

    fn body(id: u64, x: f64, y: f64, mass: f64) -> Body {
        Body::new(id, DVec2::new(x, y), DVec2::zero(), mass, Color::default())
    }

    fn root() -> Quadrant {
        Quadrant::new(DVec2::zero(), 1.0e7)
    }

    #[test]
    fn empty_tree_exerts_no_force() {
        let tree = BHTree::new(root(), 0.5);
        let probe = body(99, 1.0, 1.0, 5.0);
        assert_eq!(tree.update_force(&probe), DVec2::zero());
    }

    #[test]
    fn mass_is_conserved_across_the_tree() {
        let bodies: Vec<Body> = (0..50)
            .map(|i| {
                fastrand::seed(i as u64);
                body(
                    i,
                    fastrand::f64() * 2.0e6 - 1.0e6,
                    fastrand::f64() * 2.0e6 - 1.0e6,
                    1.0e21 * (i as f64 + 1.0),
                )
            })
            .collect();
        let tree = BHTree::build(root(), 0.5, bodies.iter());
        let expected_mass: f64 = bodies.iter().map(|b| b.mass).sum();
        let expected_center: DVec2 = bodies.iter().map(|b| b.pos * b.mass).sum::<DVec2>() / expected_mass;

        let (mass, center) = tree.total_mass_and_center();
        assert!((mass - expected_mass).abs() / expected_mass < 1e-9);
        assert!((center - expected_center).mag() < 1.0);
    }

    #[test]
    fn aggregate_is_independent_of_insertion_order() {
        let bodies: Vec<Body> = (0..30)
            .map(|i| {
                fastrand::seed(100 + i as u64);
                body(
                    i,
                    fastrand::f64() * 2.0e6 - 1.0e6,
                    fastrand::f64() * 2.0e6 - 1.0e6,
                    1.0e22,
                )
            })
            .collect();

        let forward = BHTree::build(root(), 0.5, bodies.iter());
        let mut reversed_bodies = bodies.clone();
        reversed_bodies.reverse();
        let reversed = BHTree::build(root(), 0.5, reversed_bodies.iter());

        let (m1, c1) = forward.total_mass_and_center();
        let (m2, c2) = reversed.total_mass_and_center();
        assert!((m1 - m2).abs() < 1e-6);
        assert!((c1 - c2).mag() < 1e-3);
    }

    #[test]
    fn self_force_is_zero_through_the_tree() {
        let bodies = vec![
            body(0, 0.0, 0.0, 6.4e26),
            body(1, 1.0e6, 0.0, 6.4e21),
            body(2, -1.0e6, 2.0e5, 6.4e21),
        ];
        let tree = BHTree::build(root(), 0.0, bodies.iter());
        // With theta = 0 the tree always recurses to leaves, so this exercises the
        // External-node identity check directly.
        let force_on_0 = tree.update_force(&bodies[0]);

        let direct: DVec2 = bodies
            .iter()
            .filter(|b| b.id != 0)
            .map(|b| bodies[0].gravity_from(b))
            .sum();
        assert!((force_on_0 - direct).mag() < 1e-6);
    }

    #[test]
    fn coincident_bodies_merge_past_the_depth_cutoff_without_looping_forever() {
        let mut tree = BHTree::new(root(), 0.5);
        for i in 0..10 {
            tree.insert(body(i, 0.0, 0.0, 1.0));
        }
        let (mass, _) = tree.total_mass_and_center();
        assert_eq!(mass, 10.0);
    }

    #[test]
    fn inserted_bodies_stay_within_the_quadrant_that_holds_them() {
        let root_q = root();
        let mut tree = BHTree::new(root_q, 0.5);
        let bodies = vec![
            body(0, 2.0e6, 2.0e6, 1.0),
            body(1, -2.0e6, 2.0e6, 1.0),
            body(2, 2.0e6, -2.0e6, 1.0),
            body(3, -2.0e6, -2.0e6, 1.0),
        ];
        for b in &bodies {
            assert!(b.inside(&root_q));
            tree.insert(*b);
        }
        // Every body lies inside the root; insertion never panics on the debug assertion
        // (indirect check, since Node's fields are private to this module).
    }
}
