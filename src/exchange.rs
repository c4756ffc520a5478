//! The ring-rotation force-exchange protocol: lets every process's tree exert force on every
//! other process's bodies with exactly one contribution per ordered process pair, and no
//! process ever builds a tree over bodies it doesn't own.

use rayon::prelude::*;
use ultraviolet::DVec2;

use crate::body::Body;
use crate::error::Result;
use crate::quadtree::BHTree;
use crate::transport::{Tag, Transport};

const KIND_POS_X: Tag = 0;
const KIND_POS_Y: Tag = 1;
const KIND_MASS: Tag = 2;
const KIND_FORCE_X: Tag = 3;
const KIND_FORCE_Y: Tag = 4;

/// Derives a per-round, per-exchange-kind tag. Embedding the round number keeps messages
/// from different rounds distinguishable to a transport that multiplexes message matching
/// (MPI); the in-process transport doesn't need this for correctness, since a given ordered
/// pair of ranks only ever exchanges one message of a given kind over the lifetime of a run,
/// but the scheme is uniform across transports for simplicity.
fn tag(round: usize, kind: Tag) -> Tag {
    (round as Tag) * 10 + kind
}

/// Normalizes `(rank - offset)` into `0..size` using Euclidean (always-nonnegative)
/// remainder, since Rust's `%` permits negative results for negative operands.
fn rem_euclid_usize(rank: usize, offset: usize, size: usize) -> usize {
    let rank = rank as i64;
    let offset = offset as i64;
    let size = size as i64;
    (rank - offset).rem_euclid(size) as usize
}

/// Runs the full `P - 1`-round ring protocol, accumulating every remote contribution
/// directly into `owned` via [`Body::add_force`]. `owned` must already hold each body's
/// local-tree contribution (§4.5 step 3) before this is called. A no-op when `transport.size()
/// <= 1`.
pub fn run(transport: &dyn Transport, tree: &BHTree, owned: &mut [Body]) -> Result<()> {
    let size = transport.size();
    if size <= 1 {
        return Ok(());
    }
    let rank = transport.rank();
    let portion = owned.len();

    let orig_x: Vec<f64> = owned.iter().map(|b| b.pos.x).collect();
    let orig_y: Vec<f64> = owned.iter().map(|b| b.pos.y).collect();
    let orig_m: Vec<f64> = owned.iter().map(|b| b.mass).collect();

    for r in 1..size {
        let to = (rank + r) % size;
        let from = rem_euclid_usize(rank, r, size);

        // Step 2-3: pack and exchange positions + mass with (to, from).
        let mut buf_x = orig_x.clone();
        let mut buf_y = orig_y.clone();
        let mut buf_m = orig_m.clone();
        transport.send_recv_replace(&mut buf_x, to, from, tag(r, KIND_POS_X))?;
        transport.send_recv_replace(&mut buf_y, to, from, tag(r, KIND_POS_Y))?;
        transport.send_recv_replace(&mut buf_m, to, from, tag(r, KIND_MASS))?;

        // Step 4: evaluate this process's tree against each received remote body, writing
        // the resulting force back in place of the position it arrived with.
        let forces: Vec<DVec2> = (0..portion)
            .into_par_iter()
            .map(|i| {
                let probe = Body::probe(DVec2::new(buf_x[i], buf_y[i]), buf_m[i]);
                tree.update_force(&probe)
            })
            .collect();
        for (i, f) in forces.iter().enumerate() {
            buf_x[i] = f.x;
            buf_y[i] = f.y;
        }

        // Step 5: return the partial forces to their owner (`from`), and receive this
        // process's own bodies' partial forces back from `to`.
        transport.send_recv_replace(&mut buf_x, from, to, tag(r, KIND_FORCE_X))?;
        transport.send_recv_replace(&mut buf_y, from, to, tag(r, KIND_FORCE_Y))?;

        // Step 6: accumulate.
        for (i, body) in owned.iter_mut().enumerate() {
            body.add_force(DVec2::new(buf_x[i], buf_y[i]));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Color;
    use crate::quadrant::Quadrant;
    use crate::transport::thread::ThreadTransport;
    use std::thread;

    fn make_bodies(ids: impl Iterator<Item = u64>, positions: &[(f64, f64)], mass: f64) -> Vec<Body> {
        ids.zip(positions)
            .map(|(id, &(x, y))| Body::new(id, DVec2::new(x, y), DVec2::zero(), mass, Color::default()))
            .collect()
    }

    fn direct_force(target: &Body, all: &[Body]) -> DVec2 {
        let mut out = DVec2::zero();
        for other in all {
            if other.id == target.id {
                continue;
            }
            let delta = other.pos - target.pos;
            let dist_sq = delta.mag_sq();
            if dist_sq == 0.0 {
                continue;
            }
            let denom = (dist_sq + crate::body::EPSILON * crate::body::EPSILON).powf(1.5);
            out += delta * (crate::body::G * target.mass * other.mass / denom);
        }
        out
    }

    /// Invariant 5 (ring exactness) and 6 (symmetry): with theta = 0 the per-body force
    /// produced by local-pass + ring exchange must equal the direct O(N^2) pairwise sum,
    /// regardless of how the 16 bodies are partitioned across 4 ranks.
    #[test]
    fn ring_matches_direct_pairwise_sum_with_theta_zero() {
        const N: usize = 16;
        const P: usize = 4;
        let positions: Vec<(f64, f64)> = (0..N)
            .map(|i| {
                fastrand::seed(i as u64 + 1);
                (fastrand::f64() * 2.0e6 - 1.0e6, fastrand::f64() * 2.0e6 - 1.0e6)
            })
            .collect();
        let all = make_bodies(0..N as u64, &positions, 6.4e21);

        let portion = N / P;
        let root_quadrant = Quadrant::new(DVec2::zero(), 1.0e8);

        let transports = ThreadTransport::ring(P);
        let results: Vec<Vec<Body>> = thread::scope(|scope| {
            let all_ref = &all;
            let handles: Vec<_> = transports
                .into_iter()
                .map(|t| {
                    scope.spawn(move || {
                        let rank = t.rank();
                        let mut owned: Vec<Body> = all_ref[rank * portion..(rank + 1) * portion].to_vec();

                        let tree = BHTree::build(root_quadrant, 0.0, owned.iter());
                        for b in owned.iter_mut() {
                            b.reset_force();
                            let f = tree.update_force(b);
                            b.add_force(f);
                        }
                        run(&t, &tree, &mut owned).unwrap();
                        owned
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for owned in &results {
            for body in owned {
                let expected = direct_force(body, &all);
                let rel_err = (body.force - expected).mag() / expected.mag().max(1.0);
                assert!(
                    rel_err < 1e-9,
                    "body {}: got {:?}, expected {:?} (rel err {rel_err})",
                    body.id,
                    body.force,
                    expected
                );
            }
        }
    }

    #[test]
    fn single_rank_ring_is_a_no_op() {
        let transports = ThreadTransport::ring(1);
        let t = &transports[0];
        let root_quadrant = Quadrant::new(DVec2::zero(), 1.0e8);
        let mut owned = make_bodies(0..3, &[(0.0, 0.0), (1.0e5, 0.0), (0.0, 1.0e5)], 6.4e21);
        let tree = BHTree::build(root_quadrant, 0.5, owned.iter());
        for b in owned.iter_mut() {
            b.force = DVec2::new(1.0, 2.0);
        }
        run(t, &tree, &mut owned).unwrap();
        // Untouched: no peers to exchange with.
        assert_eq!(owned[0].force, DVec2::new(1.0, 2.0));
    }
}
