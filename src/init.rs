//! Deterministic, per-process-seeded generation of each process's starting bodies.

use ultraviolet::DVec2;

use crate::body::{Body, BodyId, Color};

/// Constant mass assigned to every generated body.
pub const BODY_MASS: f64 = 6.4e21;

/// Mass of the central anchor body placed at rank 0's local index 0.
pub const BLACK_HOLE_MASS: f64 = 6.4e26;

/// Generates this process's `portion = n / p` owned bodies.
///
/// Positions are uniform in `[0, r]` on each axis; velocities are `-0.1 * u^3` along each
/// axis, where `u` is itself uniform in `[0, r]`, giving a mild inward drift. Even ranks
/// mirror x (and vx); ranks in the upper half of the process group mirror y (and vy), so
/// the four quadrants of the process grid start with mirrored populations. Each process
/// seeds its RNG from `seed + rank`, so a run is reproducible but distinct per process.
///
/// On rank 0, local index 0 is overwritten with a central massive body: the total body
/// count across the whole system is exactly `n`, not `n + 1`.
pub fn generate(n: usize, p: usize, rank: usize, r: f64, seed: u64) -> Vec<Body> {
    let portion = n / p;
    let rng = fastrand::Rng::with_seed(seed.wrapping_add(rank as u64));

    let mirror_x = rank % 2 == 0;
    let mirror_y = rank >= p / 2;

    let mut bodies = Vec::with_capacity(portion);
    for i in 0..portion {
        let id = i as BodyId;

        let mut x = rng.f64() * r;
        let mut y = rng.f64() * r;
        let ux = rng.f64() * r;
        let uy = rng.f64() * r;
        let mut vx = -0.1 * ux * ux * ux;
        let mut vy = -0.1 * uy * uy * uy;

        if mirror_x {
            x = -x;
            vx = -vx;
        }
        if mirror_y {
            y = -y;
            vy = -vy;
        }

        let color = Color(((rank * 63) % 256) as u8, ((i * 37) % 256) as u8, 200);
        bodies.push(Body::new(id, DVec2::new(x, y), DVec2::new(vx, vy), BODY_MASS, color));
    }

    if rank == 0 && !bodies.is_empty() {
        bodies[0] = Body::new(
            0,
            DVec2::zero(),
            DVec2::zero(),
            BLACK_HOLE_MASS,
            Color(255, 255, 255),
        );
    }

    bodies
}
