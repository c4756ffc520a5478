//! The per-step driver: build tree, local forces, ring exchange, integrate, optional
//! all-gather + render, barrier.

use ultraviolet::DVec2;

use crate::body::Body;
use crate::error::{Error, Result};
use crate::exchange;
use crate::quadrant::Quadrant;
use crate::quadtree::BHTree;
use crate::render::Renderer;
use crate::transport::Transport;

/// Drives one process's slice of the simulation forward, one step at a time.
pub struct Simulator<'t> {
    transport: &'t dyn Transport,
    owned: Vec<Body>,
    r: f64,
    dt: f64,
    theta: f64,
    render: bool,
    step: usize,
}

impl<'t> Simulator<'t> {
    pub fn new(transport: &'t dyn Transport, owned: Vec<Body>, r: f64, dt: f64, theta: f64) -> Self {
        Self {
            transport,
            owned,
            r,
            dt,
            theta,
            render: true,
            step: 0,
        }
    }

    pub fn with_render(mut self, render: bool) -> Self {
        self.render = render;
        self
    }

    pub fn owned_bodies(&self) -> &[Body] {
        &self.owned
    }

    pub fn step_count(&self) -> usize {
        self.step
    }

    /// Advances the simulation by one time step on this process, per §4.5:
    /// 1. build a fresh local tree from the bodies currently inside the root quadrant,
    /// 2. compute each owned body's local-tree contribution,
    /// 3. run the ring exchange to pick up every remote contribution,
    /// 4. integrate positions and velocities by `dt`,
    /// 5. optionally all-gather and render, then barrier.
    pub fn step(&mut self, renderer: &mut dyn Renderer) -> Result<()> {
        let root_quadrant = Quadrant::new(DVec2::zero(), 2.0 * self.r);
        let tree = BHTree::build(root_quadrant, self.theta, self.owned.iter());

        for body in self.owned.iter_mut() {
            body.reset_force();
            let local = tree.update_force(body);
            body.add_force(local);
        }

        exchange::run(self.transport, &tree, &mut self.owned)?;

        for body in self.owned.iter_mut() {
            body.update(self.dt);
        }

        self.check_finite()?;
        self.visualize(renderer)?;

        self.step += 1;
        tracing::debug!(rank = self.transport.rank(), step = self.step, "step complete");
        Ok(())
    }

    /// Runs until `steps` have elapsed, or forever if `steps` is `None`.
    pub fn run(&mut self, steps: Option<usize>, renderer: &mut dyn Renderer) -> Result<()> {
        loop {
            if let Some(limit) = steps {
                if self.step >= limit {
                    return Ok(());
                }
            }
            self.step(renderer)?;
        }
    }

    fn check_finite(&self) -> Result<()> {
        for body in &self.owned {
            if !body.pos.x.is_finite() || !body.pos.y.is_finite() {
                return Err(Error::Numeric(format!(
                    "rank {} body {} has a non-finite position after integration: {:?}",
                    self.transport.rank(),
                    body.id,
                    body.pos
                )));
            }
        }
        Ok(())
    }

    fn visualize(&self, renderer: &mut dyn Renderer) -> Result<()> {
        if !self.render {
            self.transport.barrier();
            return Ok(());
        }

        let send_pos: Vec<f64> = self.owned.iter().flat_map(|b| [b.pos.x, b.pos.y]).collect();
        let mut recv_pos = vec![0.0_f64; send_pos.len() * self.transport.size()];
        self.transport.all_gather(&send_pos, &mut recv_pos)?;

        // Rank 0 needs every remote body's color too, since the position gather alone can't
        // tell it apart from any other body owned by the same remote rank.
        let send_color: Vec<f64> = self
            .owned
            .iter()
            .flat_map(|b| [b.color.0 as f64, b.color.1 as f64, b.color.2 as f64])
            .collect();
        let mut recv_color = vec![0.0_f64; send_color.len() * self.transport.size()];
        self.transport.all_gather(&send_color, &mut recv_color)?;

        if self.transport.rank() == 0 {
            renderer.clear(crate::body::Color(0, 0, 0));
            for (pos, color) in recv_pos.chunks_exact(2).zip(recv_color.chunks_exact(3)) {
                let c = crate::body::Color(color[0] as u8, color[1] as u8, color[2] as u8);
                renderer.draw_point(pos[0], pos[1], c);
            }
            renderer.finish(self.step)?;
        }

        self.transport.barrier();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Color;
    use crate::render::NullRenderer;
    use crate::transport::thread::ThreadTransport;
    use std::thread;

    fn two_body_bodies() -> Vec<Body> {
        vec![
            Body::new(0, DVec2::zero(), DVec2::zero(), 6.4e26, Color::default()),
            Body::new(
                1,
                DVec2::new(1.0e6, 0.0),
                DVec2::new(0.0, orbital_speed()),
                1.0,
                Color::default(),
            ),
        ]
    }

    fn orbital_speed() -> f64 {
        (crate::body::G * 6.4e26 / 1.0e6).sqrt()
    }

    #[test]
    fn two_body_orbit_stays_within_five_percent_of_its_initial_radius() {
        let transports = ThreadTransport::ring(1);
        let t = &transports[0];
        let owned = two_body_bodies();
        let mut sim = Simulator::new(t, owned, 2.8e6, 0.1, 0.5);
        let mut renderer = NullRenderer;

        let initial_r = 1.0e6;
        for _ in 0..2000 {
            sim.step(&mut renderer).unwrap();
            let r = sim.owned_bodies()[1].pos.mag();
            assert!(
                (r - initial_r).abs() / initial_r < 0.05,
                "orbit radius drifted to {r} after {} steps",
                sim.step_count()
            );
        }
    }

    #[test]
    fn single_body_with_no_force_advances_at_constant_velocity() {
        let transports = ThreadTransport::ring(1);
        let t = &transports[0];
        let vel = DVec2::new(10.0, -5.0);
        let owned = vec![Body::new(0, DVec2::zero(), vel, 1.0, Color::default())];
        let mut sim = Simulator::new(t, owned, 2.8e6, 0.1, 0.5);
        let mut renderer = NullRenderer;

        for step in 1..=50 {
            sim.step(&mut renderer).unwrap();
            let expected = vel * (0.1 * step as f64);
            let pos = sim.owned_bodies()[0].pos;
            assert!((pos - expected).mag() < 1e-6);
            assert_eq!(sim.owned_bodies()[0].force, DVec2::zero());
        }
    }

    #[test]
    fn two_equal_masses_stay_mirror_symmetric() {
        let transports = ThreadTransport::ring(2);
        let bodies_rank0 = vec![Body::new(0, DVec2::new(1.0e6, 0.0), DVec2::zero(), 6.4e21, Color::default())];
        let bodies_rank1 = vec![Body::new(0, DVec2::new(-1.0e6, 0.0), DVec2::zero(), 6.4e21, Color::default())];

        let results: Vec<Vec<Body>> = thread::scope(|scope| {
            let handles: Vec<_> = transports
                .into_iter()
                .map(|t| {
                    let owned = if t.rank() == 0 {
                        bodies_rank0.clone()
                    } else {
                        bodies_rank1.clone()
                    };
                    scope.spawn(move || {
                        let mut sim = Simulator::new(&t, owned, 2.8e6, 0.1, 0.5);
                        let mut renderer = NullRenderer;
                        for _ in 0..200 {
                            sim.step(&mut renderer).unwrap();
                        }
                        sim.owned_bodies().to_vec()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let a = results[0][0].pos;
        let b = results[1][0].pos;
        assert!((a.x + b.x).abs() < 1.0, "x should mirror: {a:?} vs {b:?}");
        assert!((a.y + b.y).abs() < 1.0, "y should mirror: {a:?} vs {b:?}");
    }
}
