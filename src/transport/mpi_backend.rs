//! A [`Transport`] backed by a real MPI installation via the `mpi` crate (rsmpi).
//!
//! Gated behind the `mpi-transport` feature so the rest of the crate, and every test, can
//! build and run without an MPI toolchain installed. The binary entry point owns the
//! [`mpi::environment::Universe`] for the lifetime of the process; initialization and
//! finalization bracket the whole run per the spec's launch contract.

use mpi::collective::CommunicatorCollectives;
use mpi::point_to_point::{Destination, Source};
use mpi::topology::{Communicator, SimpleCommunicator};

use crate::error::{Error, Result};
use crate::transport::{Tag, Transport};

pub struct MpiTransport {
    world: SimpleCommunicator,
}

impl MpiTransport {
    /// Wraps the world communicator of an already-initialized MPI [`mpi::environment::Universe`].
    pub fn new(world: SimpleCommunicator) -> Self {
        Self { world }
    }
}

impl Transport for MpiTransport {
    fn rank(&self) -> usize {
        self.world.rank() as usize
    }

    fn size(&self) -> usize {
        self.world.size() as usize
    }

    fn send_recv_replace(&self, buf: &mut [f64], to: usize, from: usize, tag: Tag) -> Result<()> {
        let mut recv = vec![0.0_f64; buf.len()];
        // Post the receive before the send to avoid the classic two-rank deadlock where
        // both peers block in a blocking send waiting for the other to post a matching
        // receive first.
        mpi::request::scope(|scope| {
            let rreq = self
                .world
                .process_at_rank(from as i32)
                .immediate_receive_into_with_tag(scope, &mut recv[..], tag);
            self.world
                .process_at_rank(to as i32)
                .send_with_tag(&buf[..], tag);
            rreq.wait();
        });
        buf.copy_from_slice(&recv);
        Ok(())
    }

    fn all_gather(&self, send_buf: &[f64], recv_buf: &mut [f64]) -> Result<()> {
        let expected_len = send_buf.len() * self.size();
        if recv_buf.len() != expected_len {
            return Err(Error::Messaging(format!(
                "all_gather recv_buf has length {}, expected {expected_len}",
                recv_buf.len()
            )));
        }
        self.world.all_gather_into(send_buf, recv_buf);
        Ok(())
    }

    fn barrier(&self) {
        self.world.barrier();
    }
}
