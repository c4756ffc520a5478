//! Message-passing abstraction.
//!
//! The rest of the crate (the ring protocol, the simulator's gather/barrier phase) is
//! written against the [`Transport`] trait, not against any specific substrate. Two
//! implementations ship: [`thread::ThreadTransport`], which runs the whole ring of P logical
//! processes as P OS threads inside one binary, and (behind the `mpi-transport` feature)
//! [`mpi_backend::MpiTransport`], which is backed by a real MPI installation via the `mpi`
//! crate for genuinely distributed runs.

use crate::error::Result;

pub mod thread;

#[cfg(feature = "mpi-transport")]
pub mod mpi_backend;

/// A message tag. The ring protocol derives a distinct tag per round and per
/// exchange-within-round so a transport that multiplexes message matching (like MPI) can't
/// misattribute a stale message from an earlier round.
pub type Tag = i32;

/// The three collective/point-to-point primitives the simulation needs from its transport.
pub trait Transport: Send + Sync {
    /// This process's rank, in `0..size()`.
    fn rank(&self) -> usize;

    /// The number of cooperating processes.
    fn size(&self) -> usize;

    /// Sends `buf` to `to` and, in the same call, overwrites `buf` with the payload received
    /// from `from`. Symmetric send-and-receive-in-place: every peer pair must call this with
    /// matching `to`/`from`/`tag` in the same relative order to avoid deadlock.
    fn send_recv_replace(&self, buf: &mut [f64], to: usize, from: usize, tag: Tag) -> Result<()>;

    /// Concatenates every rank's `send_buf` into `recv_buf` (length `size() * send_buf.len()`)
    /// in rank order. Every rank must call this together.
    fn all_gather(&self, send_buf: &[f64], recv_buf: &mut [f64]) -> Result<()>;

    /// Blocks until every rank has entered this call.
    fn barrier(&self);
}
