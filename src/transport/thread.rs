//! An in-process [`Transport`](super::Transport) that runs the whole ring of P logical
//! processes as P OS threads inside one binary.
//!
//! This is the default substrate: it needs no MPI installation, and it is what every
//! automated test uses to stand up a full P-rank ring and inspect every rank's final state
//! from one test binary (see the invariants around ring exactness and all-gather equality).

use std::collections::HashMap;
use std::sync::{Arc, Barrier, Condvar, Mutex};

use crate::error::{Error, Result};
use crate::transport::{Tag, Transport};

/// Point-to-point rendezvous shared by every rank in a ring. A sender deposits its payload
/// keyed by `(from, to, tag)`; the matching receiver blocks on the condition variable until
/// its key appears, then removes it. This makes the exact tagging scheme the caller chooses
/// irrelevant to correctness (unlike a fixed matrix of pre-allocated channels) at the cost of
/// a small shared map, which is appropriate for the process counts this substrate targets.
struct Mailbox {
    slots: Mutex<HashMap<(usize, usize, Tag), Vec<f64>>>,
    cond: Condvar,
}

impl Mailbox {
    fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            cond: Condvar::new(),
        }
    }

    fn send(&self, from: usize, to: usize, tag: Tag, payload: Vec<f64>) {
        let mut slots = self.slots.lock().expect("mailbox lock poisoned");
        slots.insert((from, to, tag), payload);
        self.cond.notify_all();
    }

    fn recv(&self, from: usize, to: usize, tag: Tag) -> Vec<f64> {
        let mut slots = self.slots.lock().expect("mailbox lock poisoned");
        loop {
            if let Some(payload) = slots.remove(&(from, to, tag)) {
                return payload;
            }
            slots = self.cond.wait(slots).expect("mailbox lock poisoned");
        }
    }
}

/// Shared state backing [`Transport::all_gather`]: a per-rank slot, and a pair of barriers
/// separating "everyone has written their slot" from "everyone has read the full buffer",
/// so no rank's next call can race ahead and clobber a slot still being read.
struct GatherState {
    slots: Mutex<Vec<Vec<f64>>>,
    published: Barrier,
    consumed: Barrier,
}

impl GatherState {
    fn new(size: usize) -> Self {
        Self {
            slots: Mutex::new(vec![Vec::new(); size]),
            published: Barrier::new(size),
            consumed: Barrier::new(size),
        }
    }
}

/// A single rank's handle into a [`ThreadTransport`] ring, constructed via
/// [`ThreadTransport::ring`].
pub struct ThreadTransport {
    rank: usize,
    size: usize,
    mailbox: Arc<Mailbox>,
    gather: Arc<GatherState>,
    step_barrier: Arc<Barrier>,
}

impl ThreadTransport {
    /// Builds `size` per-rank transport handles sharing one mailbox, gather buffer, and
    /// step barrier. Move each handle into its own thread (or, for `size == 1`, use the
    /// single handle directly with no threading at all).
    pub fn ring(size: usize) -> Vec<ThreadTransport> {
        assert!(size > 0, "a ring needs at least one rank");
        let mailbox = Arc::new(Mailbox::new());
        let gather = Arc::new(GatherState::new(size));
        let step_barrier = Arc::new(Barrier::new(size));
        (0..size)
            .map(|rank| ThreadTransport {
                rank,
                size,
                mailbox: mailbox.clone(),
                gather: gather.clone(),
                step_barrier: step_barrier.clone(),
            })
            .collect()
    }
}

impl Transport for ThreadTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send_recv_replace(&self, buf: &mut [f64], to: usize, from: usize, tag: Tag) -> Result<()> {
        if to >= self.size || from >= self.size {
            return Err(Error::Messaging(format!(
                "rank {} cannot exchange with out-of-range peers to={to} from={from} (size={})",
                self.rank, self.size
            )));
        }
        self.mailbox.send(self.rank, to, tag, buf.to_vec());
        let received = self.mailbox.recv(from, self.rank, tag);
        if received.len() != buf.len() {
            return Err(Error::Messaging(format!(
                "rank {} received {} doubles from {from}, expected {}",
                self.rank,
                received.len(),
                buf.len()
            )));
        }
        buf.copy_from_slice(&received);
        Ok(())
    }

    fn all_gather(&self, send_buf: &[f64], recv_buf: &mut [f64]) -> Result<()> {
        let expected_len = send_buf.len() * self.size;
        if recv_buf.len() != expected_len {
            return Err(Error::Messaging(format!(
                "all_gather recv_buf has length {}, expected {expected_len}",
                recv_buf.len()
            )));
        }
        {
            let mut slots = self.gather.slots.lock().expect("gather lock poisoned");
            slots[self.rank] = send_buf.to_vec();
        }
        self.gather.published.wait();
        {
            let slots = self.gather.slots.lock().expect("gather lock poisoned");
            for (rank, slot) in slots.iter().enumerate() {
                let start = rank * send_buf.len();
                recv_buf[start..start + send_buf.len()].copy_from_slice(slot);
            }
        }
        self.gather.consumed.wait();
        Ok(())
    }

    fn barrier(&self) {
        self.step_barrier.wait();
    }
}
