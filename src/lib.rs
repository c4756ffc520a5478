//! A distributed Barnes-Hut gravitational n-body simulation: each of P processes owns an
//! `n / p` slice of the bodies, builds a quadtree over just that slice, and rotates partial
//! forces around a ring of peers to assemble the full force each body feels.

pub mod body;
pub mod config;
pub mod error;
pub mod exchange;
pub mod init;
pub mod quadrant;
pub mod quadtree;
pub mod render;
pub mod simulator;
pub mod transport;

pub use body::{Body, BodyId};
pub use config::{Args, Config};
pub use error::{Error, Result};
pub use quadrant::Quadrant;
pub use quadtree::BHTree;
pub use simulator::Simulator;
pub use transport::Transport;
