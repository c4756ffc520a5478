//! Crate-wide error taxonomy.
//!
//! Three kinds of failure are distinguished, per the error handling design: configuration
//! errors abort before the simulation loop starts, messaging errors are fatal to the step in
//! progress, and numeric errors indicate a programmer error that should never occur under
//! normal inputs but is surfaced rather than left to corrupt later steps silently.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("messaging error: {0}")]
    Messaging(String),

    #[error("numeric error: {0}")]
    Numeric(String),
}

pub type Result<T> = std::result::Result<T, Error>;
