//! Session lifecycle and the registry that owns every session
//!
//! ```text
//! cloning -> cloned -> analyzing -> completed
//!    \          \           \
//!     +----------+-----------+--> failed
//! ```

mod model;
mod registry;
mod sweeper;

pub use model::{Session, SessionStatus, SessionTransition};
pub use registry::SessionRegistry;
pub use sweeper::{spawn_sweeper, sweep_expired, SweepReport};

pub(crate) use sweeper::remove_scratch;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("session not found: {id}")]
    NotFound { id: String },

    #[error("session {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: SessionStatus,
        to: SessionStatus,
    },
}
