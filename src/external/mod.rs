//! Collaborator services the pipeline talks to but does not own
//!
//! Every adapter is optional. Failures are logged by the caller and never
//! change a session's outcome.

mod memory;
mod search;
mod storage;

pub use memory::{InMemoryMemory, Interaction, MemoryStore, NoopMemory};
pub use search::{fallback_references, DocumentSearch, NoopSearch, SearchResult};
pub use storage::{ArtifactStore, InMemoryArtifactStore};
