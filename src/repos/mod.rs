pub mod backend;
pub mod error;
pub mod memory;
pub mod pg;

pub use backend::{ResourceBackend, identifier_of};
pub use error::{BackendError, BackendResult};
pub use memory::MemoryBackend;
pub use pg::PgBackend;
