pub mod baseline;
pub mod defs;
pub mod memory;

pub use baseline::{BaselineAuth, BaselineBlobStore};
pub use defs::*;
pub use memory::MemoryStore;
