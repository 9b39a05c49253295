//! Store implementations for parley.

pub mod in_memory;

pub use in_memory::InMemoryStore;
