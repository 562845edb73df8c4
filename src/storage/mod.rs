//! Link registry storage implementations

pub mod in_memory;

pub use in_memory::InMemoryLinkRegistry;
