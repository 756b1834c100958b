//! Storage Adapters
//!
//! Implementations of the `AttributeStore` trait.

mod file;
mod memory;

pub use file::FileAttributeStore;
pub use memory::InMemoryAttributeStore;
