//! # Adapters Module
//!
//! - `storage`: `AttributeStore` implementations

pub mod storage;
