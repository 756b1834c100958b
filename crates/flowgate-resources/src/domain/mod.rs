//! # Domain Layer
//!
//! Pure domain logic for the attribute engine. No I/O lives here.
//!
//! - `identity` - `ResourceIdentity`, `ResourceType`, the store key
//! - `attributes` - Typed override payloads and their encoding
//! - `errors` - Domain and store error types

pub mod attributes;
pub mod errors;
pub mod identity;
