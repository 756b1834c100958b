//! # Ports Layer
//!
//! - `outbound.rs` - Driven ports (the attribute store the engine depends on)

pub mod outbound;
