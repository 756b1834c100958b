//! Ports the gateway consumes.

pub mod outbound;
