//! # Flowgate Test Suite
//!
//! End-to-end tests that start a real server on ephemeral ports and talk to
//! it with `reqwest` (REST) and tonic (native gRPC).
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── support.rs     # Server fixture, certificates, clients
//!     ├── insecure.rs    # Two listeners, REST → RPC dial
//!     ├── auth.rs        # Pipeline with authentication enabled
//!     └── secure.rs      # One TLS listener, per-request demux
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p flowgate-tests
//! cargo test -p flowgate-tests integration::secure::
//! ```

pub mod integration;
