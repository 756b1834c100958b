//! Listener plumbing: TLS, protocol demultiplexing and the HTTP mux.

pub mod assets;
pub mod demux;
pub mod http;
pub mod tls;

pub use assets::{AssetSource, BundledAssets};
pub use demux::{classify, HybridService, Protocol};
pub use http::http_mux;
pub use tls::TlsMaterial;
