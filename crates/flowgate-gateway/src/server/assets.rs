//! Static documents served by the HTTP mux.

use bytes::Bytes;

/// Source of the bundled OpenAPI document.
pub trait AssetSource: Send + Sync + 'static {
    /// `None` when the document is not available.
    fn openapi(&self) -> Option<Bytes>;
}

/// Documents compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledAssets;

const ADMIN_SWAGGER: &[u8] = include_bytes!("../../assets/admin.swagger.json");

impl AssetSource for BundledAssets {
    fn openapi(&self) -> Option<Bytes> {
        Some(Bytes::from_static(ADMIN_SWAGGER))
    }
}
