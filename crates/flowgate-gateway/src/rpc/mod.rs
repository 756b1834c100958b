//! Native gRPC surface of the admin API.
//!
//! [`AdminRpc`] implements the generated `AdminService` trait: execution
//! calls go to the [`ExecutionManager`] port, attribute calls to the
//! [`ResourceManager`]. [`AdminRpc::into_router`] mounts it behind the
//! interceptor pipeline. [`reflection_router`] adds server reflection.

mod admin;
mod reflection;

pub use admin::AdminRpc;
pub use reflection::{reflection_router, REFLECTION_SERVICE};
