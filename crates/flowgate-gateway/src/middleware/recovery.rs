//! Converts handler panics into `INTERNAL` responses.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::task::{Context, Poll};

use axum::{body::Body, http::Request, response::Response};
use futures::FutureExt;
use tonic::Code;
use tower::{Layer, Service};
use tracing::error;

use super::grpc::{grpc_error_response, request_id, rpc_method};

#[derive(Clone, Copy, Default)]
pub struct RecoveryLayer;

impl<S> Layer<S> for RecoveryLayer {
    type Service = RecoveryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RecoveryService { inner }
    }
}

#[derive(Clone)]
pub struct RecoveryService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RecoveryService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let method = rpc_method(&req).to_string();
        let request_id = request_id(&req);

        // A panic can surface while building the future or while polling it.
        let fut = match std::panic::catch_unwind(AssertUnwindSafe(|| inner.call(req))) {
            Ok(fut) => fut,
            Err(panic) => {
                let response = recovered(&method, &request_id, panic);
                return Box::pin(async move { Ok(response) });
            }
        };

        Box::pin(async move {
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => Ok(recovered(&method, &request_id, panic)),
            }
        })
    }
}

fn recovered(method: &str, request_id: &str, panic: Box<dyn Any + Send>) -> Response {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());

    error!(
        method = %method,
        request_id = %request_id,
        panic = %message,
        "rpc handler panicked"
    );
    grpc_error_response(Code::Internal, "internal error")
}
