//! REST transcoding gateway.
//!
//! Every route decodes its body (JSON or binary protobuf), folds path and
//! query parameters into the RPC message, and calls the admin RPC server
//! through a regular tonic client. The call therefore runs the full
//! interceptor pipeline, exactly like a native gRPC call.

pub mod codec;
pub mod error;
mod routes;

pub use codec::Codec;
pub use error::{ErrorBody, RestError};

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderName};
use axum::Router;
use flowgate_types::admin::admin_service_client::AdminServiceClient;
use tonic::metadata::MetadataMap;
use tonic::transport::Channel;

use crate::auth::{AuthHandle, HttpOrigin};
use crate::middleware::grpc::REQUEST_ID;

/// HTTP→RPC translator.
#[derive(Clone)]
pub struct TranscodingGateway {
    client: AdminServiceClient<Channel>,
    auth: Option<AuthHandle>,
    origin: HttpOrigin,
}

impl TranscodingGateway {
    /// `origin` must be the tag of the pipeline serving `channel`.
    pub fn new(channel: Channel, auth: Option<AuthHandle>, origin: HttpOrigin) -> Self {
        Self {
            client: AdminServiceClient::new(channel),
            auth,
            origin,
        }
    }

    /// Router with every transcoded route, dialing `channel`.
    pub fn register(channel: Channel, auth: Option<AuthHandle>, origin: HttpOrigin) -> Router {
        routes::router(Self::new(channel, auth, origin))
    }

    pub(crate) fn client(&self) -> AdminServiceClient<Channel> {
        self.client.clone()
    }

    /// Wrap `message` with the metadata forwarded from the HTTP request.
    pub(crate) fn outbound<T>(&self, headers: &HeaderMap, message: T) -> tonic::Request<T> {
        tonic::Request::from_parts(
            MetadataMap::from_headers(self.forwarded_headers(headers)),
            tonic::Extensions::default(),
            message,
        )
    }

    fn forwarded_headers(&self, headers: &HeaderMap) -> HeaderMap {
        let mut forwarded = HeaderMap::new();
        let custom = self
            .auth
            .as_ref()
            .and_then(|auth| auth.custom_authorization_header());

        let names = [Some(AUTHORIZATION), Some(HeaderName::from_static(REQUEST_ID)), custom];
        for name in names.into_iter().flatten() {
            if let Some(value) = headers.get(&name) {
                forwarded.insert(name, value.clone());
            }
        }

        if let Some(auth) = &self.auth {
            if !forwarded.contains_key(AUTHORIZATION) {
                if let Some((name, value)) = auth.cookie_to_metadata(headers) {
                    forwarded.insert(name, value);
                }
            }
            let (name, value) = self.origin.tag();
            forwarded.insert(name, value);
        }

        forwarded
    }
}
