//! Copies a custom authorization header into `authorization`.
//!
//! Some clients cannot set `authorization` themselves (proxies strip it), so
//! they send the credential under an alternate name. An existing
//! `authorization` value always wins.

use std::task::{Context, Poll};

use axum::{body::Body, http::Request, response::Response};
use http::header::AUTHORIZATION;
use http::HeaderName;
use tower::{Layer, Service};

#[derive(Clone, Default)]
pub struct MetadataLayer {
    custom_header: Option<HeaderName>,
}

impl MetadataLayer {
    pub fn new(custom_header: Option<HeaderName>) -> Self {
        Self { custom_header }
    }
}

impl<S> Layer<S> for MetadataLayer {
    type Service = MetadataService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetadataService {
            inner,
            custom_header: self.custom_header.clone(),
        }
    }
}

#[derive(Clone)]
pub struct MetadataService<S> {
    inner: S,
    custom_header: Option<HeaderName>,
}

impl<S> Service<Request<Body>> for MetadataService<S>
where
    S: Service<Request<Body>, Response = Response>,
{
    type Response = Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        if let Some(custom) = &self.custom_header {
            copy_custom_authorization(req.headers_mut(), custom);
        }
        self.inner.call(req)
    }
}

fn copy_custom_authorization(headers: &mut http::HeaderMap, custom: &HeaderName) {
    if headers.contains_key(AUTHORIZATION) {
        return;
    }
    if let Some(value) = headers.get(custom).cloned() {
        headers.insert(AUTHORIZATION, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, HeaderValue};

    const CUSTOM: HeaderName = HeaderName::from_static("flowgate-authorization");

    #[test]
    fn test_copies_when_authorization_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(CUSTOM, HeaderValue::from_static("Bearer abc"));
        copy_custom_authorization(&mut headers, &CUSTOM);
        assert_eq!(headers[AUTHORIZATION], "Bearer abc");
    }

    #[test]
    fn test_existing_authorization_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer native"));
        headers.insert(CUSTOM, HeaderValue::from_static("Bearer custom"));
        copy_custom_authorization(&mut headers, &CUSTOM);
        assert_eq!(headers[AUTHORIZATION], "Bearer native");
    }

    #[test]
    fn test_nothing_to_copy() {
        let mut headers = HeaderMap::new();
        copy_custom_authorization(&mut headers, &CUSTOM);
        assert!(headers.get(AUTHORIZATION).is_none());
    }
}
