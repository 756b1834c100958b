//! Body encodings accepted by the transcoder.
//!
//! JSON is the default. `application/octet-stream` selects binary protobuf
//! for both request bodies (by `Content-Type`) and responses (by `Accept`).

use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use prost::Message;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::RestError;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const JSON: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Json,
    Protobuf,
}

impl Codec {
    /// Encoding of the request body.
    pub fn for_request(headers: &HeaderMap) -> Self {
        Self::from_header(headers.get(CONTENT_TYPE))
    }

    /// Encoding the caller wants back.
    pub fn for_response(headers: &HeaderMap) -> Self {
        Self::from_header(headers.get(ACCEPT))
    }

    fn from_header(value: Option<&HeaderValue>) -> Self {
        match value.and_then(|v| v.to_str().ok()) {
            Some(v) if v.contains(OCTET_STREAM) => Codec::Protobuf,
            _ => Codec::Json,
        }
    }

    fn content_type(self) -> &'static str {
        match self {
            Codec::Json => JSON,
            Codec::Protobuf => OCTET_STREAM,
        }
    }

    /// Decode a request message. An empty body yields the default message so
    /// path and query parameters alone can describe the call.
    pub fn decode<T>(self, body: &Bytes) -> Result<T, RestError>
    where
        T: Message + DeserializeOwned + Default,
    {
        if body.is_empty() {
            return Ok(T::default());
        }
        match self {
            Codec::Json => serde_json::from_slice(body)
                .map_err(|e| RestError::invalid_argument(format!("invalid JSON body: {e}"))),
            Codec::Protobuf => T::decode(body.as_ref())
                .map_err(|e| RestError::invalid_argument(format!("invalid protobuf body: {e}"))),
        }
    }

    pub fn encode<T>(self, message: &T) -> Response
    where
        T: Message + Serialize,
    {
        let body = match self {
            Codec::Json => match serde_json::to_vec(message) {
                Ok(body) => body,
                Err(e) => {
                    tracing::error!(error = %e, "failed to encode JSON response");
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            },
            Codec::Protobuf => message.encode_to_vec(),
        };
        ([(CONTENT_TYPE, self.content_type())], body).into_response()
    }
}
