//! Request envelope validation: content type, bounded body, JSON, `request` array.
//! Checks run in order and stop at the first failure.

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, StatusCode};
use futures_util::StreamExt;
use serde_json::Value;

/// The only accepted request content type, compared byte for byte.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Envelope-level failures. `Display` is the message sent to the client.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("Content-Type must be set to application/json")]
    ContentType { provided: Option<String> },
    #[error("Error reading request body")]
    BodyRead(#[source] axum::Error),
    #[error("Unable to parse request - invalid JSON detected")]
    InvalidJson(#[source] serde_json::Error),
    /// Same message as `InvalidJson`; clients match on that string.
    #[error("Unable to parse request - invalid JSON detected")]
    MissingRequestArray,
}

impl EnvelopeError {
    pub fn status(&self) -> StatusCode {
        match self {
            EnvelopeError::BodyRead(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Client mistakes count as invalid requests; transport failures do not.
    pub fn is_invalid_request(&self) -> bool {
        !matches!(self, EnvelopeError::BodyRead(_))
    }

    /// Failures before the envelope is parsed also count one unsuccessful object.
    pub fn counts_unsuccessful_object(&self) -> bool {
        !matches!(self, EnvelopeError::MissingRequestArray)
    }
}

/// A validated request envelope.
#[derive(Debug, PartialEq)]
pub enum Envelope {
    /// Top-level `null`: nothing to do and nothing to answer.
    Null,
    Items(Vec<Value>),
}

pub fn check_content_type(headers: &HeaderMap) -> Result<(), EnvelopeError> {
    let value = headers.get(header::CONTENT_TYPE);
    if value.map(|v| v.as_bytes()) == Some(JSON_CONTENT_TYPE.as_bytes()) {
        return Ok(());
    }
    Err(EnvelopeError::ContentType {
        provided: value.map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned()),
    })
}

/// Read at most `limit` bytes of the body. Anything past the limit is
/// dropped without error.
pub async fn read_truncated(body: Body, limit: usize) -> Result<Bytes, axum::Error> {
    let mut stream = body.into_data_stream();
    let mut buf: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let room = limit - buf.len();
        if chunk.len() >= room {
            buf.extend_from_slice(&chunk[..room]);
            break;
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(buf))
}

/// Parse the body and pull out the `request` array.
pub fn parse_envelope(body: &[u8]) -> Result<Envelope, EnvelopeError> {
    let document: Value = serde_json::from_slice(body).map_err(EnvelopeError::InvalidJson)?;
    match document {
        Value::Null => Ok(Envelope::Null),
        Value::Object(mut members) => match members.remove("request") {
            Some(Value::Array(items)) => Ok(Envelope::Items(items)),
            _ => Err(EnvelopeError::MissingRequestArray),
        },
        _ => Err(EnvelopeError::MissingRequestArray),
    }
}

/// Run every envelope check in order.
pub async fn read_envelope(
    headers: &HeaderMap,
    body: Body,
    limit: usize,
) -> Result<Envelope, EnvelopeError> {
    check_content_type(headers)?;
    let bytes = read_truncated(body, limit)
        .await
        .map_err(EnvelopeError::BodyRead)?;
    parse_envelope(&bytes)
}
