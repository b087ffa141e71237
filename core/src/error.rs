//! Error types for the Nexpose API client.
//!
//! # Design
//! Every exchange either succeeds and is validated, or fails with exactly one
//! of these variants. Nothing is retried. `ProtocolMismatch` keeps the raw
//! response body because the console reports most failures as a different
//! root element (`<Failure>`), and that body is the only useful diagnostic.

use thiserror::Error;

/// Errors returned by `NexposeClient` operations and the session protocol.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A session-scoped request was attempted before a successful login.
    #[error("not authenticated: login before sending session-scoped requests")]
    NotAuthenticated,

    /// The response root element differs from the one the request expects.
    #[error("wrong API answer: expected <{expected}>, got <{actual}>:\n{body}")]
    ProtocolMismatch {
        expected: String,
        actual: String,
        body: String,
    },

    /// A protocol 1.2 response did not echo the request's sync-id.
    #[error("different sync-id from request {sent:?} and response {received:?}")]
    SyncMismatch {
        sent: String,
        received: Option<String>,
    },

    /// Network or TLS failure from the underlying HTTP agent.
    #[error("transport failure: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The response body is not well-formed XML.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A response element lacks an attribute the operation needs.
    #[error("<{element}> response has no {attribute:?} attribute")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    /// The request element could not be written as XML.
    #[error("serialization failed: {0}")]
    SerializationError(String),
}

impl ApiError {
    pub(crate) fn transport<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ApiError::Transport(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_mismatch_message_carries_body() {
        let err = ApiError::ProtocolMismatch {
            expected: "LoginResponse".to_string(),
            actual: "Failure".to_string(),
            body: "<Failure/>".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("<LoginResponse>"));
        assert!(msg.contains("<Failure/>"));
    }

    #[test]
    fn transport_error_keeps_original_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ApiError::transport(io);
        let source = std::error::Error::source(&err).unwrap();
        let io = source.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::ConnectionRefused);
    }
}
