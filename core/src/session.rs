//! Session state and the validated request/response exchange.
//!
//! # Design
//! `SessionProtocol::send` is the only place envelope invariants live:
//! session-id injection, sync-id generation and echo checking, and
//! response-tag validation. Operations above it never touch those
//! attributes. The protocol borrows the `Session` read-only; only the client
//! facade mutates it (login/logout).

use rand::Rng;
use tracing::debug;

use crate::config::Endpoint;
use crate::error::ApiError;
use crate::http::HttpRequest;
use crate::message::{Message, ProtocolVersion};
use crate::transport::Transport;
use crate::xml::{self, Element};

/// Attribute carrying the server-issued session id.
pub const SESSION_ID_ATTR: &str = "session-id";
/// Attribute carrying the client-generated correlation token.
pub const SYNC_ID_ATTR: &str = "sync-id";
/// Cookie the console expects on out-of-band document downloads.
pub const SESSION_COOKIE: &str = "nexposeCCSessionID";

/// Server-issued session id, present between login and logout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    id: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.id.is_some()
    }

    pub fn establish(&mut self, id: String) {
        self.id = Some(id);
    }

    pub fn clear(&mut self) {
        self.id = None;
    }

    fn require_id(&self) -> Result<&str, ApiError> {
        self.id().ok_or(ApiError::NotAuthenticated)
    }
}

/// Per-exchange correlation token, a decimal in `1..=1000`.
///
/// Only echo equality is checked, so collisions between exchanges are
/// harmless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncToken(String);

impl SyncToken {
    pub fn generate() -> Self {
        SyncToken(rand::thread_rng().gen_range(1..=1000u32).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Performs exactly one validated exchange per `send`.
#[derive(Debug, Clone)]
pub struct SessionProtocol<T> {
    transport: T,
    endpoint: Endpoint,
}

impl<T: Transport> SessionProtocol<T> {
    pub fn new(transport: T, endpoint: Endpoint) -> Self {
        SessionProtocol { transport, endpoint }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends `message` under `version` and returns the validated response root.
    pub fn send(
        &self,
        session: &Session,
        message: &Message,
        version: ProtocolVersion,
    ) -> Result<Element, ApiError> {
        let token = SyncToken::generate();

        let mut element = message.to_element();
        if message.is_session_scoped() {
            element.set_attribute(SESSION_ID_ATTR, session.require_id()?);
            element.set_attribute(SYNC_ID_ATTR, token.as_str());
        }
        let body = element.to_xml()?;

        debug!(
            request = message.request_tag(),
            version = version.as_str(),
            sync_id = token.as_str(),
            "sending API request"
        );
        let response = self
            .transport
            .execute(HttpRequest::xml_post(self.endpoint.api_url(version), body))?;
        let root = xml::parse(&response.body)?;

        if root.name() != message.response_tag() {
            return Err(ApiError::ProtocolMismatch {
                expected: message.response_tag().to_string(),
                actual: root.name().to_string(),
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }

        if version == ProtocolVersion::V1_2 && message.is_session_scoped() {
            let received = root.attr(SYNC_ID_ATTR);
            if received != Some(token.as_str()) {
                return Err(ApiError::SyncMismatch {
                    sent: token.as_str().to_string(),
                    received: received.map(str::to_string),
                });
            }
        }

        debug!(response = root.name(), "API response validated");
        Ok(root)
    }

    /// Cookie-authenticated GET of a server-relative document, parsed as XML.
    pub fn fetch_document(&self, session: &Session, uri: &str) -> Result<Element, ApiError> {
        let session_id = session.require_id()?;
        let url = self.endpoint.document_url(uri);
        debug!(%url, "fetching document");
        let response = self
            .transport
            .execute(HttpRequest::get_with_cookies(url, &[(SESSION_COOKIE, session_id)]))?;
        xml::parse(&response.body)
    }
}
