//! Request envelopes for the console XML API.
//!
//! # Design
//! Every API call is one variant of the closed `Request` enum. A variant
//! knows its root tag, the tag a valid reply must carry, the protocol version
//! it is sent under and its payload. `Message` is the tag-agnostic envelope
//! the session protocol works with: it only knows how to become an XML
//! element. Session attributes (`session-id`, `sync-id`) are added later by
//! the session protocol, never here.

use serde::Deserialize;

use crate::error::ApiError;
use crate::types::{ExceptionReason, ExceptionScope};
use crate::xml::Element;

/// API protocol version; picks the endpoint path and sync-id checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ProtocolVersion {
    #[serde(rename = "1.1")]
    V1_1,
    #[serde(rename = "1.2")]
    V1_2,
}

impl ProtocolVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolVersion::V1_1 => "1.1",
            ProtocolVersion::V1_2 => "1.2",
        }
    }
}

/// Whether a message must travel inside an authenticated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageScope {
    /// Sent before any session exists (login).
    Anonymous,
    /// Carries `session-id` and `sync-id`.
    Session,
}

/// Serializable request envelope.
///
/// Entries whose value is `None` are kept so the envelope mirrors the
/// operation's full field set, but they never reach the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    request_tag: String,
    response_tag: String,
    scope: MessageScope,
    attributes: Vec<(String, Option<String>)>,
    children: Vec<(String, Option<String>)>,
}

impl Message {
    pub fn new(request_tag: &str, response_tag: &str, scope: MessageScope) -> Self {
        Message {
            request_tag: request_tag.to_string(),
            response_tag: response_tag.to_string(),
            scope,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attribute(mut self, name: &str, value: Option<impl Into<String>>) -> Self {
        self.attributes.push((name.to_string(), value.map(Into::into)));
        self
    }

    /// Adds a child element whose text is `text`.
    pub fn child(mut self, tag: &str, text: Option<impl Into<String>>) -> Self {
        self.children.push((tag.to_string(), text.map(Into::into)));
        self
    }

    pub fn request_tag(&self) -> &str {
        &self.request_tag
    }

    pub fn response_tag(&self) -> &str {
        &self.response_tag
    }

    pub fn scope(&self) -> MessageScope {
        self.scope
    }

    pub fn is_session_scoped(&self) -> bool {
        self.scope == MessageScope::Session
    }

    pub fn to_element(&self) -> Element {
        let mut element = Element::new(self.request_tag.as_str());
        for (name, value) in &self.attributes {
            if let Some(value) = value {
                element.set_attribute(name.as_str(), value.as_str());
            }
        }
        for (tag, text) in &self.children {
            if let Some(text) = text {
                element.push_child(Element::new(tag.as_str()).with_text(text.as_str()));
            }
        }
        element
    }

    pub fn to_xml(&self) -> Result<String, ApiError> {
        self.to_element().to_xml()
    }
}

/// One variant per console API operation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Request {
    Login {
        user_id: String,
        password: String,
    },
    Logout,
    ReportListing,
    ReportConfig {
        config_id: String,
    },
    ReportTemplateListing,
    ReportHistory {
        config_id: String,
    },
    VulnerabilityListing,
    VulnerabilityDetails {
        vuln_id: String,
    },
    ExceptionCreate {
        vuln_id: String,
        reason: ExceptionReason,
        scope: ExceptionScope,
        #[serde(default)]
        device_id: Option<String>,
        #[serde(default)]
        comment: Option<String>,
    },
    ExceptionApprove {
        exception_id: String,
        #[serde(default)]
        comment: Option<String>,
    },
}

impl Request {
    /// Root element name sent to the console.
    pub fn request_tag(&self) -> &'static str {
        match self {
            Request::Login { .. } => "LoginRequest",
            Request::Logout => "LogoutRequest",
            Request::ReportListing => "ReportListingRequest",
            Request::ReportConfig { .. } => "ReportConfigRequest",
            Request::ReportTemplateListing => "ReportTemplateListingRequest",
            Request::ReportHistory { .. } => "ReportHistoryRequest",
            Request::VulnerabilityListing => "VulnerabilityListingRequest",
            Request::VulnerabilityDetails { .. } => "VulnerabilityDetailsRequest",
            Request::ExceptionCreate { .. } => "VulnerabilityExceptionCreateRequest",
            Request::ExceptionApprove { .. } => "VulnerabilityExceptionApproveRequest",
        }
    }

    /// Root element name of a valid reply.
    pub fn response_tag(&self) -> &'static str {
        match self {
            Request::Login { .. } => "LoginResponse",
            Request::Logout => "LogoutResponse",
            Request::ReportListing => "ReportListingResponse",
            Request::ReportConfig { .. } => "ReportConfigResponse",
            Request::ReportTemplateListing => "ReportTemplateListingResponse",
            Request::ReportHistory { .. } => "ReportHistoryResponse",
            Request::VulnerabilityListing => "VulnerabilityListingResponse",
            Request::VulnerabilityDetails { .. } => "VulnerabilityDetailsResponse",
            Request::ExceptionCreate { .. } => "VulnerabilityExceptionCreateResponse",
            Request::ExceptionApprove { .. } => "VulnerabilityExceptionApproveResponse",
        }
    }

    pub fn scope(&self) -> MessageScope {
        match self {
            Request::Login { .. } => MessageScope::Anonymous,
            _ => MessageScope::Session,
        }
    }

    /// Report operations are only served by the 1.1 API.
    pub fn protocol_version(&self) -> ProtocolVersion {
        match self {
            Request::ReportListing
            | Request::ReportConfig { .. }
            | Request::ReportTemplateListing
            | Request::ReportHistory { .. } => ProtocolVersion::V1_1,
            _ => ProtocolVersion::V1_2,
        }
    }

    pub fn to_message(&self) -> Message {
        let message = Message::new(self.request_tag(), self.response_tag(), self.scope());
        match self {
            Request::Login { user_id, password } => message
                .attribute("user-id", Some(user_id.as_str()))
                .attribute("password", Some(password.as_str())),
            Request::Logout
            | Request::ReportListing
            | Request::ReportTemplateListing
            | Request::VulnerabilityListing => message,
            Request::ReportConfig { config_id } | Request::ReportHistory { config_id } => {
                message.attribute("reportcfg-id", Some(config_id.as_str()))
            }
            Request::VulnerabilityDetails { vuln_id } => {
                message.attribute("vuln-id", Some(vuln_id.as_str()))
            }
            Request::ExceptionCreate {
                vuln_id,
                reason,
                scope,
                device_id,
                comment,
            } => message
                .attribute("vuln-id", Some(vuln_id.as_str()))
                .attribute("reason", Some(reason.as_str()))
                .attribute("scope", Some(scope.as_str()))
                .attribute("device-id", device_id.as_deref())
                .child("comment", comment.as_deref()),
            Request::ExceptionApprove {
                exception_id,
                comment,
            } => message
                .attribute("exception-id", Some(exception_id.as_str()))
                .child("comment", comment.as_deref()),
        }
    }
}

impl From<&Request> for Message {
    fn from(request: &Request) -> Self {
        request.to_message()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_entries_never_serialize() {
        let el = Message::new("T", "TResponse", MessageScope::Session)
            .attribute("a", Some("1"))
            .attribute("b", None::<String>)
            .child("c", Some("x"))
            .child("d", None::<String>)
            .to_element();

        let attrs: Vec<_> = el.attributes().collect();
        assert_eq!(attrs, vec![("a", "1")]);
        assert_eq!(el.children().len(), 1);
        assert_eq!(el.children()[0].name(), "c");
        assert_eq!(el.children()[0].text(), Some("x"));
    }

    #[test]
    fn login_is_the_only_anonymous_request() {
        let login = Request::Login {
            user_id: "admin".to_string(),
            password: "secret".to_string(),
        };
        assert_eq!(login.scope(), MessageScope::Anonymous);
        assert!(!login.to_message().is_session_scoped());
        assert_eq!(Request::Logout.scope(), MessageScope::Session);
        assert_eq!(Request::VulnerabilityListing.scope(), MessageScope::Session);
    }

    #[test]
    fn login_serializes_credentials() {
        let xml = Request::Login {
            user_id: "admin".to_string(),
            password: "secret".to_string(),
        }
        .to_message()
        .to_xml()
        .unwrap();
        assert_eq!(xml, r#"<LoginRequest user-id="admin" password="secret"/>"#);
    }

    #[test]
    fn report_operations_use_protocol_1_1() {
        assert_eq!(Request::ReportListing.protocol_version(), ProtocolVersion::V1_1);
        assert_eq!(Request::ReportTemplateListing.protocol_version(), ProtocolVersion::V1_1);
        assert_eq!(
            Request::ReportHistory { config_id: "1".to_string() }.protocol_version(),
            ProtocolVersion::V1_1
        );
        assert_eq!(Request::Logout.protocol_version(), ProtocolVersion::V1_2);
        assert_eq!(
            Request::VulnerabilityDetails { vuln_id: "v".to_string() }.protocol_version(),
            ProtocolVersion::V1_2
        );
    }

    #[test]
    fn exception_create_without_optionals() {
        let el = Request::ExceptionCreate {
            vuln_id: "ssl-weak".to_string(),
            reason: ExceptionReason::FalsePositive,
            scope: ExceptionScope::AllInstances,
            device_id: None,
            comment: None,
        }
        .to_message()
        .to_element();
        assert_eq!(el.name(), "VulnerabilityExceptionCreateRequest");
        assert_eq!(el.attr("reason"), Some("False Positive"));
        assert_eq!(el.attr("scope"), Some("All Instances"));
        assert!(el.attr("device-id").is_none());
        assert!(el.children().is_empty());
    }

    #[test]
    fn exception_approve_with_comment() {
        let el = Request::ExceptionApprove {
            exception_id: "99".to_string(),
            comment: Some("ok".to_string()),
        }
        .to_message()
        .to_element();
        assert_eq!(el.attr("exception-id"), Some("99"));
        assert_eq!(el.child("comment").and_then(Element::text), Some("ok"));
    }

    #[test]
    fn request_deserializes_from_operation_tag() {
        let req: Request = serde_json::from_str(r#"{"operation":"report_config","config_id":"10"}"#).unwrap();
        assert_eq!(req, Request::ReportConfig { config_id: "10".to_string() });
        let req: Request = serde_json::from_str(r#"{"operation":"logout"}"#).unwrap();
        assert_eq!(req, Request::Logout);
    }
}
