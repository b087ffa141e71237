//! Connection settings for a Security Console.
//!
//! `ClientConfig` is plain data and deserializes with serde, so callers can
//! load it from whatever format they already use. Only the host and the
//! credentials are mandatory.

use std::fmt;

use serde::Deserialize;

use crate::message::ProtocolVersion;

/// Default Security Console port.
pub const DEFAULT_PORT: u16 = 3780;

/// URL scheme used to reach the console.
///
/// Real consoles only listen on HTTPS. Plain HTTP exists for local mock
/// servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Https,
    Http,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Https => "https",
            Scheme::Http => "http",
        }
    }
}

/// Client configuration: console address, credentials and TLS policy.
#[derive(Clone, Deserialize)]
pub struct ClientConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub scheme: Scheme,
    /// Consoles usually run with self-signed certificates, so validation is
    /// off unless explicitly enabled.
    #[serde(default)]
    pub verify_certificates: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl ClientConfig {
    pub fn new(host: &str, port: u16, username: &str, password: &str) -> Self {
        ClientConfig {
            host: host.to_string(),
            port,
            username: username.to_string(),
            password: password.to_string(),
            scheme: Scheme::default(),
            verify_certificates: false,
        }
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_certificate_verification(mut self, verify: bool) -> Self {
        self.verify_certificates = verify;
        self
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            scheme: self.scheme,
            host: self.host.clone(),
            port: self.port,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("scheme", &self.scheme)
            .field("verify_certificates", &self.verify_certificates)
            .finish()
    }
}

/// Base address of a console; builds every URL the client requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// `{scheme}://{host}:{port}/api/{version}/xml`
    pub fn api_url(&self, version: ProtocolVersion) -> String {
        format!("{}/api/{}/xml", self.base(), version.as_str())
    }

    /// URL of a server-relative document such as a generated report.
    pub fn document_url(&self, uri: &str) -> String {
        format!("{}/{}", self.base(), uri.trim_start_matches('/'))
    }

    fn base(&self) -> String {
        format!("{}://{}:{}", self.scheme.as_str(), self.host, self.port)
    }
}
