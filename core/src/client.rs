//! Client facade for the Security Console XML API.
//!
//! # Design
//! `NexposeClient` owns the `Session` and a `SessionProtocol`. Each public
//! method maps its arguments onto one `Request` variant, sends it through
//! the protocol and shapes the validated response. Only `login`/`logout`
//! take `&mut self`; everything else reads the session.
//!
//! Scoped use goes through `open_session` (a guard that logs out on drop) or
//! `with_session` (a closure bracketed by login and logout).

use std::ops::{Deref, DerefMut};

use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::message::Request;
use crate::session::{Session, SessionProtocol, SESSION_ID_ATTR};
use crate::transport::{Transport, UreqTransport};
use crate::types::{ExceptionReason, ExceptionScope, VulnerabilityDetails};
use crate::xml::Element;

/// Synchronous client bound to one console and one set of credentials.
#[derive(Debug)]
pub struct NexposeClient<T = UreqTransport> {
    config: ClientConfig,
    protocol: SessionProtocol<T>,
    session: Session,
}

impl NexposeClient<UreqTransport> {
    /// Client using a ureq agent configured from `config`.
    pub fn new(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(config.verify_certificates);
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> NexposeClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        let protocol = SessionProtocol::new(transport, config.endpoint());
        NexposeClient {
            config,
            protocol,
            session: Session::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.id()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_active()
    }

    fn send(&self, request: Request) -> Result<Element, ApiError> {
        self.protocol
            .send(&self.session, &request.to_message(), request.protocol_version())
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    /// Authenticates with the configured credentials and stores the session id.
    pub fn login(&mut self) -> Result<(), ApiError> {
        let response = self.send(Request::Login {
            user_id: self.config.username.clone(),
            password: self.config.password.clone(),
        })?;
        let session_id = response
            .attr(SESSION_ID_ATTR)
            .ok_or_else(|| ApiError::MissingAttribute {
                element: response.name().to_string(),
                attribute: SESSION_ID_ATTR,
            })?
            .to_string();
        self.session.establish(session_id);
        info!(user = %self.config.username, "logged in to Security Console");
        Ok(())
    }

    /// Ends the session. The local session id is cleared even if the console
    /// rejects the request; the error is still returned.
    pub fn logout(&mut self) -> Result<(), ApiError> {
        let result = self.send(Request::Logout).map(|_| ());
        self.session.clear();
        if result.is_ok() {
            info!(user = %self.config.username, "logged out from Security Console");
        }
        result
    }

    /// Logs in and returns a guard that logs out when dropped.
    ///
    /// A session that is already open is logged out first so it is not
    /// orphaned on the console; a failure there is only logged.
    pub fn open_session(&mut self) -> Result<SessionGuard<'_, T>, ApiError> {
        if self.is_authenticated() {
            if let Err(err) = self.logout() {
                warn!(error = %err, "logout of previous session failed");
            }
        }
        self.login()?;
        Ok(SessionGuard {
            client: self,
            closed: false,
        })
    }

    /// Runs `work` inside a session, always attempting logout afterwards.
    ///
    /// An error from `work` takes precedence; a logout failure after a
    /// successful `work` is returned instead of the value.
    pub fn with_session<R, F>(&mut self, work: F) -> Result<R, ApiError>
    where
        F: FnOnce(&mut Self) -> Result<R, ApiError>,
    {
        let mut guard = self.open_session()?;
        match work(&mut *guard) {
            Ok(value) => {
                guard.close()?;
                Ok(value)
            }
            Err(err) => {
                drop(guard);
                Err(err)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Vulnerabilities
    // -----------------------------------------------------------------------

    pub fn vulnerability_listing(&self) -> Result<Element, ApiError> {
        self.send(Request::VulnerabilityListing)
    }

    pub fn vulnerability_details(&self, vuln_id: &str) -> Result<VulnerabilityDetails, ApiError> {
        let response = self.send(Request::VulnerabilityDetails {
            vuln_id: vuln_id.to_string(),
        })?;
        Ok(VulnerabilityDetails::new(response))
    }

    // -----------------------------------------------------------------------
    // Reports
    // -----------------------------------------------------------------------

    pub fn report_listing(&self) -> Result<Element, ApiError> {
        self.send(Request::ReportListing)
    }

    pub fn report_template_listing(&self) -> Result<Element, ApiError> {
        self.send(Request::ReportTemplateListing)
    }

    /// The `ReportConfig` element of the response, `None` if the console
    /// returned none.
    pub fn report_config(&self, config_id: &str) -> Result<Option<Element>, ApiError> {
        let response = self.send(Request::ReportConfig {
            config_id: config_id.to_string(),
        })?;
        Ok(response.take_child("ReportConfig"))
    }

    /// History entries in the order the console sends them (newest first).
    pub fn report_history(&self, config_id: &str) -> Result<std::vec::IntoIter<Element>, ApiError> {
        let response = self.send(Request::ReportHistory {
            config_id: config_id.to_string(),
        })?;
        Ok(response.into_children().into_iter())
    }

    /// Downloads a generated report document by its server-relative URI.
    pub fn get_report(&self, uri: &str) -> Result<Element, ApiError> {
        self.protocol.fetch_document(&self.session, uri)
    }

    // -----------------------------------------------------------------------
    // Vulnerability exceptions
    // -----------------------------------------------------------------------

    /// Creates an exception and returns its id.
    pub fn create_exception_for_device(
        &self,
        vuln_id: &str,
        reason: ExceptionReason,
        scope: ExceptionScope,
        device_id: Option<&str>,
        comment: Option<&str>,
    ) -> Result<String, ApiError> {
        let response = self.send(Request::ExceptionCreate {
            vuln_id: vuln_id.to_string(),
            reason,
            scope,
            device_id: device_id.map(str::to_string),
            comment: comment.map(str::to_string),
        })?;
        response
            .attr("exception-id")
            .map(str::to_string)
            .ok_or_else(|| ApiError::MissingAttribute {
                element: response.name().to_string(),
                attribute: "exception-id",
            })
    }

    pub fn approve_exception(&self, exception_id: &str, comment: Option<&str>) -> Result<Element, ApiError> {
        self.send(Request::ExceptionApprove {
            exception_id: exception_id.to_string(),
            comment: comment.map(str::to_string),
        })
    }
}

/// Authenticated scope over a `NexposeClient`.
///
/// `close` logs out and reports failure. Dropping an open guard logs out
/// best-effort and only logs a failure.
pub struct SessionGuard<'a, T: Transport> {
    client: &'a mut NexposeClient<T>,
    closed: bool,
}

impl<T: Transport> SessionGuard<'_, T> {
    pub fn close(mut self) -> Result<(), ApiError> {
        self.closed = true;
        self.client.logout()
    }
}

impl<T: Transport> Deref for SessionGuard<'_, T> {
    type Target = NexposeClient<T>;

    fn deref(&self) -> &Self::Target {
        self.client
    }
}

impl<T: Transport> DerefMut for SessionGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.client
    }
}

impl<T: Transport> Drop for SessionGuard<'_, T> {
    fn drop(&mut self) {
        if self.closed || !self.client.is_authenticated() {
            return;
        }
        if let Err(err) = self.client.logout() {
            warn!(error = %err, "logout failed while leaving session scope");
        }
    }
}
