//! Synchronous client for the Nexpose Security Console XML API.
//!
//! # Overview
//! Logs in, issues typed API requests (reports, vulnerabilities,
//! vulnerability exceptions) and returns validated XML responses or small
//! accessors over them.
//!
//! # Design
//! - `Request` is a closed enum, one variant per API call. It becomes a
//!   `Message` envelope that only knows how to serialize itself.
//! - `SessionProtocol::send` owns every envelope invariant: session-id and
//!   sync-id injection, response tag check, sync-id echo check (API 1.2).
//! - `Transport` is the only I/O seam. `UreqTransport` does blocking HTTPS;
//!   certificate validation is an explicit `ClientConfig` flag.
//! - `NexposeClient` owns the session. `open_session` / `with_session`
//!   guarantee a logout attempt on every exit path.
//!
//! ```no_run
//! use nexpose_core::{ClientConfig, NexposeClient};
//!
//! let mut client = NexposeClient::new(ClientConfig::new("localhost", 3780, "username", "password"));
//! client.with_session(|client| {
//!     let listing = client.report_listing()?;
//!     for report in listing.children() {
//!         if let Some(cfg_id) = report.attr("cfg-id") {
//!             let _config = client.report_config(cfg_id)?;
//!         }
//!     }
//!     Ok(())
//! })?;
//! # Ok::<(), nexpose_core::ApiError>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod message;
pub mod session;
pub mod transport;
pub mod types;
pub mod xml;

pub use client::{NexposeClient, SessionGuard};
pub use config::{ClientConfig, Endpoint, Scheme};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use message::{Message, MessageScope, ProtocolVersion, Request};
pub use session::{Session, SessionProtocol, SyncToken};
pub use transport::{Transport, UreqTransport};
pub use types::{ExceptionReason, ExceptionScope, ReportSummary, ReportSummaryStatus, VulnerabilityDetails};
pub use xml::Element;
