//! In-memory stand-in for a Security Console's XML API.
//!
//! Serves `POST /api/{version}/xml` and cookie-authenticated report
//! downloads under `/reports/`. Fixture data is fixed; sessions and
//! vulnerability exceptions live in shared state. Plain HTTP only.
//!
//! Request parsing is done here with quick-xml directly rather than through
//! the client crate, so integration tests catch wire-format drift.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret";
pub const SESSION_COOKIE: &str = "nexposeCCSessionID";

pub const REPORT_CONFIG_ID: &str = "10";
pub const VULN_ID: &str = "vuln-1";
/// Newest report of `REPORT_CONFIG_ID`.
pub const LATEST_REPORT_URI: &str = "/reports/00000010/00000002/report.xml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VulnException {
    pub vuln_id: String,
    pub reason: String,
    pub scope: String,
    pub device_id: Option<String>,
    pub comment: Option<String>,
    pub approved: bool,
}

#[derive(Debug, Default)]
pub struct Console {
    pub sessions: HashSet<String>,
    pub exceptions: BTreeMap<u64, VulnException>,
    next_exception_id: u64,
}

pub type Db = Arc<RwLock<Console>>;

pub fn app() -> Router {
    app_with_state(Db::default())
}

/// Router over caller-provided state, so tests can inspect it afterwards.
pub fn app_with_state(db: Db) -> Router {
    Router::new()
        .route("/api/{version}/xml", post(api))
        .route("/reports/{*path}", get(report_document))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// A parsed API request: root tag, its attributes and first-level child texts.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ApiRequest {
    pub tag: String,
    pub attributes: HashMap<String, String>,
    pub children: HashMap<String, String>,
}

impl ApiRequest {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

pub fn parse_request(body: &str) -> Option<ApiRequest> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut request: Option<ApiRequest> = None;
    let mut open_child: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if request.is_none() {
                    request = Some(root_request(&e)?);
                } else {
                    open_child = Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                }
            }
            Ok(Event::Empty(e)) => {
                if request.is_none() {
                    request = Some(root_request(&e)?);
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(req), Some(child)) = (request.as_mut(), open_child.as_ref()) {
                    req.children.insert(child.clone(), t.unescape().ok()?.into_owned());
                }
            }
            Ok(Event::End(_)) => open_child = None,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => return None,
        }
    }
    request
}

fn root_request(e: &BytesStart<'_>) -> Option<ApiRequest> {
    let mut request = ApiRequest {
        tag: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
        ..ApiRequest::default()
    };
    for attr in e.attributes() {
        let attr = attr.ok()?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().ok()?.into_owned();
        request.attributes.insert(key, value);
    }
    Some(request)
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn xml_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "text/xml")], body).into_response()
}

fn failure(message: &str) -> String {
    format!(
        "<Failure><Exception><message>{}</message></Exception></Failure>",
        xml_escape(message)
    )
}

async fn api(State(db): State<Db>, Path(version): Path<String>, body: String) -> Response {
    if version != "1.1" && version != "1.2" {
        return xml_response(StatusCode::NOT_FOUND, failure("unknown API version"));
    }
    let Some(req) = parse_request(&body) else {
        return xml_response(StatusCode::BAD_REQUEST, failure("request is not well-formed XML"));
    };
    debug!(tag = %req.tag, %version, "api request");

    let reply = if req.tag == "LoginRequest" {
        login(&db, &req).await
    } else {
        let valid = match req.attr("session-id") {
            Some(id) => db.read().await.sessions.contains(id),
            None => false,
        };
        if valid {
            // Only the 1.2 API echoes sync-id.
            let sync = match (version.as_str(), req.attr("sync-id")) {
                ("1.2", Some(sync)) => format!(r#" sync-id="{}""#, xml_escape(sync)),
                _ => String::new(),
            };
            session_request(&db, &req, &sync).await
        } else {
            failure("Invalid session")
        }
    };
    xml_response(StatusCode::OK, reply)
}

async fn login(db: &Db, req: &ApiRequest) -> String {
    if req.attr("user-id") != Some(USERNAME) || req.attr("password") != Some(PASSWORD) {
        return failure("Invalid username or password");
    }
    let session_id = Uuid::new_v4().simple().to_string().to_uppercase();
    db.write().await.sessions.insert(session_id.clone());
    info!(user = USERNAME, "login");
    format!(r#"<LoginResponse success="1" session-id="{session_id}"/>"#)
}

async fn session_request(db: &Db, req: &ApiRequest, sync: &str) -> String {
    match req.tag.as_str() {
        "LogoutRequest" => {
            if let Some(id) = req.attr("session-id") {
                db.write().await.sessions.remove(id);
            }
            info!("logout");
            format!(r#"<LogoutResponse success="1"{sync}/>"#)
        }
        "ReportListingRequest" => format!(
            r#"<ReportListingResponse success="1"{sync}><ReportConfigSummary template-id="audit-report" cfg-id="{REPORT_CONFIG_ID}" name="Weekly audit" status="Generated" generated-on="20240108T101500000" report-URI="{LATEST_REPORT_URI}"/></ReportListingResponse>"#
        ),
        "ReportConfigRequest" => match req.attr("reportcfg-id") {
            Some(REPORT_CONFIG_ID) => format!(
                r#"<ReportConfigResponse success="1"{sync}><ReportConfig id="{REPORT_CONFIG_ID}" name="Weekly audit" template-id="audit-report" format="raw-xml-v2"><Filters><filter type="site" id="1"/></Filters></ReportConfig></ReportConfigResponse>"#
            ),
            _ => failure("Report configuration not found"),
        },
        "ReportTemplateListingRequest" => format!(
            r#"<ReportTemplateListingResponse success="1"{sync}><ReportTemplateSummary id="audit-report" name="Audit Report" scope="silo" type="document"/><ReportTemplateSummary id="executive-overview" name="Executive Overview" scope="silo" type="document"/></ReportTemplateListingResponse>"#
        ),
        "ReportHistoryRequest" => match req.attr("reportcfg-id") {
            Some(REPORT_CONFIG_ID) => format!(
                r#"<ReportHistoryResponse success="1"{sync}><ReportSummary id="2" cfg-id="{REPORT_CONFIG_ID}" status="Generated" generated-on="20240108T101500000" report-URI="{LATEST_REPORT_URI}"/><ReportSummary id="1" cfg-id="{REPORT_CONFIG_ID}" status="Failed" generated-on="20240101T101500000" report-URI="/reports/00000010/00000001/report.xml"/></ReportHistoryResponse>"#
            ),
            _ => failure("Report configuration not found"),
        },
        "VulnerabilityListingRequest" => format!(
            r#"<VulnerabilityListingResponse success="1"{sync}><VulnerabilitySummary id="{VULN_ID}" title="Weak TLS cipher suites" severity="4"/><VulnerabilitySummary id="vuln-2" title="Default credentials" severity="9"/></VulnerabilityListingResponse>"#
        ),
        "VulnerabilityDetailsRequest" => match req.attr("vuln-id") {
            Some(VULN_ID) => format!(
                r#"<VulnerabilityDetailsResponse success="1"{sync}><Vulnerability id="{VULN_ID}" title="Weak TLS cipher suites" severity="4"><description>Foo</description><references><reference source="CVE">CVE-2020-0001</reference><reference source="BID">1234</reference><reference source="CVE">CVE-2020-0002</reference></references><solution>Disable weak ciphers.</solution></Vulnerability></VulnerabilityDetailsResponse>"#
            ),
            _ => failure("Vulnerability not found"),
        },
        "VulnerabilityExceptionCreateRequest" => {
            let (Some(vuln_id), Some(reason), Some(scope)) =
                (req.attr("vuln-id"), req.attr("reason"), req.attr("scope"))
            else {
                return failure("vuln-id, reason and scope are required");
            };
            let mut console = db.write().await;
            console.next_exception_id += 1;
            let id = console.next_exception_id;
            console.exceptions.insert(
                id,
                VulnException {
                    vuln_id: vuln_id.to_string(),
                    reason: reason.to_string(),
                    scope: scope.to_string(),
                    device_id: req.attr("device-id").map(str::to_string),
                    comment: req.children.get("comment").cloned(),
                    approved: false,
                },
            );
            format!(r#"<VulnerabilityExceptionCreateResponse success="1" exception-id="{id}"{sync}/>"#)
        }
        "VulnerabilityExceptionApproveRequest" => {
            let id = req.attr("exception-id").and_then(|id| id.parse::<u64>().ok());
            let mut console = db.write().await;
            match id.and_then(|id| console.exceptions.get_mut(&id)) {
                Some(exception) => {
                    exception.approved = true;
                    if let Some(comment) = req.children.get("comment") {
                        exception.comment = Some(comment.clone());
                    }
                    format!(r#"<VulnerabilityExceptionApproveResponse success="1"{sync}/>"#)
                }
                None => failure("Vulnerability exception not found"),
            }
        }
        other => failure(&format!("Unsupported request {other}")),
    }
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

async fn report_document(State(db): State<Db>, Path(path): Path<String>, headers: HeaderMap) -> Response {
    let authorized = match session_cookie(&headers) {
        Some(id) => db.read().await.sessions.contains(&id),
        None => false,
    };
    if !authorized {
        return xml_response(StatusCode::UNAUTHORIZED, failure("Invalid session"));
    }
    if format!("/reports/{path}") != LATEST_REPORT_URI {
        return xml_response(StatusCode::NOT_FOUND, failure("Report not found"));
    }
    xml_response(
        StatusCode::OK,
        format!(
            r#"<NexposeReport version="2.0"><nodes><node address="10.0.0.5" status="alive"><tests><test id="{VULN_ID}" status="vulnerable-exploited"/></tests></node></nodes></NexposeReport>"#
        ),
    )
}
