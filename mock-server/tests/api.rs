use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_state, parse_request, Db, LATEST_REPORT_URI, SESSION_COOKIE};
use tower::ServiceExt;

async fn body_text(response: axum::response::Response) -> String {
    let bytes: bytes::Bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn xml_request(version: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/{version}/xml"))
        .header(http::header::CONTENT_TYPE, "text/xml")
        .body(body.to_string())
        .unwrap()
}

/// Root attribute of a response document, read with the quick-xml parser.
fn attr(body: &str, name: &str) -> Option<String> {
    parse_request(body)?.attributes.remove(name)
}

#[test]
fn attr_ignores_attribute_layout() {
    let body = "<LoginResponse\n  success='1'\tsession-id=\"A&amp;B\"/>";
    assert_eq!(attr(body, "session-id").as_deref(), Some("A&B"));
    assert_eq!(attr(body, "success").as_deref(), Some("1"));
    assert!(attr(body, "sync-id").is_none());
}

async fn login(db: &Db) -> String {
    let resp = app_with_state(db.clone())
        .oneshot(xml_request(
            "1.2",
            r#"<LoginRequest user-id="admin" password="secret"/>"#,
        ))
        .await
        .unwrap();
    let body = body_text(resp).await;
    attr(&body, "session-id").expect("login response carries session-id")
}

// --- login ---

#[tokio::test]
async fn login_issues_session() {
    let db = Db::default();
    let session = login(&db).await;
    assert!(!session.is_empty());
    assert!(db.read().await.sessions.contains(&session));
}

#[tokio::test]
async fn login_with_bad_password_fails() {
    let resp = app()
        .oneshot(xml_request(
            "1.2",
            r#"<LoginRequest user-id="admin" password="nope"/>"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp).await;
    assert!(body.starts_with("<Failure>"));
}

// --- envelope ---

#[tokio::test]
async fn unknown_version_is_404() {
    let resp = app()
        .oneshot(xml_request("2.0", r#"<LoginRequest/>"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_request_is_400() {
    let resp = app().oneshot(xml_request("1.2", "<a><b></a>")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn session_requests_need_valid_session() {
    let resp = app()
        .oneshot(xml_request(
            "1.2",
            r#"<VulnerabilityListingRequest session-id="nope" sync-id="1"/>"#,
        ))
        .await
        .unwrap();
    let body = body_text(resp).await;
    assert!(body.contains("Invalid session"));
}

#[tokio::test]
async fn sync_id_echoed_only_under_1_2() {
    let db = Db::default();
    let session = login(&db).await;

    let resp = app_with_state(db.clone())
        .oneshot(xml_request(
            "1.2",
            &format!(r#"<VulnerabilityListingRequest session-id="{session}" sync-id="77"/>"#),
        ))
        .await
        .unwrap();
    let body = body_text(resp).await;
    assert!(body.starts_with("<VulnerabilityListingResponse"));
    assert_eq!(attr(&body, "sync-id").as_deref(), Some("77"));

    let resp = app_with_state(db)
        .oneshot(xml_request(
            "1.1",
            &format!(r#"<ReportListingRequest session-id="{session}" sync-id="77"/>"#),
        ))
        .await
        .unwrap();
    let body = body_text(resp).await;
    assert!(body.starts_with("<ReportListingResponse"));
    assert!(attr(&body, "sync-id").is_none());
}

#[tokio::test]
async fn logout_ends_session() {
    let db = Db::default();
    let session = login(&db).await;
    let resp = app_with_state(db.clone())
        .oneshot(xml_request(
            "1.2",
            &format!(r#"<LogoutRequest session-id="{session}" sync-id="3"/>"#),
        ))
        .await
        .unwrap();
    let body = body_text(resp).await;
    assert!(body.starts_with("<LogoutResponse"));
    assert!(db.read().await.sessions.is_empty());
}

// --- exceptions ---

#[tokio::test]
async fn exception_create_then_approve() {
    let db = Db::default();
    let session = login(&db).await;

    let resp = app_with_state(db.clone())
        .oneshot(xml_request(
            "1.2",
            &format!(
                r#"<VulnerabilityExceptionCreateRequest session-id="{session}" sync-id="1" vuln-id="vuln-1" reason="False Positive" scope="All Instances"><comment>scanner noise</comment></VulnerabilityExceptionCreateRequest>"#
            ),
        ))
        .await
        .unwrap();
    let body = body_text(resp).await;
    assert_eq!(attr(&body, "exception-id").as_deref(), Some("1"));
    {
        let console = db.read().await;
        let exception = &console.exceptions[&1];
        assert_eq!(exception.comment.as_deref(), Some("scanner noise"));
        assert!(!exception.approved);
    }

    let resp = app_with_state(db.clone())
        .oneshot(xml_request(
            "1.2",
            &format!(r#"<VulnerabilityExceptionApproveRequest session-id="{session}" sync-id="2" exception-id="1"/>"#),
        ))
        .await
        .unwrap();
    let body = body_text(resp).await;
    assert!(body.starts_with("<VulnerabilityExceptionApproveResponse"));
    assert!(db.read().await.exceptions[&1].approved);
}

#[tokio::test]
async fn approve_unknown_exception_fails() {
    let db = Db::default();
    let session = login(&db).await;
    let resp = app_with_state(db)
        .oneshot(xml_request(
            "1.2",
            &format!(r#"<VulnerabilityExceptionApproveRequest session-id="{session}" sync-id="2" exception-id="42"/>"#),
        ))
        .await
        .unwrap();
    assert!(body_text(resp).await.starts_with("<Failure>"));
}

// --- report documents ---

#[tokio::test]
async fn report_download_requires_cookie() {
    let resp = app()
        .oneshot(Request::builder().uri(LATEST_REPORT_URI).body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn report_download_with_session_cookie() {
    let db = Db::default();
    let session = login(&db).await;
    let resp = app_with_state(db)
        .oneshot(
            Request::builder()
                .uri(LATEST_REPORT_URI)
                .header(http::header::COOKIE, format!("{SESSION_COOKIE}={session}"))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.starts_with("<NexposeReport"));
}

#[tokio::test]
async fn unknown_report_is_404() {
    let db = Db::default();
    let session = login(&db).await;
    let resp = app_with_state(db)
        .oneshot(
            Request::builder()
                .uri("/reports/99/report.xml")
                .header(http::header::COOKIE, format!("{SESSION_COOKIE}={session}"))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
