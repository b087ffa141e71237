//! HTTP transport types.
//!
//! # Design
//! Requests and responses are plain data. The session protocol builds an
//! `HttpRequest`, hands it to a `Transport`, and validates the returned
//! `HttpResponse`; nothing above the transport touches sockets. This keeps
//! the envelope logic deterministic and lets tests swap in a closure.

/// Header name/value pairs, in send order.
pub type Headers = Vec<(String, String)>;

/// HTTP method for a request. The console API only needs these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body: Option<String>,
}

impl HttpRequest {
    /// POST of an XML document to the API endpoint.
    pub fn xml_post(url: String, body: String) -> Self {
        HttpRequest {
            method: HttpMethod::Post,
            url,
            headers: vec![
                ("Content-Type".to_string(), "text/xml".to_string()),
                ("Accept".to_string(), "*/*".to_string()),
                ("Cache-Control".to_string(), "no-cache".to_string()),
            ],
            body: Some(body),
        }
    }

    /// Plain GET carrying the given cookies in a single `Cookie` header.
    pub fn get_with_cookies(url: String, cookies: &[(&str, &str)]) -> Self {
        let mut headers = Vec::new();
        if !cookies.is_empty() {
            let cookie = cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            headers.push(("Cookie".to_string(), cookie));
        }
        HttpRequest {
            method: HttpMethod::Get,
            url,
            headers,
            body: None,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
///
/// The body stays raw bytes; the caller decides how to parse it.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// 200 response with the given body, mostly for stub transports.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xml_post_sets_console_headers() {
        let req = HttpRequest::xml_post("https://h:1/api/1.2/xml".to_string(), "<A/>".to_string());
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.header("content-type"), Some("text/xml"));
        assert_eq!(req.header("Accept"), Some("*/*"));
        assert_eq!(req.header("Cache-Control"), Some("no-cache"));
        assert_eq!(req.body.as_deref(), Some("<A/>"));
    }

    #[test]
    fn get_joins_cookies() {
        let req = HttpRequest::get_with_cookies(
            "https://h:1/doc".to_string(),
            &[("nexposeCCSessionID", "abc"), ("x", "y")],
        );
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.header("Cookie"), Some("nexposeCCSessionID=abc; x=y"));
        assert!(req.body.is_none());
    }

    #[test]
    fn get_without_cookies_has_no_headers() {
        let req = HttpRequest::get_with_cookies("https://h:1/doc".to_string(), &[]);
        assert!(req.headers.is_empty());
    }
}
