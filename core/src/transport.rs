//! Blocking HTTP execution.
//!
//! # Design
//! `Transport` is the single I/O seam: it turns an `HttpRequest` into an
//! `HttpResponse`. `UreqTransport` is the real implementation; any closure
//! with the right signature is a transport too, which is how unit tests stub
//! the console. Non-2xx statuses are returned as data because the console
//! answers failures with a `<Failure>` document the session protocol reports.

use tracing::trace;
use ureq::tls::TlsConfig;
use ureq::Agent;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP round-trip. No retries.
pub trait Transport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<F> Transport for F
where
    F: Fn(HttpRequest) -> Result<HttpResponse, ApiError>,
{
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self(request)
    }
}

/// `Transport` backed by a ureq agent.
///
/// With `verify_certificates == false` the agent accepts any server
/// certificate. That is the console's usual deployment (self-signed) and the
/// reason the flag is explicit per agent rather than global.
///
/// Response bodies are read without a size cap; rendered reports routinely
/// exceed ureq's 10 MiB default.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
    verify_certificates: bool,
}

impl UreqTransport {
    pub fn new(verify_certificates: bool) -> Self {
        let tls = TlsConfig::builder()
            .disable_verification(!verify_certificates)
            .build();
        let agent = Agent::config_builder()
            .tls_config(tls)
            .http_status_as_error(false)
            .build()
            .new_agent();
        UreqTransport {
            agent,
            verify_certificates,
        }
    }

    pub fn verifies_certificates(&self) -> bool {
        self.verify_certificates
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;
        trace!(?method, %url, "executing request");

        let result = match method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&url);
                for (name, value) in &headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Post => {
                let mut builder = self.agent.post(&url);
                for (name, value) in &headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                let body = body.unwrap_or_default();
                builder.send(body.as_bytes())
            }
        };
        let mut response = result.map_err(ApiError::transport)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(ApiError::transport)?;

        trace!(status, bytes = body.len(), "response received");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;

    use super::*;

    #[test]
    fn closures_are_transports() {
        let transport = |req: HttpRequest| -> Result<HttpResponse, ApiError> {
            assert_eq!(req.method, HttpMethod::Post);
            Ok(HttpResponse::ok(req.body.unwrap_or_default()))
        };
        let resp = transport
            .execute(HttpRequest::xml_post("http://x/api/1.2/xml".to_string(), "<A/>".to_string()))
            .unwrap();
        assert_eq!(resp.body, b"<A/>");
    }

    #[test]
    fn connection_refused_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = UreqTransport::new(false)
            .execute(HttpRequest::get_with_cookies(format!("http://{addr}/"), &[]))
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[test]
    fn certificate_verification_is_per_agent() {
        assert!(UreqTransport::new(true).verifies_certificates());
        assert!(!UreqTransport::new(false).verifies_certificates());
    }

    /// Serves one canned HTTP response on a random port.
    fn serve_once(body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            stream.write_all(head.as_bytes()).unwrap();
            stream.write_all(&body).unwrap();
        });
        format!("http://{addr}/reports/report.xml")
    }

    #[test]
    fn reads_bodies_larger_than_ten_mebibytes() {
        let mut body = b"<NexposeReport>".to_vec();
        body.resize(11 * 1024 * 1024, b'x');
        body.extend_from_slice(b"</NexposeReport>");
        let expected = body.len();

        let url = serve_once(body);
        let resp = UreqTransport::new(true)
            .execute(HttpRequest::get_with_cookies(url, &[("nexposeCCSessionID", "abc123")]))
            .unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body.len(), expected);
        assert!(resp.body.starts_with(b"<NexposeReport>"));
    }
}
