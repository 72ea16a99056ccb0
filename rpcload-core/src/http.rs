use bytes::Bytes;
use http_body_util::{BodyExt as _, Empty};
use hyper::Request;
use hyper::body::Incoming;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use std::borrow::Cow;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse failure classification used for stats labels (`http_error:<kind>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum HttpTransportErrorKind {
    InvalidUrl,
    OnlyHttpSupported,
    RequestBuild,
    Request,
    Timeout,
    BodyRead,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("only http:// URLs are supported: {0}")]
    OnlyHttpSupported(String),

    #[error("http request build failed: {0}")]
    RequestBuild(#[from] http::Error),

    #[error("http request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("http request timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to read response body: {0}")]
    BodyRead(#[from] hyper::Error),
}

impl Error {
    #[must_use]
    pub fn transport_error_kind(&self) -> HttpTransportErrorKind {
        match self {
            Self::InvalidUrl(_) => HttpTransportErrorKind::InvalidUrl,
            Self::OnlyHttpSupported(_) => HttpTransportErrorKind::OnlyHttpSupported,
            Self::RequestBuild(_) => HttpTransportErrorKind::RequestBuild,
            Self::Request(_) => HttpTransportErrorKind::Request,
            Self::Timeout(_) => HttpTransportErrorKind::Timeout,
            Self::BodyRead(_) => HttpTransportErrorKind::BodyRead,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
    /// Estimated bytes sent on the wire (HTTP/1.1 request line + headers).
    pub bytes_sent: u64,
    /// Estimated bytes received on the wire (HTTP/1.1 status line + headers + body).
    pub bytes_received: u64,
}

impl HttpResponse {
    pub fn body_utf8(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// Pooled HTTP/1.1 client shared by all virtual users of a run.
///
/// The scenarios only ever issue plain GET requests with no headers, body,
/// or response assertions, so the client surface is exactly that.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client<HttpConnector, Empty<Bytes>>,
}

impl Default for HttpClient {
    fn default() -> Self {
        let connector = HttpConnector::new();
        let inner = Client::builder(TokioExecutor::new()).build(connector);

        Self { inner }
    }
}

impl HttpClient {
    pub async fn get(&self, url: &str, timeout: Option<Duration>) -> Result<HttpResponse> {
        let parsed = url::Url::parse(url).map_err(|_| Error::InvalidUrl(url.to_string()))?;
        if parsed.scheme() != "http" {
            return Err(Error::OnlyHttpSupported(url.to_string()));
        }

        let uri: hyper::Uri = url.parse().map_err(|_| Error::InvalidUrl(url.to_string()))?;
        let bytes_sent = estimate_http1_get_bytes(&uri, &parsed);

        let mut builder = Request::builder().method(http::Method::GET).uri(uri);

        // hyper adds Host implicitly; we make it explicit so the byte
        // accounting above matches what actually goes on the wire.
        if let Some(host) = host_header_value(&parsed) {
            builder = builder.header(http::header::HOST, host);
        }

        let req: Request<Empty<Bytes>> = builder.body(Empty::new())?;

        let res: hyper::Response<Incoming> = if let Some(timeout) = timeout {
            match tokio::time::timeout(timeout, self.inner.request(req)).await {
                Ok(res) => res?,
                Err(_) => return Err(Error::Timeout(timeout)),
            }
        } else {
            self.inner.request(req).await?
        };

        let (parts, body) = res.into_parts();
        let status = parts.status.as_u16();
        let head_bytes =
            estimate_http1_response_head_bytes(parts.version, parts.status, &parts.headers);
        let body = body.collect().await?.to_bytes();
        let bytes_received = head_bytes.saturating_add(body.len() as u64);

        Ok(HttpResponse {
            status,
            body,
            bytes_sent,
            bytes_received,
        })
    }
}

/// Estimate bytes sent for a header-less HTTP/1.1 GET: request line + Host + CRLF.
fn estimate_http1_get_bytes(uri: &hyper::Uri, parsed: &url::Url) -> u64 {
    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");

    // "GET SP path SP HTTP/1.1 CRLF"
    let mut bytes = ("GET".len() as u64)
        .saturating_add(1)
        .saturating_add(path.len() as u64)
        .saturating_add(1)
        .saturating_add("HTTP/1.1".len() as u64)
        .saturating_add(2);

    if let Some(host) = host_header_value(parsed) {
        bytes = bytes.saturating_add(estimate_http1_header_bytes(b"host", host.as_bytes()));
    }

    // End of headers.
    bytes.saturating_add(2)
}

fn estimate_http1_response_head_bytes(
    version: http::Version,
    status: http::StatusCode,
    headers: &http::HeaderMap,
) -> u64 {
    let mut bytes = 0u64;
    bytes = bytes.saturating_add(estimate_http1_status_line_bytes(version, status));
    for (name, value) in headers.iter() {
        bytes = bytes.saturating_add(estimate_http1_header_bytes(
            name.as_str().as_bytes(),
            value.as_bytes(),
        ));
    }
    bytes.saturating_add(2)
}

fn estimate_http1_status_line_bytes(version: http::Version, status: http::StatusCode) -> u64 {
    let version_str: Cow<'static, str> = match version {
        http::Version::HTTP_10 => Cow::Borrowed("HTTP/1.0"),
        http::Version::HTTP_11 => Cow::Borrowed("HTTP/1.1"),
        _ => Cow::Borrowed("HTTP/1.1"),
    };

    // "HTTP/1.1 SP 200 CRLF" (reason-phrase intentionally ignored)
    (version_str.len() as u64)
        .saturating_add(1)
        .saturating_add(status.as_str().len() as u64)
        .saturating_add(2)
}

fn estimate_http1_header_bytes(name: &[u8], value: &[u8]) -> u64 {
    // "name: value\r\n"
    (name.len() as u64)
        .saturating_add(2)
        .saturating_add(value.len() as u64)
        .saturating_add(2)
}

fn host_header_value(parsed: &url::Url) -> Option<String> {
    let host = parsed.host_str()?;
    match parsed.port() {
        Some(port) if port != 80 => Some(format!("{host}:{port}")),
        _ => Some(host.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_both(url: &str) -> (url::Url, hyper::Uri) {
        let parsed = match url::Url::parse(url) {
            Ok(v) => v,
            Err(err) => panic!("bad test url {url}: {err}"),
        };
        let uri: hyper::Uri = match url.parse() {
            Ok(v) => v,
            Err(err) => panic!("bad test uri {url}: {err}"),
        };
        (parsed, uri)
    }

    #[test]
    fn get_bytes_estimate_counts_request_line_and_host() {
        let (parsed, uri) = parse_both("http://example.com:8000/blocknumber");

        // "GET /blocknumber HTTP/1.1\r\n" = 27
        // "host: example.com:8000\r\n" = 24
        // final "\r\n" = 2
        assert_eq!(estimate_http1_get_bytes(&uri, &parsed), 27 + 24 + 2);
    }

    #[test]
    fn default_port_is_not_repeated_in_host() {
        let (parsed, _) = parse_both("http://example.com/health");
        assert_eq!(host_header_value(&parsed).as_deref(), Some("example.com"));

        let (parsed, _) = parse_both("http://example.com:8000/health");
        assert_eq!(
            host_header_value(&parsed).as_deref(),
            Some("example.com:8000")
        );
    }

    #[test]
    fn error_kinds_have_stable_labels() {
        assert_eq!(
            Error::Timeout(Duration::from_secs(1))
                .transport_error_kind()
                .to_string(),
            "timeout"
        );
        assert_eq!(
            Error::InvalidUrl("x".to_string())
                .transport_error_kind()
                .to_string(),
            "invalid_url"
        );
    }
}
