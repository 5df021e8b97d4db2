//! Page fetcher used by all scrapers.
//!
//! Fetches one HTML page at a time with a browser-like client and refuses
//! private network targets. Bodies are read chunk by chunk and abandoned
//! once they pass the size cap, whether or not a Content-Length was sent.

use std::net::IpAddr;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use tracing::{debug, instrument, warn};
use url::Url;

use leadenrich_shared::{LeadEnrichError, Result};

/// Browser User-Agent; many company sites block obvious bots.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Maximum body size we accept (5 MB).
const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

// ---------------------------------------------------------------------------
// FetchedPage
// ---------------------------------------------------------------------------

/// A successfully fetched HTML page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects.
    pub url: Url,
    /// Raw HTML body.
    pub html: String,
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// HTTP client for scraping public web pages.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    /// Allow localhost/private IPs (for integration tests with mock servers).
    allow_localhost: bool,
    max_body_bytes: usize,
}

impl Fetcher {
    /// Create a fetcher with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("de-DE,de;q=0.9,en;q=0.8"));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()
            .map_err(|e| LeadEnrichError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            allow_localhost: false,
            max_body_bytes: MAX_BODY_BYTES,
        })
    }

    /// Override the body size cap.
    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Allow fetching localhost/private IPs (for integration tests).
    #[must_use]
    pub fn allow_localhost(mut self) -> Self {
        self.allow_localhost = true;
        self
    }

    /// Fetch one page.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let parsed = Url::parse(url)
            .map_err(|e| LeadEnrichError::validation(format!("invalid URL '{url}': {e}")))?;

        if !self.allow_localhost && is_ssrf_target(&parsed) {
            warn!(%url, "SSRF protection: blocked");
            return Err(LeadEnrichError::validation(format!(
                "refusing to fetch private address {url}"
            )));
        }

        let mut response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| LeadEnrichError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LeadEnrichError::Network(format!("{url}: HTTP {status}")));
        }

        let limit = self.max_body_bytes;
        if let Some(len) = response.content_length() {
            if len > limit as u64 {
                return Err(LeadEnrichError::Network(format!(
                    "{url}: body too large ({len} bytes)"
                )));
            }
        }

        let final_url = response.url().clone();
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| LeadEnrichError::Network(format!("{url}: body read failed: {e}")))?
        {
            if body.len() + chunk.len() > limit {
                return Err(LeadEnrichError::Network(format!(
                    "{url}: body exceeds {limit} bytes"
                )));
            }
            body.extend_from_slice(&chunk);
        }
        let html = decode_body(body);

        debug!(bytes = html.len(), "page fetched");
        Ok(FetchedPage {
            url: final_url,
            html,
        })
    }

    /// Fetch the first URL in `urls` that answers successfully.
    pub async fn fetch_first(&self, urls: &[String]) -> Option<FetchedPage> {
        for url in urls {
            match self.fetch(url).await {
                Ok(page) => return Some(page),
                Err(e) => debug!(%url, error = %e, "candidate page unavailable"),
            }
        }
        None
    }
}

/// UTF-8 when valid, otherwise Latin-1, which older German sites still serve.
fn decode_body(body: Vec<u8>) -> String {
    String::from_utf8(body)
        .unwrap_or_else(|e| e.into_bytes().into_iter().map(char::from).collect())
}

/// Base URLs to try for a company domain.
///
/// A value that already carries a scheme is used as-is; otherwise the
/// `www.` and bare host variants are returned, `www.` first.
pub fn site_roots(domain: &str) -> Vec<String> {
    let trimmed = domain.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return vec![trimmed.to_string()];
    }
    let bare = trimmed.strip_prefix("www.").unwrap_or(trimmed);
    vec![format!("https://www.{bare}"), format!("https://{bare}")]
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
pub(crate) fn is_ssrf_target(url: &Url) -> bool {
    // Block non-HTTP schemes
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
                // 192.0.0.0/24
                || (v4.octets()[0] == 192 && v4.octets()[1] == 0 && v4.octets()[2] == 0)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_ssrf_protection_blocks_file() {
        let url = Url::parse("file:///etc/passwd").unwrap();
        assert!(is_ssrf_target(&url));
    }

    #[test]
    fn test_ssrf_protection_blocks_private_ip() {
        let url = Url::parse("http://192.168.1.1/admin").unwrap();
        assert!(is_ssrf_target(&url));
        let url = Url::parse("http://10.0.0.1/").unwrap();
        assert!(is_ssrf_target(&url));
        let url = Url::parse("http://[::1]/").unwrap();
        assert!(is_ssrf_target(&url));
    }

    #[test]
    fn test_ssrf_blocks_localhost() {
        let url = Url::parse("http://localhost:8080/").unwrap();
        assert!(is_ssrf_target(&url));
    }

    #[test]
    fn test_ssrf_protection_allows_public() {
        let url = Url::parse("https://www.firma.de/impressum").unwrap();
        assert!(!is_ssrf_target(&url));
    }

    #[test]
    fn test_site_roots() {
        assert_eq!(
            site_roots("firma.de"),
            vec!["https://www.firma.de".to_string(), "https://firma.de".to_string()]
        );
        assert_eq!(site_roots("www.firma.de")[1], "https://firma.de");
        assert_eq!(site_roots("http://127.0.0.1:1234/"), vec!["http://127.0.0.1:1234".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_blocks_localhost_by_default() {
        let fetcher = Fetcher::new(Duration::from_secs(5)).unwrap();
        let err = fetcher.fetch("http://127.0.0.1:9/").await.unwrap_err();
        assert!(err.to_string().contains("private address"));
    }

    #[test]
    fn test_decode_body_falls_back_to_latin1() {
        assert_eq!(decode_body("Straße".as_bytes().to_vec()), "Straße");
        assert_eq!(decode_body(b"Stra\xdfe".to_vec()), "Straße");
    }

    /// Serve one chunked response without a Content-Length header.
    async fn chunked_server(chunks: usize, chunk_size: usize) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await;
            let head = "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\n\
                        transfer-encoding: chunked\r\nconnection: close\r\n\r\n";
            socket.write_all(head.as_bytes()).await.unwrap();
            let payload = "a".repeat(chunk_size);
            for _ in 0..chunks {
                let frame = format!("{chunk_size:x}\r\n{payload}\r\n");
                if socket.write_all(frame.as_bytes()).await.is_err() {
                    return;
                }
            }
            let _ = socket.write_all(b"0\r\n\r\n").await;
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn test_chunked_body_is_capped() {
        let url = chunked_server(8, 1024).await;
        let fetcher = Fetcher::new(Duration::from_secs(5))
            .unwrap()
            .allow_localhost()
            .max_body_bytes(4096);
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(err.to_string().contains("body exceeds 4096 bytes"), "{err}");
    }

    #[tokio::test]
    async fn test_chunked_body_under_cap_is_read() {
        let url = chunked_server(2, 1024).await;
        let fetcher = Fetcher::new(Duration::from_secs(5))
            .unwrap()
            .allow_localhost()
            .max_body_bytes(4096);
        let page = fetcher.fetch(&url).await.unwrap();
        assert_eq!(page.html.len(), 2048);
    }

    #[tokio::test]
    async fn test_fetch_first_skips_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/impressum"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/kontakt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>Kontakt</p>"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(Duration::from_secs(5)).unwrap().allow_localhost();
        let urls = vec![
            format!("{}/impressum", server.uri()),
            format!("{}/kontakt", server.uri()),
        ];
        let page = fetcher.fetch_first(&urls).await.unwrap();
        assert!(page.url.path().ends_with("/kontakt"));
        assert!(page.html.contains("Kontakt"));
    }
}
