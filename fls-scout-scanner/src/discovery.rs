use crate::error::{Result, ScanError};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::net::Ipv6Addr;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

/// Shodan signature of a JetBrains floating license server: the redirect it
/// answers with on `/`.
pub const FLS_QUERY: &str = "Location: https://account.jetbrains.com/fls-auth";

pub const DEFAULT_SEARCH_URL: &str = "https://api.shodan.io";

const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Port a search record is assumed to be on when Shodan omits it.
const DEFAULT_PORT: u16 = 443;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Http => write!(f, "http"),
            Scheme::Https => write!(f, "https"),
        }
    }
}

/// An endpoint found in the search index, not yet verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    host: String,
    port: u16,
    scheme: Scheme,
}

impl Candidate {
    /// 443 is served over TLS on the default port; anything else is plain
    /// HTTP with the port spelled out.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let scheme = if port == 443 { Scheme::Https } else { Scheme::Http };
        Self {
            host: host.into(),
            port,
            scheme,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn url(&self) -> String {
        let host = self.url_host();
        match self.scheme {
            Scheme::Https => format!("https://{}", host),
            Scheme::Http => format!("http://{}:{}", host, self.port),
        }
    }

    /// IPv6 literals must be bracketed inside a URL authority.
    fn url_host(&self) -> String {
        if self.host.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    matches: Vec<SearchMatch>,
    #[serde(default)]
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SearchMatch {
    ip_str: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct SearchErrorBody {
    error: String,
}

/// Client for the Shodan host search endpoint.
pub struct SearchClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    page: u32,
}

impl SearchClient {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_timeout(api_key, DEFAULT_SEARCH_TIMEOUT)
    }

    pub fn with_timeout(api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("fls-scout/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_SEARCH_URL.to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            page: 1,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Run `query` against the index and return one candidate per match, in
    /// result order.
    #[instrument(skip(self), fields(page = self.page))]
    pub async fn search(&self, query: &str) -> Result<Vec<Candidate>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ScanError::MissingApiKey("SHODAN_API_KEY is not set".to_string()))?;

        let url = self.search_url(api_key, query)?;
        debug!("Querying search index at {}", self.base_url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<SearchErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| body.trim().to_string());
            return Err(ScanError::SearchRejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| ScanError::ParseError(format!("Invalid search response: {}", e)))?;

        info!(
            "Search returned {} matches (total reported: {})",
            parsed.matches.len(),
            parsed.total.map(|t| t.to_string()).unwrap_or_else(|| "?".to_string())
        );

        let returned = parsed.matches.len();
        let candidates = candidates_from_matches(parsed.matches);
        info!(
            "Derived {} candidates ({} matches skipped without an address)",
            candidates.len(),
            returned - candidates.len()
        );
        Ok(candidates)
    }

    fn search_url(&self, api_key: &str, query: &str) -> Result<Url> {
        let mut base = Url::parse(&self.base_url)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut url = base
            .join("shodan/host/search")
            .map_err(|e| ScanError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("key", api_key)
            .append_pair("query", query)
            .append_pair("page", &self.page.to_string());
        Ok(url)
    }
}

fn candidates_from_matches(matches: Vec<SearchMatch>) -> Vec<Candidate> {
    matches
        .into_iter()
        .filter_map(|m| match m.ip_str {
            Some(ip) if !ip.is_empty() => Some(Candidate::new(ip, m.port.unwrap_or(DEFAULT_PORT))),
            _ => {
                debug!("Skipping search match without ip_str");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    #[test]
    fn test_port_443_is_https_without_port() {
        let candidate = Candidate::new("1.2.3.4", 443);
        assert_eq!(candidate.scheme(), Scheme::Https);
        assert_eq!(candidate.url(), "https://1.2.3.4");
    }

    #[test]
    fn test_other_ports_are_http_with_port() {
        for port in [80, 8080, 8443, 1027] {
            let candidate = Candidate::new("5.6.7.8", port);
            assert_eq!(candidate.scheme(), Scheme::Http);
            assert_eq!(candidate.url(), format!("http://5.6.7.8:{}", port));
        }
    }

    #[test]
    fn test_ipv6_hosts_are_bracketed() {
        let tls = Candidate::new("2001:db8::1", 443);
        assert_eq!(tls.url(), "https://[2001:db8::1]");
        assert!(Url::parse(&tls.url()).is_ok());

        let plain = Candidate::new("2001:db8::1", 8080);
        assert_eq!(plain.url(), "http://[2001:db8::1]:8080");
        assert_eq!(
            Url::parse(&plain.url()).unwrap().host_str(),
            Some("[2001:db8::1]")
        );
        assert_eq!(plain.host(), "2001:db8::1");
    }

    #[test]
    fn test_missing_port_defaults_to_443() {
        let candidates = candidates_from_matches(vec![
            SearchMatch {
                ip_str: Some("9.9.9.9".to_string()),
                port: None,
            },
            SearchMatch {
                ip_str: None,
                port: Some(80),
            },
        ]);
        assert_eq!(candidates, vec![Candidate::new("9.9.9.9", 443)]);
    }

    #[test]
    fn test_blank_api_key_counts_as_missing() {
        let client = SearchClient::new(Some("   ".to_string())).unwrap();
        assert!(!client.has_api_key());
    }

    #[tokio::test]
    async fn test_search_without_key_fails_before_any_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = SearchClient::new(None)
            .unwrap()
            .with_base_url(mock_server.uri());
        let err = client.search(FLS_QUERY).await.unwrap_err();
        assert!(matches!(err, ScanError::MissingApiKey(_)));
    }

    #[tokio::test]
    async fn test_search_derives_urls_in_result_order() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/shodan/host/search"))
            .and(query_param("key", "secret"))
            .and(query_param("query", FLS_QUERY))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total": 2,
                "matches": [
                    { "ip_str": "1.2.3.4", "port": 443 },
                    { "ip_str": "5.6.7.8", "port": 8080 }
                ]
            })))
            .mount(&mock_server)
            .await;

        let client = SearchClient::new(Some("secret".to_string()))
            .unwrap()
            .with_base_url(mock_server.uri());
        let urls: Vec<String> = client
            .search(FLS_QUERY)
            .await
            .unwrap()
            .iter()
            .map(Candidate::url)
            .collect();

        assert_eq!(urls, vec!["https://1.2.3.4", "http://5.6.7.8:8080"]);
    }

    #[tokio::test]
    async fn test_search_passes_requested_page() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/shodan/host/search"))
            .and(query_param("page", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "matches": [ { "ip_str": "10.0.0.1", "port": 80 } ]
            })))
            .mount(&mock_server)
            .await;

        let client = SearchClient::new(Some("secret".to_string()))
            .unwrap()
            .with_base_url(mock_server.uri())
            .with_page(3);
        let candidates = client.search(FLS_QUERY).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].url(), "http://10.0.0.1:80");
    }

    #[tokio::test]
    async fn test_search_surfaces_api_error_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/shodan/host/search"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({ "error": "Invalid API key" })),
            )
            .mount(&mock_server)
            .await;

        let client = SearchClient::new(Some("bad".to_string()))
            .unwrap()
            .with_base_url(mock_server.uri());
        match client.search(FLS_QUERY).await {
            Err(ScanError::SearchRejected { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid API key");
            }
            other => panic!("expected SearchRejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_rejects_malformed_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/shodan/host/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let client = SearchClient::new(Some("secret".to_string()))
            .unwrap()
            .with_base_url(mock_server.uri());
        let err = client.search(FLS_QUERY).await.unwrap_err();
        assert!(matches!(err, ScanError::ParseError(_)));
    }
}
