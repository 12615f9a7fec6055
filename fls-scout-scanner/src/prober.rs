use crate::error::Result;
use crate::result::{ProbeOutcome, ProbeResult};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Issues a single GET per endpoint and classifies the answer.
#[derive(Debug, Clone)]
pub struct Prober {
    client: Client,
    timeout: Duration,
}

impl Prober {
    pub fn new() -> Result<Self> {
        Self::with_options(DEFAULT_PROBE_TIMEOUT, false)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Self::with_options(timeout, false)
    }

    /// `accept_invalid_certs` lets self-signed servers on 443 count as live;
    /// off by default, so a TLS failure is an unreachable server.
    pub fn with_options(timeout: Duration, accept_invalid_certs: bool) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("fls-scout/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe one endpoint. Never fails: every error becomes an
    /// [`ProbeOutcome::Unreachable`] result.
    pub async fn probe(&self, index: usize, url: &str) -> ProbeResult {
        let url = normalize_url(url);
        debug!("Probing {}", url);

        let start = Instant::now();
        match self.client.get(&url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let elapsed = start.elapsed();
                debug!("{} answered {} in {:?}", url, status, elapsed);
                ProbeResult::new(index, url, ProbeOutcome::from_status(status), elapsed)
            }
            Err(e) => {
                let reason = describe_error(&e);
                debug!("{} unreachable: {} ({})", url, reason, e);
                ProbeResult::unreachable(index, url, reason)
            }
        }
    }
}

/// Make sure `url` carries a scheme, defaulting to plain HTTP.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

fn describe_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "timed out".to_string()
    } else if e.is_connect() {
        "connection failed".to_string()
    } else if e.is_builder() {
        "invalid URL".to_string()
    } else if e.is_redirect() {
        "redirect loop".to_string()
    } else {
        "request failed".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    #[test]
    fn test_normalize_url_adds_http() {
        assert_eq!(normalize_url("1.2.3.4:8080"), "http://1.2.3.4:8080");
        assert_eq!(normalize_url("localhost:8080"), "http://localhost:8080");
        assert_eq!(normalize_url("https://1.2.3.4"), "https://1.2.3.4");
        assert_eq!(normalize_url("  http://x.test  "), "http://x.test");
    }

    #[tokio::test]
    async fn test_200_is_live() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let prober = Prober::new().unwrap();
        let result = prober.probe(0, &mock_server.uri()).await;

        assert!(result.is_live());
        assert_eq!(result.outcome, ProbeOutcome::Live { status: 200 });
        assert_eq!(result.index, 0);
    }

    #[tokio::test]
    async fn test_non_200_is_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let prober = Prober::new().unwrap();
        let result = prober.probe(4, &mock_server.uri()).await;

        assert!(!result.is_live());
        assert_eq!(result.outcome, ProbeOutcome::Rejected { status: 403 });
        assert_eq!(result.index, 4);
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&mock_server)
            .await;

        let prober = Prober::with_timeout(Duration::from_millis(200)).unwrap();
        let result = prober.probe(1, &mock_server.uri()).await;

        assert_eq!(
            result.outcome,
            ProbeOutcome::Unreachable {
                reason: "timed out".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_ipv6_candidate_is_probed_live() {
        // Hosts without IPv6 loopback have nothing to test against.
        let Ok(listener) = std::net::TcpListener::bind("[::1]:0") else {
            return;
        };
        let port = listener.local_addr().unwrap().port();
        let mock_server = MockServer::builder().listener(listener).start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let url = crate::discovery::Candidate::new("::1", port).url();
        let result = Prober::new().unwrap().probe(0, &url).await;

        assert_eq!(result.url, format!("http://[::1]:{}", port));
        assert_eq!(result.outcome, ProbeOutcome::Live { status: 200 });
    }

    #[tokio::test]
    async fn test_refused_connection_is_unreachable() {
        // Grab a free port, then release it so nothing is listening there.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let prober = Prober::with_timeout(Duration::from_secs(2)).unwrap();
        let result = prober.probe(0, &format!("127.0.0.1:{}", port)).await;

        assert!(!result.is_live());
        assert_eq!(result.url, format!("http://127.0.0.1:{}", port));
        assert!(matches!(result.outcome, ProbeOutcome::Unreachable { .. }));
    }
}
