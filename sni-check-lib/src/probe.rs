//! HTTP/HTTPS probe for a single hostname.
//!
//! A probe sends one plain HTTP request and one HTTPS request to the fixed
//! server address with the Host header forced to the candidate hostname.
//! Certificates are not validated and redirects are not followed, so the
//! status the server returns for that Host is exactly what gets judged.
//!
//! Requests are HTTP/1.1 only. Over HTTP/2 the `:authority` pseudo-header
//! would carry the server address while `host` carried the hostname, and
//! servers disagree on which of the two they route by.
//!
//! Transport failures never leave this module. A refused connection, a
//! timeout, a TLS failure, or an unaccepted status all mean the same thing
//! for that protocol: absent from the outcome.

use crate::error::SniCheckError;
use crate::types::{CheckConfig, Protocol, ProtocolSet, ACCEPTED_STATUSES};
use async_trait::async_trait;
use reqwest::header::HOST;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Sends one request and reports the response status.
///
/// This is the seam between the probe policy and the network, so tests can
/// drive the pool with a scripted transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Request `protocol://address:port/` with `Host: hostname`.
    async fn status(
        &self,
        protocol: Protocol,
        address: &str,
        port: u16,
        hostname: &str,
    ) -> Result<u16, SniCheckError>;
}

/// `reqwest`-backed transport shared by all workers of a run.
#[derive(Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Build a client with the probe policy: HTTP/1.1 only, no certificate
    /// validation, no redirects and no proxies. Requests share one timeout
    /// and the idle pool is capped at `max_connections`.
    pub fn new(timeout: Duration, max_connections: usize) -> Result<Self, SniCheckError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .danger_accept_invalid_certs(true)
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .http1_only()
            .pool_max_idle_per_host(max_connections)
            .build()
            .map_err(|e| {
                SniCheckError::internal(format!("Failed to create probe HTTP client: {}", e))
            })?;

        Ok(Self { http_client })
    }

    /// Build a client from a run configuration.
    pub fn from_config(config: &CheckConfig) -> Result<Self, SniCheckError> {
        Self::new(config.timeout, config.concurrency)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn status(
        &self,
        protocol: Protocol,
        address: &str,
        port: u16,
        hostname: &str,
    ) -> Result<u16, SniCheckError> {
        let url = build_url(protocol, address, port);
        let response = self
            .http_client
            .get(&url)
            .header(HOST, hostname)
            .send()
            .await
            .map_err(|e| SniCheckError::from(e).for_hostname(hostname))?;

        Ok(response.status().as_u16())
    }
}

/// Probes hostnames against one server address.
///
/// Cheap to clone; every worker holds its own copy sharing one transport.
#[derive(Clone)]
pub struct Prober {
    address: String,
    config: CheckConfig,
    transport: Arc<dyn Transport>,
}

impl Prober {
    pub fn new<A: Into<String>>(
        address: A,
        config: &CheckConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            address: address.into(),
            config: config.clone(),
            transport,
        }
    }

    /// The server address every probe targets.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Probe one hostname over HTTP, then HTTPS.
    ///
    /// Returns the protocols that produced an accepted status. Never fails:
    /// a failure on one protocol does not stop the other from being tried.
    pub async fn probe(&self, hostname: &str) -> ProtocolSet {
        let mut protocols = ProtocolSet::empty();

        for protocol in [Protocol::Http, Protocol::Https] {
            if self.check_protocol(protocol, hostname).await {
                protocols.insert(protocol);
            }
        }

        protocols
    }

    async fn check_protocol(&self, protocol: Protocol, hostname: &str) -> bool {
        let port = self.config.port_for(protocol);

        match self
            .transport
            .status(protocol, &self.address, port, hostname)
            .await
        {
            Ok(status) => {
                let accepted = is_accepted_status(status);
                debug!(hostname, %protocol, status, accepted, "probe response");
                accepted
            }
            Err(e) => {
                debug!(hostname, %protocol, error = %e, "probe failed");
                false
            }
        }
    }
}

/// Whether a response status means the server routes for the hostname.
pub fn is_accepted_status(status: u16) -> bool {
    ACCEPTED_STATUSES.contains(&status)
}

/// Address as it appears in a URL authority: bare IPv6 literals bracketed.
pub(crate) fn url_host(address: &str) -> String {
    if address.contains(':') && !address.starts_with('[') {
        format!("[{}]", address)
    } else {
        address.to_string()
    }
}

/// Build the request URL for the server address.
///
/// Default ports are left implicit.
pub fn build_url(protocol: Protocol, address: &str, port: u16) -> String {
    let host = url_host(address);

    let default_port = match protocol {
        Protocol::Http => 80,
        Protocol::Https => 443,
    };

    if port == default_port {
        format!("{}://{}/", protocol.scheme(), host)
    } else {
        format!("{}://{}:{}/", protocol.scheme(), host, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Scripted transport: (hostname, protocol) -> status or error.
    struct ScriptedTransport {
        responses: HashMap<(String, Protocol), Option<u16>>,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn status(
            &self,
            protocol: Protocol,
            _address: &str,
            _port: u16,
            hostname: &str,
        ) -> Result<u16, SniCheckError> {
            match self.responses.get(&(hostname.to_string(), protocol)) {
                Some(Some(status)) => Ok(*status),
                _ => Err(SniCheckError::transport(
                    protocol.scheme(),
                    hostname,
                    "connection refused",
                )),
            }
        }
    }

    fn prober(responses: &[(&str, Protocol, Option<u16>)]) -> Prober {
        let responses = responses
            .iter()
            .map(|(h, p, s)| ((h.to_string(), *p), *s))
            .collect();
        Prober::new(
            "203.0.113.7",
            &CheckConfig::default(),
            Arc::new(ScriptedTransport { responses }),
        )
    }

    #[test]
    fn test_accepted_statuses() {
        for status in [200, 301, 302, 404] {
            assert!(is_accepted_status(status), "{} should be accepted", status);
        }
        for status in [201, 204, 303, 307, 400, 403, 500, 503] {
            assert!(!is_accepted_status(status), "{} should be rejected", status);
        }
    }

    #[test]
    fn test_build_url() {
        assert_eq!(build_url(Protocol::Http, "1.2.3.4", 80), "http://1.2.3.4/");
        assert_eq!(build_url(Protocol::Https, "1.2.3.4", 443), "https://1.2.3.4/");
        assert_eq!(
            build_url(Protocol::Http, "127.0.0.1", 8080),
            "http://127.0.0.1:8080/"
        );
        assert_eq!(build_url(Protocol::Https, "::1", 443), "https://[::1]/");
        assert_eq!(build_url(Protocol::Http, "[::1]", 81), "http://[::1]:81/");
    }

    #[tokio::test]
    async fn test_http_only_when_https_refused() {
        let prober = prober(&[("x.com", Protocol::Http, Some(200))]);
        let protocols = prober.probe("x.com").await;
        assert!(protocols.http);
        assert!(!protocols.https);
    }

    #[tokio::test]
    async fn test_both_protocols() {
        let prober = prober(&[
            ("both.com", Protocol::Http, Some(301)),
            ("both.com", Protocol::Https, Some(404)),
        ]);
        assert_eq!(prober.probe("both.com").await.to_string(), "http+https");
    }

    #[tokio::test]
    async fn test_http_failure_does_not_skip_https() {
        let prober = prober(&[("tls.com", Protocol::Https, Some(302))]);
        let protocols = prober.probe("tls.com").await;
        assert!(!protocols.http);
        assert!(protocols.https);
    }

    #[tokio::test]
    async fn test_unaccepted_status_is_not_working() {
        let prober = prober(&[
            ("err.com", Protocol::Http, Some(503)),
            ("err.com", Protocol::Https, Some(403)),
        ]);
        assert!(prober.probe("err.com").await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_is_empty() {
        let prober = prober(&[]);
        assert!(prober.probe("nothing.com").await.is_empty());
    }

    #[tokio::test]
    async fn test_probe_is_repeatable() {
        let prober = prober(&[("x.com", Protocol::Http, Some(200))]);
        let first = prober.probe("x.com").await;
        let second = prober.probe("x.com").await;
        assert_eq!(first, second);
    }
}
