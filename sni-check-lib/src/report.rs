//! Output artifacts built from a finished run.
//!
//! Two text artifacts come out of a run: the working-hosts list
//! (`hostname|http+https` lines) and a client configuration block for a
//! VLESS + Reality inbound that uses one of the working hostnames as its
//! server name. Both are pure functions of the result set; writing them to
//! disk is left to the caller.

use crate::probe::url_host;
use crate::types::{ProbeOutcome, Protocol};
use std::fmt::Write;
use uuid::Uuid;

/// Hosts listed in the client configuration preview.
pub const CONFIG_PREVIEW_LIMIT: usize = 50;

/// Port the generated client connects to.
pub const REALITY_PORT: u16 = 443;

/// Counts printed after a run and embedded in the client configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultStats {
    /// Hostnames probed (from the final progress state)
    pub checked: usize,
    /// Hostnames answering on at least one protocol
    pub working: usize,
    /// Hostnames answering over HTTP
    pub http: usize,
    /// Hostnames answering over HTTPS
    pub https: usize,
}

impl ResultStats {
    pub fn from_results(results: &[ProbeOutcome], checked: usize) -> Self {
        Self {
            checked,
            working: results.len(),
            http: count_with(results, Protocol::Http),
            https: count_with(results, Protocol::Https),
        }
    }
}

fn count_with(results: &[ProbeOutcome], protocol: Protocol) -> usize {
    results
        .iter()
        .filter(|r| r.protocols.contains(protocol))
        .count()
}

/// Render outcomes as `hostname|protocols` lines, one per outcome.
pub fn format_working_hosts(results: &[ProbeOutcome]) -> String {
    let mut out = String::new();
    for outcome in results {
        let _ = writeln!(out, "{}|{}", outcome.hostname, outcome.protocols);
    }
    out
}

/// Up to `limit` HTTPS-capable hostnames, in result order.
pub fn best_https_hosts(results: &[ProbeOutcome], limit: usize) -> Vec<&str> {
    results
        .iter()
        .filter(|r| r.protocols.contains(Protocol::Https))
        .take(limit)
        .map(|r| r.hostname.as_str())
        .collect()
}

/// The first HTTPS-capable hostname, else the first working one.
pub fn select_server_name(results: &[ProbeOutcome]) -> Option<&str> {
    results
        .iter()
        .find(|r| r.protocols.contains(Protocol::Https))
        .or_else(|| results.first())
        .map(|r| r.hostname.as_str())
}

/// Generated VLESS + Reality client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub address: String,
    pub server_name: String,
    pub client_id: Uuid,
    /// Eight lowercase hex digits
    pub short_id: String,
    pub stats: ResultStats,
    /// First hosts of the result set in `hostname|protocols` form
    pub preview: String,
}

impl ClientConfig {
    /// Build a configuration with a fresh client id and short id.
    ///
    /// Returns `None` when there is no working hostname to use as the
    /// server name.
    pub fn generate(address: &str, results: &[ProbeOutcome], checked: usize) -> Option<Self> {
        let short_id = hex::encode(rand::random::<[u8; 4]>());
        Self::with_ids(address, results, checked, Uuid::new_v4(), short_id)
    }

    /// Same as [`ClientConfig::generate`] with caller-supplied identifiers.
    pub fn with_ids(
        address: &str,
        results: &[ProbeOutcome],
        checked: usize,
        client_id: Uuid,
        short_id: String,
    ) -> Option<Self> {
        let server_name = select_server_name(results)?.to_string();
        let preview_len = results.len().min(CONFIG_PREVIEW_LIMIT);

        Some(Self {
            address: address.to_string(),
            server_name,
            client_id,
            short_id,
            stats: ResultStats::from_results(results, checked),
            preview: format_working_hosts(&results[..preview_len]),
        })
    }

    /// `vless://` share link for client import. IPv6 addresses are bracketed.
    pub fn share_link(&self) -> String {
        format!(
            "vless://{id}@{addr}:{port}?encryption=none&flow=xtls-rprx-vision&security=reality\
             &sni={sni}&fp=chrome&pbk=YOUR_PUBLIC_KEY&sid={sid}&spx=%2F&type=tcp#Reality-Connection",
            id = self.client_id,
            addr = url_host(&self.address),
            port = REALITY_PORT,
            sni = self.server_name,
            sid = self.short_id,
        )
    }

    /// Full text block written to the configuration file.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "=== WORKING SNI (first {}) ===",
            CONFIG_PREVIEW_LIMIT
        );
        out.push_str(&self.preview);
        out.push('\n');

        out.push_str("=== STATISTICS ===\n");
        let _ = writeln!(out, "Total checked: {}", self.stats.checked);
        let _ = writeln!(out, "Total working: {}", self.stats.working);
        let _ = writeln!(out, "Working over HTTP: {}", self.stats.http);
        let _ = writeln!(out, "Working over HTTPS: {}", self.stats.https);
        out.push('\n');

        out.push_str("=== VLESS + REALITY CONFIGURATION ===\n\n");
        out.push_str("Type: VLESS + Reality\n");
        let _ = writeln!(out, "Address: {}", self.address);
        let _ = writeln!(out, "Port: {}", REALITY_PORT);
        let _ = writeln!(out, "ID: {}", self.client_id);
        out.push_str("Flow: xtls-rprx-vision\n");
        out.push_str("Network: tcp\n");
        out.push_str("Security: reality\n");
        out.push_str("Reality options:\n");
        out.push_str("  - publicKey: (generate in the x-ui panel)\n");
        let _ = writeln!(out, "  - shortId: {}", self.short_id);
        out.push_str("  - spiderX: \"/\"\n");
        let _ = writeln!(out, "  - serverName: {}", self.server_name);
        out.push_str("  - fingerprint: chrome\n");
        out.push('\n');

        out.push_str("=== CLIENT LINK ===\n");
        out.push_str(&self.share_link());
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProtocolSet;

    fn outcome(hostname: &str, http: bool, https: bool) -> ProbeOutcome {
        ProbeOutcome::new(hostname, ProtocolSet { http, https })
    }

    #[test]
    fn test_format_working_hosts() {
        let results = vec![
            outcome("a.com", true, false),
            outcome("b.com", false, true),
            outcome("c.com", true, true),
        ];
        assert_eq!(
            format_working_hosts(&results),
            "a.com|http\nb.com|https\nc.com|http+https\n"
        );
    }

    #[test]
    fn test_stats() {
        let results = vec![
            outcome("a.com", true, false),
            outcome("b.com", false, true),
            outcome("c.com", true, true),
        ];
        let stats = ResultStats::from_results(&results, 10);
        assert_eq!(
            stats,
            ResultStats {
                checked: 10,
                working: 3,
                http: 2,
                https: 2,
            }
        );
    }

    #[test]
    fn test_server_name_prefers_https() {
        let results = vec![outcome("plain.com", true, false), outcome("tls.com", false, true)];
        assert_eq!(select_server_name(&results), Some("tls.com"));
    }

    #[test]
    fn test_server_name_falls_back_to_first() {
        let results = vec![outcome("first.com", true, false), outcome("second.com", true, false)];
        assert_eq!(select_server_name(&results), Some("first.com"));
    }

    #[test]
    fn test_no_working_hosts_means_no_config() {
        assert!(select_server_name(&[]).is_none());
        assert!(ClientConfig::generate("1.2.3.4", &[], 42).is_none());
    }

    #[test]
    fn test_best_https_hosts_limit() {
        let results: Vec<ProbeOutcome> = (0..15)
            .map(|i| outcome(&format!("h{}.com", i), i % 3 == 0, i % 3 != 0))
            .collect();
        let best = best_https_hosts(&results, 5);
        assert_eq!(best, vec!["h1.com", "h2.com", "h4.com", "h5.com", "h7.com"]);
    }

    #[test]
    fn test_generated_ids() {
        let results = vec![outcome("tls.com", false, true)];
        let config = ClientConfig::generate("1.2.3.4", &results, 1).unwrap();
        assert_eq!(config.short_id.len(), 8);
        assert!(config.short_id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(config.client_id.get_version_num(), 4);
    }

    #[test]
    fn test_render_contains_selected_host_and_link() {
        let results = vec![outcome("plain.com", true, false), outcome("tls.com", true, true)];
        let config = ClientConfig::with_ids(
            "203.0.113.9",
            &results,
            2,
            Uuid::nil(),
            "deadbeef".to_string(),
        )
        .unwrap();

        let text = config.render();
        assert!(text.contains("plain.com|http\ntls.com|http+https\n"));
        assert!(text.contains("Total checked: 2"));
        assert!(text.contains("  - serverName: tls.com"));
        assert!(text.contains("  - shortId: deadbeef"));
        assert!(text.contains(
            "vless://00000000-0000-0000-0000-000000000000@203.0.113.9:443?encryption=none"
        ));
        assert!(text.contains("&sni=tls.com&fp=chrome&pbk=YOUR_PUBLIC_KEY&sid=deadbeef&spx=%2F"));
    }

    #[test]
    fn test_preview_is_capped() {
        let results: Vec<ProbeOutcome> = (0..80)
            .map(|i| outcome(&format!("h{}.com", i), true, false))
            .collect();
        let config =
            ClientConfig::with_ids("1.2.3.4", &results, 80, Uuid::nil(), "00000000".into())
                .unwrap();
        assert_eq!(config.preview.lines().count(), CONFIG_PREVIEW_LIMIT);
        assert_eq!(config.stats.working, 80);
    }

    #[test]
    fn test_share_link_brackets_ipv6_address() {
        let results = vec![outcome("tls.com", false, true)];
        let config =
            ClientConfig::with_ids("2001:db8::1", &results, 1, Uuid::nil(), "deadbeef".into())
                .unwrap();

        assert!(config
            .share_link()
            .starts_with("vless://00000000-0000-0000-0000-000000000000@[2001:db8::1]:443?"));

        let text = config.render();
        assert!(text.contains("Address: 2001:db8::1\n"));
        assert!(text.contains("@[2001:db8::1]:443?"));
    }
}
