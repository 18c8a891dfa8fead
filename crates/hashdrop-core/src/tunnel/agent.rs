//! Client for the local tunnel agent's introspection API.
//!
//! The agent (ngrok or anything speaking the same API) lists its active
//! tunnels at `GET <api_url>/api/tunnels`:
//!
//! ```json
//! {"tunnels": [{"name": "web", "proto": "https",
//!               "public_url": "https://abcd.ngrok-free.app",
//!               "config": {"addr": "http://localhost:5000"}}]}
//! ```
//!
//! Missing fields of a tunnel default to empty, so partial entries still
//! parse. A body without a `tunnels` list is rejected.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Path of the tunnel listing relative to the agent's base URL.
pub const TUNNELS_PATH: &str = "/api/tunnels";

/// One tunnel reported by the agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tunnel {
    /// Agent-side tunnel name
    pub name: String,
    /// Public URL the tunnel is reachable at
    pub public_url: String,
    /// Tunnel protocol (`http`, `https`, `tcp`)
    pub proto: String,
    /// Forwarding configuration
    pub config: TunnelTarget,
}

/// Where a tunnel forwards traffic to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelTarget {
    /// Local address, e.g. `http://localhost:5000`, `127.0.0.1:5000` or `5000`
    pub addr: String,
}

/// Body of the agent's tunnel listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TunnelList {
    /// Active tunnels
    pub tunnels: Vec<Tunnel>,
}

impl Tunnel {
    /// Whether the tunnel forwards to this machine's `port`.
    #[must_use]
    pub fn forwards_to_port(&self, port: u16) -> bool {
        addr_targets_port(&self.config.addr, port)
    }

    /// Whether the public side is HTTP(S).
    #[must_use]
    pub fn is_http(&self) -> bool {
        self.public_url.starts_with("http://") || self.public_url.starts_with("https://")
    }

    /// Whether the public side is HTTPS.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.public_url.starts_with("https://")
    }
}

/// Match a forwarding address against a local port.
///
/// Accepts `localhost` or `127.0.0.1`, with or without a scheme, and a bare
/// port number. `localhost:50001` does not match port 5000.
fn addr_targets_port(addr: &str, port: u16) -> bool {
    let rest = addr.split_once("://").map_or(addr, |(_, rest)| rest);
    let rest = rest.trim_end_matches('/');

    let (host, port_str) = rest.rsplit_once(':').unwrap_or(("localhost", rest));

    matches!(host, "localhost" | "127.0.0.1") && port_str.parse::<u16>() == Ok(port)
}

/// HTTP client for the agent API.
#[derive(Debug, Clone)]
pub struct TunnelAgent {
    client: Client,
    api_url: String,
    timeout: Duration,
}

impl TunnelAgent {
    /// Create a client for the agent at `api_url`.
    ///
    /// Every request is bounded by `timeout`.
    #[must_use]
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Full URL of the tunnel listing.
    #[must_use]
    pub fn tunnels_url(&self) -> String {
        format!("{}{TUNNELS_PATH}", self.api_url)
    }

    /// Fetch the active tunnels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DiscoveryUnavailable`] if the agent is unreachable,
    /// times out, answers with a non-success status, or sends a body that
    /// does not parse.
    pub async fn tunnels(&self) -> Result<Vec<Tunnel>> {
        let list: TunnelList = self
            .get()
            .await?
            .json()
            .await
            .map_err(|e| Error::DiscoveryUnavailable(format!("malformed agent response: {e}")))?;

        Ok(list.tunnels)
    }

    /// Fetch the agent's listing as untyped JSON, for diagnostics.
    ///
    /// # Errors
    ///
    /// Same as [`TunnelAgent::tunnels`].
    pub async fn raw(&self) -> Result<serde_json::Value> {
        self.get()
            .await?
            .json()
            .await
            .map_err(|e| Error::DiscoveryUnavailable(format!("malformed agent response: {e}")))
    }

    async fn get(&self) -> Result<reqwest::Response> {
        self.client
            .get(self.tunnels_url())
            .header("Accept", "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::DiscoveryUnavailable(format!("failed to query tunnel agent: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tunnel(addr: &str, public_url: &str) -> Tunnel {
        Tunnel {
            public_url: public_url.to_string(),
            config: TunnelTarget {
                addr: addr.to_string(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_addr_forms_match() {
        for addr in [
            "http://localhost:5000",
            "https://127.0.0.1:5000",
            "localhost:5000",
            "127.0.0.1:5000",
            "5000",
            "http://localhost:5000/",
        ] {
            assert!(tunnel(addr, "").forwards_to_port(5000), "{addr} should match");
        }
    }

    #[test]
    fn test_addr_forms_rejected() {
        for addr in [
            "http://localhost:50001",
            "http://localhost:500",
            "http://192.168.1.10:5000",
            "http://example.com:5000",
            "",
        ] {
            assert!(!tunnel(addr, "").forwards_to_port(5000), "{addr} should not match");
        }
    }

    #[test]
    fn test_is_http() {
        assert!(tunnel("5000", "https://a.ngrok-free.app").is_http());
        assert!(tunnel("5000", "http://a.ngrok.io").is_http());
        assert!(!tunnel("5000", "tcp://0.tcp.ngrok.io:12345").is_http());
        assert!(!tunnel("5000", "").is_http());
    }

    #[test]
    fn test_partial_listing_parses() {
        let json = r#"{"tunnels":[{"public_url":"https://x.ngrok.app"}],"uri":"/api/tunnels"}"#;
        let list: TunnelList = serde_json::from_str(json).unwrap();
        assert_eq!(list.tunnels.len(), 1);
        assert_eq!(list.tunnels[0].public_url, "https://x.ngrok.app");
        assert!(list.tunnels[0].config.addr.is_empty());
    }

    #[test]
    fn test_listing_without_tunnels_is_rejected() {
        for body in [r#"{"error":"agent restarting"}"#, "[]", r#"{"tunnels":null}"#, "{}"] {
            assert!(
                serde_json::from_str::<TunnelList>(body).is_err(),
                "{body} should not parse"
            );
        }

        let empty: TunnelList = serde_json::from_str(r#"{"tunnels":[]}"#).unwrap();
        assert!(empty.tunnels.is_empty());
    }

    #[test]
    fn test_tunnels_url() {
        let agent = TunnelAgent::new("http://127.0.0.1:4040/", Duration::from_secs(1));
        assert_eq!(agent.tunnels_url(), "http://127.0.0.1:4040/api/tunnels");
    }
}
