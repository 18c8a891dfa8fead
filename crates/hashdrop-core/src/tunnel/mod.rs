//! Public endpoint resolution.
//!
//! Share links must point somewhere other people can reach. When the server
//! runs behind a NAT that usually means a tunnel agent forwarding a public
//! URL to the local port. The [`EndpointResolver`] keeps track of that URL:
//!
//! - A background task ([`spawn_monitor`]) asks the agent for its tunnels on
//!   a fixed interval and moves between [`EndpointState::Unknown`] and
//!   [`EndpointState::Public`].
//! - A request that arrives through a tunnel domain while the state is
//!   still unknown makes the resolver adopt `https://<host>` immediately,
//!   so the first link after a tunnel comes up is already public.
//! - With nothing known, links use `http://localhost:<port>`.
//!
//! ## Tunnel matching
//!
//! Two rules, tried in order:
//!
//! 1. A tunnel whose forwarding address is `localhost:<port>` or
//!    `127.0.0.1:<port>` (HTTPS preferred when the agent lists both).
//! 2. Only when listening on the default port: if exactly one tunnel has an
//!    HTTP(S) public URL, take it whatever it forwards to.

pub mod agent;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::TunnelConfig;

pub use agent::{Tunnel, TunnelAgent, TunnelList, TunnelTarget};

/// What the resolver believes about public reachability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "url", rename_all = "snake_case")]
pub enum EndpointState {
    /// No public URL observed, or the last probe found none
    #[default]
    Unknown,
    /// A tunnel is believed active at this URL
    Public(String),
}

impl EndpointState {
    /// The public URL, if any.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Unknown => None,
            Self::Public(url) => Some(url),
        }
    }
}

/// Public URL before and after a forced probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Refresh {
    /// URL before the probe
    pub old_url: Option<String>,
    /// URL after the probe
    pub new_url: Option<String>,
}

/// Raw view of the agent, for diagnostics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentReport {
    /// Whether the agent answered
    pub agent_reachable: bool,
    /// Agent URL that was queried
    pub agent_url: String,
    /// The agent's listing, verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tunnels: Option<serde_json::Value>,
    /// Why the agent could not be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Pick the tunnel serving `port`, applying the two matching rules in order.
#[must_use]
pub fn select_tunnel(tunnels: &[Tunnel], port: u16, default_port: u16) -> Option<&Tunnel> {
    let exact: Vec<&Tunnel> = tunnels
        .iter()
        .filter(|t| t.forwards_to_port(port) && t.is_http())
        .collect();

    if let Some(found) = exact
        .iter()
        .copied()
        .find(|t| t.is_https())
        .or_else(|| exact.first().copied())
    {
        return Some(found);
    }

    if port != default_port {
        return None;
    }

    let mut http = tunnels.iter().filter(|t| t.is_http());
    match (http.next(), http.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

/// Dot-separated labels of ASCII letters, digits and `-`.
fn is_dns_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 253
        && name.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        })
}

/// Tracks the best-known externally reachable base URL.
#[derive(Debug)]
pub struct EndpointResolver {
    port: u16,
    default_port: u16,
    domains: Vec<String>,
    agent: TunnelAgent,
    state: RwLock<EndpointState>,
}

impl EndpointResolver {
    /// Create a resolver for a server listening on `port`.
    #[must_use]
    pub fn new(port: u16, config: &TunnelConfig) -> Self {
        Self {
            port,
            default_port: config.default_port,
            domains: config
                .domains
                .iter()
                .map(|d| d.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            agent: TunnelAgent::new(config.api_url.clone(), config.request_timeout),
            state: RwLock::new(EndpointState::Unknown),
        }
    }

    /// The listening port links fall back to.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// The agent client.
    #[must_use]
    pub const fn agent(&self) -> &TunnelAgent {
        &self.agent
    }

    /// Snapshot of the current state.
    pub async fn state(&self) -> EndpointState {
        self.state.read().await.clone()
    }

    /// The public URL, if one is known.
    pub async fn public_url(&self) -> Option<String> {
        self.state.read().await.url().map(String::from)
    }

    /// Whether a public URL is known.
    pub async fn is_public(&self) -> bool {
        matches!(*self.state.read().await, EndpointState::Public(_))
    }

    /// `http://localhost:<port>`.
    #[must_use]
    pub fn local_base_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    /// Whether `host` (optionally with a port) belongs to a tunnel domain.
    ///
    /// Only plain DNS names qualify, so nothing but a hostname and port can
    /// end up in an adopted URL.
    #[must_use]
    pub fn is_tunnel_host(&self, host: &str) -> bool {
        let name = match host.rsplit_once(':') {
            Some((name, port)) if port.parse::<u16>().is_ok() => name,
            Some(_) => return false,
            None => host,
        }
        .to_ascii_lowercase();

        is_dns_name(&name)
            && self.domains.iter().any(|domain| {
                name == *domain
                    || name
                        .strip_suffix(domain.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'))
            })
    }

    /// Run one discovery round against the agent.
    ///
    /// Any failure leaves the state untouched.
    pub async fn probe(&self) {
        match self.agent.tunnels().await {
            Ok(tunnels) => {
                self.apply(&tunnels).await;
            }
            Err(e) if e.is_recoverable() => tracing::debug!("Tunnel probe skipped: {}", e),
            Err(e) => tracing::warn!("Tunnel probe failed: {}", e),
        }
    }

    /// Move to the state implied by a tunnel listing and return it.
    pub async fn apply(&self, tunnels: &[Tunnel]) -> EndpointState {
        let next = select_tunnel(tunnels, self.port, self.default_port).map_or(
            EndpointState::Unknown,
            |t| EndpointState::Public(t.public_url.trim_end_matches('/').to_string()),
        );

        let mut state = self.state.write().await;
        match (&*state, &next) {
            (EndpointState::Unknown, EndpointState::Public(url)) => {
                tracing::info!("Tunnel connected, public access at {}", url);
            }
            (EndpointState::Public(old), EndpointState::Public(new)) if old != new => {
                tracing::info!("Tunnel URL changed: {} -> {}", old, new);
            }
            (EndpointState::Public(old), EndpointState::Unknown) => {
                tracing::warn!("Tunnel {} disconnected, links fall back to local", old);
            }
            _ => {}
        }
        *state = next.clone();

        next
    }

    /// Probe now and report the URL before and after.
    pub async fn refresh(&self) -> Refresh {
        let old_url = self.public_url().await;
        self.probe().await;
        let new_url = self.public_url().await;
        Refresh { old_url, new_url }
    }

    /// Base URL for share links.
    ///
    /// `host` is the `Host` header of the request the link is built for.
    pub async fn current_base_url(&self, host: Option<&str>) -> String {
        if let EndpointState::Public(url) = &*self.state.read().await {
            return url.clone();
        }

        if let Some(host) = host.filter(|h| self.is_tunnel_host(h)) {
            let mut state = self.state.write().await;
            return match &*state {
                EndpointState::Public(url) => url.clone(),
                EndpointState::Unknown => {
                    let adopted = format!("https://{host}");
                    tracing::info!("Tunnel detected from request, public access at {}", adopted);
                    *state = EndpointState::Public(adopted.clone());
                    adopted
                }
            };
        }

        self.local_base_url()
    }

    /// Query the agent without touching the state.
    pub async fn inspect(&self) -> AgentReport {
        let agent_url = self.agent.tunnels_url();
        match self.agent.raw().await {
            Ok(tunnels) => AgentReport {
                agent_reachable: true,
                agent_url,
                tunnels: Some(tunnels),
                error: None,
            },
            Err(e) => AgentReport {
                agent_reachable: false,
                agent_url,
                tunnels: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Probe on a fixed interval for the rest of the process.
///
/// The first probe runs immediately.
pub fn spawn_monitor(resolver: Arc<EndpointResolver>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            resolver.probe().await;
        }
    })
}
