//! Host/port addressing and broker name resolution.

use std::fmt;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use anyhow::{Context, bail};
use tokio::net::lookup_host;

/// Port assumed when a broker address carries none.
pub const DEFAULT_BROKER_PORT: u16 = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addr {
    pub host: String,
    pub port: u16,
}

impl Addr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parses a broker address.
    ///
    /// Accepts `host`, `host:port`, IPv6 literals (`::1`, `[::1]:8080`) and
    /// `scheme://host[:port][/...]`. A missing port falls back to the
    /// scheme's default, or to 80.
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Self::parse_with_scheme(raw).map(|(_, addr)| addr)
    }

    /// Like [`Addr::parse`], also returning the URL scheme the address was
    /// given with. Addresses without one are `http`.
    pub fn parse_with_scheme(raw: &str) -> anyhow::Result<(String, Self)> {
        let raw = raw.trim();
        if raw.is_empty() {
            bail!("empty address");
        }

        if raw.contains("://") {
            let url = url::Url::parse(raw).context("invalid broker URL")?;
            let host = match url.host().context("broker URL missing host")? {
                url::Host::Domain(domain) => domain.to_string(),
                url::Host::Ipv4(ip) => ip.to_string(),
                url::Host::Ipv6(ip) => ip.to_string(),
            };
            let port = url.port_or_known_default().unwrap_or(DEFAULT_BROKER_PORT);
            return Ok((url.scheme().to_string(), Self::new(host, port)));
        }

        Ok(("http".to_string(), Self::parse_host_port(raw)?))
    }

    fn parse_host_port(raw: &str) -> anyhow::Result<Self> {
        if let Ok(sock) = raw.parse::<SocketAddr>() {
            return Ok(Self::new(sock.ip().to_string(), sock.port()));
        }
        if let Ok(ip) = raw.parse::<IpAddr>() {
            return Ok(Self::new(ip.to_string(), DEFAULT_BROKER_PORT));
        }
        if let Some(inner) = raw.strip_prefix('[') {
            let ip: Ipv6Addr = inner
                .strip_suffix(']')
                .and_then(|ip| ip.parse().ok())
                .with_context(|| format!("invalid IPv6 address {raw:?}"))?;
            return Ok(Self::new(ip.to_string(), DEFAULT_BROKER_PORT));
        }

        match raw.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse()
                    .with_context(|| format!("invalid port in address {raw:?}"))?;
                Ok(Self::new(host, port))
            }
            None => Ok(Self::new(raw, DEFAULT_BROKER_PORT)),
        }
    }

    /// Resolves the host to a single IP and returns it as `ip:port`.
    ///
    /// The last address the resolver returns wins.
    pub async fn resolve(&self) -> anyhow::Result<String> {
        let resolved = lookup_host((self.host.as_str(), self.port))
            .await
            .with_context(|| format!("failed to resolve {}", self.host))?
            .last()
            .with_context(|| format!("no addresses found for {}", self.host))?;

        Ok(resolved.to_string())
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
