//! Destination address validation.
//!
//! [`EndpointEditor`] receives the raw text of the host and port fields,
//! validates each independently and reports "endpoint ready" once per
//! actual change of the valid `(host, port)` pair.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::FaderError;

// ── Endpoint ─────────────────────────────────────────────────────

/// A validated `(host, port)` destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Validate both fields under `policy`.
    pub fn parse(host: &str, port: &str, policy: HostPolicy) -> Result<Self, FaderError> {
        Ok(Self {
            host: parse_host(host, policy)?,
            port: parse_port(port)?,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The socket address, when the host is an IP literal and needs no
    /// lookup.
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        let ip = self.host.parse::<IpAddr>().ok()?;
        Some(SocketAddr::new(ip, self.port))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

// ── Validation ───────────────────────────────────────────────────

/// Which host strings the deployment accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostPolicy {
    /// IPv4 or IPv6 literals only.
    #[default]
    IpLiteral,
    /// IP literals or RFC 1123 host names, resolved when connecting.
    AllowHostnames,
}

/// Trim and validate host text.
pub fn parse_host(text: &str, policy: HostPolicy) -> Result<String, FaderError> {
    let host = text.trim();
    let ok = host.parse::<IpAddr>().is_ok()
        || (policy == HostPolicy::AllowHostnames && is_hostname(host));
    if ok {
        Ok(host.to_string())
    } else {
        Err(FaderError::InvalidAddress(text.to_string()))
    }
}

/// Trim and validate port text: an integer in `1..=65535`.
pub fn parse_port(text: &str) -> Result<u16, FaderError> {
    match text.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(FaderError::InvalidPort(text.to_string())),
    }
}

fn is_hostname(host: &str) -> bool {
    let host = host.strip_suffix('.').unwrap_or(host);
    if host.is_empty() || host.len() > 253 {
        return false;
    }
    let labels_ok = host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    // An all-numeric final label means a mistyped IPv4 address.
    let tld_numeric = host
        .rsplit('.')
        .next()
        .is_some_and(|tld| tld.chars().all(|c| c.is_ascii_digit()));
    labels_ok && !tld_numeric
}

// ── FieldStatus ──────────────────────────────────────────────────

/// Validation state of one text field, for display next to it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldStatus {
    #[default]
    Empty,
    Valid,
    Invalid(String),
}

impl FieldStatus {
    /// Error text to show, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Invalid(msg) => Some(msg),
            _ => None,
        }
    }
}

// ── EndpointEditor ───────────────────────────────────────────────

/// Holds the last valid host and port and decides when the pair is
/// ready to be applied.
///
/// An invalid edit only updates the field status; the last valid value of
/// that field stays in place.
#[derive(Debug, Default)]
pub struct EndpointEditor {
    policy: HostPolicy,
    host: Option<String>,
    port: Option<u16>,
    host_status: FieldStatus,
    port_status: FieldStatus,
    signalled: Option<Endpoint>,
}

impl EndpointEditor {
    pub fn new(policy: HostPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    pub fn policy(&self) -> HostPolicy {
        self.policy
    }

    /// Validate host text. Returns the endpoint when it became ready.
    pub fn set_host(&mut self, text: &str) -> Result<Option<Endpoint>, FaderError> {
        match parse_host(text, self.policy) {
            Ok(host) => {
                self.host = Some(host);
                self.host_status = FieldStatus::Valid;
                Ok(self.ready())
            }
            Err(e) => {
                warn!(input = text, "rejected host");
                self.host_status = FieldStatus::Invalid("Invalid IP Address".into());
                Err(e)
            }
        }
    }

    /// Validate port text. Returns the endpoint when it became ready.
    pub fn set_port(&mut self, text: &str) -> Result<Option<Endpoint>, FaderError> {
        match parse_port(text) {
            Ok(port) => {
                self.port = Some(port);
                self.port_status = FieldStatus::Valid;
                Ok(self.ready())
            }
            Err(e) => {
                warn!(input = text, "rejected port");
                self.port_status = FieldStatus::Invalid("Invalid Port".into());
                Err(e)
            }
        }
    }

    /// The current pair, if both fields hold a valid value.
    pub fn endpoint(&self) -> Option<Endpoint> {
        match (&self.host, self.port) {
            (Some(host), Some(port)) => Some(Endpoint {
                host: host.clone(),
                port,
            }),
            _ => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.host.is_some() && self.port.is_some()
    }

    pub fn host_status(&self) -> &FieldStatus {
        &self.host_status
    }

    pub fn port_status(&self) -> &FieldStatus {
        &self.port_status
    }

    /// Forget the last signalled endpoint so that re-confirming the same
    /// pair signals again.
    pub fn rearm(&mut self) {
        self.signalled = None;
    }

    fn ready(&mut self) -> Option<Endpoint> {
        let endpoint = self.endpoint()?;
        if self.signalled.as_ref() == Some(&endpoint) {
            return None;
        }
        self.signalled = Some(endpoint.clone());
        Some(endpoint)
    }
}
