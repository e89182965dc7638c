use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

/// Process configuration, read once from `ROOMBOOK_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: IpAddr,
    pub port: u16,
    pub metrics_port: Option<u16>,
    pub shutdown_grace: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            metrics_port: None,
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparsable values fall back to the default for that key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            bind: parsed(&lookup, "ROOMBOOK_BIND").unwrap_or(defaults.bind),
            port: parsed(&lookup, "ROOMBOOK_PORT").unwrap_or(defaults.port),
            metrics_port: parsed(&lookup, "ROOMBOOK_METRICS_PORT"),
            shutdown_grace: parsed(&lookup, "ROOMBOOK_SHUTDOWN_GRACE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_grace),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_port.map(|p| SocketAddr::new(self.bind, p))
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.trim().parse().ok())
}
