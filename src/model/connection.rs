//! Connection settings for the InfluxDB server

use std::net::Ipv6Addr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::model::Password;

pub const DEFAULT_PORT: u16 = 8086;
pub const DEFAULT_CONNECT_USER: &str = "root";
pub const DEFAULT_CONNECT_PASSWORD: &str = "root";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Where and as whom to connect
#[derive(Clone, Debug)]
pub struct ConnectionSpec {
    pub host: String,
    pub port: u16,

    /// Credential used for connecting (distinct from the managed user)
    pub connect_user: String,
    pub connect_password: Password,

    pub timeout_secs: u64,
}

impl ConnectionSpec {
    /// Connection to `host` with every other field defaulted
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            connect_user: DEFAULT_CONNECT_USER.to_string(),
            connect_password: Password::new(DEFAULT_CONNECT_PASSWORD),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Base URL of the HTTP API
    pub fn base_url(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("http://[{}]:{}", self.host, self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::config("host must not be empty"));
        }
        if self.host.contains('/') {
            return Err(Error::config(format!(
                "host '{}' must be a bare address without scheme or path",
                self.host
            )));
        }
        if self.host.contains(':') {
            let bare = self
                .host
                .strip_prefix('[')
                .and_then(|h| h.strip_suffix(']'))
                .unwrap_or(&self.host);
            if bare.parse::<Ipv6Addr>().is_err() {
                return Err(Error::config(format!(
                    "host '{}' is not an IPv6 address; pass the port separately",
                    self.host
                )));
            }
        }
        if self.port == 0 {
            return Err(Error::config("port must be between 1 and 65535"));
        }
        if self.timeout_secs == 0 {
            return Err(Error::config("timeout_secs must be greater than zero"));
        }
        Ok(())
    }
}
