use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT, RetryPolicy};
use crate::tftp::core::DEFAULT_MODE;

/// Port the paired server listens on.
pub const DEFAULT_PORT: u16 = 1738;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TftpcConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<ClientConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<ClientConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClientConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "humantime_serde")]
    pub timeout: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl ClientConfig {
    pub fn new(server: String, port: u16) -> Self {
        Self {
            server: Some(server),
            port: Some(port),
            timeout: Some(DEFAULT_TIMEOUT),
            retries: Some(DEFAULT_MAX_ATTEMPTS),
            mode: Some(DEFAULT_MODE.to_string()),
        }
    }

    pub fn merge_cli(
        mut self,
        cli_server: Option<String>,
        cli_port: u16,
        cli_timeout: u64,
        cli_retries: u32,
    ) -> Self {
        // File > CLI: CLI values only fill what the config file leaves out
        if self.server.is_none() {
            self.server = cli_server;
        }
        if self.port.is_none() {
            self.port = Some(cli_port);
        }
        if self.timeout.is_none() {
            self.timeout = Some(Duration::from_secs(cli_timeout));
        }
        if self.retries.is_none() {
            self.retries = Some(cli_retries);
        }
        if self.mode.is_none() {
            self.mode = Some(DEFAULT_MODE.to_string());
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            self.retries.unwrap_or(DEFAULT_MAX_ATTEMPTS),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tftp::client::retry::MIN_TIMEOUT;

    #[test]
    fn test_file_values_win_over_cli() {
        let cfg: ClientConfig = toml::from_str(
            r#"
            port = 6969
            timeout = "2s 500ms"
            "#,
        )
        .unwrap();
        let cfg = cfg.merge_cli(Some("10.0.0.1".to_string()), 1738, 10, 5);

        assert_eq!(cfg.server.as_deref(), Some("10.0.0.1"));
        assert_eq!(cfg.port, Some(6969));
        assert_eq!(cfg.timeout, Some(Duration::from_millis(2500)));
        assert_eq!(cfg.retries, Some(5));
        assert_eq!(cfg.mode.as_deref(), Some("octet"));
    }

    #[test]
    fn test_retry_policy_defaults() {
        let policy = ClientConfig::default().retry_policy();
        assert_eq!(policy, RetryPolicy::default());
        assert_eq!(ClientConfig::default().port_or_default(), DEFAULT_PORT);
    }

    #[test]
    fn test_zero_timeout_from_file_is_raised() {
        let cfg: ClientConfig = toml::from_str(r#"timeout = "0s""#).unwrap();
        assert_eq!(cfg.retry_policy().base_timeout, MIN_TIMEOUT);
    }

    #[test]
    fn test_serializes_humantime() {
        let cfg = ClientConfig::new("127.0.0.1".to_string(), 69);
        let text = toml::to_string(&cfg).unwrap();
        assert!(text.contains("timeout = \"10s\""), "{text}");
        assert!(text.contains("retries = 3"), "{text}");
    }
}
