use std::fs::File;
use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

use super::config::ClientConfig;
use super::retry::RetryPolicy;
use super::session::{Direction, Stream, TransferSession, TransferStats};
use crate::tftp::core::{DEFAULT_MODE, UdpEndpoint};
use crate::tftp::error::{Result, TransferError};

/// Everything needed to run one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferContext {
    /// Host name or IP address of the server.
    pub server: String,
    pub remote_file: String,
    pub local_file: PathBuf,
    pub direction: Direction,
}

impl TransferContext {
    /// Uses the same name locally and on the server.
    pub fn new(server: impl Into<String>, filename: &str, direction: Direction) -> Self {
        Self {
            server: server.into(),
            remote_file: filename.to_string(),
            local_file: PathBuf::from(filename),
            direction,
        }
    }
}

/// TFTP client
///
/// Supports file upload (send) and download (receive). Each call opens its
/// own endpoint and file, and both are closed when the call returns,
/// whatever the outcome.
pub struct Client {
    port: u16,
    policy: RetryPolicy,
    mode: String,
}

impl Client {
    /// Create a new TFTP client
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mode = config.mode.clone().unwrap_or_else(|| DEFAULT_MODE.to_string());
        if mode.as_bytes().contains(&0) {
            return Err(TransferError::Encoding(
                "mode contains a zero byte".to_string(),
            ));
        }

        Ok(Self {
            port: config.port_or_default(),
            policy: config.retry_policy(),
            mode,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Download `filename` from `server` into a local file of the same name.
    pub fn receive_file(&self, server: &str, filename: &str) -> Result<TransferStats> {
        self.execute(&TransferContext::new(server, filename, Direction::Receive))
    }

    /// Upload the local file `filename` to `server` under the same name.
    pub fn send_file(&self, server: &str, filename: &str) -> Result<TransferStats> {
        self.execute(&TransferContext::new(server, filename, Direction::Send))
    }

    pub fn execute(&self, ctx: &TransferContext) -> Result<TransferStats> {
        match ctx.direction {
            Direction::Receive => self.get(&ctx.server, &ctx.remote_file, &ctx.local_file),
            Direction::Send => self.put(&ctx.server, &ctx.local_file, &ctx.remote_file),
        }
    }

    /// Download a file from the server (RRQ - Read Request)
    pub fn get(&self, server: &str, remote_file: &str, local_file: &Path) -> Result<TransferStats> {
        log::info!(
            "Downloading {} from {}:{} to {}",
            remote_file,
            server,
            self.port,
            local_file.display()
        );

        let server_addr = resolve(server, self.port)?;
        let mut file = File::create(local_file)?;
        let socket = UdpEndpoint::open(server_addr)?;

        let mut session =
            TransferSession::new(socket, remote_file, self.policy).with_mode(self.mode.as_str());
        session.run(Stream::Sink(&mut file))
    }

    /// Upload a file to the server (WRQ - Write Request)
    pub fn put(&self, server: &str, local_file: &Path, remote_file: &str) -> Result<TransferStats> {
        log::info!(
            "Uploading {} to {}:{} as {}",
            local_file.display(),
            server,
            self.port,
            remote_file
        );

        // Opened before resolving so a missing file costs no network traffic.
        let mut file = match File::open(local_file) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TransferError::FileNotFound(local_file.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        let server_addr = resolve(server, self.port)?;
        let socket = UdpEndpoint::open(server_addr)?;

        let mut session =
            TransferSession::new(socket, remote_file, self.policy).with_mode(self.mode.as_str());
        session.run(Stream::Source(&mut file))
    }
}

/// Resolves a host name or IP literal, preferring IPv4 when both exist.
pub fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| TransferError::HostResolution {
            host: host.to_string(),
            reason: e.to_string(),
        })?
        .collect();

    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| TransferError::HostResolution {
            host: host.to_string(),
            reason: "no addresses found".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_ip_literal() {
        let addr = resolve("127.0.0.1", 1738).unwrap();
        assert_eq!(addr, "127.0.0.1:1738".parse().unwrap());
    }

    #[test]
    fn test_resolve_failure() {
        let err = resolve("no-such-host.invalid", 69).unwrap_err();
        assert!(matches!(err, TransferError::HostResolution { .. }));
    }

    #[test]
    fn test_missing_upload_source() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("absent.bin");
        let client = Client::new(ClientConfig::default()).unwrap();

        // The host is unresolvable, so reaching resolution would fail differently.
        let err = client
            .put("no-such-host.invalid", &missing, "absent.bin")
            .unwrap_err();
        match err {
            TransferError::FileNotFound(path) => assert_eq!(path, missing),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_download_resolves_before_creating_file() {
        let temp = TempDir::new().unwrap();
        let local = temp.path().join("never.bin");
        let client = Client::new(ClientConfig::default()).unwrap();

        let err = client
            .get("no-such-host.invalid", "never.bin", &local)
            .unwrap_err();
        assert!(matches!(err, TransferError::HostResolution { .. }));
        assert!(!local.exists());
    }

    #[test]
    fn test_config_flows_into_client() {
        let config = ClientConfig::new("127.0.0.1".to_string(), 6969)
            .with_timeout(Duration::from_secs(2))
            .with_retries(5);
        let client = Client::new(config).unwrap();
        assert_eq!(client.port(), 6969);
        assert_eq!(client.policy(), RetryPolicy::new(Duration::from_secs(2), 5));
    }

    #[test]
    fn test_rejects_mode_with_zero_byte() {
        let mut config = ClientConfig::default();
        config.mode = Some("oct\0et".to_string());
        assert!(matches!(
            Client::new(config),
            Err(TransferError::Encoding(_))
        ));
    }

    #[test]
    fn test_context_uses_same_name() {
        let ctx = TransferContext::new("10.1.1.1", "fw.bin", Direction::Send);
        assert_eq!(ctx.remote_file, "fw.bin");
        assert_eq!(ctx.local_file, PathBuf::from("fw.bin"));
    }
}
