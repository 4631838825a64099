//! TFTP client implementation
//!
//! This module provides the lock-step transfer client:
//! - File download (get/RRQ)
//! - File upload (put/WRQ)
//! - An interactive shell that asks for server, direction and filename
//!
//! # Usage Examples
//!
//! ## Download file
//!
//! ```rust,no_run
//! use tftpc::tftp::client::Client;
//! use tftpc::tftp::client::config::ClientConfig;
//!
//! let client = Client::new(ClientConfig::default()).unwrap();
//! client.receive_file("192.168.1.100", "remote.txt").unwrap();
//! ```
//!
//! ## Upload file
//!
//! ```rust,no_run
//! use tftpc::tftp::client::{Client, Direction, TransferContext};
//! use tftpc::tftp::client::config::ClientConfig;
//!
//! let client = Client::new(ClientConfig::default()).unwrap();
//! let ctx = TransferContext::new("192.168.1.100", "local.txt", Direction::Send);
//! client.execute(&ctx).unwrap();
//! ```
//!
//! # Command Line Usage
//!
//! ```bash
//! # Download file
//! tftpc get 192.168.1.100 remote.txt [local.txt]
//!
//! # Upload file
//! tftpc put 192.168.1.100 local.txt [remote.txt]
//!
//! # Menu-driven session
//! tftpc shell [192.168.1.100]
//! ```

mod client_impl;
pub mod config;
pub mod retry;
mod session;
mod shell;

use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;

pub use client_impl::{Client, TransferContext, resolve};
pub use retry::RetryPolicy;
pub use session::{Direction, SessionState, Stream, TransferSession, TransferStats};

#[derive(Subcommand)]
pub enum TftpcAction {
    /// Download a file from the server (RRQ)
    Get {
        /// Server IP address or hostname
        server: String,

        /// Remote file name on server
        remote_file: String,

        /// Local file path (defaults to remote file name)
        #[arg(value_name = "LOCAL_FILE")]
        local_file: Option<PathBuf>,

        /// Server port
        #[arg(short, long, default_value = "1738")]
        port: u16,

        /// Base timeout in seconds
        #[arg(short, long, default_value = "10")]
        timeout: u64,

        /// Attempts per block before giving up (upload only)
        #[arg(short, long, default_value = "3")]
        retries: u32,
    },

    /// Upload a file to the server (WRQ)
    Put {
        /// Server IP address or hostname
        server: String,

        /// Local file path to upload
        local_file: PathBuf,

        /// Remote file name on server (defaults to local file name)
        #[arg(value_name = "REMOTE_FILE")]
        remote_file: Option<String>,

        /// Server port
        #[arg(short, long, default_value = "1738")]
        port: u16,

        /// Base timeout in seconds
        #[arg(short, long, default_value = "10")]
        timeout: u64,

        /// Attempts per block before giving up
        #[arg(short, long, default_value = "3")]
        retries: u32,
    },

    /// Interactive menu: pick a direction and a filename, repeat
    Shell {
        /// Server IP address or hostname (prompted for when omitted)
        server: Option<String>,

        /// Server port
        #[arg(short, long, default_value = "1738")]
        port: u16,

        /// Base timeout in seconds
        #[arg(short, long, default_value = "10")]
        timeout: u64,

        /// Attempts per block before giving up
        #[arg(short, long, default_value = "3")]
        retries: u32,
    },
}

/// Run TFTP client command with configuration
pub fn run_with_config(
    action: TftpcAction,
    config: Option<&config::TftpcConfigFile>,
) -> Result<()> {
    match action {
        TftpcAction::Get {
            server,
            remote_file,
            local_file,
            port,
            timeout,
            retries,
        } => {
            let client_config = config.and_then(|c| c.get.clone()).unwrap_or_default();
            let cfg = client_config.merge_cli(Some(server), port, timeout, retries);
            let server = cfg.server.clone().unwrap_or_default();

            let local_path = local_file.unwrap_or_else(|| PathBuf::from(&remote_file));
            log::info!("Saving to: {}", local_path.display());

            let client = Client::new(cfg)?;
            let stats = client.execute(&TransferContext {
                server,
                remote_file,
                local_file: local_path,
                direction: Direction::Receive,
            })?;

            log::info!("Download completed successfully ({} bytes)", stats.bytes);
        }

        TftpcAction::Put {
            server,
            local_file,
            remote_file,
            port,
            timeout,
            retries,
        } => {
            let client_config = config.and_then(|c| c.put.clone()).unwrap_or_default();
            let cfg = client_config.merge_cli(Some(server), port, timeout, retries);
            let server = cfg.server.clone().unwrap_or_default();

            let remote_name = remote_file.unwrap_or_else(|| {
                local_file
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("file")
                    .to_string()
            });
            log::info!("Remote file: {}", remote_name);

            let client = Client::new(cfg)?;
            let stats = client.execute(&TransferContext {
                server,
                remote_file: remote_name,
                local_file,
                direction: Direction::Send,
            })?;

            log::info!(
                "Upload completed successfully ({} bytes, {} retransmits)",
                stats.bytes,
                stats.retransmits
            );
        }

        TftpcAction::Shell {
            server,
            port,
            timeout,
            retries,
        } => {
            // Either section configures the shell; `get` is consulted first.
            let client_config = config
                .and_then(|c| c.get.clone().or_else(|| c.put.clone()))
                .unwrap_or_default();
            let cfg = client_config.merge_cli(server, port, timeout, retries);
            shell::run(cfg)?;
        }
    }
    Ok(())
}
