//! Lock-step TFTP client
//!
//! Implements the client side of [RFC 1350](https://www.rfc-editor.org/rfc/rfc1350)
//! with a single packet in flight, 512-byte blocks and `octet` mode only.
//! No option negotiation is offered.
//!
//! ## Module structure
//!
//! ```text
//! tftp/
//! ├── core/           # wire protocol
//! │   ├── packet      # packet encoding / decoding
//! │   └── socket      # datagram transport abstraction
//! │
//! ├── client/         # TFTP client
//! │   ├── session     # transfer engine (send and receive loops)
//! │   ├── retry       # timeout escalation and retry budget
//! │   ├── client      # orchestration: resolve, open, run, close
//! │   ├── shell       # interactive menu
//! │   └── config      # client configuration
//! │
//! └── error           # TransferError
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use tftpc::tftp::client::{Client, config::ClientConfig};
//!
//! let client = Client::new(ClientConfig::default()).unwrap();
//! client.send_file("10.0.0.5", "firmware.bin").unwrap();
//! client.receive_file("10.0.0.5", "firmware.bin").unwrap();
//! ```

pub mod client;
pub mod core;
pub mod error;

pub use error::{Result, TransferError};
