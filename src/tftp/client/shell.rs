use std::net::SocketAddr;

use anyhow::{Result, anyhow};
use dialoguer::{Input, Select};

use super::client_impl::{Client, TransferContext, resolve};
use super::config::ClientConfig;
use super::session::Direction;

const MENU: [&str; 3] = ["Write file to server", "Read file from server", "Quit"];

fn menu_choice(index: usize) -> Option<Direction> {
    match index {
        0 => Some(Direction::Send),
        1 => Some(Direction::Receive),
        _ => None,
    }
}

// The host is resolved once per shell; every transfer reuses the address.
fn context_for(addr: SocketAddr, filename: &str, direction: Direction) -> TransferContext {
    TransferContext::new(addr.ip().to_string(), filename.trim(), direction)
}

/// Menu loop over one server. A failed transfer is reported and the menu is
/// offered again; only "Quit" or a prompt failure ends the loop.
pub fn run(config: ClientConfig) -> Result<()> {
    let server = match config.server.clone() {
        Some(server) => server,
        None => Input::<String>::new()
            .with_prompt("Server IP address")
            .interact_text()
            .map_err(|e| anyhow!("prompt failed: {e}"))?,
    };
    let client = Client::new(config)?;
    let addr = resolve(server.trim(), client.port())?;
    info!("Using server {}", addr);

    loop {
        let choice = Select::new()
            .with_prompt("Choose an action")
            .items(&MENU)
            .default(0)
            .interact()
            .map_err(|e| anyhow!("prompt failed: {e}"))?;
        let Some(direction) = menu_choice(choice) else {
            return Ok(());
        };

        let filename: String = Input::new()
            .with_prompt("Filename")
            .interact_text()
            .map_err(|e| anyhow!("prompt failed: {e}"))?;

        let ctx = context_for(addr, &filename, direction);
        match client.execute(&ctx) {
            Ok(stats) => info!("{} done: {} bytes", ctx.remote_file, stats.bytes),
            Err(e) => error!("{}: {}", ctx.remote_file, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_order() {
        assert_eq!(menu_choice(0), Some(Direction::Send));
        assert_eq!(menu_choice(1), Some(Direction::Receive));
        assert_eq!(menu_choice(2), None);
        assert_eq!(MENU.len(), 3);
    }

    #[test]
    fn test_transfers_reuse_resolved_address() {
        let addr = resolve("localhost", 1738).unwrap();
        let ctx = context_for(addr, "  notes.txt\n", Direction::Receive);

        assert_eq!(ctx.server, addr.ip().to_string());
        assert_eq!(ctx.remote_file, "notes.txt");
        assert_eq!(resolve(&ctx.server, 1738).unwrap(), addr);
    }
}
