use std::{
    io::{self, ErrorKind},
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket},
    time::{Duration, Instant},
};

/// Socket `trait` is the datagram transport a transfer runs over. The
/// endpoint is already bound to one remote server; the engine only ever
/// sends to it and receives from it.
///
/// A receive that runs past the read timeout must fail with an error for
/// which [`is_timeout`] returns `true`.
pub trait Socket: Send {
    /// Sends one datagram to the remote.
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;
    /// Blocks until one datagram from the remote arrives or the read timeout
    /// expires. Returns the number of bytes written into `buf`.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    /// Sets the read timeout used by subsequent [`Socket::recv`] calls.
    fn set_read_timeout(&mut self, dur: Duration) -> io::Result<()>;
    /// Returns the remote [`SocketAddr`] datagrams are currently sent to.
    fn remote_addr(&self) -> SocketAddr;
}

/// Whether an I/O error from [`Socket::recv`] means the read timed out.
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

/// UDP endpoint talking to a single server.
///
/// Requests go to the server's well-known address. The first datagram that
/// comes back from the server's IP fixes the remote transfer identifier
/// (its source port); from then on everything is sent there and datagrams
/// from any other source are dropped. Dropped datagrams do not extend the
/// read timeout.
pub struct UdpEndpoint {
    socket: UdpSocket,
    server: SocketAddr,
    peer: Option<SocketAddr>,
    read_timeout: Option<Duration>,
}

impl UdpEndpoint {
    /// Binds an ephemeral local port of the same address family as `server`.
    pub fn open(server: SocketAddr) -> io::Result<Self> {
        let local: SocketAddr = if server.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local)?;
        log::debug!(
            "Opened endpoint {} for server {}",
            socket.local_addr()?,
            server
        );

        Ok(Self {
            socket,
            server,
            peer: None,
            read_timeout: None,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl Socket for UdpEndpoint {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        let to = self.remote_addr();
        self.socket.send_to(bytes, to)?;

        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let deadline = self
            .read_timeout
            .and_then(|dur| Instant::now().checked_add(dur));
        self.socket.set_read_timeout(self.read_timeout)?;

        loop {
            let (amt, src) = self.socket.recv_from(buf)?;
            match self.peer {
                Some(peer) if peer == src => return Ok(amt),
                None if src.ip() == self.server.ip() => {
                    if src != self.server {
                        log::debug!("Server answered from {}", src);
                    }
                    self.peer = Some(src);
                    return Ok(amt);
                }
                _ => {
                    log::warn!("Dropping {} byte datagram from unexpected source {}", amt, src);
                }
            }

            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(io::Error::new(
                        ErrorKind::TimedOut,
                        "read timeout expired while dropping stray datagrams",
                    ));
                }
                self.socket.set_read_timeout(Some(remaining))?;
            }
        }
    }

    fn set_read_timeout(&mut self, dur: Duration) -> io::Result<()> {
        // std rejects a zero timeout; callers treat zero remaining as expiry.
        if dur.is_zero() {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                "read timeout must be non-zero",
            ));
        }
        self.socket.set_read_timeout(Some(dur))?;
        self.read_timeout = Some(dur);
        Ok(())
    }

    fn remote_addr(&self) -> SocketAddr {
        self.peer.unwrap_or(self.server)
    }
}

impl<T: Socket + ?Sized> Socket for Box<T> {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).send(bytes)
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).recv(buf)
    }

    fn set_read_timeout(&mut self, dur: Duration) -> io::Result<()> {
        (**self).set_read_timeout(dur)
    }

    fn remote_addr(&self) -> SocketAddr {
        (**self).remote_addr()
    }
}
