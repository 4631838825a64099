use std::io::{self, ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use super::retry::RetryPolicy;
use crate::tftp::core::{
    BLOCK_SIZE, DEFAULT_MODE, HEADER_SIZE, MAX_PACKET_SIZE, Opcode, RequestKind, Socket,
    decode_error, decode_header, encode_ack, encode_data, encode_request, is_ack_for,
    is_timeout,
};
use crate::tftp::error::{Result, TransferError};

/// Which way file content flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Upload: local source to server (WRQ).
    Send,
    /// Download: server to local sink (RRQ).
    Receive,
}

/// Local end of a transfer. The variant selects the protocol that runs.
pub enum Stream<'a> {
    Source(&'a mut dyn Read),
    Sink(&'a mut dyn Write),
}

impl Stream<'_> {
    pub fn direction(&self) -> Direction {
        match self {
            Stream::Source(_) => Direction::Send,
            Stream::Sink(_) => Direction::Receive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    RequestSent,
    AwaitingPeer,
    Exchanging,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// DATA blocks delivered (written to the sink or acknowledged by the peer).
    pub blocks: u32,
    pub bytes: u64,
    /// DATA packets sent again after a timeout.
    pub retransmits: u32,
    pub elapsed: Duration,
}

/// One transfer over an already open [`Socket`].
///
/// The session never has more than one unacknowledged packet in flight.
/// Block numbers start at 1 and wrap modulo 65536.
///
/// The two directions treat silence differently: the
/// send side retries each block with an escalating wait, while the receive
/// side fails with [`TransferError::Stalled`] on the first timeout.
pub struct TransferSession<S: Socket> {
    socket: S,
    filename: String,
    mode: String,
    policy: RetryPolicy,
    direction: Option<Direction>,
    state: SessionState,
    block: u16,
    attempt: u32,
    timeout: Duration,
    stats: TransferStats,
}

impl<S: Socket> TransferSession<S> {
    pub fn new(socket: S, filename: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            socket,
            filename: filename.into(),
            mode: DEFAULT_MODE.to_string(),
            policy,
            direction: None,
            state: SessionState::Idle,
            block: 1,
            attempt: 0,
            timeout: policy.timeout_for(1),
            stats: TransferStats::default(),
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    /// Block number currently being exchanged.
    pub fn block(&self) -> u16 {
        self.block
    }

    pub fn socket(&self) -> &S {
        &self.socket
    }

    /// Drives the transfer to completion or to the first terminal error.
    pub fn run(&mut self, stream: Stream<'_>) -> Result<TransferStats> {
        let start = Instant::now();
        self.direction = Some(stream.direction());
        self.stats = TransferStats::default();
        self.block = 1;
        self.attempt = 0;
        self.timeout = self.policy.timeout_for(1);

        let result = match stream {
            Stream::Sink(sink) => self.receive(sink),
            Stream::Source(source) => self.send(source),
        };
        self.stats.elapsed = start.elapsed();

        match result {
            Ok(()) => {
                self.state = SessionState::Completed;
                let secs = self.stats.elapsed.as_secs_f64();
                log::info!(
                    "Transfer of {} complete: {} blocks, {} bytes, cost: {:.3}s, speed: {:.2} KB/s",
                    self.filename,
                    self.stats.blocks,
                    self.stats.bytes,
                    secs,
                    if secs > 0.0 {
                        self.stats.bytes as f64 / secs / 1024.0
                    } else {
                        0.0
                    }
                );
                Ok(self.stats)
            }
            Err(e) => {
                self.state = SessionState::Failed;
                log::debug!("Transfer of {} failed at block {}: {}", self.filename, self.block, e);
                Err(e)
            }
        }
    }

    fn receive(&mut self, sink: &mut dyn Write) -> Result<()> {
        self.socket.set_read_timeout(self.timeout)?;
        let rrq = encode_request(
            RequestKind::Read,
            self.filename.as_bytes(),
            self.mode.as_bytes(),
        )?;
        self.socket.send(&rrq)?;
        self.state = SessionState::RequestSent;

        let mut buf = [0u8; MAX_PACKET_SIZE];
        loop {
            self.state = SessionState::AwaitingPeer;
            let amt = match self.socket.recv(&mut buf) {
                Ok(amt) => amt,
                Err(e) if is_timeout(&e) => {
                    return Err(TransferError::Stalled {
                        block: self.block,
                        waited: self.timeout,
                    });
                }
                Err(e) => return Err(e.into()),
            };

            // Only the header is checked; anything that is not DATA or
            // ERROR is skipped without looking at the rest.
            let datagram = &buf[..amt];
            let (op, block_num) = decode_header(datagram)?;
            match Opcode::from_byte(op) {
                Some(Opcode::Data) if block_num == self.block => {
                    let data = &datagram[HEADER_SIZE..];
                    self.state = SessionState::Exchanging;
                    sink.write_all(data)?;
                    self.socket.send(&encode_ack(block_num))?;
                    self.stats.blocks += 1;
                    self.stats.bytes += data.len() as u64;
                    log::debug!("Received block {} ({} bytes)", block_num, data.len());

                    if data.len() < BLOCK_SIZE {
                        sink.flush()?;
                        return Ok(());
                    }
                    self.block = self.block.wrapping_add(1);
                }
                Some(Opcode::Data) => {
                    log::debug!(
                        "Ignoring block {} while expecting {}",
                        block_num,
                        self.block
                    );
                }
                Some(Opcode::Error) => {
                    let (code, message) = decode_error(datagram)?;
                    return Err(TransferError::Protocol { code, message });
                }
                _ => {
                    log::warn!("Ignoring unexpected packet with opcode {}", op);
                }
            }
        }
    }

    fn send(&mut self, source: &mut dyn Read) -> Result<()> {
        let wrq = encode_request(
            RequestKind::Write,
            self.filename.as_bytes(),
            self.mode.as_bytes(),
        )?;
        self.socket.send(&wrq)?;
        self.state = SessionState::RequestSent;

        let mut payload = vec![0u8; BLOCK_SIZE];
        loop {
            // End of stream is only noticed here, before a block is built, so
            // an exact multiple of BLOCK_SIZE never gets a trailing empty block.
            let amt = read_block(source, &mut payload)?;
            if amt == 0 {
                log::debug!("Source exhausted after {} blocks", self.stats.blocks);
                return Ok(());
            }

            let packet = encode_data(self.block, &payload[..amt])?;
            self.exchange_block(&packet)?;
            self.stats.blocks += 1;
            self.stats.bytes += amt as u64;
            log::debug!("Block {} acknowledged ({} bytes)", self.block, amt);

            self.block = self.block.wrapping_add(1);
        }
    }

    // Sends one DATA packet until its ACK arrives or the budget runs out.
    fn exchange_block(&mut self, packet: &[u8]) -> Result<()> {
        self.attempt = 0;
        while self.attempt < self.policy.max_attempts {
            self.attempt += 1;
            self.timeout = self.policy.timeout_for(self.attempt);
            if self.attempt > 1 {
                self.stats.retransmits += 1;
            }

            self.state = SessionState::Exchanging;
            self.socket.send(packet)?;
            self.state = SessionState::AwaitingPeer;

            if self.await_ack()? {
                self.timeout = self.policy.timeout_for(1);
                return Ok(());
            }
            log::warn!(
                "Timeout while waiting for ACK #{}, attempt {}/{}",
                self.block,
                self.attempt,
                self.policy.max_attempts
            );
        }

        Err(TransferError::AckTimeoutExhausted {
            block: self.block,
            attempts: self.attempt,
        })
    }

    // Ok(true) on the matching ACK, Ok(false) once the attempt's wait is over.
    fn await_ack(&mut self) -> Result<bool> {
        let deadline = Instant::now() + self.timeout;
        let mut remaining = self.timeout;
        let mut buf = [0u8; MAX_PACKET_SIZE];

        loop {
            self.socket.set_read_timeout(remaining)?;
            let amt = match self.socket.recv(&mut buf) {
                Ok(amt) => amt,
                Err(e) if is_timeout(&e) => return Ok(false),
                Err(e) => return Err(e.into()),
            };

            let datagram = &buf[..amt];
            if is_ack_for(datagram, self.block) {
                return Ok(true);
            }
            let (op, field) = decode_header(datagram)?;
            match Opcode::from_byte(op) {
                Some(Opcode::Error) => {
                    let (code, message) = decode_error(datagram)?;
                    return Err(TransferError::Protocol { code, message });
                }
                Some(Opcode::Ack) => {
                    log::debug!("Ignoring ACK #{} while waiting for #{}", field, self.block);
                }
                _ => {
                    log::warn!("Ignoring unexpected packet with opcode {}", op);
                }
            }

            remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(false);
            }
        }
    }
}

// Fills `buf` unless the source ends first.
fn read_block(source: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
