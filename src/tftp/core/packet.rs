use crate::tftp::error::{Result, TransferError};

/// Payload size of a full DATA block. Anything shorter ends the transfer.
pub const BLOCK_SIZE: usize = 512;
/// Opcode plus block number / error code.
pub const HEADER_SIZE: usize = 4;
/// Largest datagram the client sends or reads.
pub const MAX_PACKET_SIZE: usize = HEADER_SIZE + BLOCK_SIZE;
/// The only transfer mode the client requests.
pub const DEFAULT_MODE: &str = "octet";

/// Wire opcodes. Only the low byte is ever inspected on receive.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Rrq = 1,
    Wrq = 2,
    Data = 3,
    Ack = 4,
    Error = 5,
}

impl Opcode {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Opcode::Rrq),
            2 => Some(Opcode::Wrq),
            3 => Some(Opcode::Data),
            4 => Some(Opcode::Ack),
            5 => Some(Opcode::Error),
            _ => None,
        }
    }
}

/// Which side of the exchange a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Read,
    Write,
}

impl RequestKind {
    fn opcode(self) -> Opcode {
        match self {
            RequestKind::Read => Opcode::Rrq,
            RequestKind::Write => Opcode::Wrq,
        }
    }
}

/// `[0][1|2][filename][0][mode][0]`
pub fn encode_request(kind: RequestKind, filename: &[u8], mode: &[u8]) -> Result<Vec<u8>> {
    if filename.contains(&0) {
        return Err(TransferError::Encoding(
            "filename contains a zero byte".to_string(),
        ));
    }
    if mode.contains(&0) {
        return Err(TransferError::Encoding(
            "mode contains a zero byte".to_string(),
        ));
    }

    let mut bytes = Vec::with_capacity(2 + filename.len() + 1 + mode.len() + 1);
    bytes.push(0);
    bytes.push(kind.opcode() as u8);
    bytes.extend_from_slice(filename);
    bytes.push(0);
    bytes.extend_from_slice(mode);
    bytes.push(0);
    Ok(bytes)
}

/// `[0][3][blockHi][blockLo][payload]`
pub fn encode_data(block: u16, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > BLOCK_SIZE {
        return Err(TransferError::Encoding(format!(
            "payload of {} bytes exceeds block size {}",
            payload.len(),
            BLOCK_SIZE
        )));
    }

    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.push(0);
    bytes.push(Opcode::Data as u8);
    bytes.extend_from_slice(&block.to_be_bytes());
    bytes.extend_from_slice(payload);
    Ok(bytes)
}

/// `[0][4][blockHi][blockLo]`
pub fn encode_ack(block: u16) -> [u8; HEADER_SIZE] {
    let [hi, lo] = block.to_be_bytes();
    [0, Opcode::Ack as u8, hi, lo]
}

/// `[0][5][codeHi][codeLo][message][0]`
pub fn encode_error(code: u16, message: &str) -> Result<Vec<u8>> {
    if message.as_bytes().contains(&0) {
        return Err(TransferError::Encoding(
            "error message contains a zero byte".to_string(),
        ));
    }

    let mut bytes = Vec::with_capacity(HEADER_SIZE + message.len() + 1);
    bytes.push(0);
    bytes.push(Opcode::Error as u8);
    bytes.extend_from_slice(&code.to_be_bytes());
    bytes.extend_from_slice(message.as_bytes());
    bytes.push(0);
    Ok(bytes)
}

/// Returns the opcode byte and the 16-bit block number (or error code).
pub fn decode_header(bytes: &[u8]) -> Result<(u8, u16)> {
    if bytes.len() < HEADER_SIZE {
        return Err(TransferError::Decoding {
            len: bytes.len(),
            reason: "shorter than the 4-byte header",
        });
    }
    Ok((bytes[1], u16::from_be_bytes([bytes[2], bytes[3]])))
}

pub fn is_ack_for(bytes: &[u8], expected_block: u16) -> bool {
    matches!(
        decode_header(bytes),
        Ok((op, block)) if op == Opcode::Ack as u8 && block == expected_block
    )
}

/// Error code and message of an ERROR packet. Only the header is validated;
/// the opcode is the caller's concern.
pub fn decode_error(bytes: &[u8]) -> Result<(u16, String)> {
    let (_, code) = decode_header(bytes)?;
    Ok((code, error_message(&bytes[HEADER_SIZE..])))
}

/// A received datagram, borrowing from the receive buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet<'a> {
    Request {
        kind: RequestKind,
        filename: &'a [u8],
        mode: &'a [u8],
    },
    Data {
        block_num: u16,
        data: &'a [u8],
    },
    Ack(u16),
    Error {
        code: u16,
        msg: String,
    },
    Unknown(u8),
}

impl<'a> Packet<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let (op, field) = decode_header(bytes)?;

        let packet = match Opcode::from_byte(op) {
            Some(Opcode::Rrq) | Some(Opcode::Wrq) => {
                let kind = if op == Opcode::Rrq as u8 {
                    RequestKind::Read
                } else {
                    RequestKind::Write
                };
                let (filename, rest) = split_cstr(&bytes[2..]).ok_or(TransferError::Decoding {
                    len: bytes.len(),
                    reason: "missing filename terminator",
                })?;
                let (mode, _) = split_cstr(rest).ok_or(TransferError::Decoding {
                    len: bytes.len(),
                    reason: "missing mode terminator",
                })?;
                Packet::Request {
                    kind,
                    filename,
                    mode,
                }
            }
            Some(Opcode::Data) => Packet::Data {
                block_num: field,
                data: &bytes[HEADER_SIZE..],
            },
            Some(Opcode::Ack) => Packet::Ack(field),
            Some(Opcode::Error) => Packet::Error {
                code: field,
                msg: error_message(&bytes[HEADER_SIZE..]),
            },
            None => Packet::Unknown(op),
        };

        Ok(packet)
    }
}

// Splits at the first zero byte, dropping the terminator.
fn split_cstr(buf: &[u8]) -> Option<(&[u8], &[u8])> {
    let pos = buf.iter().position(|&b| b == 0)?;
    Some((&buf[..pos], &buf[pos + 1..]))
}

// Servers do not always terminate the message, so read to the end if needed.
fn error_message(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_request() {
        let bytes = encode_request(RequestKind::Read, b"notes.txt", b"octet").unwrap();
        assert_eq!(bytes, b"\x00\x01notes.txt\x00octet\x00".to_vec());

        let bytes = encode_request(RequestKind::Write, b"a", DEFAULT_MODE.as_bytes()).unwrap();
        assert_eq!(bytes, b"\x00\x02a\x00octet\x00".to_vec());
    }

    #[test]
    fn test_encode_request_rejects_zero_byte() {
        let err = encode_request(RequestKind::Read, b"bad\0name", b"octet").unwrap_err();
        assert!(matches!(err, TransferError::Encoding(_)));

        let err = encode_request(RequestKind::Write, b"file", b"oc\0tet").unwrap_err();
        assert!(matches!(err, TransferError::Encoding(_)));
    }

    #[test]
    fn test_data_header_decodes_back() {
        let payload = vec![0xAB; BLOCK_SIZE];
        for block in [0u16, 1, 255, 256, 4097, u16::MAX] {
            for len in [0, 1, 511, 512] {
                let bytes = encode_data(block, &payload[..len]).unwrap();
                assert_eq!(bytes.len(), HEADER_SIZE + len);
                assert_eq!(decode_header(&bytes).unwrap(), (3, block));
            }
        }
    }

    #[test]
    fn test_encode_data_rejects_oversized_payload() {
        let payload = vec![0; BLOCK_SIZE + 1];
        assert!(matches!(
            encode_data(1, &payload),
            Err(TransferError::Encoding(_))
        ));
    }

    #[test]
    fn test_data_block_number_is_big_endian() {
        let bytes = encode_data(0x1234, b"xy").unwrap();
        assert_eq!(bytes, vec![0, 3, 0x12, 0x34, b'x', b'y']);
    }

    #[test]
    fn test_is_ack_for() {
        for block in [0u16, 1, 2, 511, 65534, 65535] {
            let ack = encode_ack(block);
            assert!(is_ack_for(&ack, block));
            assert!(!is_ack_for(&ack, block.wrapping_add(1)));
            assert!(!is_ack_for(&ack, block.wrapping_sub(1)));
        }
    }

    #[test]
    fn test_is_ack_for_rejects_other_opcodes() {
        let data = encode_data(7, b"").unwrap();
        assert!(!is_ack_for(&data, 7));
        assert!(!is_ack_for(&[0, 4, 0], 0));
    }

    #[test]
    fn test_decode_header_too_short() {
        for len in 0..HEADER_SIZE {
            let buf = vec![0u8; len];
            match decode_header(&buf) {
                Err(TransferError::Decoding { len: got, .. }) => assert_eq!(got, len),
                other => panic!("unexpected result: {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_packets() {
        let ack = encode_ack(9);
        assert_eq!(Packet::parse(&ack).unwrap(), Packet::Ack(9));

        let data = encode_data(3, b"hello").unwrap();
        assert_eq!(
            Packet::parse(&data).unwrap(),
            Packet::Data {
                block_num: 3,
                data: b"hello"
            }
        );

        let error = encode_error(1, "File not found").unwrap();
        assert_eq!(
            Packet::parse(&error).unwrap(),
            Packet::Error {
                code: 1,
                msg: "File not found".to_string()
            }
        );

        let rrq = encode_request(RequestKind::Read, b"boot.img", b"octet").unwrap();
        assert_eq!(
            Packet::parse(&rrq).unwrap(),
            Packet::Request {
                kind: RequestKind::Read,
                filename: b"boot.img",
                mode: b"octet"
            }
        );

        assert_eq!(Packet::parse(&[0, 6, 0, 0]).unwrap(), Packet::Unknown(6));
    }

    #[test]
    fn test_parse_unterminated_error_message() {
        let bytes = [0, 5, 0, 0, b'o', b'o', b'p', b's'];
        assert_eq!(
            Packet::parse(&bytes).unwrap(),
            Packet::Error {
                code: 0,
                msg: "oops".to_string()
            }
        );
    }

    #[test]
    fn test_decode_error() {
        let bytes = encode_error(1, "File not found").unwrap();
        assert_eq!(
            decode_error(&bytes).unwrap(),
            (1, "File not found".to_string())
        );
        assert_eq!(decode_error(&[0, 5, 0, 7]).unwrap(), (7, String::new()));
        assert!(decode_error(&[0, 5]).is_err());
    }

    #[test]
    fn test_parse_request_missing_terminator() {
        let bytes = b"\x00\x02name-without-end";
        assert!(matches!(
            Packet::parse(bytes),
            Err(TransferError::Decoding { .. })
        ));
    }
}
