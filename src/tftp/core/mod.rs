//! Core protocol pieces shared by every transfer:
//! - `packet`: wire encoding and decoding of the five packet kinds
//! - `socket`: the datagram transport abstraction and its UDP endpoint

mod packet;
mod socket;

pub use packet::{
    BLOCK_SIZE, DEFAULT_MODE, HEADER_SIZE, MAX_PACKET_SIZE, Opcode, Packet, RequestKind,
    decode_error, decode_header, encode_ack, encode_data, encode_error, encode_request,
    is_ack_for,
};
pub use socket::{Socket, UdpEndpoint, is_timeout};
