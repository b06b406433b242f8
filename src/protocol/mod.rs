//! # Packet
//!
//! All numbers in network byte order (BE).
//!
//! ```text
//! 0               4               8              12 (BYTE)
//! +---------------+---------------+---------------+
//! |      seq      |      ack      |   checksum    |
//! +---------------+---------------+---------------+
//! |                                               |
//! |               payload (20 bytes)              |
//! |                                               |
//! +-----------------------------------------------+
//! ```
//!
//! # Invariants
//!
//! - `ack` is `NOT_IN_USE` on data packets
//! - `checksum` is `seq + ack + sum(payload)` at creation; any mismatch means corruption

pub mod checksum;
pub mod packet;

/// Maximum number of unacknowledged packets in flight
pub const WINDOWSIZE: u32 = 6;
/// Modulus of the sequence numbers; at least `WINDOWSIZE + 1`
pub const SEQSPACE: u32 = 7;
/// Retransmission interval in simulated time units
pub const RTT: f64 = 16.0;
pub const PAYLOAD_LEN: usize = 20;
/// `ack` of a pure data packet
pub const NOT_IN_USE: i32 = -1;

pub type Payload = [u8; PAYLOAD_LEN];

#[derive(Debug, PartialEq, Eq)]
pub enum DecodingError {
    Decoding { field: &'static str },
    Length { len: usize },
}
