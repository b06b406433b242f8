use super::{packet::Packet, Payload};

/// Additive checksum over both sequence fields and every payload byte.
///
/// Not a CRC: reordered bytes or compensating errors go unnoticed. It only has to catch the
/// corruption a channel emulator injects.
#[must_use]
pub fn compute(seq: i32, ack: i32, payload: &Payload) -> i32 {
    payload
        .iter()
        .fold(seq.wrapping_add(ack), |sum, &b| sum.wrapping_add(b as i32))
}

#[must_use]
pub fn is_corrupted(packet: &Packet) -> bool {
    compute(packet.seq(), packet.ack(), packet.payload()) != packet.checksum()
}
