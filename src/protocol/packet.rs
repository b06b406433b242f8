use std::io::Cursor;

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};

use super::{checksum, DecodingError, Payload, NOT_IN_USE, PAYLOAD_LEN};

pub const PACKET_HDR_LEN: usize = 12;
pub const PACKET_LEN: usize = PACKET_HDR_LEN + PAYLOAD_LEN;

/// Payload of every ACK
pub const ACK_FILLER: Payload = [b'0'; PAYLOAD_LEN];

/// A fixed-size datagram as it travels through the channel.
///
/// Fields are raw wire values: nothing here is trusted until [`Packet::is_corrupted`] has been
/// checked, and even then `seq`/`ack` still need a range check against the sequence space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    seq: i32,
    ack: i32,
    checksum: i32,
    payload: Payload,
}

pub struct PacketBuilder {
    pub seq: i32,
    pub ack: i32,
    pub payload: Payload,
}

impl PacketBuilder {
    /// Seals the packet with a checksum over its current fields
    #[must_use]
    pub fn build(self) -> Packet {
        Packet {
            seq: self.seq,
            ack: self.ack,
            checksum: checksum::compute(self.seq, self.ack, &self.payload),
            payload: self.payload,
        }
    }
}

impl Packet {
    #[must_use]
    pub fn data(seq: i32, payload: Payload) -> Packet {
        PacketBuilder {
            seq,
            ack: NOT_IN_USE,
            payload,
        }
        .build()
    }

    #[must_use]
    pub fn ack_for(ack: i32) -> Packet {
        PacketBuilder {
            seq: 0,
            ack,
            payload: ACK_FILLER,
        }
        .build()
    }

    /// Decodes any `PACKET_LEN` bytes, corrupted content included
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodingError> {
        if bytes.len() != PACKET_LEN {
            return Err(DecodingError::Length { len: bytes.len() });
        }
        let mut rdr = Cursor::new(bytes);
        let seq = rdr
            .read_i32::<BigEndian>()
            .map_err(|_e| DecodingError::Decoding { field: "seq" })?;
        let ack = rdr
            .read_i32::<BigEndian>()
            .map_err(|_e| DecodingError::Decoding { field: "ack" })?;
        let checksum = rdr
            .read_i32::<BigEndian>()
            .map_err(|_e| DecodingError::Decoding { field: "checksum" })?;
        let mut payload = [0; PAYLOAD_LEN];
        payload.copy_from_slice(&bytes[PACKET_HDR_LEN..]);

        Ok(Packet {
            seq,
            ack,
            checksum,
            payload,
        })
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; PACKET_LEN] {
        let mut bytes = [0; PACKET_LEN];
        BigEndian::write_i32(&mut bytes[0..4], self.seq);
        BigEndian::write_i32(&mut bytes[4..8], self.ack);
        BigEndian::write_i32(&mut bytes[8..12], self.checksum);
        bytes[PACKET_HDR_LEN..].copy_from_slice(&self.payload);
        bytes
    }

    pub fn append_to(&self, wtr: &mut Vec<u8>) {
        wtr.extend_from_slice(&self.to_bytes());
    }

    #[must_use]
    #[inline]
    pub fn is_corrupted(&self) -> bool {
        checksum::is_corrupted(self)
    }

    #[must_use]
    #[inline]
    pub fn seq(&self) -> i32 {
        self.seq
    }

    #[must_use]
    #[inline]
    pub fn ack(&self) -> i32 {
        self.ack
    }

    #[must_use]
    #[inline]
    pub fn checksum(&self) -> i32 {
        self.checksum
    }

    #[must_use]
    #[inline]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test1() {
        let packet1 = Packet::data(4, *b"dddddddddddddddddddd");
        let mut wtr = Vec::new();
        packet1.append_to(&mut wtr);
        assert_eq!(wtr.len(), PACKET_LEN);
        assert_eq!(&wtr[0..4], &[0, 0, 0, 4]);
        assert_eq!(&wtr[4..8], &[0xff, 0xff, 0xff, 0xff]);
        let packet2 = Packet::from_bytes(&wtr).unwrap();
        assert_eq!(packet1, packet2);
        assert!(!packet2.is_corrupted());
    }

    #[test]
    fn ack_layout() {
        let ack = Packet::ack_for(3);
        assert_eq!(ack.seq(), 0);
        assert_eq!(ack.ack(), 3);
        assert_eq!(ack.payload(), &ACK_FILLER);
        assert!(!ack.is_corrupted());
    }

    #[test]
    fn corrupted_header_decodes_but_fails_checksum() {
        let packet = Packet::data(1, [7; PAYLOAD_LEN]);
        let mut bytes = packet.to_bytes();
        bytes[3] ^= 0x40;
        let decoded = Packet::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.seq(), 1 ^ 0x40);
        assert!(decoded.is_corrupted());
    }

    #[test]
    fn wrong_length() {
        assert_eq!(
            Packet::from_bytes(&[0; PACKET_LEN - 1]),
            Err(DecodingError::Length {
                len: PACKET_LEN - 1
            })
        );
        assert_eq!(
            Packet::from_bytes(&[]),
            Err(DecodingError::Length { len: 0 })
        );
    }
}
