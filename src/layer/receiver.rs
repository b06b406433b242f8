use tracing::{debug, trace};

use crate::{
    protocol::{packet::Packet, Payload, SEQSPACE, WINDOWSIZE},
    utils::{InsertOutcome, Rwnd, Seq, SeqSpace, SeqSpaceError},
};

use super::{Entity, EntityId, Host, SendError};

const ENTITY: EntityId = EntityId::B;

/// What the ACK of a corrupted frame acknowledges
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CorruptFrameAck {
    /// The frame's own `seq` field, whatever it reads
    EchoSeq,
    /// The most recently delivered sequence number, which the sender never has to resend
    LastDelivered,
}

/// Receiving end of a Selective-Repeat pair.
///
/// Buffers any uncorrupted frame inside `[expected, expected + wnd_size)`, hands the application
/// every contiguous run starting at `expected`, and answers every frame with an ACK naming the
/// frame that arrived.
pub struct Receiver {
    space: SeqSpace,
    rwnd: Rwnd,
    corrupt_frame_ack: CorruptFrameAck,
    stat: LocalStat,
}

pub struct ReceiverBuilder {
    pub seq_space: u32,
    pub wnd_size: u32,
    pub corrupt_frame_ack: CorruptFrameAck,
}

impl ReceiverBuilder {
    pub fn build(self) -> Result<Receiver, BuildError> {
        let space = SeqSpace::new(self.seq_space, self.wnd_size).map_err(BuildError::SeqSpace)?;
        let this = Receiver {
            space,
            rwnd: Rwnd::new(space),
            corrupt_frame_ack: self.corrupt_frame_ack,
            stat: LocalStat {
                frames: 0,
                corrupted: 0,
                out_of_wnd: 0,
                duplicates: 0,
                delivered: 0,
                acks: 0,
            },
        };
        this.check_rep();
        Ok(this)
    }

    #[must_use]
    pub fn default() -> ReceiverBuilder {
        ReceiverBuilder {
            seq_space: SEQSPACE,
            wnd_size: WINDOWSIZE,
            corrupt_frame_ack: CorruptFrameAck::EchoSeq,
        }
    }
}

#[derive(Debug)]
pub enum BuildError {
    SeqSpace(SeqSpaceError),
}

impl Receiver {
    #[inline]
    fn check_rep(&self) {
        assert!(self.rwnd.buffered_len() < self.space.wnd_size() as usize);
    }

    #[must_use]
    pub fn stat(&self) -> Stat {
        Stat {
            frames: self.stat.frames,
            corrupted: self.stat.corrupted,
            out_of_wnd: self.stat.out_of_wnd,
            duplicates: self.stat.duplicates,
            delivered: self.stat.delivered,
            acks: self.stat.acks,
            buffered: self.rwnd.buffered_len(),
            next_seq_to_receive: self.rwnd.next_seq_to_receive(),
        }
    }

    #[must_use]
    #[inline]
    pub fn expected(&self) -> Seq {
        self.rwnd.next_seq_to_receive()
    }

    #[must_use]
    #[inline]
    pub fn seq_space(&self) -> SeqSpace {
        self.space
    }

    fn handle_frame(&mut self, host: &mut impl Host, packet: Packet) {
        let seq = match self.space.seq_from_wire(packet.seq()) {
            Some(seq) => seq,
            None => {
                debug!("packet {} is outside window, resend ACK", packet.seq());
                self.stat.out_of_wnd += 1;
                return;
            }
        };
        match self.rwnd.insert(seq, packet) {
            InsertOutcome::Buffered => {
                debug!("packet {} is correctly received, send ACK", seq.to_u32());
            }
            InsertOutcome::Duplicate => {
                trace!("packet {} is already buffered", seq.to_u32());
                self.stat.duplicates += 1;
            }
            InsertOutcome::OutOfWnd => {
                debug!("packet {} is outside window, resend ACK", seq.to_u32());
                self.stat.out_of_wnd += 1;
            }
        }

        while let Some(packet) = self.rwnd.pop_next() {
            trace!("delivering packet {}", packet.seq());
            host.deliver(ENTITY, *packet.payload());
            self.stat.delivered += 1;
        }
    }
}

impl Entity for Receiver {
    fn init(&mut self) {
        self.rwnd.reset();
        self.check_rep();
    }

    /// Simplex: the receiver never originates data
    fn submit(
        &mut self,
        _host: &mut impl Host,
        _message: Payload,
    ) -> Result<(), SendError<Payload>> {
        Ok(())
    }

    fn on_packet(&mut self, host: &mut impl Host, packet: Packet) {
        self.stat.frames += 1;
        let received_seq = packet.seq();

        let ack = if packet.is_corrupted() {
            self.stat.corrupted += 1;
            match self.corrupt_frame_ack {
                CorruptFrameAck::EchoSeq => received_seq,
                CorruptFrameAck::LastDelivered => {
                    let expected = self.rwnd.next_seq_to_receive();
                    self.space.add(expected, self.space.modulus() - 1).to_wire()
                }
            }
        } else {
            self.handle_frame(host, packet);
            received_seq
        };

        if ack == received_seq {
            debug!("sending ACK {}", ack);
        } else {
            debug!("packet corrupted, resending ACK {}", ack);
        }
        host.transmit(ENTITY, Packet::ack_for(ack));
        self.stat.acks += 1;
        self.check_rep();
    }

    /// No timer is ever started for the receiver
    fn on_timeout(&mut self, _host: &mut impl Host) {}
}

struct LocalStat {
    frames: u64,
    corrupted: u64,
    out_of_wnd: u64,
    duplicates: u64,
    delivered: u64,
    acks: u64,
}

#[derive(Debug, PartialEq)]
pub struct Stat {
    pub frames: u64,
    pub corrupted: u64,
    /// Already delivered or too far ahead
    pub out_of_wnd: u64,
    pub duplicates: u64,
    pub delivered: u64,
    pub acks: u64,
    /// Held back by a gap right now
    pub buffered: usize,
    pub next_seq_to_receive: Seq,
}
