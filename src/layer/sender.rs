use tracing::{debug, trace};

use crate::{
    protocol::{packet::Packet, Payload, RTT, SEQSPACE, WINDOWSIZE},
    utils::{AckOutcome, SendSlot, Seq, SeqSpace, SeqSpaceError, Swnd},
};

use super::{Entity, EntityId, Host, SendError};

const ENTITY: EntityId = EntityId::A;

/// Sending end of a Selective-Repeat pair.
///
/// Every packet in the window is acknowledged on its own. The window only slides when its oldest
/// packet is acknowledged, then past every acknowledged packet behind it. A single timer covers the
/// whole window; on expiry each unacknowledged packet that has waited a full `rtt` since it was
/// last sent goes out again.
pub struct Sender {
    space: SeqSpace,
    swnd: Swnd,
    rtt: f64,
    stat: LocalStat,
}

pub struct SenderBuilder {
    pub seq_space: u32,
    pub wnd_size: u32,
    pub rtt: f64,
}

impl SenderBuilder {
    pub fn build(self) -> Result<Sender, BuildError> {
        let space = SeqSpace::new(self.seq_space, self.wnd_size).map_err(BuildError::SeqSpace)?;
        if !(self.rtt > 0.0) {
            return Err(BuildError::NonPositiveRtt);
        }
        let this = Sender {
            space,
            swnd: Swnd::new(space),
            rtt: self.rtt,
            stat: LocalStat {
                packets_sent: 0,
                window_full: 0,
                acks: 0,
                new_acks: 0,
                corrupted_acks: 0,
                retransmissions: 0,
            },
        };
        this.check_rep();
        Ok(this)
    }

    #[must_use]
    pub fn default() -> SenderBuilder {
        SenderBuilder {
            seq_space: SEQSPACE,
            wnd_size: WINDOWSIZE,
            rtt: RTT,
        }
    }
}

#[derive(Debug)]
pub enum BuildError {
    SeqSpace(SeqSpaceError),
    NonPositiveRtt,
}

impl Sender {
    #[inline]
    fn check_rep(&self) {
        assert!(self.swnd.size() <= self.space.wnd_size() as usize);
    }

    #[must_use]
    pub fn stat(&self) -> Stat {
        Stat {
            packets_sent: self.stat.packets_sent,
            window_full: self.stat.window_full,
            acks: self.stat.acks,
            new_acks: self.stat.new_acks,
            corrupted_acks: self.stat.corrupted_acks,
            retransmissions: self.stat.retransmissions,
            base: self.swnd.start(),
            next_seq: self.swnd.end(),
        }
    }

    /// Oldest unacknowledged sequence number
    #[must_use]
    #[inline]
    pub fn base(&self) -> Seq {
        self.swnd.start()
    }

    /// Sequence number the next accepted message gets
    #[must_use]
    #[inline]
    pub fn next_seq(&self) -> Seq {
        self.swnd.end()
    }

    /// `(next_seq - base) mod seq_space`
    #[must_use]
    #[inline]
    pub fn occupancy(&self) -> usize {
        self.swnd.size()
    }

    #[must_use]
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.swnd.is_empty()
    }

    #[must_use]
    pub fn slot(&self, seq: Seq) -> &SendSlot {
        self.swnd.slot(seq)
    }

    #[must_use]
    #[inline]
    pub fn seq_space(&self) -> SeqSpace {
        self.space
    }

    fn handle_ack(&mut self, ack: i32) {
        let seq = match self.space.seq_from_wire(ack) {
            Some(seq) => seq,
            None => {
                trace!("ACK {} is not a sequence number, ignoring", ack);
                return;
            }
        };
        match self.swnd.ack(seq) {
            AckOutcome::NewlyAcked => {
                debug!("ACK {} is new", ack);
                self.stat.new_acks += 1;
            }
            AckOutcome::Duplicate => trace!("ACK {} is a duplicate", ack),
            AckOutcome::OutOfWnd => trace!("ACK {} is outside of the send window", ack),
        }
    }
}

impl Entity for Sender {
    fn init(&mut self) {
        self.swnd.reset();
        self.check_rep();
    }

    fn submit(&mut self, host: &mut impl Host, message: Payload) -> Result<(), SendError<Payload>> {
        if self.swnd.is_full() {
            debug!("new message arrives, send window is full");
            self.stat.window_full += 1;
            return Err(SendError(message));
        }

        let was_idle = self.swnd.is_empty();
        let packet = Packet::data(self.swnd.end().to_wire(), message);
        debug!("sending packet {}", packet.seq());
        self.swnd.push_back(packet.clone(), host.now());
        host.transmit(ENTITY, packet);
        if was_idle {
            host.start_timer(ENTITY, self.rtt);
        }
        self.stat.packets_sent += 1;

        self.check_rep();
        Ok(())
    }

    fn on_packet(&mut self, host: &mut impl Host, packet: Packet) {
        if packet.is_corrupted() {
            debug!("corrupted ACK is received, ignoring");
            self.stat.corrupted_acks += 1;
            return;
        }
        self.stat.acks += 1;
        self.handle_ack(packet.ack());

        let moved = self.swnd.slide();
        if moved > 0 {
            trace!("send window slid by {} to base {:?}", moved, self.swnd.start());
        }

        host.stop_timer(ENTITY);
        if !self.swnd.is_empty() {
            host.start_timer(ENTITY, self.rtt);
        }
        self.check_rep();
    }

    fn on_timeout(&mut self, host: &mut impl Host) {
        debug!("timeout, resending expired packets");
        for packet in self.swnd.take_expired(host.now(), self.rtt) {
            debug!("resending packet {}", packet.seq());
            host.transmit(ENTITY, packet);
            self.stat.retransmissions += 1;
        }
        host.start_timer(ENTITY, self.rtt);
        self.check_rep();
    }
}

struct LocalStat {
    packets_sent: u64,
    window_full: u64,
    acks: u64,
    new_acks: u64,
    corrupted_acks: u64,
    retransmissions: u64,
}

#[derive(Debug, PartialEq)]
pub struct Stat {
    /// First transmissions only
    pub packets_sent: u64,
    /// Messages turned away because the window was full
    pub window_full: u64,
    /// Uncorrupted ACKs
    pub acks: u64,
    pub new_acks: u64,
    pub corrupted_acks: u64,
    pub retransmissions: u64,
    pub base: Seq,
    pub next_seq: Seq,
}
