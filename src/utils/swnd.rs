use crate::{
    protocol::packet::Packet,
    utils::{Seq, SeqSpace},
};

/// One position of the send window per sequence number
#[derive(Debug, Clone, PartialEq)]
pub enum SendSlot {
    /// Never used since the last reset; counts as acknowledged
    Vacant,
    InFlight { packet: Packet, sent_at: f64 },
    Acked { packet: Packet },
}

impl SendSlot {
    #[must_use]
    #[inline]
    pub fn is_settled(&self) -> bool {
        match self {
            SendSlot::Vacant => true,
            SendSlot::InFlight { .. } => false,
            SendSlot::Acked { .. } => true,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AckOutcome {
    NewlyAcked,
    Duplicate,
    OutOfWnd,
}

/// Sender side window: `[start, end)` are the packets sent and not yet slid past
pub struct Swnd {
    space: SeqSpace,
    slots: Vec<SendSlot>,
    start: Seq,
    end: Seq, // exclusive
}

impl Swnd {
    fn check_rep(&self) {
        assert_eq!(self.slots.len(), self.space.modulus() as usize);
        assert!(self.size() <= self.space.wnd_size() as usize);
        let mut seq = self.start;
        while seq != self.end {
            match &self.slots[self.space.space_slot(seq)] {
                SendSlot::Vacant => panic!("slot of outstanding seq {:?} is vacant", seq),
                SendSlot::InFlight { packet, .. } | SendSlot::Acked { packet } => {
                    assert_eq!(packet.seq(), seq.to_wire());
                }
            }
            self.space.increment(&mut seq);
        }
    }

    #[must_use]
    pub fn new(space: SeqSpace) -> Self {
        let this = Swnd {
            space,
            slots: vec![SendSlot::Vacant; space.modulus() as usize],
            start: Seq::zero(),
            end: Seq::zero(),
        };
        this.check_rep();
        this
    }

    pub fn reset(&mut self) {
        self.slots.fill(SendSlot::Vacant);
        self.start = Seq::zero();
        self.end = Seq::zero();
        self.check_rep();
    }

    #[must_use]
    #[inline]
    pub fn start(&self) -> Seq {
        self.start
    }

    #[must_use]
    #[inline]
    pub fn end(&self) -> Seq {
        self.end
    }

    #[must_use]
    #[inline]
    pub fn size(&self) -> usize {
        self.space.distance(self.start, self.end) as usize
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[must_use]
    #[inline]
    pub fn is_full(&self) -> bool {
        self.space.wnd_size() as usize <= self.size()
    }

    #[must_use]
    pub fn slot(&self, seq: Seq) -> &SendSlot {
        &self.slots[self.space.space_slot(seq)]
    }

    /// Claims the slot of `end` for `packet` and moves `end` forward
    pub fn push_back(&mut self, packet: Packet, now: f64) -> Seq {
        assert!(!self.is_full());
        assert_eq!(packet.seq(), self.end.to_wire());
        let seq = self.end;
        let i = self.space.space_slot(seq);
        self.slots[i] = SendSlot::InFlight {
            packet,
            sent_at: now,
        };
        self.space.increment(&mut self.end);
        self.check_rep();
        seq
    }

    #[must_use]
    pub fn ack(&mut self, seq: Seq) -> AckOutcome {
        // `end` itself is never outstanding, so the window here is `[start, end)`
        if self.space.distance(self.start, seq) >= self.space.distance(self.start, self.end) {
            return AckOutcome::OutOfWnd;
        }
        let i = self.space.space_slot(seq);
        let outcome = match std::mem::replace(&mut self.slots[i], SendSlot::Vacant) {
            SendSlot::InFlight { packet, .. } => {
                self.slots[i] = SendSlot::Acked { packet };
                AckOutcome::NewlyAcked
            }
            settled => {
                self.slots[i] = settled;
                AckOutcome::Duplicate
            }
        };
        self.check_rep();
        outcome
    }

    /// Moves `start` past every contiguously settled slot; returns how far it moved
    pub fn slide(&mut self) -> usize {
        let mut moved = 0;
        while self.start != self.end && self.slot(self.start).is_settled() {
            self.space.increment(&mut self.start);
            moved += 1;
        }
        self.check_rep();
        moved
    }

    /// Restamps and returns every outstanding unacknowledged packet sent at least `rto` ago
    #[must_use]
    pub fn take_expired(&mut self, now: f64, rto: f64) -> Vec<Packet> {
        let mut expired = Vec::new();
        let mut seq = self.start;
        while seq != self.end {
            let i = self.space.space_slot(seq);
            if let SendSlot::InFlight { packet, sent_at } = &mut self.slots[i] {
                if *sent_at + rto <= now {
                    *sent_at = now;
                    expired.push(packet.clone());
                }
            }
            self.space.increment(&mut seq);
        }
        self.check_rep();
        expired
    }
}
