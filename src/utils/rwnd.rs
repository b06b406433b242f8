use crate::{
    protocol::packet::Packet,
    utils::{Seq, SeqLocationToWnd, SeqSpace},
};

/// One receive buffer position per sequence number
#[derive(Debug, Clone, PartialEq)]
pub enum RecvSlot {
    Empty,
    Buffered(Packet),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum InsertOutcome {
    Buffered,
    /// Already buffered and not yet delivered
    Duplicate,
    /// Already delivered, or too far ahead
    OutOfWnd,
}

pub struct Rwnd {
    space: SeqSpace,
    slots: Vec<RecvSlot>,
    next_seq_to_receive: Seq,
}

impl Rwnd {
    fn check_rep(&self) {
        assert_eq!(self.slots.len(), self.space.modulus() as usize);
        for (i, slot) in self.slots.iter().enumerate() {
            if let RecvSlot::Buffered(packet) = slot {
                let seq = self.space.seq(i as u32);
                assert_eq!(packet.seq(), seq.to_wire());
                assert!(self.space.in_wnd(self.next_seq_to_receive, seq));
            }
        }
    }

    #[must_use]
    pub fn new(space: SeqSpace) -> Self {
        let this = Rwnd {
            space,
            slots: vec![RecvSlot::Empty; space.modulus() as usize],
            next_seq_to_receive: Seq::zero(),
        };
        this.check_rep();
        this
    }

    pub fn reset(&mut self) {
        self.slots.fill(RecvSlot::Empty);
        self.next_seq_to_receive = Seq::zero();
        self.check_rep();
    }

    #[must_use]
    #[inline]
    pub fn next_seq_to_receive(&self) -> Seq {
        self.next_seq_to_receive
    }

    #[must_use]
    #[inline]
    pub fn location(&self, seq: Seq) -> SeqLocationToWnd {
        self.space.location(self.next_seq_to_receive, seq)
    }

    #[must_use]
    pub fn is_buffered(&self, seq: Seq) -> bool {
        matches!(self.slots[self.space.space_slot(seq)], RecvSlot::Buffered(_))
    }

    /// Number of packets held back by a gap
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, RecvSlot::Buffered(_)))
            .count()
    }

    #[must_use]
    pub fn insert(&mut self, seq: Seq, packet: Packet) -> InsertOutcome {
        let outcome = match self.location(seq) {
            SeqLocationToWnd::OutOfWnd => InsertOutcome::OutOfWnd,
            SeqLocationToWnd::AtWndStart | SeqLocationToWnd::InWnd => {
                let slot = &mut self.slots[self.space.space_slot(seq)];
                match slot {
                    RecvSlot::Buffered(_) => InsertOutcome::Duplicate,
                    RecvSlot::Empty => {
                        *slot = RecvSlot::Buffered(packet);
                        InsertOutcome::Buffered
                    }
                }
            }
        };
        self.check_rep();
        outcome
    }

    /// Takes the packet at the window start if it has arrived, advancing the window
    #[must_use]
    pub fn pop_next(&mut self) -> Option<Packet> {
        let i = self.space.space_slot(self.next_seq_to_receive);
        let ret = match std::mem::replace(&mut self.slots[i], RecvSlot::Empty) {
            RecvSlot::Buffered(packet) => {
                self.space.increment(&mut self.next_seq_to_receive);
                Some(packet)
            }
            RecvSlot::Empty => None,
        };
        self.check_rep();
        ret
    }
}
