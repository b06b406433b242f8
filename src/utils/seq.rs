/// A sequence number that has been range checked against a [`SeqSpace`].
///
/// Raw packet fields stay `i32` since a corrupted packet may carry anything; a `Seq` only exists
/// for values in `[0, seq_space)`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Seq {
    n: u32,
}

impl Seq {
    pub fn zero() -> Self {
        Seq { n: 0 }
    }

    pub fn to_u32(&self) -> u32 {
        self.n
    }

    pub fn to_wire(&self) -> i32 {
        self.n as i32
    }
}

/// Where a sequence number falls relative to a window of `wnd_size` starting at some `start`
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SeqLocationToWnd {
    AtWndStart,
    InWnd,
    OutOfWnd,
}

/// Modulus and window size of one protocol instance.
///
/// All wraparound arithmetic of both peers goes through here.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SeqSpace {
    modulus: u32,
    wnd_size: u32,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SeqSpaceError {
    WndSizeZero,
    SeqSpaceTooSmall { seq_space: u32, wnd_size: u32 },
    SeqSpaceTooLarge { seq_space: u32 },
}

impl SeqSpace {
    fn check_rep(&self) {
        assert!(self.wnd_size > 0);
        assert!(self.wnd_size < self.modulus);
    }

    pub fn new(modulus: u32, wnd_size: u32) -> Result<Self, SeqSpaceError> {
        if wnd_size == 0 {
            return Err(SeqSpaceError::WndSizeZero);
        }
        // `modulus == wnd_size` would make "next expected" and "delivered, wrapped" identical
        if modulus < wnd_size.saturating_add(1) {
            return Err(SeqSpaceError::SeqSpaceTooSmall {
                seq_space: modulus,
                wnd_size,
            });
        }
        if modulus > i32::MAX as u32 {
            return Err(SeqSpaceError::SeqSpaceTooLarge { seq_space: modulus });
        }
        let this = SeqSpace { modulus, wnd_size };
        this.check_rep();
        Ok(this)
    }

    #[must_use]
    #[inline]
    pub fn modulus(&self) -> u32 {
        self.modulus
    }

    #[must_use]
    #[inline]
    pub fn wnd_size(&self) -> u32 {
        self.wnd_size
    }

    /// Accepts a raw wire value only if it names a sequence number of this space
    #[must_use]
    pub fn seq_from_wire(&self, n: i32) -> Option<Seq> {
        if 0 <= n && (n as u32) < self.modulus {
            Some(Seq { n: n as u32 })
        } else {
            None
        }
    }

    #[must_use]
    pub fn seq(&self, n: u32) -> Seq {
        Seq { n: n % self.modulus }
    }

    #[must_use]
    #[inline]
    pub fn add(&self, seq: Seq, n: u32) -> Seq {
        Seq {
            n: ((seq.n as u64 + n as u64) % self.modulus as u64) as u32,
        }
    }

    #[inline]
    pub fn increment(&self, seq: &mut Seq) {
        *seq = self.add(*seq, 1);
    }

    /// `(to - from) mod modulus`
    #[must_use]
    #[inline]
    pub fn distance(&self, from: Seq, to: Seq) -> u32 {
        (to.n + self.modulus - from.n) % self.modulus
    }

    #[must_use]
    pub fn location(&self, start: Seq, seq: Seq) -> SeqLocationToWnd {
        match self.distance(start, seq) {
            0 => SeqLocationToWnd::AtWndStart,
            d if d < self.wnd_size => SeqLocationToWnd::InWnd,
            _ => SeqLocationToWnd::OutOfWnd,
        }
    }

    /// `seq ∈ [start, start + wnd_size)` modulo the space
    #[must_use]
    #[inline]
    pub fn in_wnd(&self, start: Seq, seq: Seq) -> bool {
        self.location(start, seq) != SeqLocationToWnd::OutOfWnd
    }

    /// Position of `seq` in an array of `modulus` window slots
    #[must_use]
    #[inline]
    pub fn space_slot(&self, seq: Seq) -> usize {
        seq.n as usize
    }
}
