pub mod receiver;
pub mod sender;

#[cfg(test)]
pub(crate) mod test_host;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::protocol::{packet::Packet, Payload, RTT, SEQSPACE, WINDOWSIZE};
pub use receiver::{CorruptFrameAck, Receiver, ReceiverBuilder};
pub use sender::{Sender, SenderBuilder};

/// The two ends of the simplex channel
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum EntityId {
    /// Sender
    A = 0,
    /// Receiver
    B = 1,
}

impl EntityId {
    #[must_use]
    pub fn peer(&self) -> EntityId {
        match self {
            EntityId::A => EntityId::B,
            EntityId::B => EntityId::A,
        }
    }
}

/// What the protocol needs from its surroundings: a lossy channel, an application sink, one
/// retransmission timer per entity and a clock.
///
/// Starting a running timer restarts its deadline; stopping a stopped timer is a no-op.
#[cfg_attr(test, mockall::automock)]
pub trait Host {
    fn transmit(&mut self, entity: EntityId, packet: Packet);
    fn deliver(&mut self, entity: EntityId, payload: Payload);
    fn start_timer(&mut self, entity: EntityId, interval: f64);
    fn stop_timer(&mut self, entity: EntityId);
    fn now(&self) -> f64;
}

/// Event handlers of one protocol entity. Each runs to completion.
pub trait Entity {
    /// Back to the initial state, as if freshly built
    fn init(&mut self);

    /// A message from the application; handed back if it cannot be taken now
    fn submit(&mut self, host: &mut impl Host, message: Payload) -> Result<(), SendError<Payload>>;

    fn on_packet(&mut self, host: &mut impl Host, packet: Packet);

    fn on_timeout(&mut self, host: &mut impl Host);
}

/// The message was not taken; the caller may retry it later
#[derive(Debug, PartialEq, Eq)]
pub struct SendError<T>(pub T);

pub struct Builder {
    pub seq_space: u32,
    pub wnd_size: u32,
    pub rtt: f64,
    pub corrupt_frame_ack: CorruptFrameAck,
}

impl Builder {
    pub fn build(self) -> Result<(Sender, Receiver), BuildError> {
        let sender = SenderBuilder {
            seq_space: self.seq_space,
            wnd_size: self.wnd_size,
            rtt: self.rtt,
        }
        .build()
        .map_err(BuildError::Sender)?;
        let receiver = ReceiverBuilder {
            seq_space: self.seq_space,
            wnd_size: self.wnd_size,
            corrupt_frame_ack: self.corrupt_frame_ack,
        }
        .build()
        .map_err(BuildError::Receiver)?;
        Ok((sender, receiver))
    }

    #[must_use]
    pub fn default() -> Self {
        Builder {
            seq_space: SEQSPACE,
            wnd_size: WINDOWSIZE,
            rtt: RTT,
            corrupt_frame_ack: CorruptFrameAck::EchoSeq,
        }
    }
}

#[derive(Debug)]
pub enum BuildError {
    Sender(sender::BuildError),
    Receiver(receiver::BuildError),
}
