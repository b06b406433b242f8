//! Discrete-event network for running a [`Sender`] against a [`Receiver`].
//!
//! | Fault      | Description                                                  |
//! |------------|--------------------------------------------------------------|
//! | Loss       | Drop a packet with probability `loss_prob`.                  |
//! | Corruption | XOR one byte of the encoded packet with probability `corrupt_prob`. |
//!
//! Each direction is FIFO: a packet is scheduled to arrive after every packet sent before it on
//! the same direction. Messages from the application arrive at uniformly random intervals with
//! mean `lambda`. Time is simulated and only moves from one event to the next.

use std::{
    cmp::{Ordering, Reverse},
    collections::HashMap,
};

use keyed_priority_queue::KeyedPriorityQueue;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info, trace};

use crate::{
    layer::{self, receiver, sender, Builder, Entity, EntityId, Host, Receiver, SendError, Sender},
    protocol::{
        packet::{Packet, PACKET_LEN},
        Payload, PAYLOAD_LEN,
    },
};

#[derive(Debug, Clone, Copy, PartialEq)]
struct SimTime(f64);

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
enum EventKey {
    /// One key per entity, so restarting a timer replaces its deadline
    Timer(EntityId),
    Arrival(u64),
    Message(usize),
}

/// Earliest time first, then earliest scheduled first
type EventPriority = Reverse<(SimTime, u64)>;

/// The channel, the timers, the clock and the application sink of both entities
pub struct Network {
    rng: StdRng,
    loss_prob: f64,
    corrupt_prob: f64,
    now: f64,
    events: KeyedPriorityQueue<EventKey, EventPriority>,
    next_event_id: u64,
    in_flight: HashMap<u64, (EntityId, Packet)>,
    last_arrival: [f64; 2],
    delivered: Vec<Payload>,
    stat: NetworkStat,
}

impl Network {
    fn new(rng: StdRng, loss_prob: f64, corrupt_prob: f64) -> Self {
        Network {
            rng,
            loss_prob,
            corrupt_prob,
            now: 0.0,
            events: KeyedPriorityQueue::new(),
            next_event_id: 0,
            in_flight: HashMap::new(),
            last_arrival: [0.0; 2],
            delivered: Vec::new(),
            stat: NetworkStat::default(),
        }
    }

    fn schedule(&mut self, key: EventKey, at: f64) {
        let id = self.next_event_id;
        self.next_event_id += 1;
        self.events.push(key, Reverse((SimTime(at), id)));
    }

    fn pop_event(&mut self) -> Option<(EventKey, f64)> {
        let (key, Reverse((SimTime(at), _))) = self.events.pop()?;
        Some((key, at))
    }

    fn corrupt(&mut self, packet: Packet) -> Packet {
        let mut bytes = packet.to_bytes();
        let i = self.rng.gen_range(0..PACKET_LEN);
        bytes[i] ^= self.rng.gen_range(1..=u8::MAX);
        Packet::from_bytes(&bytes).unwrap_or(packet)
    }

    #[must_use]
    pub fn delivered(&self) -> &[Payload] {
        &self.delivered
    }

    #[must_use]
    pub fn stat(&self) -> NetworkStat {
        self.stat.clone()
    }
}

impl Host for Network {
    fn transmit(&mut self, entity: EntityId, packet: Packet) {
        self.stat.transmitted += 1;
        if self.rng.gen::<f64>() < self.loss_prob {
            debug!("packet from {:?} is lost", entity);
            self.stat.lost += 1;
            return;
        }
        let packet = if self.rng.gen::<f64>() < self.corrupt_prob {
            debug!("packet from {:?} is corrupted", entity);
            self.stat.corrupted += 1;
            self.corrupt(packet)
        } else {
            packet
        };

        let to = entity.peer();
        let last = &mut self.last_arrival[u8::from(to) as usize];
        let arrival = self.now.max(*last) + 1.0 + 9.0 * self.rng.gen::<f64>();
        *last = arrival;

        let id = self.next_event_id;
        self.in_flight.insert(id, (to, packet));
        self.schedule(EventKey::Arrival(id), arrival);
    }

    fn deliver(&mut self, entity: EntityId, payload: Payload) {
        trace!("{:?} delivers a message at {}", entity, self.now);
        self.delivered.push(payload);
    }

    fn start_timer(&mut self, entity: EntityId, interval: f64) {
        self.stat.timer_starts += 1;
        self.schedule(EventKey::Timer(entity), self.now + interval);
    }

    fn stop_timer(&mut self, entity: EntityId) {
        self.stat.timer_stops += 1;
        self.events.remove(&EventKey::Timer(entity));
    }

    fn now(&self) -> f64 {
        self.now
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkStat {
    pub transmitted: u64,
    pub lost: u64,
    pub corrupted: u64,
    pub timer_starts: u64,
    pub timer_stops: u64,
}

pub struct EmulatorBuilder {
    /// Messages the application generates in total
    pub msgs: usize,
    pub loss_prob: f64,
    pub corrupt_prob: f64,
    /// Mean interval between two messages
    pub lambda: f64,
    pub seed: u64,
    /// The run is abandoned past this simulated time
    pub max_time: f64,
    pub layer: Builder,
}

impl EmulatorBuilder {
    pub fn build(self) -> Result<Emulator, BuildError> {
        for (name, value) in [("loss", self.loss_prob), ("corrupt", self.corrupt_prob)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(BuildError::Probability { name, value });
            }
        }
        if !(self.lambda > 0.0) {
            return Err(BuildError::NonPositiveLambda);
        }
        if !(self.max_time.is_finite() && self.max_time >= 0.0) {
            return Err(BuildError::MaxTime {
                value: self.max_time,
            });
        }
        let (sender, receiver) = self.layer.build().map_err(BuildError::Layer)?;
        Ok(Emulator {
            network: Network::new(
                StdRng::seed_from_u64(self.seed),
                self.loss_prob,
                self.corrupt_prob,
            ),
            sender,
            receiver,
            msgs: self.msgs,
            lambda: self.lambda,
            max_time: self.max_time,
        })
    }

    #[must_use]
    pub fn default() -> Self {
        EmulatorBuilder {
            msgs: 20,
            loss_prob: 0.0,
            corrupt_prob: 0.0,
            lambda: 50.0,
            seed: 0,
            max_time: 1_000_000.0,
            layer: Builder::default(),
        }
    }
}

#[derive(Debug)]
pub enum BuildError {
    Layer(layer::BuildError),
    Probability { name: &'static str, value: f64 },
    NonPositiveLambda,
    /// Must be finite and not negative
    MaxTime { value: f64 },
}

pub struct Emulator {
    network: Network,
    sender: Sender,
    receiver: Receiver,
    msgs: usize,
    lambda: f64,
    max_time: f64,
}

/// The `n`th message: twenty copies of one letter, cycling through the alphabet
#[must_use]
pub fn message(n: usize) -> Payload {
    [b'a' + (n % 26) as u8; PAYLOAD_LEN]
}

impl Emulator {
    fn next_interval(&mut self) -> f64 {
        self.lambda * 2.0 * self.network.rng.gen::<f64>()
    }

    /// Runs until every message has been generated and acknowledged, or until `max_time`
    pub fn run(mut self) -> Report {
        let mut submitted = Vec::new();
        let mut rejected = 0;
        let mut generated = 0;
        let mut timed_out = false;

        if self.msgs > 0 {
            let at = self.next_interval();
            self.network.schedule(EventKey::Message(0), at);
        }

        while let Some((key, at)) = self.network.pop_event() {
            if at > self.max_time {
                info!("simulated time limit {} reached", self.max_time);
                timed_out = true;
                break;
            }
            self.network.now = at;

            match key {
                EventKey::Message(n) => {
                    generated += 1;
                    let payload = message(n);
                    match self.sender.submit(&mut self.network, payload) {
                        Ok(()) => submitted.push(payload),
                        Err(SendError(_)) => {
                            trace!("message {} is dropped", n);
                            rejected += 1;
                        }
                    }
                    if n + 1 < self.msgs {
                        let at = self.network.now + self.next_interval();
                        self.network.schedule(EventKey::Message(n + 1), at);
                    }
                }
                EventKey::Arrival(id) => {
                    let Some((to, packet)) = self.network.in_flight.remove(&id) else {
                        continue;
                    };
                    match to {
                        EntityId::A => self.sender.on_packet(&mut self.network, packet),
                        EntityId::B => self.receiver.on_packet(&mut self.network, packet),
                    }
                }
                EventKey::Timer(EntityId::A) => self.sender.on_timeout(&mut self.network),
                EventKey::Timer(EntityId::B) => self.receiver.on_timeout(&mut self.network),
            }

            if generated == self.msgs && self.sender.is_idle() {
                break;
            }
        }

        let delivered = self.network.delivered();
        let in_order = delivered == submitted.as_slice();
        info!(
            "finished at {}: {} submitted, {} rejected, {} delivered",
            self.network.now,
            submitted.len(),
            rejected,
            delivered.len()
        );
        Report {
            sender: self.sender.stat(),
            receiver: self.receiver.stat(),
            network: self.network.stat(),
            submitted: submitted.len(),
            rejected,
            delivered: delivered.len(),
            in_order,
            end_time: self.network.now,
            timed_out,
        }
    }
}

#[derive(Debug)]
pub struct Report {
    pub sender: sender::Stat,
    pub receiver: receiver::Stat,
    pub network: NetworkStat,
    pub submitted: usize,
    /// Messages turned away by a full send window
    pub rejected: usize,
    pub delivered: usize,
    /// Delivered messages are exactly the submitted ones, in order
    pub in_order: bool,
    pub end_time: f64,
    pub timed_out: bool,
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use crate::{
        layer::{Builder, CorruptFrameAck, EntityId, Host},
        protocol::packet::Packet,
    };

    use super::{message, BuildError, EmulatorBuilder, EventKey, Network};

    fn network() -> Network {
        Network::new(StdRng::seed_from_u64(1), 0.0, 0.0)
    }

    #[test]
    fn test_channel_is_fifo() {
        let mut network = network();
        for seq in 0..50 {
            network.transmit(EntityId::A, Packet::data(seq, message(seq as usize)));
        }
        network.transmit(EntityId::B, Packet::ack_for(0));

        let mut last = 0.0;
        let mut seqs = Vec::new();
        while let Some((key, at)) = network.pop_event() {
            let EventKey::Arrival(id) = key else {
                panic!();
            };
            let (to, packet) = network.in_flight.remove(&id).unwrap();
            if to == EntityId::B {
                assert!(last < at);
                last = at;
                seqs.push(packet.seq());
            }
        }
        assert_eq!(seqs, (0..50).collect::<Vec<_>>());
        assert!(network.in_flight.is_empty());
    }

    #[test]
    fn test_timer_restart_replaces_deadline() {
        let mut network = network();
        network.start_timer(EntityId::A, 16.0);
        network.now = 5.0;
        network.start_timer(EntityId::A, 16.0);
        assert_eq!(network.pop_event(), Some((EventKey::Timer(EntityId::A), 21.0)));
        assert_eq!(network.pop_event(), None);

        network.start_timer(EntityId::A, 16.0);
        network.stop_timer(EntityId::A);
        network.stop_timer(EntityId::A);
        assert_eq!(network.pop_event(), None);
    }

    #[test]
    fn test_corrupted_packets_are_detectable() {
        let mut network = Network::new(StdRng::seed_from_u64(3), 0.0, 1.0);
        for seq in 0..100 {
            network.transmit(EntityId::A, Packet::data(seq % 7, message(seq as usize)));
        }
        assert_eq!(network.stat().corrupted, 100);
        assert!(network
            .in_flight
            .values()
            .all(|(_, packet)| packet.is_corrupted()));
    }

    #[test]
    fn test_all_lost() {
        let mut network = Network::new(StdRng::seed_from_u64(3), 1.0, 0.0);
        network.transmit(EntityId::A, Packet::data(0, message(0)));
        assert_eq!(network.stat().lost, 1);
        assert_eq!(network.pop_event(), None);
    }

    #[test]
    fn test_lossless_with_default_window() {
        let report = EmulatorBuilder {
            msgs: 50,
            seed: 11,
            layer: Builder {
                // longer than any round trip, so nothing is resent
                rtt: 1000.0,
                ..Builder::default()
            },
            ..EmulatorBuilder::default()
        }
        .build()
        .unwrap()
        .run();

        assert!(!report.timed_out);
        assert!(report.in_order);
        assert_eq!(report.submitted + report.rejected, 50);
        assert_eq!(report.delivered, report.submitted);
        assert_eq!(report.sender.retransmissions, 0);
        assert_eq!(report.receiver.out_of_wnd, 0);
    }

    #[test]
    fn test_lossy_and_corrupting_channel() {
        let report = EmulatorBuilder {
            msgs: 300,
            loss_prob: 0.2,
            corrupt_prob: 0.2,
            lambda: 20.0,
            seed: 7,
            layer: Builder {
                seq_space: 12,
                wnd_size: 6,
                corrupt_frame_ack: CorruptFrameAck::LastDelivered,
                ..Builder::default()
            },
            ..EmulatorBuilder::default()
        }
        .build()
        .unwrap()
        .run();

        assert!(!report.timed_out);
        assert!(report.in_order);
        assert_eq!(report.submitted + report.rejected, 300);
        assert!(report.submitted > 0);
        assert!(report.network.lost > 0);
        assert!(report.network.corrupted > 0);
        assert!(report.sender.retransmissions > 0);
        assert_eq!(report.receiver.buffered, 0);
    }

    #[test]
    fn test_gives_up_at_max_time() {
        let report = EmulatorBuilder {
            msgs: 3,
            loss_prob: 1.0,
            max_time: 500.0,
            ..EmulatorBuilder::default()
        }
        .build()
        .unwrap()
        .run();

        assert!(report.timed_out);
        assert_eq!(report.delivered, 0);
        assert!(report.end_time <= 500.0);
        assert!(report.sender.retransmissions > 0);
    }

    #[test]
    fn test_rejects_bad_config() {
        let result = EmulatorBuilder {
            corrupt_prob: 1.5,
            ..EmulatorBuilder::default()
        }
        .build();
        assert!(matches!(
            result,
            Err(BuildError::Probability { name: "corrupt", .. })
        ));

        let result = EmulatorBuilder {
            lambda: 0.0,
            ..EmulatorBuilder::default()
        }
        .build();
        assert!(matches!(result, Err(BuildError::NonPositiveLambda)));
    }

    #[test]
    fn test_rejects_unbounded_max_time() {
        for max_time in [f64::NAN, f64::INFINITY, -1.0] {
            let result = EmulatorBuilder {
                msgs: 3,
                loss_prob: 1.0,
                max_time,
                ..EmulatorBuilder::default()
            }
            .build();
            assert!(matches!(result, Err(BuildError::MaxTime { .. })));
        }
    }
}
