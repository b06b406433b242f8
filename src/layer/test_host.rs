use std::collections::HashMap;

use crate::protocol::{packet::Packet, Payload};

use super::{EntityId, Host};

/// Records every outbound call instead of acting on it. Time only moves when a test moves it.
pub struct RecordingHost {
    now: f64,
    sent: Vec<(EntityId, Packet)>,
    delivered: Vec<(EntityId, Payload)>,
    deadlines: HashMap<EntityId, f64>,
    pub timer_starts: usize,
    pub timer_stops: usize,
}

impl RecordingHost {
    pub fn new() -> Self {
        RecordingHost {
            now: 0.0,
            sent: Vec::new(),
            delivered: Vec::new(),
            deadlines: HashMap::new(),
            timer_starts: 0,
            timer_stops: 0,
        }
    }

    pub fn set_now(&mut self, now: f64) {
        assert!(self.now <= now);
        self.now = now;
    }

    /// Jumps the clock to the pending deadline of `entity`, as a timer driver would before
    /// calling `on_timeout`
    pub fn advance_to_timer(&mut self, entity: EntityId) {
        let deadline = self.deadlines.remove(&entity).expect("timer is not running");
        self.set_now(deadline);
    }

    pub fn timer_running(&self, entity: EntityId) -> bool {
        self.deadlines.contains_key(&entity)
    }

    pub fn deadline(&self, entity: EntityId) -> Option<f64> {
        self.deadlines.get(&entity).copied()
    }

    pub fn take_sent(&mut self) -> Vec<(EntityId, Packet)> {
        std::mem::take(&mut self.sent)
    }

    pub fn sent_seqs(&self, entity: EntityId) -> Vec<i32> {
        self.sent
            .iter()
            .filter(|(from, _)| *from == entity)
            .map(|(_, packet)| packet.seq())
            .collect()
    }

    pub fn delivered_payloads(&self) -> Vec<Payload> {
        self.delivered.iter().map(|(_, payload)| *payload).collect()
    }
}

impl Host for RecordingHost {
    fn transmit(&mut self, entity: EntityId, packet: Packet) {
        self.sent.push((entity, packet));
    }

    fn deliver(&mut self, entity: EntityId, payload: Payload) {
        self.delivered.push((entity, payload));
    }

    fn start_timer(&mut self, entity: EntityId, interval: f64) {
        self.timer_starts += 1;
        self.deadlines.insert(entity, self.now + interval);
    }

    fn stop_timer(&mut self, entity: EntityId) {
        self.timer_stops += 1;
        self.deadlines.remove(&entity);
    }

    fn now(&self) -> f64 {
        self.now
    }
}
