//! Ring buffer registry (C2): fixed-capacity sliding windows per
//! `(site, asset, point)`.
//!
//! Sharded via `DashMap` rather than one global lock (§5: "never one global
//! lock, to avoid stalling all points on one slow egress"). Each key's
//! buffer lives behind its shard's internal lock; different keys can append
//! concurrently without contention.

use crate::domain::{PointKey, SamplePacket};
use dashmap::DashMap;
use std::collections::VecDeque;

/// An immutable snapshot of a ring buffer: exactly `W` g-values when
/// `ready()` was true at snapshot time.
pub type Window = Vec<f64>;

pub struct RingBufferRegistry {
    capacity: usize,
    buffers: DashMap<PointKey, VecDeque<f64>>,
}

impl RingBufferRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buffers: DashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append one packet's samples. Ignores packets failing the §3
    /// invariant (no error, no panic) — counted upstream by the ingress
    /// adapter, not here.
    pub fn append(&self, packet: &SamplePacket) {
        if !packet.is_valid() {
            return;
        }
        let key = packet.key();
        let mut entry = self.buffers.entry(key).or_insert_with(VecDeque::new);
        for &sample in &packet.acceleration {
            if entry.len() == self.capacity {
                entry.pop_front();
            }
            entry.push_back(sample);
        }
    }

    /// True iff the key's buffer currently holds exactly `capacity` samples.
    pub fn ready(&self, key: &PointKey) -> bool {
        self.buffers
            .get(key)
            .map(|b| b.len() == self.capacity)
            .unwrap_or(false)
    }

    /// An independent copy of the current buffer contents, or `None` if the
    /// key has never been seen. Does not clear the buffer — later packets
    /// keep sliding the window.
    pub fn snapshot(&self, key: &PointKey) -> Option<Window> {
        self.buffers.get(key).map(|b| b.iter().copied().collect())
    }

    pub fn clear(&self, key: &PointKey) {
        if let Some(mut b) = self.buffers.get_mut(key) {
            b.clear();
        }
    }

    pub fn len(&self, key: &PointKey) -> usize {
        self.buffers.get(key).map(|b| b.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(asset: &str, point: &str, samples: &[f64]) -> SamplePacket {
        SamplePacket {
            site: "default".into(),
            asset: asset.into(),
            point: point.into(),
            rpm: None,
            temperature: None,
            speed: None,
            timestamp: None,
            acceleration: samples.to_vec(),
        }
    }

    #[test]
    fn missing_acceleration_is_ignored() {
        let reg = RingBufferRegistry::new(4);
        let key = PointKey::new("default", "P1", "DE");
        reg.append(&packet("P1", "DE", &[]));
        assert_eq!(reg.len(&key), 0);
        assert!(!reg.ready(&key));
    }

    #[test]
    fn buffer_never_exceeds_capacity_and_evicts_oldest() {
        let reg = RingBufferRegistry::new(4);
        let key = PointKey::new("default", "P1", "DE");
        for v in 0..10 {
            reg.append(&packet("P1", "DE", &[v as f64]));
            assert!(reg.len(&key) <= 4);
        }
        assert_eq!(reg.snapshot(&key).unwrap(), vec![6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn ready_true_only_at_exact_capacity() {
        let reg = RingBufferRegistry::new(4);
        let key = PointKey::new("default", "P1", "DE");
        reg.append(&packet("P1", "DE", &[1.0, 2.0, 3.0]));
        assert!(!reg.ready(&key));
        reg.append(&packet("P1", "DE", &[4.0]));
        assert!(reg.ready(&key));
    }

    #[test]
    fn snapshot_is_independent_of_further_appends() {
        let reg = RingBufferRegistry::new(4);
        let key = PointKey::new("default", "P1", "DE");
        reg.append(&packet("P1", "DE", &[1.0, 2.0, 3.0, 4.0]));
        let snap = reg.snapshot(&key).unwrap();
        reg.append(&packet("P1", "DE", &[5.0]));
        assert_eq!(snap, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(reg.snapshot(&key).unwrap(), vec![2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn clear_empties_buffer() {
        let reg = RingBufferRegistry::new(4);
        let key = PointKey::new("default", "P1", "DE");
        reg.append(&packet("P1", "DE", &[1.0, 2.0]));
        reg.clear(&key);
        assert_eq!(reg.len(&key), 0);
    }

    #[test]
    fn keys_are_case_sensitive() {
        let reg = RingBufferRegistry::new(4);
        reg.append(&packet("p1", "de", &[1.0]));
        let lower = PointKey::new("default", "p1", "de");
        let upper = PointKey::new("default", "P1", "DE");
        assert_eq!(reg.len(&lower), 1);
        assert_eq!(reg.len(&upper), 0);
    }
}
