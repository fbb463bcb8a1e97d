//! Lock-free hand-off of loudness values from the audio thread to the
//! consumer tick.
//!
//! The queue is a fixed-capacity SPSC ring backed by [`rtrb`]. `rtrb`
//! publishes a slot with a release store of the write index after the value
//! has been written, and the consumer acquires that index before reading. The
//! consumer releases the read index only after it has copied the value out, so
//! the producer never reuses a slot that is still being read.
//!
//! When the ring is full the producer drops the *incoming* sample and bumps a
//! shared counter. The read index is never touched from the producer side, so
//! the newest value is the one lost under sustained consumer starvation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rtrb::{Consumer, Producer, PushError, RingBuffer};

/// Creates a queue that holds up to `capacity` loudness samples.
pub fn loudness_queue(capacity: usize) -> (LoudnessProducer, LoudnessConsumer) {
    let (producer, consumer) = RingBuffer::new(capacity);
    let dropped = Arc::new(AtomicU64::new(0));
    (
        LoudnessProducer {
            inner: producer,
            dropped: dropped.clone(),
        },
        LoudnessConsumer {
            inner: consumer,
            dropped,
        },
    )
}

/// Producer half. Lives on the real-time thread.
pub struct LoudnessProducer {
    inner: Producer<f32>,
    dropped: Arc<AtomicU64>,
}

impl LoudnessProducer {
    /// Enqueues one sample. Never blocks or allocates.
    ///
    /// Returns `false` when the ring was full and the sample was dropped.
    #[inline]
    pub fn push(&mut self, sample: f32) -> bool {
        match self.inner.push(sample) {
            Ok(()) => true,
            Err(PushError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Free slots as seen by the producer.
    pub fn free_slots(&self) -> usize {
        self.inner.slots()
    }

    /// Total samples dropped because the ring was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// True once the consumer half has been dropped.
    pub fn is_abandoned(&self) -> bool {
        self.inner.is_abandoned()
    }
}

/// Consumer half. Lives on the periodic tick.
pub struct LoudnessConsumer {
    inner: Consumer<f32>,
    dropped: Arc<AtomicU64>,
}

impl LoudnessConsumer {
    /// Samples currently waiting.
    pub fn pending(&self) -> usize {
        self.inner.slots()
    }

    /// Total samples dropped by the producer because the ring was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Takes every sample published since the last drain, oldest first.
    pub fn drain(&mut self) -> Vec<f32> {
        let mut samples = Vec::with_capacity(self.pending());
        self.drain_into(|sample| samples.push(sample));
        samples
    }

    /// Hands every pending sample to `sink` in arrival order without
    /// allocating. Returns how many samples were consumed.
    pub fn drain_into(&mut self, mut sink: impl FnMut(f32)) -> usize {
        let count = self.inner.slots();
        if count == 0 {
            return 0;
        }
        match self.inner.read_chunk(count) {
            Ok(chunk) => {
                let (first, second) = chunk.as_slices();
                first.iter().chain(second).copied().for_each(&mut sink);
                chunk.commit_all();
                count
            }
            // `slots()` was just observed on this side, so the chunk is available.
            Err(_) => 0,
        }
    }
}

impl std::fmt::Debug for LoudnessProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoudnessProducer")
            .field("free_slots", &self.free_slots())
            .field("dropped", &self.dropped())
            .finish()
    }
}

impl std::fmt::Debug for LoudnessConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoudnessConsumer")
            .field("pending", &self.pending())
            .field("dropped", &self.dropped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_pushed_values_in_order() {
        let (mut tx, mut rx) = loudness_queue(8);
        let values = [0.1_f32, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8];
        for value in values {
            assert!(tx.push(value));
        }

        assert_eq!(rx.drain(), values.to_vec());
        assert!(rx.drain().is_empty());
        assert_eq!(rx.dropped(), 0);
    }

    #[test]
    fn overflow_drops_newest_and_counts() {
        let (mut tx, mut rx) = loudness_queue(4);
        for i in 0..10 {
            tx.push(i as f32);
        }

        let drained = rx.drain();
        assert_eq!(drained, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(tx.dropped(), 6);
        assert_eq!(rx.dropped(), 6);
    }

    #[test]
    fn drain_frees_slots_for_reuse_across_wraparound() {
        let (mut tx, mut rx) = loudness_queue(3);
        let mut seen = Vec::new();
        for round in 0..5 {
            for i in 0..3 {
                assert!(tx.push((round * 3 + i) as f32));
            }
            let consumed = rx.drain_into(|sample| seen.push(sample));
            assert_eq!(consumed, 3);
        }

        let expected: Vec<f32> = (0..15).map(|i| i as f32).collect();
        assert_eq!(seen, expected);
        assert_eq!(tx.free_slots(), 3);
    }

    #[test]
    fn cross_thread_delivery_is_ordered() {
        let (mut tx, mut rx) = loudness_queue(64);
        let total = 10_000;

        let producer = std::thread::spawn(move || {
            let mut sent = Vec::new();
            for i in 0..total {
                if tx.push(i as f32) {
                    sent.push(i as f32);
                }
            }
            sent
        });

        let mut received = Vec::new();
        while !producer.is_finished() || rx.pending() > 0 {
            rx.drain_into(|sample| received.push(sample));
        }
        let sent = producer.join().unwrap();
        rx.drain_into(|sample| received.push(sample));

        assert_eq!(received, sent);
        assert_eq!(rx.dropped() as usize, total - sent.len());
    }
}
