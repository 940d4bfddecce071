//! Reassembly buffers and the pool they are recycled through.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::protocol::header::MsgId;

/// Parts received so far for one segmented message.
#[derive(Debug, Default)]
pub struct Segment {
    phone_number: String,
    msg_id: MsgId,
    total: u16,
    parts: HashMap<u16, Vec<u8>>,
}

impl Segment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds an empty buffer to the message it will collect.
    pub fn start(&mut self, phone_number: &str, msg_id: MsgId, total: u16) {
        self.phone_number.clear();
        self.phone_number.push_str(phone_number);
        self.msg_id = msg_id;
        self.total = total;
        self.parts.clear();
    }

    /// Stores `body` as part `index`.  Returns `true` if the part was
    /// already present and has been overwritten.
    pub fn merge(&mut self, index: u16, body: &[u8]) -> bool {
        self.parts.insert(index, body.to_vec()).is_some()
    }

    /// `true` once every index in `1..=total` is present.
    pub fn is_complete(&self) -> bool {
        self.total > 0 && (1..=self.total).all(|i| self.parts.contains_key(&i))
    }

    /// Concatenates the parts in ascending index order.
    pub fn assemble(&self) -> Vec<u8> {
        let size = self.parts.values().map(Vec::len).sum();
        let mut body = Vec::with_capacity(size);
        for index in 1..=self.total {
            if let Some(part) = self.parts.get(&index) {
                body.extend_from_slice(part);
            }
        }
        body
    }

    /// Clears identity and parts, keeping allocated capacity.
    pub fn reset(&mut self) {
        self.phone_number.clear();
        self.msg_id = MsgId::default();
        self.total = 0;
        self.parts.clear();
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn msg_id(&self) -> MsgId {
        self.msg_id
    }

    pub fn total(&self) -> u16 {
        self.total
    }

    /// Number of distinct parts received.
    pub fn received(&self) -> usize {
        self.parts.len()
    }
}

/// Bounded free list of [`Segment`] buffers.
///
/// [`release`](Self::release) resets a buffer before keeping it, so an
/// acquired buffer never carries a previous message's identity or parts.
#[derive(Debug)]
pub struct SegmentPool {
    idle: Mutex<Vec<Segment>>,
    max_idle: usize,
}

impl SegmentPool {
    /// Creates a pool that keeps at most `max_idle` buffers around.
    pub fn new(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Takes an idle buffer, or allocates one when none is idle.
    pub fn acquire(&self) -> Segment {
        self.idle.lock().pop().unwrap_or_default()
    }

    /// Resets `segment` and returns it to the pool.  Dropped instead when the
    /// pool already holds `max_idle` buffers.
    pub fn release(&self, mut segment: Segment) {
        segment.reset();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(segment);
        }
    }

    /// Number of buffers waiting to be reused.
    pub fn idle_buffers(&self) -> usize {
        self.idle.lock().len()
    }

    pub fn max_idle(&self) -> usize {
        self.max_idle
    }
}
