//! Reassembly of segmented messages.
//!
//! Terminals split bodies larger than one frame into parts that each carry a
//! [`SegmentInfo`](crate::protocol::SegmentInfo) `{ total, index }`.  Parts
//! can arrive in any order and on different connections.  [`SegmentCache`]
//! collects them per `phone_number:msg_id` key and hands back the joined
//! body exactly once, to the caller that delivered the last missing part.
//!
//! # Why per-key atomicity matters
//!
//! Picture a three-part upload whose parts 2 and 3 land on two worker
//! threads at the same instant, with part 1 already stored.  If each thread
//! read the entry, added its part and then checked "do I have all three?"
//! as separate steps, both could see three parts and both would hand the
//! body upstream, or neither would.  The fix is to make the whole
//! read → merge → check → remove sequence one indivisible step per key.
//!
//! Entries live in a [`DashMap`], which locks per shard.  Each merge runs
//! under the entry guard from `DashMap::entry`, so for one key the sequence
//! above cannot interleave with another merge, while unrelated keys in other
//! shards proceed in parallel.  Eviction goes through `remove_if` with a
//! generation check, so it can never remove an entry that a concurrent
//! merge has just completed or restarted.
//!
//! # Expiry
//!
//! Each write re-arms the entry's deadline.  The cache remembers the
//! earliest armed deadline; the first write after it passes sweeps the whole
//! map with [`SegmentCache::purge_expired`].  Sweeps are spaced at least
//! [`sweep_interval`](SegmentCacheConfig::sweep_interval) apart.  A part
//! arriving for a key that expired since the last sweep starts a fresh
//! reassembly.  Caches that may go quiet can run
//! [`SegmentCache::start_sweeper`], a background thread that sweeps on the
//! same interval.  Overflowing the capacity also sweeps before evicting.

pub mod buffer;
pub mod config;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::protocol::header::{MsgHeader, MsgId};

pub use buffer::{Segment, SegmentPool};
pub use config::SegmentCacheConfig;

/// A segmentation descriptor that cannot describe a real part.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SegmentError {
    /// The index is 0, larger than the total, or the total is 0.
    #[error("segment index {index} out of range 1..={total}")]
    IndexOutOfRange { index: u16, total: u16 },
}

/// Why a reassembly buffer left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    /// Every part arrived and the body was handed out.
    Completed,
    /// No part arrived within the entry's time-to-live.
    Expired,
    /// Evicted to bring the cache back under capacity.
    Overflow,
    /// A part announced a different total; the old partial was discarded.
    Replaced,
}

#[derive(Debug)]
struct Pending {
    segment: Segment,
    expires_at: Instant,
    ttl: Duration,
    generation: u64,
}

/// Concurrent store of in-flight reassemblies.
///
/// # Examples
///
/// ```rust
/// use jtt_core::protocol::{MsgHeader, MsgId, SegmentInfo};
/// use jtt_core::segment::{SegmentCache, SegmentCacheConfig};
///
/// let cache = SegmentCache::new(SegmentCacheConfig::default());
/// let part = |index| {
///     MsgHeader::new(MsgId::MULTIMEDIA_UPLOAD, "13800138000", index)
///         .with_segment(Some(SegmentInfo::new(2, index)))
/// };
///
/// assert_eq!(cache.cache(&part(2), b"world").unwrap(), None);
/// assert_eq!(cache.cache(&part(1), b"hello ").unwrap(), Some(b"hello world".to_vec()));
/// assert!(cache.is_empty());
/// ```
#[derive(Debug)]
pub struct SegmentCache {
    entries: DashMap<String, Pending>,
    pool: SegmentPool,
    config: SegmentCacheConfig,
    generation: AtomicU64,
    /// Reference point for `next_sweep_ms`.
    epoch: Instant,
    /// Milliseconds after `epoch` at which the next write sweeps;
    /// `u64::MAX` when nothing is armed.
    next_sweep_ms: AtomicU64,
    /// When a write last swept; `u64::MAX` before the first sweep.
    last_sweep_ms: AtomicU64,
}

/// Deadline used when `now + ttl` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

fn deadline(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Cache key for one device's message type.
pub fn segment_key(phone_number: &str, msg_id: MsgId) -> String {
    format!("{}:{}", phone_number, msg_id.0)
}

impl SegmentCache {
    pub fn new(config: SegmentCacheConfig) -> Self {
        Self {
            entries: DashMap::with_capacity(config.initial_capacity),
            pool: SegmentPool::new(config.max_idle_buffers),
            config,
            generation: AtomicU64::new(0),
            epoch: Instant::now(),
            next_sweep_ms: AtomicU64::new(u64::MAX),
            last_sweep_ms: AtomicU64::new(u64::MAX),
        }
    }

    /// Merges one part and returns the joined body if it completed the message.
    ///
    /// Returns `Ok(None)` when the header has no segmentation descriptor (the
    /// cache is untouched) or when parts are still missing.  A part arriving
    /// twice overwrites the earlier copy.
    ///
    /// # Errors
    ///
    /// [`SegmentError::IndexOutOfRange`] if the descriptor's index is not in
    /// `1..=total`.  The cache is untouched.
    pub fn cache(&self, header: &MsgHeader, body: &[u8]) -> Result<Option<Vec<u8>>, SegmentError> {
        self.merge(header, body, None)
    }

    /// Like [`cache`](Self::cache), but when the part leaves the message
    /// incomplete the entry's time-to-live becomes `ttl`.  `Duration::MAX`
    /// keeps the entry until it completes or overflows the capacity.
    ///
    /// The override sticks to the entry: later parts for the same key, even
    /// through [`cache`](Self::cache), re-arm it with `ttl` until the entry
    /// completes or is evicted.
    pub fn cache_with_timeout(
        &self,
        header: &MsgHeader,
        body: &[u8],
        ttl: Duration,
    ) -> Result<Option<Vec<u8>>, SegmentError> {
        self.merge(header, body, Some(ttl))
    }

    fn merge(
        &self,
        header: &MsgHeader,
        body: &[u8],
        ttl: Option<Duration>,
    ) -> Result<Option<Vec<u8>>, SegmentError> {
        let Some(info) = header.segment else {
            return Ok(None);
        };
        if !info.is_valid() {
            return Err(SegmentError::IndexOutOfRange {
                index: info.index,
                total: info.total,
            });
        }

        let now = Instant::now();
        self.sweep_if_due(now);

        let key = segment_key(&header.phone_number, header.msg_id);
        let mut removed: Vec<(Segment, RemovalCause)> = Vec::new();
        let mut inserted = false;

        // The entry guard is released at the end of this match; the pool and
        // capacity work below must not run while it is held.
        let completed = match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                let pending = occupied.get_mut();

                let restart = if pending.expires_at <= now {
                    Some(RemovalCause::Expired)
                } else if pending.segment.total() != info.total {
                    warn!(
                        phone_number = %header.phone_number,
                        msg_id = %header.msg_id,
                        previous_total = pending.segment.total(),
                        total = info.total,
                        "segment total changed, restarting reassembly"
                    );
                    Some(RemovalCause::Replaced)
                } else {
                    None
                };
                if let Some(cause) = restart {
                    let mut fresh = self.pool.acquire();
                    fresh.start(&header.phone_number, header.msg_id, info.total);
                    removed.push((std::mem::replace(&mut pending.segment, fresh), cause));
                    pending.ttl = self.config.default_ttl();
                    pending.generation = self.next_generation();
                }

                if pending.segment.merge(info.index, body) {
                    warn!(
                        phone_number = %header.phone_number,
                        msg_id = %header.msg_id,
                        index = info.index,
                        "duplicate segment overwrote earlier part"
                    );
                }

                if pending.segment.is_complete() {
                    let done = occupied.remove();
                    let joined = done.segment.assemble();
                    removed.push((done.segment, RemovalCause::Completed));
                    Some(joined)
                } else {
                    if let Some(ttl) = ttl {
                        pending.ttl = ttl;
                    }
                    pending.expires_at = deadline(now, pending.ttl);
                    self.schedule_sweep(pending.expires_at);
                    None
                }
            }
            Entry::Vacant(vacant) => {
                if info.total == 1 {
                    trace!(phone_number = %header.phone_number, msg_id = %header.msg_id, "single-part segment");
                    return Ok(Some(body.to_vec()));
                }
                let mut segment = self.pool.acquire();
                segment.start(&header.phone_number, header.msg_id, info.total);
                segment.merge(info.index, body);
                let ttl = ttl.unwrap_or_else(|| self.config.default_ttl());
                let expires_at = deadline(now, ttl);
                self.schedule_sweep(expires_at);
                debug!(
                    phone_number = %header.phone_number,
                    msg_id = %header.msg_id,
                    total = info.total,
                    "segment reassembly started"
                );
                vacant.insert(Pending {
                    segment,
                    expires_at,
                    ttl,
                    generation: self.next_generation(),
                });
                inserted = true;
                None
            }
        };

        for (segment, cause) in removed {
            self.recycle(segment, cause);
        }
        if inserted {
            self.enforce_capacity();
        }
        Ok(completed)
    }

    /// Removes every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<(String, u64)> = self
            .entries
            .iter()
            .filter(|entry| entry.expires_at <= now)
            .map(|entry| (entry.key().clone(), entry.generation))
            .collect();

        let mut purged = 0;
        for (key, generation) in expired {
            let removed = self
                .entries
                .remove_if(&key, |_, p| p.generation == generation && p.expires_at <= now);
            if let Some((_, pending)) = removed {
                self.recycle(pending.segment, RemovalCause::Expired);
                purged += 1;
            }
        }

        if let Some(earliest) = self.entries.iter().map(|entry| entry.expires_at).min() {
            self.schedule_sweep(earliest.max(deadline(now, self.config.sweep_interval())));
        }
        if purged > 0 {
            debug!(purged, remaining = self.entries.len(), "expired reassemblies purged");
        }
        purged
    }

    /// Starts a thread that calls [`purge_expired`](Self::purge_expired)
    /// every [`sweep_interval`](SegmentCacheConfig::sweep_interval).
    ///
    /// The thread holds only a weak reference and exits once the last
    /// `Arc` to the cache is dropped.
    pub fn start_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let interval = self.config.sweep_interval().max(Duration::from_millis(1));
        let cache: Weak<Self> = Arc::downgrade(self);

        thread::spawn(move || loop {
            thread::sleep(interval);
            match cache.upgrade() {
                Some(cache) => {
                    cache.purge_expired();
                }
                None => {
                    trace!("segment cache dropped, sweeper exiting");
                    break;
                }
            }
        })
    }

    /// Number of in-flight reassemblies, including entries that expired since
    /// the last sweep.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn config(&self) -> &SegmentCacheConfig {
        &self.config
    }

    /// The buffer pool backing this cache.
    pub fn pool(&self) -> &SegmentPool {
        &self.pool
    }

    fn millis_since_epoch(&self, at: Instant) -> u64 {
        u64::try_from(at.saturating_duration_since(self.epoch).as_millis()).unwrap_or(u64::MAX)
    }

    /// Arms a sweep no earlier than `at`, rounded up to the next millisecond.
    fn schedule_sweep(&self, at: Instant) {
        let at_ms = self.millis_since_epoch(at).saturating_add(1);
        self.next_sweep_ms.fetch_min(at_ms, Ordering::AcqRel);
    }

    /// Sweeps when the earliest known deadline has passed and the last sweep
    /// is at least one interval old.  Only the caller that claims the slot
    /// sweeps; the others carry on.
    fn sweep_if_due(&self, now: Instant) {
        let now_ms = self.millis_since_epoch(now);
        let due = self.next_sweep_ms.load(Ordering::Acquire);
        if now_ms < due {
            return;
        }
        let last = self.last_sweep_ms.load(Ordering::Acquire);
        if last != u64::MAX && now_ms < last.saturating_add(self.config.sweep_interval_ms) {
            return;
        }
        if self
            .next_sweep_ms
            .compare_exchange(due, u64::MAX, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.last_sweep_ms.store(now_ms, Ordering::Release);
            self.purge_expired();
        }
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed)
    }

    fn enforce_capacity(&self) {
        if self.entries.len() <= self.config.capacity {
            return;
        }
        self.purge_expired();

        while self.entries.len() > self.config.capacity {
            let victim = self
                .entries
                .iter()
                .min_by_key(|entry| entry.expires_at)
                .map(|entry| (entry.key().clone(), entry.generation));
            let Some((key, generation)) = victim else {
                break;
            };
            if let Some((_, pending)) = self.entries.remove_if(&key, |_, p| p.generation == generation) {
                self.recycle(pending.segment, RemovalCause::Overflow);
            }
        }
    }

    /// Single exit point for buffers leaving the cache.
    fn recycle(&self, segment: Segment, cause: RemovalCause) {
        match cause {
            RemovalCause::Completed => debug!(
                phone_number = segment.phone_number(),
                msg_id = %segment.msg_id(),
                total = segment.total(),
                "segment reassembly completed"
            ),
            RemovalCause::Expired | RemovalCause::Overflow | RemovalCause::Replaced => debug!(
                phone_number = segment.phone_number(),
                msg_id = %segment.msg_id(),
                received = segment.received(),
                total = segment.total(),
                ?cause,
                "segment reassembly evicted"
            ),
        }
        self.pool.release(segment);
    }
}

impl Default for SegmentCache {
    fn default() -> Self {
        Self::new(SegmentCacheConfig::default())
    }
}
