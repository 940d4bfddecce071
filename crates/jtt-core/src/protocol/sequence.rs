//! Thread-safe message serial numbers.
//!
//! Every outgoing message carries a 16-bit serial number so the peer can
//! match responses (`reply_serial` in the general responses) and detect
//! duplicates.  Serial numbers cycle through a configurable inclusive range
//! and wrap back to its lower bound instead of overflowing.
//!
//! # Thread safety
//!
//! The counter is a single `AtomicU16` advanced with a compare-and-swap loop
//! ([`AtomicU16::fetch_update`]), so any number of threads can share one
//! counter without a lock and never observe the same value twice within one
//! cycle.

use std::sync::atomic::{AtomicU16, Ordering};

/// Anything that can hand out serial numbers.
///
/// The packet encoder takes this trait rather than a concrete counter so
/// callers can share a per-connection counter, or substitute a fixed
/// sequence in tests.
#[cfg_attr(test, mockall::automock)]
pub trait SerialNumberSource: Send + Sync {
    /// Returns the next serial number.
    fn next(&self) -> u16;
}

/// Wrapping serial number counter over `[min, max]`.
///
/// # Examples
///
/// ```rust
/// use jtt_core::protocol::{SerialNumberCounter, SerialNumberSource};
///
/// let counter = SerialNumberCounter::with_range(1, 3);
/// let drawn: Vec<u16> = (0..5).map(|_| counter.next()).collect();
/// assert_eq!(drawn, vec![1, 2, 3, 1, 2]);
/// ```
#[derive(Debug)]
pub struct SerialNumberCounter {
    inner: AtomicU16,
    min: u16,
    max: u16,
}

impl SerialNumberCounter {
    /// Creates a counter over `[1, 65535]` starting at 1.
    pub fn new() -> Self {
        Self::with_range(1, u16::MAX)
    }

    /// Creates a counter over `[min, max]` starting at `min`.
    ///
    /// Bounds given in the wrong order are swapped.
    pub fn with_range(min: u16, max: u16) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            inner: AtomicU16::new(min),
            min,
            max,
        }
    }

    /// Returns the value the next call to [`next`](SerialNumberSource::next)
    /// will hand out, without advancing.
    ///
    /// By the time the caller uses it another thread may already have taken it.
    pub fn current(&self) -> u16 {
        self.inner.load(Ordering::Relaxed)
    }

    pub fn min(&self) -> u16 {
        self.min
    }

    pub fn max(&self) -> u16 {
        self.max
    }

    fn successor(&self, value: u16) -> u16 {
        if value >= self.max || value < self.min {
            self.min
        } else {
            value + 1
        }
    }
}

impl SerialNumberSource for SerialNumberCounter {
    fn next(&self) -> u16 {
        // `fetch_update` only fails when the closure returns `None`; ours never does.
        match self
            .inner
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(self.successor(v)))
        {
            Ok(previous) | Err(previous) => previous,
        }
    }
}

impl Default for SerialNumberCounter {
    fn default() -> Self {
        Self::new()
    }
}
