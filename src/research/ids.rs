//! Entry ID generation.
//!
//! Entry IDs must stay unique for the lifetime of the process even when a
//! batch mints several entries in the same millisecond, so the timestamp is
//! paired with an atomic counter. The clock is injectable so tests get
//! stable IDs.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Monotonic ID source producing `<millis>-<seq>-<category-slug>`.
pub struct EntryIdGen {
    clock: fn() -> i64,
    counter: AtomicU64,
}

impl EntryIdGen {
    pub fn new() -> Self {
        Self {
            clock: || Utc::now().timestamp_millis(),
            counter: AtomicU64::new(0),
        }
    }

    /// Generator with a caller-supplied clock, for deterministic tests.
    pub fn with_clock(clock: fn() -> i64) -> Self {
        Self {
            clock,
            counter: AtomicU64::new(0),
        }
    }

    /// Mint the next ID for an entry in `category`.
    pub fn next(&self, category: &str) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}-{}", (self.clock)(), seq, slug(category))
    }
}

impl Default for EntryIdGen {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercase alphanumeric slug; runs of other characters collapse to '-'.
pub fn slug(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_dash = false;
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }

    if out.is_empty() {
        "research".to_string()
    } else {
        out
    }
}
