//! Correlation id generation.

use nanoid::nanoid;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::RequestId;

/// Produces correlation ids of the form `<prefix>-<counter>`.
///
/// The counter never repeats within one generator, so ids cannot collide no
/// matter how many requests are issued within the same clock tick. The random
/// prefix keeps ids from separate client processes apart in editor-side logs.
#[derive(Debug)]
pub struct RequestIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl RequestIdGenerator {
    /// Create a generator with a random 8 character prefix.
    pub fn new() -> Self {
        Self::with_prefix(nanoid!(8))
    }

    /// Create a generator with a fixed prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Allocate the next id.
    pub fn next_id(&self) -> RequestId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        RequestId::new(format!("{}-{}", self.prefix, n))
    }
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
