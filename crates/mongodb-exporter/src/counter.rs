//! Process-wide cache of the user collection count.
//!
//! The count gates the per-collection collectors. It is computed at most once
//! successfully and then trusted for the life of the process.

use mongodb_exporter_collectors::{count_user_collections, Connection};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
pub struct CollectionCounter {
    cached: Mutex<Option<u64>>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag however the count ends, including cancellation
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CollectionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached count, `None` until a count has succeeded
    pub fn cached(&self) -> Option<u64> {
        *self.cached.lock()
    }

    /// Count user collections unless the count is already known.
    ///
    /// Only one count runs at a time; a caller that finds another count in
    /// progress returns immediately and sees the count as unknown. Failures
    /// leave the cache empty so the next scrape tries again. The lock is never
    /// held across the enumeration.
    pub async fn refresh_if_unknown(&self, connection: &dyn Connection) -> Option<u64> {
        if let Some(count) = self.cached() {
            return Some(count);
        }
        if self.in_flight.swap(true, Ordering::AcqRel) {
            debug!("Collection count already in progress");
            return None;
        }
        let _guard = InFlight(&self.in_flight);

        match count_user_collections(connection).await {
            Ok(count) => {
                let mut cached = self.cached.lock();
                if cached.is_none() {
                    *cached = Some(count);
                    info!(count, "Cached user collection count");
                }
                *cached
            }
            Err(e) => {
                warn!(error = %e, "Cannot count user collections");
                None
            }
        }
    }
}
