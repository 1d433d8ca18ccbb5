//! Exclusive sections keyed by (journey, seat).
//!
//! Each key maps to its own async mutex, created on first use. Entries are
//! removed once no task holds or awaits them, so the table only ever
//! contains seats with a booking in flight.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::{JourneyId, SeatId};

/// Key of one exclusive section.
pub(crate) type SectionKey = (JourneyId, SeatId);

/// The section could not be entered before the timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SectionTimedOut;

#[derive(Default)]
pub(crate) struct SectionTable {
    entries: Mutex<HashMap<SectionKey, Arc<AsyncMutex<()>>>>,
}

impl SectionTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Wait up to `timeout` to enter the section for `key`.
    ///
    /// The section is held until the returned guard is dropped.
    pub(crate) async fn enter(
        &self,
        key: SectionKey,
        timeout: Duration,
    ) -> Result<SectionGuard<'_>, SectionTimedOut> {
        let mutex = {
            let mut entries = self.lock_entries();
            Arc::clone(entries.entry(key.clone()).or_default())
        };

        match tokio::time::timeout(timeout, mutex.lock_owned()).await {
            Ok(guard) => Ok(SectionGuard {
                table: self,
                key,
                guard: Some(guard),
            }),
            Err(_) => {
                // The timed-out `lock_owned` future has already dropped its
                // clone of the mutex.
                self.release(&key);
                Err(SectionTimedOut)
            }
        }
    }

    /// Number of keys currently held or awaited.
    #[cfg(test)]
    pub(crate) fn active_keys(&self) -> usize {
        self.lock_entries().len()
    }

    /// Drop the entry for `key` if only the table still references it.
    fn release(&self, key: &SectionKey) {
        let mut entries = self.lock_entries();
        if entries
            .get(key)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            entries.remove(key);
        }
    }

    // The map only holds `Arc`s; a panic elsewhere cannot leave it torn.
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<SectionKey, Arc<AsyncMutex<()>>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Proof that the holder is inside the section for one key.
pub(crate) struct SectionGuard<'a> {
    table: &'a SectionTable,
    key: SectionKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SectionGuard<'_> {
    fn drop(&mut self) {
        // Unlock first so the strong count no longer includes this guard.
        drop(self.guard.take());
        self.table.release(&self.key);
    }
}
