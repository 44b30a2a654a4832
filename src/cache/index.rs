//! Repository index: memoized remote listings
//!
//! Listings are cached per remote key for a time-to-live. Refreshes are
//! single-flight: while one caller refreshes a key, other callers for that
//! key wait for its result instead of issuing their own request. A failed
//! refresh falls back to the last known listing, flagged as stale.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::domain::Version;
use crate::error::{Result, remote};

/// One archive advertised by a remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub id: String,
    pub version: Version,
    /// Protocol-specific retrieval locator (path or URL)
    pub locator: String,
}

/// Everything a remote advertises
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    entries: Vec<ListingEntry>,
}

impl Listing {
    pub fn new(mut entries: Vec<ListingEntry>) -> Self {
        entries.sort_by(|a, b| a.id.cmp(&b.id).then(b.version.cmp(&a.version)));
        entries.dedup_by(|a, b| a.id == b.id && a.version == b.version);
        Self { entries }
    }

    pub fn entries(&self) -> &[ListingEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Advertised versions of `id`, highest first
    pub fn versions_of(&self, id: &str) -> Vec<Version> {
        self.entries
            .iter()
            .filter(|e| e.id == id)
            .map(|e| e.version)
            .collect()
    }

    pub fn latest(&self, id: &str) -> Option<Version> {
        self.versions_of(id).into_iter().next()
    }

    pub fn locate(&self, id: &str, version: Version) -> Option<&ListingEntry> {
        self.entries
            .iter()
            .find(|e| e.id == id && e.version == version)
    }
}

/// A listing as served by the index
#[derive(Debug, Clone)]
pub struct IndexedListing {
    pub listing: Arc<Listing>,
    /// The last refresh failed and this is an older listing
    pub stale: bool,
}

#[derive(Default)]
struct SlotState {
    listing: Option<Arc<Listing>>,
    fetched_at: Option<Instant>,
    refreshing: bool,
    /// Bumped every time a refresh finishes
    generation: u64,
    last_ok: bool,
    last_error: Option<String>,
}

#[derive(Default)]
struct Slot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl Slot {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self, outcome: std::result::Result<Arc<Listing>, String>) {
        let mut state = self.lock();
        match outcome {
            Ok(listing) => {
                state.listing = Some(listing);
                state.fetched_at = Some(Instant::now());
                state.last_ok = true;
                state.last_error = None;
            }
            Err(reason) => {
                state.last_ok = false;
                state.last_error = Some(reason);
            }
        }
        state.refreshing = false;
        state.generation += 1;
        self.ready.notify_all();
    }
}

/// Releases waiters if a refresh unwinds before reporting its outcome
struct InFlight<'a> {
    slot: &'a Slot,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.slot.finish(Err("listing refresh aborted".to_string()));
        }
    }
}

/// Process-wide cache of remote listings
pub struct RepositoryIndex {
    ttl: Duration,
    slots: Mutex<HashMap<String, Arc<Slot>>>,
}

impl RepositoryIndex {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn slot(&self, key: &str) -> Arc<Slot> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.to_string()).or_default())
    }

    /// Return the listing for `key`, calling `refresh` if it is missing or
    /// older than the TTL.
    ///
    /// At most one `refresh` runs per key at a time; concurrent callers
    /// share its result. If the refresh fails, the previous listing is
    /// returned with `stale` set; without a previous listing the error is
    /// returned.
    pub fn get_or_refresh<F>(&self, key: &str, refresh: F) -> Result<IndexedListing>
    where
        F: FnOnce() -> Result<Listing>,
    {
        let slot = self.slot(key);
        let mut state = slot.lock();

        if let (Some(listing), Some(at)) = (&state.listing, state.fetched_at) {
            if at.elapsed() < self.ttl {
                debug!(key, "listing served from index");
                return Ok(IndexedListing {
                    listing: Arc::clone(listing),
                    stale: false,
                });
            }
        }

        if state.refreshing {
            let generation = state.generation;
            while state.refreshing && state.generation == generation {
                state = slot
                    .ready
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            debug!(key, "joined in-flight listing refresh");
            return match &state.listing {
                Some(listing) => Ok(IndexedListing {
                    listing: Arc::clone(listing),
                    stale: !state.last_ok,
                }),
                None => Err(remote::unavailable(
                    key,
                    state
                        .last_error
                        .clone()
                        .unwrap_or_else(|| "listing unavailable".to_string()),
                )),
            };
        }

        state.refreshing = true;
        drop(state);

        let mut guard = InFlight {
            slot: &slot,
            armed: true,
        };
        debug!(key, "refreshing listing");
        let result = refresh();
        guard.armed = false;

        match result {
            Ok(listing) => {
                let listing = Arc::new(listing);
                slot.finish(Ok(Arc::clone(&listing)));
                Ok(IndexedListing {
                    listing,
                    stale: false,
                })
            }
            Err(e) => {
                slot.finish(Err(e.to_string()));
                let state = slot.lock();
                match &state.listing {
                    Some(listing) => {
                        warn!(key, error = %e, "listing refresh failed, serving stale listing");
                        Ok(IndexedListing {
                            listing: Arc::clone(listing),
                            stale: true,
                        })
                    }
                    None => Err(e),
                }
            }
        }
    }

    /// Force the next lookup of `key` to refresh. The current listing is
    /// kept as a stale fallback.
    pub fn invalidate(&self, key: &str) {
        let slot = self.slot(key);
        slot.lock().fetched_at = None;
    }
}
