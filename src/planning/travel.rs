//! Travel-time lookups.
//!
//! The planner never computes distances itself. The host supplies a
//! [`TravelTimeSource`] (usually a routing service) and wraps it in a
//! [`TravelTimeCache`] so each `(origin, destination)` pair is asked once
//! per process.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

/// Travel time in whole minutes between two addresses.
pub trait TravelTimeSource: Send + Sync {
    /// Minutes from `origin` to `destination`, `None` when unknown.
    fn minutes(&self, origin: &str, destination: &str) -> Option<u32>;
}

/// Fixed lookup table, symmetric in its pairs.
#[derive(Debug, Clone, Default)]
pub struct StaticTravelTimes {
    table: HashMap<(String, String), u32>,
}

impl StaticTravelTimes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the travel time between `a` and `b` (both directions).
    pub fn with(mut self, a: impl Into<String>, b: impl Into<String>, minutes: u32) -> Self {
        let (a, b) = (a.into(), b.into());
        self.table.insert((b.clone(), a.clone()), minutes);
        self.table.insert((a, b), minutes);
        self
    }
}

impl TravelTimeSource for StaticTravelTimes {
    fn minutes(&self, origin: &str, destination: &str) -> Option<u32> {
        if origin == destination {
            return Some(0);
        }
        self.table
            .get(&(origin.to_string(), destination.to_string()))
            .copied()
    }
}

/// Memoizing wrapper; misses are cached too.
#[derive(Debug)]
pub struct TravelTimeCache<S> {
    source: S,
    cache: Mutex<HashMap<(String, String), Option<u32>>>,
}

impl<S: TravelTimeSource> TravelTimeCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Number of cached pairs.
    pub fn len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: TravelTimeSource> TravelTimeSource for TravelTimeCache<S> {
    fn minutes(&self, origin: &str, destination: &str) -> Option<u32> {
        let key = (origin.to_string(), destination.to_string());
        if let Some(hit) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return *hit;
        }

        // Lookup runs unlocked; a concurrent miss on the same pair just
        // asks twice.
        let minutes = self.source.minutes(origin, destination);
        debug!(origin, destination, ?minutes, "travel time lookup");
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, minutes);
        minutes
    }
}
