// ============================================
// File: crates/vanet-routing/src/services/routes.rs
// ============================================
//! # Route Table
//!
//! ## Creation Reason
//! Caches the next hop towards each destination learned from route
//! replies and beacons, so data can be sent without rediscovery.
//!
//! ## Routing Table Structure
//! ```text
//! ┌──────────────┬────────────┬──────┬──────────────┬───────┐
//! │ Destination  │ Next hop   │ Hops │ Learned at   │ Trust │
//! ├──────────────┼────────────┼──────┼──────────────┼───────┤
//! │ veh-12       │ veh-3      │ 2    │ 1700..000ms  │ 0.92  │
//! │ veh-3        │ veh-3      │ 1    │ 1700..450ms  │ 0.92  │
//! └──────────────┴────────────┴──────┴──────────────┴───────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Admission rules (hop limit, freshness) live in the engine; this
//!   table stores whatever it is given
//! - One destination maps to exactly one route; a newer entry replaces it
//!
//! ## Last Modified
//! v0.1.0 - Initial route table

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use vanet_common::time::Timestamp;
use vanet_common::types::VehicleId;

use crate::model::RouteEntry;

/// Destination to next-hop routing table.
pub struct RouteTable {
    routes: HashMap<VehicleId, RouteEntry>,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Adds or replaces the route to `destination`.
    pub fn insert(&mut self, destination: VehicleId, entry: RouteEntry) -> Option<RouteEntry> {
        let next_hop = entry.next_hop.clone();
        let hop_count = entry.hop_count;
        let previous = self.routes.insert(destination.clone(), entry);

        if previous.is_some() {
            debug!(
                destination = %destination,
                next_hop = %next_hop,
                hop_count,
                "Route replaced"
            );
        } else {
            debug!(
                destination = %destination,
                next_hop = %next_hop,
                hop_count,
                "Route added"
            );
        }

        previous
    }

    /// Removes the route to `destination`.
    pub fn remove(&mut self, destination: &VehicleId) -> Option<RouteEntry> {
        let removed = self.routes.remove(destination);

        if let Some(ref entry) = removed {
            debug!(destination = %destination, next_hop = %entry.next_hop, "Route removed");
        }

        removed
    }

    /// Looks up the route to `destination`.
    #[must_use]
    pub fn get(&self, destination: &VehicleId) -> Option<&RouteEntry> {
        self.routes.get(destination)
    }

    /// Checks if a route exists for `destination`.
    #[must_use]
    pub fn contains(&self, destination: &VehicleId) -> bool {
        self.routes.contains_key(destination)
    }

    /// Returns the number of routes.
    #[must_use]
    pub fn count(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if there are no routes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Clears all routes.
    pub fn clear(&mut self) {
        self.routes.clear();
        debug!("All routes cleared");
    }

    /// Iterates over `(destination, route)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&VehicleId, &RouteEntry)> {
        self.routes.iter()
    }

    /// Removes routes with `timestamp + timeout < now`.
    pub fn remove_expired(&mut self, now: Timestamp, timeout: Duration) -> usize {
        let before = self.routes.len();
        self.routes.retain(|destination, entry| {
            let keep = !entry.is_expired(now, timeout);
            if !keep {
                debug!(destination = %destination, learned_at = %entry.timestamp, "Route expired");
            }
            keep
        });
        before - self.routes.len()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> VehicleId {
        VehicleId::new(s).unwrap()
    }

    fn route(next_hop: &str, hops: u32, ms: u64) -> RouteEntry {
        RouteEntry::new(id(next_hop), hops, Timestamp::from_millis(ms), 1.0)
    }

    #[test]
    fn test_insert_lookup_route() {
        let mut table = RouteTable::new();
        assert!(table.insert(id("veh-9"), route("veh-2", 2, 0)).is_none());

        assert_eq!(table.get(&id("veh-9")).unwrap().next_hop, id("veh-2"));
        assert!(table.contains(&id("veh-9")));
        assert!(table.get(&id("veh-8")).is_none());
    }

    #[test]
    fn test_replace_and_remove() {
        let mut table = RouteTable::new();
        table.insert(id("veh-9"), route("veh-2", 2, 0));
        let previous = table.insert(id("veh-9"), route("veh-3", 1, 10));
        assert_eq!(previous.unwrap().next_hop, id("veh-2"));
        assert_eq!(table.count(), 1);

        assert!(table.remove(&id("veh-9")).is_some());
        assert!(table.remove(&id("veh-9")).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove_expired_is_idempotent() {
        let mut table = RouteTable::new();
        table.insert(id("old"), route("veh-2", 1, 0));
        table.insert(id("new"), route("veh-2", 1, 50_000));

        let now = Timestamp::from_millis(70_000);
        let timeout = Duration::from_secs(60);
        assert_eq!(table.remove_expired(now, timeout), 1);
        assert_eq!(table.remove_expired(now, timeout), 0);
        assert!(table.contains(&id("new")));
    }

    #[test]
    fn test_clear() {
        let mut table = RouteTable::new();
        table.insert(id("a"), route("b", 1, 0));
        table.insert(id("c"), route("b", 2, 0));
        assert_eq!(table.iter().count(), 2);

        table.clear();
        assert!(table.is_empty());
    }
}
