//! In-memory order collection and the dual-source reconciliation algorithm.
//!
//! The cache is the single source of truth the dashboard reads. It is fed by
//! three asynchronous origins: the active-orders snapshot, the
//! canceled-orders snapshot, and push upserts. Each snapshot query is
//! filtered server-side to one status bucket, so applying it must replace
//! exactly that bucket and leave the other untouched — the active query never
//! returns canceled orders, and a naive replace would erase cancellation
//! history.
//!
//! Every write goes through the four operations below; no other code path
//! mutates the collection. For any given id the last-applied operation wins.
//! There is no timestamp-based conflict resolution: the server is the single
//! writer and push events are monotonically informative.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::model::{normalize_order, OrderRecord, OrderStatus};

#[derive(Debug)]
struct Slot {
    record: OrderRecord,
    /// Generation of the snapshot pass that last confirmed this record.
    /// Makes the preserve-other-bucket rule explicit: a snapshot pass drops
    /// only records of its own bucket that it did not re-confirm.
    generation: u64,
}

/// Authoritative in-process collection of orders, keyed by id.
///
/// Exactly one record per id exists at any time. Records are created the
/// instant a payload is first observed, replaced in place on every later
/// observation of the same id, and removed only by being absent from a full
/// snapshot of their own status bucket.
#[derive(Debug, Default)]
pub struct OrderCache {
    slots: HashMap<String, Slot>,
    /// Ids in display order: snapshot order for fetched rows, front-insertion
    /// for records first seen through a push event.
    display: Vec<String>,
    snapshot_generation: u64,
}

impl OrderCache {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Mutation operations
    // -----------------------------------------------------------------------

    /// Apply a full active-bucket snapshot: replace every non-canceled order
    /// with the snapshot's contents, preserving every CANCELADO record
    /// untouched.
    pub fn apply_active_snapshot(&mut self, payloads: &[Value]) {
        let generation = self.begin_snapshot();
        let fresh = self.ingest(payloads, generation);
        // Non-canceled records the snapshot did not re-confirm are gone from
        // the server's active set.
        self.slots
            .retain(|_, slot| slot.generation == generation || slot.record.status.is_canceled());
        let kept = self.surviving_display(generation);
        self.display = fresh.into_iter().chain(kept).collect();
        debug!(
            generation,
            orders = self.display.len(),
            "active snapshot applied"
        );
    }

    /// Apply a full canceled-bucket snapshot: replace the canceled subset,
    /// preserving every non-canceled order untouched.
    pub fn apply_canceled_snapshot(&mut self, payloads: &[Value]) {
        let generation = self.begin_snapshot();
        let fresh = self.ingest(payloads, generation);
        self.slots
            .retain(|_, slot| slot.generation == generation || !slot.record.status.is_canceled());
        let kept = self.surviving_display(generation);
        self.display = kept.into_iter().chain(fresh).collect();
        debug!(
            generation,
            orders = self.display.len(),
            "canceled snapshot applied"
        );
    }

    /// Apply a push upsert: replace the existing record by id, or prepend the
    /// record as new. This is the only path that moves an order into the
    /// cache without a snapshot round-trip, and it is idempotent — the same
    /// event twice leaves the same final state as once.
    pub fn apply_event(&mut self, payload: &Value) -> &OrderRecord {
        let record = normalize_order(payload);
        let id = record.id.clone();
        match self.slots.get_mut(&id) {
            Some(slot) => {
                // Replace in place; the record keeps its display position.
                slot.record = record;
            }
            None => {
                self.slots.insert(
                    id.clone(),
                    Slot {
                        record,
                        generation: self.snapshot_generation,
                    },
                );
                self.display.insert(0, id.clone());
            }
        }
        &self.slots[&id].record
    }

    /// Fold a single server-confirmed record over an existing entry by id.
    /// Unlike [`apply_event`](Self::apply_event), an unknown id is dropped —
    /// this mirrors the cancellation fold-back, which only ever rewrites an
    /// order the operator was looking at.
    pub fn replace_by_id(&mut self, record: OrderRecord) -> bool {
        match self.slots.get_mut(&record.id) {
            Some(slot) => {
                slot.record = record;
                true
            }
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn get(&self, id: &str) -> Option<&OrderRecord> {
        self.slots.get(id).map(|slot| &slot.record)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All orders in display order.
    pub fn orders(&self) -> impl Iterator<Item = &OrderRecord> {
        self.display
            .iter()
            .filter_map(|id| self.slots.get(id))
            .map(|slot| &slot.record)
    }

    /// Non-canceled orders in display order.
    pub fn active(&self) -> impl Iterator<Item = &OrderRecord> {
        self.orders().filter(|o| !o.status.is_canceled())
    }

    /// Canceled orders in display order.
    pub fn canceled(&self) -> impl Iterator<Item = &OrderRecord> {
        self.orders().filter(|o| o.status.is_canceled())
    }

    /// Orders in one dashboard column.
    pub fn in_status<'a>(
        &'a self,
        status: &'a OrderStatus,
    ) -> impl Iterator<Item = &'a OrderRecord> {
        self.orders().filter(move |o| o.status == *status)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn begin_snapshot(&mut self) -> u64 {
        self.snapshot_generation += 1;
        self.snapshot_generation
    }

    /// Normalize and upsert every payload, tagging it with `generation`.
    /// Returns the fresh ids in snapshot order, deduplicated (last payload
    /// for an id wins, first position sticks).
    fn ingest(&mut self, payloads: &[Value], generation: u64) -> Vec<String> {
        let mut fresh = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let record = normalize_order(payload);
            let id = record.id.clone();
            let prev = self.slots.insert(id.clone(), Slot { record, generation });
            if prev.map_or(true, |slot| slot.generation != generation) {
                fresh.push(id);
            }
        }
        fresh
    }

    /// Ids from the prior display order that survived the current snapshot
    /// pass untouched, in their existing relative order.
    fn surviving_display(&self, generation: u64) -> Vec<String> {
        self.display
            .iter()
            .filter(|id| {
                self.slots
                    .get(*id)
                    .is_some_and(|slot| slot.generation != generation)
            })
            .cloned()
            .collect()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(cache: &OrderCache) -> Vec<&str> {
        cache.orders().map(|o| o.id.as_str()).collect()
    }

    #[test]
    fn test_active_snapshot_preserves_canceled_bucket() {
        // A canceled order must survive an active refresh untouched.
        let mut cache = OrderCache::new();
        cache.apply_canceled_snapshot(&[json!({"id": "c1", "status": "CANCELADO"})]);
        cache.apply_active_snapshot(&[json!({"id": "a1", "status": "PROCESO"})]);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a1").unwrap().status, OrderStatus::Proceso);
        assert_eq!(cache.get("c1").unwrap().status, OrderStatus::Cancelado);
        assert_eq!(ids(&cache), vec!["a1", "c1"]);
    }

    #[test]
    fn test_canceled_snapshot_preserves_active_bucket() {
        let mut cache = OrderCache::new();
        cache.apply_active_snapshot(&[
            json!({"id": "a1", "status": "PROCESO"}),
            json!({"id": "a2", "status": "ENVIADO"}),
        ]);
        cache.apply_canceled_snapshot(&[json!({"id": "c1", "status": "CANCELADO"})]);

        assert_eq!(cache.len(), 3);
        assert_eq!(ids(&cache), vec!["a1", "a2", "c1"]);
        assert_eq!(cache.active().count(), 2);
        assert_eq!(cache.canceled().count(), 1);
    }

    #[test]
    fn test_active_snapshot_replaces_whole_bucket() {
        let mut cache = OrderCache::new();
        cache.apply_active_snapshot(&[
            json!({"id": "a1", "status": "PROCESO"}),
            json!({"id": "a2", "status": "PROCESO"}),
        ]);
        // a2 is gone from the server's active set; a3 is new.
        cache.apply_active_snapshot(&[
            json!({"id": "a1", "status": "ENVIADO"}),
            json!({"id": "a3", "status": "PROCESO"}),
        ]);

        assert_eq!(cache.get("a2"), None);
        assert_eq!(cache.get("a1").unwrap().status, OrderStatus::Enviado);
        assert_eq!(ids(&cache), vec!["a1", "a3"]);
    }

    #[test]
    fn test_canceled_snapshot_replaces_only_canceled() {
        let mut cache = OrderCache::new();
        cache.apply_canceled_snapshot(&[
            json!({"id": "c1", "status": "CANCELADO"}),
            json!({"id": "c2", "status": "CANCELADO"}),
        ]);
        cache.apply_active_snapshot(&[json!({"id": "a1", "status": "PROCESO"})]);
        cache.apply_canceled_snapshot(&[json!({"id": "c2", "status": "CANCELADO"})]);

        assert_eq!(cache.get("c1"), None);
        assert_eq!(cache.len(), 2);
        assert_eq!(ids(&cache), vec!["a1", "c2"]);
    }

    #[test]
    fn test_snapshot_takeover_across_buckets_keeps_one_record_per_id() {
        // An order that was active gets returned by the canceled snapshot:
        // the snapshot's version wins and the id appears exactly once.
        let mut cache = OrderCache::new();
        cache.apply_active_snapshot(&[json!({"id": "o1", "status": "PROCESO"})]);
        cache.apply_canceled_snapshot(&[json!({"id": "o1", "status": "CANCELADO"})]);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("o1").unwrap().status, OrderStatus::Cancelado);
        assert_eq!(ids(&cache), vec!["o1"]);
    }

    #[test]
    fn test_push_event_prepends_new_and_is_idempotent() {
        // An unknown id inserts at the front; a second identical event
        // changes nothing further.
        let mut cache = OrderCache::new();
        cache.apply_active_snapshot(&[json!({"id": "a1", "status": "PROCESO"})]);

        let event = json!({"id": "p1", "status": "PROCESO", "total": 42.0});
        cache.apply_event(&event);
        assert_eq!(ids(&cache), vec!["p1", "a1"]);

        let before: Vec<OrderRecord> = cache.orders().cloned().collect();
        cache.apply_event(&event);
        let after: Vec<OrderRecord> = cache.orders().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_push_event_replaces_in_place() {
        let mut cache = OrderCache::new();
        cache.apply_active_snapshot(&[
            json!({"id": "a1", "status": "PROCESO"}),
            json!({"id": "a2", "status": "PROCESO"}),
        ]);
        cache.apply_event(&json!({"id": "a2", "status": "ENVIADO"}));

        // Same display position, new contents.
        assert_eq!(ids(&cache), vec!["a1", "a2"]);
        assert_eq!(cache.get("a2").unwrap().status, OrderStatus::Enviado);
    }

    #[test]
    fn test_pushed_record_is_superseded_by_next_snapshot() {
        // A record first seen via push belongs to the active bucket; the next
        // active snapshot owns it and drops it when absent.
        let mut cache = OrderCache::new();
        cache.apply_event(&json!({"id": "p1", "status": "PROCESO"}));
        cache.apply_active_snapshot(&[json!({"id": "a1", "status": "PROCESO"})]);

        assert_eq!(cache.get("p1"), None);
        assert_eq!(ids(&cache), vec!["a1"]);
    }

    #[test]
    fn test_replace_by_id_ignores_unknown() {
        let mut cache = OrderCache::new();
        cache.apply_active_snapshot(&[json!({"id": "a1", "status": "PROCESO"})]);

        let known = normalize_order(&json!({"id": "a1", "status": "CANCELADO"}));
        assert!(cache.replace_by_id(known));
        assert_eq!(cache.get("a1").unwrap().status, OrderStatus::Cancelado);

        let unknown = normalize_order(&json!({"id": "zz", "status": "CANCELADO"}));
        assert!(!cache.replace_by_id(unknown));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_duplicate_ids_within_snapshot_last_wins() {
        let mut cache = OrderCache::new();
        cache.apply_active_snapshot(&[
            json!({"id": "a1", "status": "PROCESO", "total": 10.0}),
            json!({"id": "a1", "status": "PROCESO", "total": 20.0}),
        ]);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a1").unwrap().total, 20.0);
        assert_eq!(ids(&cache), vec!["a1"]);
    }

    #[test]
    fn test_status_buckets_for_display() {
        let mut cache = OrderCache::new();
        cache.apply_active_snapshot(&[
            json!({"id": "a1", "status": "PROCESO"}),
            json!({"id": "a2", "status": "ENVIADO"}),
            json!({"id": "a3", "status": "PROCESO"}),
        ]);

        let proceso: Vec<&str> = cache
            .in_status(&OrderStatus::Proceso)
            .map(|o| o.id.as_str())
            .collect();
        assert_eq!(proceso, vec!["a1", "a3"]);
        assert_eq!(cache.in_status(&OrderStatus::Enviado).count(), 1);
    }

    #[test]
    fn test_empty_snapshot_clears_own_bucket_only() {
        let mut cache = OrderCache::new();
        cache.apply_active_snapshot(&[json!({"id": "a1", "status": "PROCESO"})]);
        cache.apply_canceled_snapshot(&[json!({"id": "c1", "status": "CANCELADO"})]);

        cache.apply_active_snapshot(&[]);
        assert_eq!(cache.get("a1"), None);
        assert!(cache.get("c1").is_some());

        cache.apply_canceled_snapshot(&[]);
        assert!(cache.is_empty());
    }
}
