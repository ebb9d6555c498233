//! The spool inventory ledger.

use std::sync::Arc;

use serde::Serialize;

use crate::error::{LedgerError, Result};
use crate::spool::{Spool, SpoolId, SpoolIdentity};
use crate::store::{load_collection, save_collection, Collection, RecordStore};

/// Totals across the whole inventory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InventorySummary {
    /// Number of spools on record.
    pub spool_count: usize,
    /// Grams on hand (negative spools count as zero).
    pub grams_on_hand: f64,
    /// Purchase value of the filament on hand.
    pub stock_value: f64,
    /// Spools whose weight has gone below zero.
    pub negative_spools: usize,
}

/// Owner of all spool records.
///
/// Every mutation rewrites the whole spool collection before returning. The
/// ledger has a single owner, so it does no locking of its own.
pub struct Inventory {
    spools: Vec<Spool>,
    store: Arc<dyn RecordStore>,
}

impl Inventory {
    /// Load the spool collection from `store`.
    ///
    /// Records without an id get the next free zero-padded number, and the
    /// collection is rewritten if any were assigned.
    pub fn open(store: Arc<dyn RecordStore>) -> Self {
        let spools = load_collection(store.as_ref(), Collection::Spools);
        let mut inventory = Self { spools, store };

        if inventory.backfill_ids() > 0 {
            if let Err(e) = inventory.persist() {
                tracing::warn!(error = %e, "could not save back-filled spool ids");
            }
        }
        inventory
    }

    fn backfill_ids(&mut self) -> usize {
        let mut next = self.next_number();
        let mut assigned = 0;
        for spool in &mut self.spools {
            if spool.id.is_unassigned() {
                spool.id = SpoolId::from_number(next);
                next += 1;
                assigned += 1;
            }
        }
        assigned
    }

    fn next_number(&self) -> u64 {
        self.spools
            .iter()
            .filter_map(|s| s.id.number())
            .max()
            .map_or(1, |n| n + 1)
    }

    fn persist(&self) -> Result<()> {
        save_collection(self.store.as_ref(), Collection::Spools, &self.spools)
    }

    fn position(&self, id: &SpoolId) -> Result<usize> {
        self.spools
            .iter()
            .position(|s| &s.id == id)
            .ok_or_else(|| LedgerError::UnknownSpool(id.clone()))
    }

    /// All spools, in insertion order.
    pub fn spools(&self) -> &[Spool] {
        &self.spools
    }

    /// Look up a spool by id.
    pub fn get(&self, id: &SpoolId) -> Option<&Spool> {
        self.spools.iter().find(|s| &s.id == id)
    }

    /// The id the next added spool would receive.
    pub fn next_id(&self) -> SpoolId {
        SpoolId::from_number(self.next_number())
    }

    /// Add a spool, assigning an id if it has none.
    pub fn add_spool(&mut self, mut spool: Spool) -> Result<SpoolId> {
        if spool.id.is_unassigned() {
            spool.id = self.next_id();
        } else if self.get(&spool.id).is_some() {
            return Err(LedgerError::DuplicateId(spool.id));
        }
        let id = spool.id.clone();
        let (name, grams) = (spool.name.clone(), spool.weight);
        self.spools.push(spool);
        if let Err(e) = self.persist() {
            self.spools.pop();
            return Err(e);
        }
        tracing::info!(spool = %id, name = %name, grams, "spool added");
        Ok(id)
    }

    /// Replace the record carrying `spool.id`.
    pub fn update_spool(&mut self, spool: Spool) -> Result<()> {
        let idx = self.position(&spool.id)?;
        let previous = std::mem::replace(&mut self.spools[idx], spool);
        if let Err(e) = self.persist() {
            self.spools[idx] = previous;
            return Err(e);
        }
        tracing::info!(spool = %previous.id, "spool updated");
        Ok(())
    }

    /// Remove a spool.
    ///
    /// Queued jobs keep value snapshots of their allocations, so deleting a
    /// spool they drew from is allowed; those lines become orphaned.
    pub fn delete_spool(&mut self, id: &SpoolId) -> Result<Spool> {
        let idx = self.position(id)?;
        let removed = self.spools.remove(idx);
        if let Err(e) = self.persist() {
            self.spools.insert(idx, removed);
            return Err(e);
        }
        tracing::info!(spool = %id, "spool deleted");
        Ok(removed)
    }

    /// True if deducting `grams` would leave the spool below zero.
    pub fn would_go_negative(&self, id: &SpoolId, grams: f64) -> Result<bool> {
        let idx = self.position(id)?;
        Ok(self.spools[idx].weight - grams < 0.0)
    }

    /// Subtract `grams` from a spool and return the new weight.
    ///
    /// The result may be negative; gating on [`Inventory::would_go_negative`]
    /// is the caller's job.
    pub fn deduct(&mut self, id: &SpoolId, grams: f64) -> Result<f64> {
        let weight = self.set_weight(id, |w| w - grams)?;
        if weight < 0.0 {
            tracing::warn!(spool = %id, grams, weight, "spool weight is negative");
        } else {
            tracing::debug!(spool = %id, grams, weight, "deducted");
        }
        Ok(weight)
    }

    /// Add `grams` back to a spool and return the new weight.
    pub fn restore(&mut self, id: &SpoolId, grams: f64) -> Result<f64> {
        let weight = self.set_weight(id, |w| w + grams)?;
        tracing::debug!(spool = %id, grams, weight, "restored");
        Ok(weight)
    }

    // a failed write leaves the old weight in place
    fn set_weight(&mut self, id: &SpoolId, change: impl FnOnce(f64) -> f64) -> Result<f64> {
        let idx = self.position(id)?;
        let before = self.spools[idx].weight;
        let after = change(before);
        self.spools[idx].weight = after;
        if let Err(e) = self.persist() {
            self.spools[idx].weight = before;
            return Err(e);
        }
        Ok(after)
    }

    /// Find the spool with exactly this (name, material, color).
    pub fn find_matching_spool(&self, identity: &SpoolIdentity) -> Option<&Spool> {
        self.spools.iter().find(|s| identity.matches(s))
    }

    /// Totals for a dashboard view.
    pub fn summary(&self) -> InventorySummary {
        InventorySummary {
            spool_count: self.spools.len(),
            grams_on_hand: self.spools.iter().map(|s| s.weight.max(0.0)).sum(),
            stock_value: self.spools.iter().map(Spool::stock_value).sum(),
            negative_spools: self.spools.iter().filter(|s| s.weight < 0.0).count(),
        }
    }
}
