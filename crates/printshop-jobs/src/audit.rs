//! Over-commitment audit.
//!
//! A spool should never owe more grams to queued jobs than it still holds.
//! Nothing enforces this; the audit only reports it.

use printshop_ledger::{Inventory, SpoolId};
use serde::Serialize;

use crate::record::QueueEntry;

/// A spool whose queued demand exceeds its remaining weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overcommitment {
    /// Spool id.
    pub spool_id: SpoolId,
    /// Spool label for display.
    pub label: String,
    /// Grams currently on the spool.
    pub remaining: f64,
    /// Grams promised to queued jobs.
    pub committed: f64,
}

impl Overcommitment {
    /// Grams missing once every queued job is printed.
    pub fn shortfall(&self) -> f64 {
        self.committed - self.remaining
    }
}

/// Compare each spool's remaining weight against queued demand.
pub fn overcommitted(inventory: &Inventory, queue: &[QueueEntry]) -> Vec<Overcommitment> {
    inventory
        .spools()
        .iter()
        .filter_map(|spool| {
            let committed: f64 = queue
                .iter()
                .flat_map(|e| &e.items)
                .filter(|a| a.spool.matches(spool))
                .map(|a| a.grams)
                .sum();
            if committed <= 0.0 || spool.weight - committed >= 0.0 {
                return None;
            }
            tracing::warn!(spool = %spool.id, remaining = spool.weight, committed, "spool over-committed");
            Some(Overcommitment {
                spool_id: spool.id.clone(),
                label: spool.identity().to_string(),
                remaining: spool.weight,
                committed,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::JobBook;
    use printshop_ledger::{MemoryStore, Spool};
    use printshop_pricing::JobDraft;
    use std::sync::Arc;

    #[test]
    fn test_reports_only_overcommitted_spools() {
        let store = Arc::new(MemoryStore::new());
        let mut inv = Inventory::open(store.clone());
        let mut book = JobBook::open(store);
        let tight = inv.add_spool(Spool::new("Sunlu", "PLA", "Red", 150.0, 20.0)).unwrap();
        let roomy = inv.add_spool(Spool::new("Sunlu", "PLA", "Blue", 1000.0, 20.0)).unwrap();

        for _ in 0..2 {
            let mut draft = JobDraft::new("Bracket");
            draft.add_from_spool(inv.get(&tight).unwrap(), 100.0);
            draft.add_from_spool(inv.get(&roomy).unwrap(), 100.0);
            book.save_to_queue(&mut draft).unwrap();
        }

        let report = overcommitted(&inv, book.queue());
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].spool_id, tight);
        assert_eq!(report[0].committed, 200.0);
        assert_eq!(report[0].shortfall(), 50.0);
    }

    #[test]
    fn test_empty_queue_is_clean() {
        let mut inv = Inventory::open(Arc::new(MemoryStore::new()));
        inv.add_spool(Spool::new("Sunlu", "PLA", "Red", 10.0, 20.0)).unwrap();
        assert!(overcommitted(&inv, &[]).is_empty());
    }
}
