//! Pre-deduction review of a job's material lines.
//!
//! Before any spool is touched, every line is matched against the ledger by
//! exact identity. Lines that would drive a spool negative and lines whose
//! spool no longer exists are collected into one [`ConsumptionReview`], shown
//! to the operator once, and only then applied.

use std::collections::HashMap;

use printshop_ledger::{Inventory, SpoolId};
use printshop_pricing::Allocation;

use crate::error::{JobError, Result};

/// What the ledger says about one material line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineStatus {
    /// An exact identity match was found.
    Matched {
        /// Spool that will be deducted.
        spool_id: SpoolId,
        /// Projected spool weight after this line and every earlier line
        /// drawing from the same spool.
        remaining_after: f64,
    },
    /// No spool carries this (name, material, color) any more.
    Orphaned,
}

/// One material line and its ledger status.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewLine {
    /// The line as recorded on the job.
    pub allocation: Allocation,
    /// Match result.
    pub status: LineStatus,
}

impl ReviewLine {
    /// True if deducting this line leaves its spool below zero.
    pub fn would_go_negative(&self) -> bool {
        matches!(self.status, LineStatus::Matched { remaining_after, .. } if remaining_after < 0.0)
    }

    /// True if no spool matched.
    pub fn is_orphaned(&self) -> bool {
        self.status == LineStatus::Orphaned
    }
}

/// Stock and orphan warnings for a whole job, gathered before deduction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConsumptionReview {
    /// One entry per material line, in job order.
    pub lines: Vec<ReviewLine>,
}

impl ConsumptionReview {
    /// Match every allocation against the ledger without mutating it.
    pub fn build(inventory: &Inventory, allocations: &[Allocation]) -> Self {
        let mut projected: HashMap<SpoolId, f64> = HashMap::new();
        let lines = allocations
            .iter()
            .map(|allocation| {
                let status = match inventory.find_matching_spool(&allocation.spool) {
                    Some(spool) => {
                        let weight = projected.entry(spool.id.clone()).or_insert(spool.weight);
                        *weight -= allocation.grams;
                        LineStatus::Matched {
                            spool_id: spool.id.clone(),
                            remaining_after: *weight,
                        }
                    }
                    None => {
                        tracing::warn!(spool = %allocation.spool, grams = allocation.grams, "orphaned allocation");
                        LineStatus::Orphaned
                    }
                };
                ReviewLine {
                    allocation: allocation.clone(),
                    status,
                }
            })
            .collect();
        Self { lines }
    }

    /// Lines that would leave a spool negative.
    pub fn negative_lines(&self) -> impl Iterator<Item = &ReviewLine> {
        self.lines.iter().filter(|l| l.would_go_negative())
    }

    /// Lines with no matching spool.
    pub fn orphaned_lines(&self) -> impl Iterator<Item = &ReviewLine> {
        self.lines.iter().filter(|l| l.is_orphaned())
    }

    /// True if anything needs the operator's attention.
    pub fn has_warnings(&self) -> bool {
        self.lines
            .iter()
            .any(|l| l.is_orphaned() || l.would_go_negative())
    }

    /// Deduct every matched line, skipping orphans.
    ///
    /// Returns the lines actually deducted. Each deduction persists on its
    /// own; a failure partway leaves earlier lines applied and reports how
    /// many went through.
    pub fn apply(&self, inventory: &mut Inventory) -> Result<Vec<Allocation>> {
        let mut applied = Vec::new();
        for line in &self.lines {
            let LineStatus::Matched { spool_id, .. } = &line.status else {
                continue;
            };
            inventory
                .deduct(spool_id, line.allocation.grams)
                .map_err(|source| JobError::Interrupted {
                    applied: applied.len(),
                    source,
                })?;
            applied.push(line.allocation.clone());
        }
        Ok(applied)
    }

    /// Orphaned lines, which [`ConsumptionReview::apply`] skips.
    pub fn skipped(&self) -> Vec<Allocation> {
        self.orphaned_lines().map(|l| l.allocation.clone()).collect()
    }
}

/// Operator decision on a [`ConsumptionReview`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Deduct matched lines and skip orphaned ones.
    Proceed,
    /// Leave everything untouched.
    Abort,
}

/// The single confirmation shown before any deduction.
pub trait ConfirmGate {
    /// Decide whether to go ahead with `review`.
    fn confirm(&mut self, review: &ConsumptionReview) -> Verdict;
}

impl<F> ConfirmGate for F
where
    F: FnMut(&ConsumptionReview) -> Verdict,
{
    fn confirm(&mut self, review: &ConsumptionReview) -> Verdict {
        self(review)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use printshop_ledger::{Collection, MemoryStore, RecordStore, Spool, SpoolIdentity};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn inventory_with(spools: &[Spool]) -> (Inventory, Vec<SpoolId>) {
        let mut inv = Inventory::open(Arc::new(MemoryStore::new()));
        let ids = spools
            .iter()
            .map(|s| inv.add_spool(s.clone()).unwrap())
            .collect();
        (inv, ids)
    }

    fn line(name: &str, material: &str, color: &str, grams: f64) -> Allocation {
        Allocation {
            spool: SpoolIdentity::new(name, material, color),
            spool_id: None,
            grams,
            cost_per_kg: 20.0,
        }
    }

    #[test]
    fn test_projection_accumulates_per_spool() {
        let (inv, ids) = inventory_with(&[Spool::new("Sunlu", "PLA", "Red", 150.0, 20.0)]);
        let review = ConsumptionReview::build(
            &inv,
            &[line("Sunlu", "PLA", "Red", 100.0), line("Sunlu", "PLA", "Red", 100.0)],
        );
        assert!(!review.lines[0].would_go_negative());
        assert!(review.lines[1].would_go_negative());
        assert_eq!(
            review.lines[1].status,
            LineStatus::Matched {
                spool_id: ids[0].clone(),
                remaining_after: -50.0
            }
        );
        // building a review never touches the ledger
        assert_eq!(inv.get(&ids[0]).unwrap().weight, 150.0);
    }

    #[test]
    fn test_orphan_detected() {
        let (inv, _) = inventory_with(&[Spool::new("Sunlu", "PLA", "Red", 150.0, 20.0)]);
        let review = ConsumptionReview::build(&inv, &[line("Sunlu", "PETG", "Red", 10.0)]);
        assert!(review.has_warnings());
        assert_eq!(review.orphaned_lines().count(), 1);
        assert_eq!(review.negative_lines().count(), 0);
    }

    #[test]
    fn test_apply_skips_orphans() {
        let (mut inv, ids) = inventory_with(&[Spool::new("Sunlu", "PLA", "Red", 150.0, 20.0)]);
        let review = ConsumptionReview::build(
            &inv,
            &[line("Sunlu", "PLA", "Red", 40.0), line("Gone", "PLA", "Red", 10.0)],
        );
        let applied = review.apply(&mut inv).unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(review.skipped().len(), 1);
        assert_eq!(inv.get(&ids[0]).unwrap().weight, 110.0);
    }

    /// Store whose writes start failing after `ok_writes` successes.
    struct FailAfter {
        inner: MemoryStore,
        ok_writes: AtomicUsize,
    }

    impl RecordStore for FailAfter {
        fn read(&self, collection: Collection) -> printshop_ledger::Result<Option<String>> {
            self.inner.read(collection)
        }

        fn write(&self, collection: Collection, contents: &str) -> printshop_ledger::Result<()> {
            let left = self.ok_writes.load(Ordering::SeqCst);
            if left == 0 {
                return Err(std::io::Error::other("disk full").into());
            }
            self.ok_writes.store(left - 1, Ordering::SeqCst);
            self.inner.write(collection, contents)
        }
    }

    #[test]
    fn test_apply_is_not_rolled_back() {
        let store = Arc::new(FailAfter {
            inner: MemoryStore::new(),
            ok_writes: AtomicUsize::new(usize::MAX),
        });
        let mut inv = Inventory::open(store.clone());
        let a = inv.add_spool(Spool::new("A", "PLA", "Red", 100.0, 20.0)).unwrap();
        let b = inv.add_spool(Spool::new("B", "PLA", "Red", 100.0, 20.0)).unwrap();

        let review = ConsumptionReview::build(
            &inv,
            &[line("A", "PLA", "Red", 10.0), line("B", "PLA", "Red", 10.0)],
        );
        // the first deduction is written, the second write fails
        store.ok_writes.store(1, Ordering::SeqCst);
        let err = review.apply(&mut inv).unwrap_err();
        assert!(matches!(err, JobError::Interrupted { applied: 1, .. }));
        assert_eq!(inv.get(&a).unwrap().weight, 90.0);
        assert_eq!(inv.get(&b).unwrap().weight, 100.0);

        let on_disk = Inventory::open(store);
        assert_eq!(on_disk.get(&a).unwrap().weight, 90.0);
        assert_eq!(on_disk.get(&b).unwrap().weight, 100.0);
    }

    #[test]
    fn test_closure_gate() {
        let review = ConsumptionReview::default();
        let mut seen = 0;
        let mut gate = |_: &ConsumptionReview| {
            seen += 1;
            Verdict::Abort
        };
        assert_eq!(gate.confirm(&review), Verdict::Abort);
        assert_eq!(seen, 1);
    }
}
