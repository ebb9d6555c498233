//! The job book: queued jobs and sales history.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use printshop_ledger::{load_collection, save_collection, Collection, Inventory, RecordStore, SpoolId};
use printshop_pricing::{price, Allocation, JobDraft, PricedQuote};
use serde::Serialize;

use crate::error::{JobError, Result};
use crate::record::{HistoryRecord, JobId, JobOutcome, QueueEntry};
use crate::review::{ConfirmGate, ConsumptionReview, Verdict};

/// Outcome of a finalize operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Inventory was deducted and a history record appended.
    Recorded {
        /// The new record.
        record: HistoryRecord,
        /// Orphaned lines that were not deducted.
        skipped: Vec<Allocation>,
    },
    /// The operator declined; nothing changed.
    Aborted,
}

/// Result of deleting a history record.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoReport {
    /// The deleted record.
    pub record: HistoryRecord,
    /// Spools given their grams back.
    pub restored: Vec<(SpoolId, f64)>,
    /// Lines that could not be restored.
    pub unrestored: Vec<Allocation>,
}

/// Totals across the sales history.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct HistorySummary {
    /// Records of any outcome.
    pub jobs: usize,
    /// Failed prints.
    pub failed: usize,
    /// Donated jobs.
    pub donated: usize,
    /// Sum of amounts charged.
    pub revenue: f64,
    /// Sum of profits (failures count as losses).
    pub profit: f64,
}

/// Owner of the job queue and the sales history.
///
/// Like the spool ledger, every mutation rewrites the affected collection
/// before returning.
pub struct JobBook {
    queue: Vec<QueueEntry>,
    history: Vec<HistoryRecord>,
    store: Arc<dyn RecordStore>,
}

impl JobBook {
    /// Load the queue and history from `store`.
    pub fn open(store: Arc<dyn RecordStore>) -> Self {
        let queue = load_collection(store.as_ref(), Collection::Queue);
        let history = load_collection(store.as_ref(), Collection::History);
        Self {
            queue,
            history,
            store,
        }
    }

    fn persist_queue(&self) -> Result<()> {
        Ok(save_collection(self.store.as_ref(), Collection::Queue, &self.queue)?)
    }

    fn persist_history(&self) -> Result<()> {
        Ok(save_collection(self.store.as_ref(), Collection::History, &self.history)?)
    }

    fn queue_position(&self, id: JobId) -> Result<usize> {
        self.queue
            .iter()
            .position(|e| e.id == id)
            .ok_or(JobError::NotFound(id))
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// Queued jobs, oldest first.
    pub fn queue(&self) -> &[QueueEntry] {
        &self.queue
    }

    /// Sales history, oldest first.
    pub fn history(&self) -> &[HistoryRecord] {
        &self.history
    }

    /// Look up a queued job.
    pub fn queue_entry(&self, id: JobId) -> Option<&QueueEntry> {
        self.queue.iter().find(|e| e.id == id)
    }

    /// Price and snapshot a draft into the queue, then clear the draft.
    pub fn save_to_queue(&mut self, draft: &mut JobDraft) -> Result<JobId> {
        if draft.is_empty() {
            return Err(JobError::EmptyDraft);
        }
        let entry = QueueEntry::from_draft(draft, price(draft), Self::today());
        let id = entry.id;
        self.queue.push(entry);
        if let Err(e) = self.persist_queue() {
            self.queue.pop();
            return Err(e);
        }
        tracing::info!(job = %draft.name, %id, "job queued");
        draft.clear();
        Ok(id)
    }

    /// Rebuild a draft from a queued job. The entry stays queued.
    pub fn load_from_queue(&self, id: JobId) -> Result<JobDraft> {
        self.queue_entry(id)
            .map(QueueEntry::to_draft)
            .ok_or(JobError::NotFound(id))
    }

    /// Queue a copy of an existing entry under a new id.
    pub fn duplicate_queue_entry(&mut self, id: JobId) -> Result<JobId> {
        let idx = self.queue_position(id)?;
        let mut copy = self.queue[idx].clone();
        copy.id = JobId::new();
        copy.date_added = Self::today();
        let new_id = copy.id;
        self.queue.push(copy);
        if let Err(e) = self.persist_queue() {
            self.queue.pop();
            return Err(e);
        }
        tracing::info!(from = %id, to = %new_id, "queue entry duplicated");
        Ok(new_id)
    }

    /// Cancel a queued job. Inventory is not touched.
    pub fn delete_from_queue(&mut self, id: JobId) -> Result<QueueEntry> {
        let idx = self.queue_position(id)?;
        let entry = self.queue.remove(idx);
        if let Err(e) = self.persist_queue() {
            self.queue.insert(idx, entry);
            return Err(e);
        }
        tracing::info!(job = %entry.job, %id, "queued job cancelled");
        Ok(entry)
    }

    /// Deduct a queued job's materials, log it as sold, and unqueue it.
    pub fn complete_queued_job(
        &mut self,
        inventory: &mut Inventory,
        id: JobId,
        gate: &mut dyn ConfirmGate,
    ) -> Result<Completion> {
        let idx = self.queue_position(id)?;
        let entry = &self.queue[idx];
        let review = ConsumptionReview::build(inventory, &entry.items);
        if gate.confirm(&review) == Verdict::Abort {
            tracing::info!(job = %entry.job, "completion aborted");
            return Ok(Completion::Aborted);
        }

        let deducted = review.apply(inventory)?;
        let entry = &self.queue[idx];
        let record = HistoryRecord::sold(&entry.job, &entry.quote, entry.donation, deducted, Self::today());
        self.append_history(record.clone())?;
        let entry = self.queue.remove(idx);
        if let Err(e) = self.persist_queue() {
            self.queue.insert(idx, entry);
            return Err(e);
        }
        tracing::info!(job = %record.job, sold_for = record.sold_for, "queued job completed");

        Ok(Completion::Recorded {
            record,
            skipped: review.skipped(),
        })
    }

    /// Deduct a draft's materials and log it as sold without queueing.
    ///
    /// The draft is cleared once the record is written.
    pub fn finalize_sale(
        &mut self,
        inventory: &mut Inventory,
        draft: &mut JobDraft,
        gate: &mut dyn ConfirmGate,
    ) -> Result<Completion> {
        let quote = price(draft);
        let name = draft_name(draft);
        let donation = draft.params.donation;
        self.finalize_draft(inventory, draft, gate, move |items, date| {
            HistoryRecord::sold(name, &quote, donation, items, date)
        })
    }

    /// Deduct a draft's materials and log a failed print.
    ///
    /// The material cost is recorded as a loss with no revenue.
    pub fn log_failure(
        &mut self,
        inventory: &mut Inventory,
        draft: &mut JobDraft,
        gate: &mut dyn ConfirmGate,
    ) -> Result<Completion> {
        let quote = price(draft);
        let name = draft_name(draft);
        self.finalize_draft(inventory, draft, gate, move |items, date| {
            HistoryRecord::failed(name, &quote, items, date)
        })
    }

    fn finalize_draft(
        &mut self,
        inventory: &mut Inventory,
        draft: &mut JobDraft,
        gate: &mut dyn ConfirmGate,
        make_record: impl FnOnce(Vec<Allocation>, NaiveDate) -> HistoryRecord,
    ) -> Result<Completion> {
        if draft.is_empty() {
            return Err(JobError::EmptyDraft);
        }
        let review = ConsumptionReview::build(inventory, &draft.allocations);
        if gate.confirm(&review) == Verdict::Abort {
            tracing::info!(job = %draft.name, "finalize aborted");
            return Ok(Completion::Aborted);
        }

        let deducted = review.apply(inventory)?;
        let record = make_record(deducted, Self::today());
        self.append_history(record.clone())?;
        tracing::info!(job = %record.job, outcome = ?record.outcome, "job finalized");
        draft.clear();

        Ok(Completion::Recorded {
            record,
            skipped: review.skipped(),
        })
    }

    fn append_history(&mut self, record: HistoryRecord) -> Result<()> {
        self.history.push(record);
        if let Err(e) = self.persist_history() {
            self.history.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Delete a history record, optionally giving its grams back.
    ///
    /// Lines are matched by spool identity. A line with no match is reported
    /// as unrestored and the record is deleted anyway.
    pub fn delete_history(
        &mut self,
        inventory: &mut Inventory,
        id: JobId,
        restore: bool,
    ) -> Result<UndoReport> {
        let idx = self
            .history
            .iter()
            .position(|r| r.id == id)
            .ok_or(JobError::NotFound(id))?;

        let mut restored = Vec::new();
        let mut unrestored = Vec::new();
        if restore {
            for item in &self.history[idx].items {
                let Some(spool_id) = inventory.find_matching_spool(&item.spool).map(|s| s.id.clone())
                else {
                    tracing::warn!(spool = %item.spool, grams = item.grams, "could not restore");
                    unrestored.push(item.clone());
                    continue;
                };
                match inventory.restore(&spool_id, item.grams) {
                    Ok(_) => restored.push((spool_id, item.grams)),
                    Err(e) => {
                        tracing::warn!(spool = %spool_id, error = %e, "could not restore");
                        unrestored.push(item.clone());
                    }
                }
            }
        }

        let record = self.history.remove(idx);
        if let Err(e) = self.persist_history() {
            self.history.insert(idx, record);
            return Err(e);
        }
        tracing::info!(job = %record.job, restored = restored.len(), "history record deleted");
        Ok(UndoReport {
            record,
            restored,
            unrestored,
        })
    }

    /// Totals across the whole history.
    pub fn history_summary(&self) -> HistorySummary {
        self.history.iter().fold(HistorySummary::default(), |mut acc, r| {
            acc.jobs += 1;
            if r.outcome == JobOutcome::Failed {
                acc.failed += 1;
            }
            if r.donation {
                acc.donated += 1;
            }
            acc.revenue += r.sold_for;
            acc.profit += r.profit;
            acc
        })
    }

    /// The quote frozen on a queued job.
    pub fn queued_quote(&self, id: JobId) -> Option<&PricedQuote> {
        self.queue_entry(id).map(|e| &e.quote)
    }
}

fn draft_name(draft: &JobDraft) -> String {
    if draft.name.trim().is_empty() {
        "Custom Job".to_string()
    } else {
        draft.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use printshop_ledger::{MemoryStore, Spool};

    fn setup() -> (Arc<MemoryStore>, Inventory, JobBook) {
        let store = Arc::new(MemoryStore::new());
        let inventory = Inventory::open(store.clone());
        let book = JobBook::open(store.clone());
        (store, inventory, book)
    }

    fn proceed(_: &ConsumptionReview) -> Verdict {
        Verdict::Proceed
    }

    fn abort(_: &ConsumptionReview) -> Verdict {
        Verdict::Abort
    }

    fn draft_from(inv: &Inventory, id: &SpoolId, grams: f64) -> JobDraft {
        let mut draft = JobDraft::new("Planter");
        draft.add_from_spool(inv.get(id).unwrap(), grams);
        draft.params.hours = 2.0;
        draft.params.markup = 2.5;
        draft
    }

    #[test]
    fn test_queue_round_trip_survives_spool_deletion() {
        let (_, mut inv, mut book) = setup();
        let id = inv.add_spool(Spool::new("Sunlu", "PLA", "Red", 1000.0, 20.0)).unwrap();
        let mut draft = draft_from(&inv, &id, 100.0);
        let original = draft.clone();

        let job = book.save_to_queue(&mut draft).unwrap();
        assert!(draft.is_empty());
        inv.delete_spool(&id).unwrap();

        let loaded = book.load_from_queue(job).unwrap();
        assert_eq!(loaded.name, original.name);
        assert_eq!(loaded.allocations, original.allocations);
        assert_eq!(loaded.params, original.params);
        assert_relative_eq!(book.queued_quote(job).unwrap().final_price, 8.75, epsilon = 1e-9);
    }

    #[test]
    fn test_save_empty_draft_rejected() {
        let (_, _, mut book) = setup();
        let mut draft = JobDraft::new("Nothing");
        assert!(matches!(book.save_to_queue(&mut draft), Err(JobError::EmptyDraft)));
        assert!(book.queue().is_empty());
    }

    #[test]
    fn test_complete_with_renamed_spool_skips_orphan() {
        let (_, mut inv, mut book) = setup();
        let red = inv.add_spool(Spool::new("Sunlu", "PLA", "Red", 500.0, 20.0)).unwrap();
        let blue = inv.add_spool(Spool::new("Sunlu", "PLA", "Blue", 500.0, 20.0)).unwrap();

        let mut draft = draft_from(&inv, &red, 100.0);
        draft.add_from_spool(inv.get(&blue).unwrap(), 50.0);
        let job = book.save_to_queue(&mut draft).unwrap();

        let mut renamed = inv.get(&blue).unwrap().clone();
        renamed.name = "Sunlu Matte".into();
        inv.update_spool(renamed).unwrap();

        let mut reviewed = None;
        let mut gate = |review: &ConsumptionReview| {
            reviewed = Some(review.clone());
            Verdict::Proceed
        };
        let completion = book.complete_queued_job(&mut inv, job, &mut gate).unwrap();

        let review = reviewed.unwrap();
        assert_eq!(review.orphaned_lines().count(), 1);
        let Completion::Recorded { record, skipped } = completion else {
            panic!("expected a record");
        };
        assert_eq!(skipped.len(), 1);
        assert_eq!(record.items.len(), 1);
        assert_eq!(record.outcome, JobOutcome::Sold);
        assert_eq!(inv.get(&red).unwrap().weight, 400.0);
        assert_eq!(inv.get(&blue).unwrap().weight, 500.0);
        assert!(book.queue().is_empty());
        assert_eq!(book.history().len(), 1);
    }

    #[test]
    fn test_abort_changes_nothing() {
        let (_, mut inv, mut book) = setup();
        let id = inv.add_spool(Spool::new("Sunlu", "PLA", "Red", 50.0, 20.0)).unwrap();
        let mut draft = draft_from(&inv, &id, 100.0);
        let job = book.save_to_queue(&mut draft).unwrap();

        let mut seen_negative = false;
        let mut gate = |review: &ConsumptionReview| {
            seen_negative = review.negative_lines().count() == 1;
            Verdict::Abort
        };
        let completion = book.complete_queued_job(&mut inv, job, &mut gate).unwrap();
        assert_eq!(completion, Completion::Aborted);
        assert!(seen_negative);
        assert_eq!(inv.get(&id).unwrap().weight, 50.0);
        assert_eq!(book.queue().len(), 1);
        assert!(book.history().is_empty());
    }

    #[test]
    fn test_finalize_sale_skips_queue() {
        let (store, mut inv, mut book) = setup();
        let id = inv.add_spool(Spool::new("Sunlu", "PLA", "Red", 1000.0, 20.0)).unwrap();
        let mut draft = draft_from(&inv, &id, 100.0);

        let completion = book.finalize_sale(&mut inv, &mut draft, &mut proceed).unwrap();
        let Completion::Recorded { record, .. } = completion else {
            panic!("expected a record");
        };
        assert_relative_eq!(record.sold_for, 8.75, epsilon = 1e-9);
        assert_relative_eq!(record.cost, 3.50, epsilon = 1e-9);
        assert_relative_eq!(record.profit, 5.25, epsilon = 1e-9);
        assert!(draft.is_empty());
        assert_eq!(inv.get(&id).unwrap().weight, 900.0);

        let reopened = JobBook::open(store);
        assert_eq!(reopened.history(), book.history());
    }

    #[test]
    fn test_log_failure_records_material_loss() {
        let (_, mut inv, mut book) = setup();
        let id = inv.add_spool(Spool::new("Sunlu", "PLA", "Red", 1000.0, 20.0)).unwrap();
        let mut draft = draft_from(&inv, &id, 100.0);

        let Completion::Recorded { record, .. } =
            book.log_failure(&mut inv, &mut draft, &mut proceed).unwrap()
        else {
            panic!("expected a record");
        };
        assert_eq!(record.outcome, JobOutcome::Failed);
        assert_eq!(record.sold_for, 0.0);
        assert_relative_eq!(record.profit, -2.0, epsilon = 1e-9);
        assert_eq!(inv.get(&id).unwrap().weight, 900.0);
    }

    #[test]
    fn test_aborted_finalize_keeps_draft() {
        let (_, mut inv, mut book) = setup();
        let id = inv.add_spool(Spool::new("Sunlu", "PLA", "Red", 1000.0, 20.0)).unwrap();
        let mut draft = draft_from(&inv, &id, 100.0);
        assert_eq!(
            book.finalize_sale(&mut inv, &mut draft, &mut abort).unwrap(),
            Completion::Aborted
        );
        assert!(!draft.is_empty());
    }

    #[test]
    fn test_cancel_has_no_inventory_effect() {
        let (_, mut inv, mut book) = setup();
        let id = inv.add_spool(Spool::new("Sunlu", "PLA", "Red", 1000.0, 20.0)).unwrap();
        let mut draft = draft_from(&inv, &id, 100.0);
        let job = book.save_to_queue(&mut draft).unwrap();

        book.delete_from_queue(job).unwrap();
        assert!(book.queue().is_empty());
        assert_eq!(inv.get(&id).unwrap().weight, 1000.0);
        assert!(matches!(book.delete_from_queue(job), Err(JobError::NotFound(_))));
    }

    #[test]
    fn test_duplicate_queue_entry() {
        let (_, mut inv, mut book) = setup();
        let id = inv.add_spool(Spool::new("Sunlu", "PLA", "Red", 1000.0, 20.0)).unwrap();
        let mut draft = draft_from(&inv, &id, 100.0);
        let job = book.save_to_queue(&mut draft).unwrap();

        let copy = book.duplicate_queue_entry(job).unwrap();
        assert_ne!(copy, job);
        assert_eq!(book.queue().len(), 2);
        assert_eq!(book.queue()[0].items, book.queue()[1].items);
    }

    #[test]
    fn test_undo_restores_and_reports_unmatched() {
        let (_, mut inv, mut book) = setup();
        let red = inv.add_spool(Spool::new("Sunlu", "PLA", "Red", 1000.0, 20.0)).unwrap();
        let blue = inv.add_spool(Spool::new("Sunlu", "PLA", "Blue", 1000.0, 20.0)).unwrap();
        let mut draft = draft_from(&inv, &red, 100.0);
        draft.add_from_spool(inv.get(&blue).unwrap(), 30.0);
        book.finalize_sale(&mut inv, &mut draft, &mut proceed).unwrap();
        let record_id = book.history()[0].id;

        inv.delete_spool(&blue).unwrap();
        let report = book.delete_history(&mut inv, record_id, true).unwrap();

        assert_eq!(report.restored, vec![(red.clone(), 100.0)]);
        assert_eq!(report.unrestored.len(), 1);
        assert!(book.history().is_empty());
        assert_eq!(inv.get(&red).unwrap().weight, 1000.0);
    }

    #[test]
    fn test_undo_without_restore() {
        let (_, mut inv, mut book) = setup();
        let id = inv.add_spool(Spool::new("Sunlu", "PLA", "Red", 1000.0, 20.0)).unwrap();
        let mut draft = draft_from(&inv, &id, 100.0);
        book.finalize_sale(&mut inv, &mut draft, &mut proceed).unwrap();
        let record_id = book.history()[0].id;

        let report = book.delete_history(&mut inv, record_id, false).unwrap();
        assert!(report.restored.is_empty());
        assert_eq!(inv.get(&id).unwrap().weight, 900.0);
    }

    #[test]
    fn test_failed_queue_write_keeps_draft() {
        let (store, mut inv, mut book) = setup();
        let id = inv.add_spool(Spool::new("Sunlu", "PLA", "Red", 1000.0, 20.0)).unwrap();
        let mut draft = draft_from(&inv, &id, 100.0);

        store.set_fail_writes(true);
        assert!(book.save_to_queue(&mut draft).is_err());
        assert!(book.queue().is_empty());
        assert!(!draft.is_empty());
    }

    #[test]
    fn test_history_summary() {
        let (_, mut inv, mut book) = setup();
        let id = inv.add_spool(Spool::new("Sunlu", "PLA", "Red", 1000.0, 20.0)).unwrap();
        let mut sale = draft_from(&inv, &id, 100.0);
        book.finalize_sale(&mut inv, &mut sale, &mut proceed).unwrap();
        let mut failure = draft_from(&inv, &id, 100.0);
        book.log_failure(&mut inv, &mut failure, &mut proceed).unwrap();

        let summary = book.history_summary();
        assert_eq!(summary.jobs, 2);
        assert_eq!(summary.failed, 1);
        assert_relative_eq!(summary.revenue, 8.75, epsilon = 1e-9);
        assert_relative_eq!(summary.profit, 3.25, epsilon = 1e-9);
    }

    #[test]
    fn test_failed_cancel_keeps_entry() {
        let (store, mut inv, mut book) = setup();
        let id = inv.add_spool(Spool::new("Sunlu", "PLA", "Red", 1000.0, 20.0)).unwrap();
        let mut draft = draft_from(&inv, &id, 100.0);
        let job = book.save_to_queue(&mut draft).unwrap();

        store.set_fail_writes(true);
        assert!(book.delete_from_queue(job).is_err());
        assert!(book.duplicate_queue_entry(job).is_err());
        assert_eq!(book.queue().len(), 1);

        store.set_fail_writes(false);
        let reopened = JobBook::open(store.clone());
        assert_eq!(reopened.queue().len(), 1);
    }

    #[test]
    fn test_failed_undo_keeps_record() {
        let (store, mut inv, mut book) = setup();
        let id = inv.add_spool(Spool::new("Sunlu", "PLA", "Red", 1000.0, 20.0)).unwrap();
        let mut draft = draft_from(&inv, &id, 100.0);
        book.finalize_sale(&mut inv, &mut draft, &mut proceed).unwrap();
        let record_id = book.history()[0].id;

        store.set_fail_writes(true);
        assert!(book.delete_history(&mut inv, record_id, true).is_err());
        assert_eq!(book.history().len(), 1);
        // the restore write failed too, so the spool is still short
        assert_eq!(inv.get(&id).unwrap().weight, 900.0);
    }
}
