//! Command handlers over the open ledger and job book.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use printshop_jobs::{
    overcommitted, write_receipt, Completion, ConsumptionReview, JobBook, JobId, JobOutcome,
    QueueEntry, Verdict,
};
use printshop_ledger::{auto_backup, Inventory, JsonFileStore, Spool, SpoolId};
use printshop_pricing::{parse_grams, price, JobDraft, PricedQuote, QuoteForm};

use crate::config::AppConfig;
use crate::prompt::Prompt;
use crate::QuoteArgs;

/// The application root: owns the ledger and the job book.
pub struct Shop {
    config: AppConfig,
    inventory: Inventory,
    book: JobBook,
}

impl Shop {
    /// Back up the data directory, then load every collection.
    pub fn open(config: AppConfig) -> Result<Self> {
        let data_dir = config.data_dir();
        auto_backup(
            &data_dir,
            Local::now().naive_local(),
            config.storage.backups_to_keep,
        );
        let store = Arc::new(
            JsonFileStore::open(&data_dir)
                .with_context(|| format!("opening data directory {}", data_dir.display()))?,
        );
        Ok(Self {
            inventory: Inventory::open(store.clone()),
            book: JobBook::open(store),
            config,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn spool_id(&self, id: &str) -> Result<SpoolId> {
        let id = SpoolId::new(id.trim());
        if self.inventory.get(&id).is_some() {
            return Ok(id);
        }
        // accept "7" for "007"
        if let Ok(n) = id.as_str().parse::<u64>() {
            let padded = SpoolId::from_number(n);
            if self.inventory.get(&padded).is_some() {
                return Ok(padded);
            }
        }
        bail!("no spool with id {id}")
    }

    pub fn add_spool(&mut self, spool: Spool) -> Result<()> {
        let id = self.inventory.add_spool(spool)?;
        println!("Added spool {id}");
        Ok(())
    }

    pub fn list_spools(&self) {
        println!(
            "{:<5} {:<20} {:<8} {:<12} {:>9} {:>8}  flags",
            "ID", "NAME", "MATERIAL", "COLOR", "GRAMS", "$/KG"
        );
        for s in self.inventory.spools() {
            let mut flags = Vec::new();
            if s.abrasive {
                flags.push("abrasive".to_string());
            }
            if s.has_benchy {
                flags.push("benchy".to_string());
            }
            if let Some(slot) = &s.ams_slot {
                flags.push(format!("AMS {slot}"));
            }
            if let Some(location) = &s.location {
                flags.push(format!("@{location}"));
            }
            println!(
                "{:<5} {:<20} {:<8} {:<12} {:>9.1} {:>8.2}  {}",
                s.id,
                s.name,
                s.material,
                s.color,
                s.weight,
                s.cost,
                flags.join(", ")
            );
        }
        let summary = self.inventory.summary();
        println!(
            "\n{} spools, {:.0} g on hand, stock value ${:.2}",
            summary.spool_count, summary.grams_on_hand, summary.stock_value
        );
        if summary.negative_spools > 0 {
            println!("{} spool(s) below zero", summary.negative_spools);
        }
    }

    pub fn edit_spool(&mut self, id: &str, edit: impl FnOnce(&mut Spool)) -> Result<()> {
        let id = self.spool_id(id)?;
        let mut spool = self
            .inventory
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow!("no spool with id {id}"))?;
        edit(&mut spool);
        spool.id = id.clone();
        self.inventory.update_spool(spool)?;
        println!("Updated spool {id}");
        Ok(())
    }

    pub fn remove_spool(&mut self, id: &str, prompt: &Prompt) -> Result<()> {
        let id = self.spool_id(id)?;
        let queued = self
            .inventory
            .get(&id)
            .map(|spool| {
                self.book
                    .queue()
                    .iter()
                    .filter(|e| e.items.iter().any(|a| a.spool.matches(spool)))
                    .count()
            })
            .unwrap_or(0);
        if queued > 0 {
            println!("{queued} queued job(s) draw from this spool; their lines will become orphaned.");
        }
        if !prompt.confirm(&format!("Delete spool {id}?")) {
            return Ok(());
        }
        let spool = self.inventory.delete_spool(&id)?;
        println!("Deleted {} ({})", spool.identity(), spool.id);
        Ok(())
    }

    fn build_draft(&self, args: &QuoteArgs) -> Result<JobDraft> {
        let form = QuoteForm {
            hours: args.hours.clone(),
            machine_rate: args.rate.clone(),
            processing_fee: args.fee.clone(),
            swap_count: args.swaps.clone(),
            swap_fee: args.swap_fee.clone(),
            waste_pct: args.waste.clone(),
            markup: args.markup.clone(),
            discount_pct: args.discount.clone(),
            batch_qty: args.batch.clone(),
            donation: args.donation,
            round_price: args.round,
        };

        let mut draft = JobDraft::new(args.name.clone());
        draft.params = form.parse(&self.config.default_params())?;
        if let Some(tier) = &self.config.pricing.tier {
            if tier.apply(&mut draft.params) {
                println!("Volume tier applied ({} swaps)", draft.params.swap_count);
            }
        }

        for line in &args.uses {
            let (id, grams) = line
                .split_once(':')
                .ok_or_else(|| anyhow!("material line must be ID:GRAMS, got {line:?}"))?;
            let grams = parse_grams(grams)?;
            let id = self.spool_id(id)?;
            let spool = self
                .inventory
                .get(&id)
                .ok_or_else(|| anyhow!("no spool with id {id}"))?;
            let preview = draft.add_from_spool(spool, grams);
            if preview.low_stock {
                println!(
                    "Low stock: spool {id} only has {:.0}g remaining",
                    spool.weight
                );
            }
        }
        Ok(draft)
    }

    pub fn quote(&mut self, args: QuoteArgs, prompt: &Prompt) -> Result<()> {
        let mut draft = self.build_draft(&args)?;
        let quote = price(&draft);
        print_quote(&draft, &quote);

        if args.receipt {
            let path = write_receipt(
                &self.config.receipts_dir(),
                &draft,
                &quote,
                Local::now().naive_local(),
            )?;
            println!("Receipt saved to {}", path.display());
        }

        if args.queue {
            let id = self.book.save_to_queue(&mut draft)?;
            println!("Queued as {}", short(id));
        } else if args.sell {
            let completion = self
                .book
                .finalize_sale(&mut self.inventory, &mut draft, &mut gate(prompt))?;
            report_completion(&completion);
        } else if args.fail {
            let completion = self
                .book
                .log_failure(&mut self.inventory, &mut draft, &mut gate(prompt))?;
            report_completion(&completion);
        }
        Ok(())
    }

    fn queue_id(&self, prefix: &str) -> Result<JobId> {
        resolve_id(self.book.queue().iter().map(|e| e.id), prefix)
    }

    fn history_id(&self, prefix: &str) -> Result<JobId> {
        resolve_id(self.book.history().iter().map(|r| r.id), prefix)
    }

    pub fn list_queue(&self) {
        if self.book.queue().is_empty() {
            println!("Queue is empty");
            return;
        }
        println!(
            "{:<9} {:<10} {:<24} {:>8} {:>9}",
            "ID", "ADDED", "JOB", "GRAMS", "PRICE"
        );
        for entry in self.book.queue() {
            print_queue_entry(entry);
        }
    }

    pub fn complete_queued(&mut self, id: &str, prompt: &Prompt) -> Result<()> {
        let id = self.queue_id(id)?;
        let completion =
            self.book
                .complete_queued_job(&mut self.inventory, id, &mut gate(prompt))?;
        report_completion(&completion);
        Ok(())
    }

    pub fn cancel_queued(&mut self, id: &str, prompt: &Prompt) -> Result<()> {
        let id = self.queue_id(id)?;
        if !prompt.confirm("Cancel this queued job? No filament is returned or deducted.") {
            return Ok(());
        }
        let entry = self.book.delete_from_queue(id)?;
        println!("Cancelled {}", entry.job);
        Ok(())
    }

    pub fn duplicate_queued(&mut self, id: &str) -> Result<()> {
        let id = self.queue_id(id)?;
        let copy = self.book.duplicate_queue_entry(id)?;
        println!("Queued copy as {}", short(copy));
        Ok(())
    }

    pub fn list_history(&self) {
        println!(
            "{:<9} {:<10} {:<24} {:>9} {:>9} {:>9}",
            "ID", "DATE", "JOB", "COST", "SOLD", "PROFIT"
        );
        for r in self.book.history() {
            let mut job = r.job.clone();
            if r.outcome == JobOutcome::Failed {
                job.push_str(" [failed]");
            } else if r.donation {
                job.push_str(" [donated]");
            }
            println!(
                "{:<9} {:<10} {:<24} {:>9.2} {:>9.2} {:>9.2}",
                short(r.id),
                r.date,
                job,
                r.cost,
                r.sold_for,
                r.profit
            );
        }
        let summary = self.book.history_summary();
        println!(
            "\n{} jobs ({} failed, {} donated), revenue ${:.2}, profit ${:.2}",
            summary.jobs, summary.failed, summary.donated, summary.revenue, summary.profit
        );
    }

    pub fn undo_history(&mut self, id: &str, restore: bool, prompt: &Prompt) -> Result<()> {
        let id = self.history_id(id)?;
        if !prompt.confirm("Delete this history record?") {
            return Ok(());
        }
        let report = self.book.delete_history(&mut self.inventory, id, restore)?;
        println!("Deleted {}", report.record.job);
        for (spool, grams) in &report.restored {
            println!("  restored {grams:.1}g to spool {spool}");
        }
        for line in &report.unrestored {
            println!("  could not restore {:.1}g of {}", line.grams, line.spool);
        }
        Ok(())
    }

    pub fn audit(&self) {
        let report = overcommitted(&self.inventory, self.book.queue());
        if report.is_empty() {
            println!("No spool is over-committed");
            return;
        }
        for o in report {
            println!(
                "spool {} ({}): {:.1}g on hand, {:.1}g queued, short {:.1}g",
                o.spool_id,
                o.label,
                o.remaining,
                o.committed,
                o.shortfall()
            );
        }
    }
}

fn gate(prompt: &Prompt) -> impl FnMut(&ConsumptionReview) -> Verdict + '_ {
    move |review| prompt.review(review)
}

fn short(id: JobId) -> String {
    id.to_string().chars().take(8).collect()
}

/// Find the one id starting with `prefix`.
fn resolve_id(ids: impl Iterator<Item = JobId>, prefix: &str) -> Result<JobId> {
    let prefix = prefix.trim().to_lowercase();
    if prefix.is_empty() {
        bail!("job id is empty");
    }
    let matches: Vec<JobId> = ids.filter(|id| id.to_string().starts_with(&prefix)).collect();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => bail!("no job with id {prefix}"),
        _ => bail!("job id {prefix} is ambiguous"),
    }
}

fn print_quote(draft: &JobDraft, q: &PricedQuote) {
    println!("{}", draft.name);
    println!("  Materials      ${:>9.2}  ({:.1} g)", q.material_cost, draft.total_grams());
    println!("  Machine        ${:>9.2}", q.machine_cost);
    println!("  Labor          ${:>9.2}", q.labor_cost);
    println!("  Swaps          ${:>9.2}", q.swap_cost);
    println!("  Base cost      ${:>9.2}", q.base_cost);
    println!("  Subtotal       ${:>9.2}", q.subtotal);
    if q.discount_amount != 0.0 {
        println!("  Discount      -${:>9.2}", q.discount_amount);
    }
    if draft.params.batch_qty > 1 {
        println!(
            "  Unit price     ${:>9.2}  x {}",
            q.unit_price, draft.params.batch_qty
        );
    }
    println!("  Price          ${:>9.2}", q.display_price);
    println!("  Profit         ${:>9.2}  ({:.1}% margin)", q.profit, q.margin_pct);
}

fn print_queue_entry(entry: &QueueEntry) {
    let mut job = entry.job.clone();
    if entry.donation {
        job.push_str(" [donation]");
    }
    println!(
        "{:<9} {:<10} {:<24} {:>8.1} {:>9.2}",
        short(entry.id),
        entry.date_added,
        job,
        entry.total_grams(),
        entry.quote.display_price
    );
}

fn report_completion(completion: &Completion) {
    match completion {
        Completion::Recorded { record, skipped } => {
            println!(
                "Recorded {}: sold for ${:.2}, profit ${:.2}",
                record.job, record.sold_for, record.profit
            );
            for line in skipped {
                println!("  skipped {:.1}g of {} (no matching spool)", line.grams, line.spool);
            }
        }
        Completion::Aborted => println!("Cancelled; nothing was changed."),
    }
}
