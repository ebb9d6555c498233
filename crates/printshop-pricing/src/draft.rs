//! Job drafts: the material lines and parameters of a quote in progress.

use printshop_ledger::{Spool, SpoolId, SpoolIdentity};
use serde::{Deserialize, Serialize};

/// Machine rate used when none is configured (currency per hour).
pub const DEFAULT_MACHINE_RATE: f64 = 0.75;

/// Some grams of one spool assigned to a job.
///
/// The spool is captured by value so the line survives later edits or
/// deletion of the spool record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// Spool identity at the time of allocation.
    #[serde(flatten)]
    pub spool: SpoolIdentity,
    /// Id the spool had when allocated. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spool_id: Option<SpoolId>,
    /// Grams of filament.
    pub grams: f64,
    /// Spool cost per 1000 g when allocated.
    pub cost_per_kg: f64,
}

impl Allocation {
    /// Allocate `grams` of `spool`.
    pub fn from_spool(spool: &Spool, grams: f64) -> Self {
        Self {
            spool: spool.identity(),
            spool_id: Some(spool.id.clone()),
            grams,
            cost_per_kg: spool.cost,
        }
    }

    /// Material cost of this line, before waste.
    pub fn cost(&self) -> f64 {
        (self.cost_per_kg / 1000.0) * self.grams
    }
}

/// Numeric and flag inputs of a quote.
///
/// Percentages are fractions: `0.2` is 20 %.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobParameters {
    /// Print time in hours.
    pub hours: f64,
    /// Machine cost per hour.
    pub machine_rate: f64,
    /// Flat labor / processing fee.
    pub processing_fee: f64,
    /// Number of filament swaps.
    pub swap_count: u32,
    /// Fee charged per swap.
    pub swap_fee: f64,
    /// Waste allowance on material.
    pub waste_pct: f64,
    /// Multiplier applied to the base cost.
    pub markup: f64,
    /// Discount taken off the marked-up subtotal.
    pub discount_pct: f64,
    /// Number of identical copies.
    pub batch_qty: u32,
    /// Donated job: nothing is charged.
    pub donation: bool,
    /// Round the unit price to a whole currency unit.
    pub round_price: bool,
}

impl Default for JobParameters {
    fn default() -> Self {
        Self {
            hours: 0.0,
            machine_rate: DEFAULT_MACHINE_RATE,
            processing_fee: 0.0,
            swap_count: 0,
            swap_fee: 0.0,
            waste_pct: 0.0,
            markup: 1.0,
            discount_pct: 0.0,
            batch_qty: 1,
            donation: false,
            round_price: false,
        }
    }
}

/// Result of adding a line to a draft.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllocationPreview {
    /// Cost of the new line.
    pub cost: f64,
    /// The line asks for more than the spool currently holds.
    pub low_stock: bool,
}

/// An unsaved job quote.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobDraft {
    /// Job name shown on receipts and history.
    pub name: String,
    /// Material lines, in the order they were added.
    pub allocations: Vec<Allocation>,
    /// Pricing inputs.
    pub params: JobParameters,
}

impl JobDraft {
    /// Start an empty draft.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append a line drawing `grams` from `spool`.
    pub fn add_from_spool(&mut self, spool: &Spool, grams: f64) -> AllocationPreview {
        let allocation = Allocation::from_spool(spool, grams);
        let preview = AllocationPreview {
            cost: allocation.cost(),
            low_stock: grams > spool.weight,
        };
        if preview.low_stock {
            tracing::warn!(spool = %spool.id, grams, remaining = spool.weight, "low stock");
        }
        self.allocations.push(allocation);
        preview
    }

    /// Append a prepared line.
    pub fn push(&mut self, allocation: Allocation) {
        self.allocations.push(allocation);
    }

    /// Remove a line by position.
    pub fn remove(&mut self, index: usize) -> Option<Allocation> {
        (index < self.allocations.len()).then(|| self.allocations.remove(index))
    }

    /// Total grams across all lines.
    pub fn total_grams(&self) -> f64 {
        self.allocations.iter().map(|a| a.grams).sum()
    }

    /// True if the draft has no material lines.
    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    /// Drop the material lines and name, keeping the parameters.
    pub fn clear(&mut self) {
        self.name.clear();
        self.allocations.clear();
    }
}
