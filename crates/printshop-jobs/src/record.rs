//! Queue entries and history records.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use printshop_pricing::{Allocation, JobDraft, JobParameters, PricedQuote};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a queue entry or history record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// A fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A job saved for later, with its materials and price frozen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Entry id.
    #[serde(default)]
    pub id: JobId,
    /// Job name.
    pub job: String,
    /// Day the job was queued.
    pub date_added: NaiveDate,
    /// Material lines, captured by value.
    #[serde(default)]
    pub items: Vec<Allocation>,
    /// Pricing inputs at the time of queueing.
    #[serde(default)]
    pub params: JobParameters,
    /// Price at the time of queueing.
    #[serde(default)]
    pub quote: PricedQuote,
    /// Donated job.
    #[serde(default)]
    pub donation: bool,
}

impl QueueEntry {
    /// Snapshot a draft and its quote.
    pub fn from_draft(draft: &JobDraft, quote: PricedQuote, date_added: NaiveDate) -> Self {
        Self {
            id: JobId::new(),
            job: draft.name.clone(),
            date_added,
            items: draft.allocations.clone(),
            params: draft.params.clone(),
            quote,
            donation: draft.params.donation,
        }
    }

    /// Rebuild an editable draft from the snapshot.
    pub fn to_draft(&self) -> JobDraft {
        let mut params = self.params.clone();
        params.donation = self.donation;
        JobDraft {
            name: self.job.clone(),
            allocations: self.items.clone(),
            params,
        }
    }

    /// Grams across all lines.
    pub fn total_grams(&self) -> f64 {
        self.items.iter().map(|a| a.grams).sum()
    }
}

/// How a finalized job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobOutcome {
    /// Delivered and paid for (or donated).
    #[default]
    Sold,
    /// Print failed; material is lost.
    Failed,
}

/// A finalized job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Record id.
    #[serde(default)]
    pub id: JobId,
    /// Day the job was finalized.
    pub date: NaiveDate,
    /// Job name.
    pub job: String,
    /// Cost to produce.
    #[serde(default)]
    pub cost: f64,
    /// Amount charged.
    #[serde(default)]
    pub sold_for: f64,
    /// Amount charged minus cost.
    #[serde(default)]
    pub profit: f64,
    /// Donated job.
    #[serde(default)]
    pub donation: bool,
    /// Sold or failed.
    #[serde(default)]
    pub outcome: JobOutcome,
    /// Lines actually deducted from inventory.
    #[serde(default)]
    pub items: Vec<Allocation>,
}

impl HistoryRecord {
    /// Record a sale at the quoted price.
    pub fn sold(
        job: impl Into<String>,
        quote: &PricedQuote,
        donation: bool,
        items: Vec<Allocation>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: JobId::new(),
            date,
            job: job.into(),
            cost: quote.base_cost,
            sold_for: quote.display_price,
            profit: quote.profit,
            donation,
            outcome: JobOutcome::Sold,
            items,
        }
    }

    /// Record a failed print: material cost is lost, nothing is earned.
    pub fn failed(
        job: impl Into<String>,
        quote: &PricedQuote,
        items: Vec<Allocation>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: JobId::new(),
            date,
            job: job.into(),
            cost: quote.material_cost,
            sold_for: 0.0,
            profit: -quote.material_cost,
            donation: false,
            outcome: JobOutcome::Failed,
            items,
        }
    }
}
