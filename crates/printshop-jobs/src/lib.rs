#![warn(missing_docs)]

//! Job lifecycle for printshop.
//!
//! A job starts as a [`JobDraft`](printshop_pricing::JobDraft) and moves
//! through the [`JobBook`]:
//!
//! ```text
//! Draft ──save_to_queue──▶ Queued ──complete_queued_job──▶ Completed
//!   │                        └──────delete_from_queue───▶ Cancelled
//!   ├──finalize_sale──────────────────────────────────────▶ Completed
//!   └──log_failure────────────────────────────────────────▶ Failed
//! ```
//!
//! Every path that consumes filament builds a [`ConsumptionReview`] first and
//! asks a [`ConfirmGate`] once before touching the ledger.
//!
//! # Example
//!
//! ```ignore
//! use printshop_jobs::{Completion, JobBook, Verdict};
//!
//! let mut book = JobBook::open(store.clone());
//! let id = book.save_to_queue(&mut draft)?;
//!
//! let mut gate = |review: &ConsumptionReview| {
//!     if review.has_warnings() { Verdict::Abort } else { Verdict::Proceed }
//! };
//! if let Completion::Recorded { record, .. } =
//!     book.complete_queued_job(&mut inventory, id, &mut gate)?
//! {
//!     println!("sold {} for ${:.2}", record.job, record.sold_for);
//! }
//! ```

pub mod audit;
pub mod book;
pub mod error;
pub mod receipt;
pub mod record;
pub mod review;

pub use audit::{overcommitted, Overcommitment};
pub use book::{Completion, HistorySummary, JobBook, UndoReport};
pub use error::{JobError, Result};
pub use receipt::{render as render_receipt, write_receipt};
pub use record::{HistoryRecord, JobId, JobOutcome, QueueEntry};
pub use review::{ConfirmGate, ConsumptionReview, LineStatus, ReviewLine, Verdict};
