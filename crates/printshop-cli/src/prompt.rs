//! Interactive y/N confirmations.

use std::io::{self, BufRead, Write};

use printshop_jobs::{ConsumptionReview, LineStatus, Verdict};

/// Asks the operator, or answers yes for them with `--yes`.
#[derive(Debug, Clone, Copy)]
pub struct Prompt {
    assume_yes: bool,
}

impl Prompt {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }

    /// Ask a yes/no question. Anything but y/yes is no.
    pub fn confirm(&self, question: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        print!("{question} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(_) => false,
        }
    }

    /// Show every warning in a review and ask once.
    pub fn review(&self, review: &ConsumptionReview) -> Verdict {
        let warnings = describe_review(review);
        let question = if warnings.is_empty() {
            "Deduct filament and record the job?".to_string()
        } else {
            for line in &warnings {
                println!("  ! {line}");
            }
            "Proceed anyway? Orphaned lines will not be deducted.".to_string()
        };
        if self.confirm(&question) {
            Verdict::Proceed
        } else {
            Verdict::Abort
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// One line per warning in `review`.
pub fn describe_review(review: &ConsumptionReview) -> Vec<String> {
    review
        .lines
        .iter()
        .filter_map(|line| match &line.status {
            LineStatus::Orphaned => Some(format!(
                "{}: no matching spool, {:.1}g will not be deducted",
                line.allocation.spool, line.allocation.grams
            )),
            LineStatus::Matched {
                spool_id,
                remaining_after,
            } if *remaining_after < 0.0 => Some(format!(
                "spool {spool_id} ({}) would drop to {remaining_after:.1}g",
                line.allocation.spool
            )),
            LineStatus::Matched { .. } => None,
        })
        .collect()
}
