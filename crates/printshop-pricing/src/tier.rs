//! Volume tier for multi-color jobs.

use serde::{Deserialize, Serialize};

use crate::draft::JobParameters;

/// Cheaper swap fee and markup once a job passes a swap-count threshold.
///
/// Applied to the parameters before pricing; the engine itself knows
/// nothing about tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierPolicy {
    /// Tier applies when the swap count is strictly above this.
    pub swap_threshold: u32,
    /// Per-swap fee inside the tier.
    pub swap_fee: f64,
    /// Markup inside the tier.
    pub markup: f64,
}

impl TierPolicy {
    /// True if `params` qualify for the tier.
    pub fn qualifies(&self, params: &JobParameters) -> bool {
        params.swap_count > self.swap_threshold
    }

    /// Lower the swap fee and markup together if the job qualifies.
    ///
    /// Values already below the tier are left alone.
    pub fn apply(&self, params: &mut JobParameters) -> bool {
        if !self.qualifies(params) {
            return false;
        }
        params.swap_fee = params.swap_fee.min(self.swap_fee);
        params.markup = params.markup.min(self.markup);
        true
    }
}
