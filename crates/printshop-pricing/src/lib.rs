#![warn(missing_docs)]

//! Print job pricing for printshop.
//!
//! Turns a [`JobDraft`] (filament lines plus hours, fees, and markup) into a
//! [`PricedQuote`]. Pricing is a pure function: no validation, no I/O, and the
//! same draft always prices the same way.
//!
//! # Example
//!
//! ```ignore
//! use printshop_pricing::{price, JobDraft};
//!
//! let mut draft = JobDraft::new("Desk organizer");
//! draft.add_from_spool(&spool, 100.0);
//! draft.params.hours = 2.0;
//! draft.params.markup = 2.5;
//!
//! let quote = price(&draft);
//! println!("Total: ${:.2}", quote.display_price);
//! ```

pub mod draft;
pub mod error;
pub mod input;
pub mod tier;

pub use draft::{Allocation, AllocationPreview, JobDraft, JobParameters, DEFAULT_MACHINE_RATE};
pub use error::{PricingError, Result};
pub use input::{parse_grams, QuoteForm};
pub use tier::TierPolicy;

use serde::{Deserialize, Serialize};

/// Cost and price breakdown of a job.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PricedQuote {
    /// Filament cost including the waste allowance.
    pub material_cost: f64,
    /// Machine time cost.
    pub machine_cost: f64,
    /// Processing fee.
    pub labor_cost: f64,
    /// Filament swap cost.
    pub swap_cost: f64,
    /// Cost to produce.
    pub base_cost: f64,
    /// Base cost after markup.
    pub subtotal: f64,
    /// Discount taken off the subtotal.
    pub discount_amount: f64,
    /// Price before per-unit rounding (zero for donations).
    pub final_price: f64,
    /// Price of one copy.
    pub unit_price: f64,
    /// Amount charged for the whole batch.
    pub display_price: f64,
    /// Charged amount minus base cost.
    pub profit: f64,
    /// Profit as a percentage of the charged amount.
    pub margin_pct: f64,
}

/// Price a draft.
///
/// Steps, in order:
/// 1. material cost = Σ cost/1000 × grams, plus waste
/// 2. machine cost = hours × rate
/// 3. swap cost = swaps × fee per swap
/// 4. base cost = material + machine + processing fee + swaps
/// 5. subtotal = base × markup, less the discount
/// 6. donations charge nothing
/// 7. unit price = final / batch, optionally rounded (never down to zero)
/// 8. charged = unit × batch; profit = charged − base
pub fn price(draft: &JobDraft) -> PricedQuote {
    let p = &draft.params;

    let raw_material: f64 = draft.allocations.iter().map(Allocation::cost).sum();
    let material_cost = raw_material * (1.0 + p.waste_pct);
    let machine_cost = p.hours * p.machine_rate;
    let labor_cost = p.processing_fee;
    let swap_cost = f64::from(p.swap_count) * p.swap_fee;
    let base_cost = material_cost + machine_cost + labor_cost + swap_cost;

    let subtotal = base_cost * p.markup;
    let discount_amount = subtotal * p.discount_pct;
    let final_price = if p.donation {
        0.0
    } else {
        subtotal - discount_amount
    };

    let batch = f64::from(p.batch_qty.max(1));
    let mut unit_price = final_price / batch;
    if p.round_price {
        unit_price = round_unit_price(unit_price);
    }
    let display_price = unit_price * batch;
    let profit = display_price - base_cost;
    let margin_pct = if display_price > 0.0 {
        profit / display_price * 100.0
    } else {
        0.0
    };

    PricedQuote {
        material_cost,
        machine_cost,
        labor_cost,
        swap_cost,
        base_cost,
        subtotal,
        discount_amount,
        final_price,
        unit_price,
        display_price,
        profit,
        margin_pct,
    }
}

/// Round to the nearest whole unit, flooring billable prices at 1.
fn round_unit_price(unit: f64) -> f64 {
    let rounded = unit.round();
    if unit > 0.0 && rounded < 1.0 {
        1.0
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use printshop_ledger::Spool;

    fn pla_draft(grams: f64) -> JobDraft {
        let spool = Spool::new("Bambu Basic", "PLA", "Black", 1000.0, 20.0);
        let mut draft = JobDraft::new("Test job");
        draft.add_from_spool(&spool, grams);
        draft
    }

    #[test]
    fn test_basic_quote() {
        let mut draft = pla_draft(100.0);
        draft.params.hours = 2.0;
        draft.params.machine_rate = 0.75;
        draft.params.markup = 2.5;

        let q = price(&draft);
        assert_relative_eq!(q.material_cost, 2.00, epsilon = 1e-9);
        assert_relative_eq!(q.machine_cost, 1.50, epsilon = 1e-9);
        assert_relative_eq!(q.base_cost, 3.50, epsilon = 1e-9);
        assert_relative_eq!(q.subtotal, 8.75, epsilon = 1e-9);
        assert_relative_eq!(q.final_price, 8.75, epsilon = 1e-9);
        assert_relative_eq!(q.display_price, 8.75, epsilon = 1e-9);
        assert_relative_eq!(q.profit, 5.25, epsilon = 1e-9);
        assert_relative_eq!(q.margin_pct, 60.0, epsilon = 1e-9);
    }

    #[test]
    fn test_donation_charges_nothing() {
        let mut draft = pla_draft(100.0);
        draft.params.hours = 2.0;
        draft.params.markup = 2.5;
        draft.params.discount_pct = 0.1;
        draft.params.donation = true;

        let q = price(&draft);
        assert_eq!(q.final_price, 0.0);
        assert_eq!(q.display_price, 0.0);
        assert_relative_eq!(q.profit, -3.50, epsilon = 1e-9);
        assert_eq!(q.profit, -q.base_cost);
        assert_eq!(q.margin_pct, 0.0);
    }

    #[test]
    fn test_base_cost_is_sum_of_parts() {
        let mut draft = pla_draft(137.3);
        draft.params.hours = 3.7;
        draft.params.processing_fee = 2.25;
        draft.params.swap_count = 12;
        draft.params.swap_fee = 0.03;

        let q = price(&draft);
        assert_eq!(q.base_cost, q.material_cost + q.machine_cost + q.labor_cost + q.swap_cost);
        assert_relative_eq!(q.swap_cost, 0.36, epsilon = 1e-9);
    }

    #[test]
    fn test_pricing_is_deterministic() {
        let mut draft = pla_draft(55.5);
        draft.params.hours = 1.25;
        draft.params.markup = 1.8;
        draft.params.round_price = true;
        assert_eq!(price(&draft), price(&draft));
    }

    #[test]
    fn test_waste_and_discount() {
        let mut draft = pla_draft(100.0);
        draft.params.machine_rate = 0.0;
        draft.params.waste_pct = 0.20;
        draft.params.markup = 2.0;
        draft.params.discount_pct = 0.25;

        let q = price(&draft);
        assert_relative_eq!(q.material_cost, 2.40, epsilon = 1e-9);
        assert_relative_eq!(q.subtotal, 4.80, epsilon = 1e-9);
        assert_relative_eq!(q.discount_amount, 1.20, epsilon = 1e-9);
        assert_relative_eq!(q.final_price, 3.60, epsilon = 1e-9);
    }

    #[test]
    fn test_rounding_to_nearest() {
        let mut draft = pla_draft(80.0); // $1.60
        draft.params.machine_rate = 0.0;
        draft.params.round_price = true;
        assert_eq!(price(&draft).unit_price, 2.0);
    }

    #[test]
    fn test_rounding_never_free() {
        let mut draft = pla_draft(5.0); // $0.10
        draft.params.machine_rate = 0.0;
        draft.params.round_price = true;

        let q = price(&draft);
        assert_eq!(q.unit_price, 1.0);
        assert_eq!(q.display_price, 1.0);
    }

    #[test]
    fn test_rounding_keeps_zero_at_zero() {
        let mut draft = pla_draft(5.0);
        draft.params.round_price = true;
        draft.params.donation = true;
        assert_eq!(price(&draft).unit_price, 0.0);
    }

    #[test]
    fn test_batch_rounds_per_unit() {
        let mut draft = pla_draft(100.0); // $2.00 material
        draft.params.machine_rate = 0.0;
        draft.params.markup = 1.3; // $2.60 for the batch
        draft.params.batch_qty = 4; // $0.65 each
        draft.params.round_price = true;

        let q = price(&draft);
        assert_eq!(q.unit_price, 1.0);
        assert_eq!(q.display_price, 4.0);
        assert_relative_eq!(q.profit, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_batch_treated_as_one() {
        let mut draft = pla_draft(100.0);
        draft.params.machine_rate = 0.0;
        draft.params.batch_qty = 0;
        let q = price(&draft);
        assert_relative_eq!(q.unit_price, 2.0, epsilon = 1e-9);
        assert_relative_eq!(q.display_price, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_negative_inputs_pass_through() {
        let mut draft = pla_draft(100.0);
        draft.params.hours = -1.0;
        draft.params.machine_rate = 1.0;
        let q = price(&draft);
        assert_relative_eq!(q.machine_cost, -1.0, epsilon = 1e-9);
        assert_relative_eq!(q.base_cost, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_tier_applied_before_pricing() {
        let mut draft = pla_draft(100.0);
        draft.params.machine_rate = 0.0;
        draft.params.swap_count = 60;
        draft.params.swap_fee = 0.05;
        draft.params.markup = 3.0;

        let tier = TierPolicy {
            swap_threshold: 50,
            swap_fee: 0.02,
            markup: 2.0,
        };
        tier.apply(&mut draft.params);

        let q = price(&draft);
        assert_relative_eq!(q.swap_cost, 1.20, epsilon = 1e-9);
        assert_relative_eq!(q.subtotal, 6.40, epsilon = 1e-9);
    }
}
