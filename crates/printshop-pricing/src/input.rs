//! Parsing raw quote-form text into job parameters.

use crate::draft::JobParameters;
use crate::error::{PricingError, Result};

/// Quote fields as typed by the operator.
///
/// Empty fields fall back to the defaults handed to [`QuoteForm::parse`].
#[derive(Debug, Clone, Default)]
pub struct QuoteForm {
    /// Print hours.
    pub hours: String,
    /// Machine rate per hour.
    pub machine_rate: String,
    /// Processing fee.
    pub processing_fee: String,
    /// Swap count.
    pub swap_count: String,
    /// Fee per swap.
    pub swap_fee: String,
    /// Waste allowance (fraction).
    pub waste_pct: String,
    /// Markup multiplier.
    pub markup: String,
    /// Discount (fraction).
    pub discount_pct: String,
    /// Batch quantity.
    pub batch_qty: String,
    /// Donation checkbox.
    pub donation: bool,
    /// Round-price checkbox.
    pub round_price: bool,
}

impl QuoteForm {
    /// Parse every field, stopping at the first bad one.
    pub fn parse(&self, defaults: &JobParameters) -> Result<JobParameters> {
        Ok(JobParameters {
            hours: number_or("hours", &self.hours, defaults.hours)?,
            machine_rate: number_or("machine rate", &self.machine_rate, defaults.machine_rate)?,
            processing_fee: number_or("processing fee", &self.processing_fee, defaults.processing_fee)?,
            swap_count: count_or("swap count", &self.swap_count, defaults.swap_count)?,
            swap_fee: number_or("swap fee", &self.swap_fee, defaults.swap_fee)?,
            waste_pct: number_or("waste", &self.waste_pct, defaults.waste_pct)?,
            markup: number_or("markup", &self.markup, defaults.markup)?,
            discount_pct: number_or("discount", &self.discount_pct, defaults.discount_pct)?,
            batch_qty: count_or("batch quantity", &self.batch_qty, defaults.batch_qty)?,
            donation: self.donation,
            round_price: self.round_price,
        })
    }
}

/// Parse the grams of a material line. Required.
pub fn parse_grams(text: &str) -> Result<f64> {
    let text = text.trim();
    if text.is_empty() {
        return Err(PricingError::Missing("grams"));
    }
    parse_number("grams", text)
}

fn parse_number(field: &'static str, text: &str) -> Result<f64> {
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| PricingError::Input {
            field,
            value: text.to_string(),
        })
}

fn number_or(field: &'static str, text: &str, default: f64) -> Result<f64> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(default);
    }
    parse_number(field, text)
}

fn count_or(field: &'static str, text: &str, default: u32) -> Result<u32> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(default);
    }
    text.parse::<u32>().map_err(|_| PricingError::Input {
        field,
        value: text.to_string(),
    })
}
