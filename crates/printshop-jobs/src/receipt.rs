//! Plain-text invoices and donation receipts.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use printshop_pricing::{JobDraft, PricedQuote};

use crate::error::Result;

const WIDTH: usize = 50;

/// Render a receipt for a priced draft.
pub fn render(draft: &JobDraft, quote: &PricedQuote, now: NaiveDateTime) -> String {
    let p = &draft.params;
    let heavy = "=".repeat(WIDTH);
    let light = "-".repeat(WIDTH);
    let header = if p.donation {
        "DONATION RECEIPT (TAX EXEMPT)"
    } else {
        "INVOICE"
    };
    let job = if draft.name.trim().is_empty() {
        "Custom Job"
    } else {
        draft.name.as_str()
    };

    let mut out = String::new();
    // writing into a String cannot fail
    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(out, "{header:^width$}", width = WIDTH);
    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(out, "Date: {}", now.format("%Y-%m-%d %H:%M"));
    let _ = writeln!(out, "Job Name: {job}");
    if p.batch_qty > 1 {
        let _ = writeln!(out, "Quantity: {}", p.batch_qty);
    }
    let _ = writeln!(out, "{light}");
    let _ = writeln!(out, "COST BREAKDOWN:");
    let _ = writeln!(out, " > Materials:       ${:.2}", quote.material_cost);
    let _ = writeln!(
        out,
        " > Machine/Power:   ${:.2} ({}h @ ${}/h)",
        quote.machine_cost, p.hours, p.machine_rate
    );
    let _ = writeln!(out, " > Labor/Prep:      ${:.2}", quote.labor_cost);
    if quote.swap_cost != 0.0 {
        let _ = writeln!(out, " > Color Swaps:     ${:.2} ({} swaps)", quote.swap_cost, p.swap_count);
    }
    let _ = writeln!(out, "{light}");
    let _ = writeln!(out, "SUBTOTAL COST:      ${:.2}", quote.base_cost);
    let _ = writeln!(out, "MARKUP:             x{}", p.markup);
    if quote.discount_amount != 0.0 {
        let _ = writeln!(out, "DISCOUNT:           -${:.2}", quote.discount_amount);
    }
    let _ = writeln!(out, "{heavy}");
    if p.donation {
        let _ = writeln!(out, "TOTAL DUE:          $0.00");
        let _ = writeln!(
            out,
            "TAX DEDUCTIBLE VAL: ${:.2}",
            quote.subtotal - quote.discount_amount
        );
    } else {
        let _ = writeln!(out, "TOTAL DUE:          ${:.2}", quote.display_price);
    }
    let _ = writeln!(out, "{heavy}");
    let _ = write!(out, "\nThank you for your business!\n");
    out
}

/// File name for a receipt written at `now`.
pub fn receipt_file_name(now: NaiveDateTime) -> String {
    format!("Receipt_{}.txt", now.format("%Y%m%d_%H%M"))
}

/// Render and write a receipt into `dir`, creating it if needed.
pub fn write_receipt(
    dir: &Path,
    draft: &JobDraft,
    quote: &PricedQuote,
    now: NaiveDateTime,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(receipt_file_name(now));
    fs::write(&path, render(draft, quote, now))?;
    tracing::info!(path = %path.display(), "receipt written");
    Ok(path)
}
