use std::io::Write;

use tracing::info;

use crate::models::{Deal, DealKind};
use crate::utils::error::Result;

/// One line per match in document order, or a single fallback line when
/// nothing matched. JSON mode emits the structured records instead.
pub fn write_report<W: Write>(out: &mut W, deals: &[Deal], json: bool) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, deals)?;
        writeln!(out)?;
        return Ok(());
    }

    if deals.is_empty() {
        writeln!(out, "no discounts found")?;
        return Ok(());
    }
    for deal in deals {
        writeln!(out, "{}: {}", deal.product_name, deal.discount_text)?;
    }
    Ok(())
}

/// Per-kind totals for the log footer.
pub fn log_summary(deals: &[Deal]) {
    let bogo = deals.iter().filter(|d| d.is_bogo).count();
    let discounts = deals
        .iter()
        .filter(|d| d.kind == DealKind::Discount)
        .count();
    info!(matches = deals.len(), bogo, discounts, "search complete");
}
