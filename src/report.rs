//! Plain-text reports for the terminal.

use std::fmt::Write;

use crate::controller::{RunOutcome, RunSummary};
use crate::state::ProgressState;

const RULE: &str = "======================================================================";

fn join_pages<'a>(pages: impl IntoIterator<Item = &'a u32>) -> String {
    pages
        .into_iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Scraping history and cumulative statistics
pub fn render_history(state: Option<&ProgressState>) -> String {
    let Some(state) = state else {
        return "No scraping history found. Starting fresh!\n".to_string();
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}\nSCRAPING HISTORY & STATISTICS\n{}", RULE, RULE);
    let _ = writeln!(out, "Pages scraped: {}", join_pages(&state.scraped_pages));
    let _ = writeln!(out, "Last page: {}", state.last_page);
    let _ = writeln!(out, "Total unique records: {}", state.total_records);
    let _ = writeln!(out, "Total batches created: {}", state.total_batches);
    let _ = writeln!(out, "Duplicates skipped: {}", state.duplicates_skipped);
    match state.last_updated {
        Some(ts) => {
            let _ = writeln!(out, "Last updated: {}", ts.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        None => {
            let _ = writeln!(out, "Last updated: N/A");
        }
    }
    if let (Some(first), Some(last)) = (state.scraped_pages.first(), state.scraped_pages.last()) {
        let _ = writeln!(
            out,
            "\n✓ Successfully scraped pages: {}-{}\n  (Total: {} pages)",
            first,
            last,
            state.scraped_pages.len()
        );
    }
    let _ = writeln!(out, "{}", RULE);
    out
}

pub fn render_outcome(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::NothingToDo { totals, .. } => {
            let mut out = String::from(
                "All pages have been scraped already!\nUse `force` to re-scrape or choose different pages.\n\n",
            );
            out.push_str(&render_history(totals.as_ref()));
            out
        }
        RunOutcome::Completed(summary) => render_summary(summary),
    }
}

pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();

    if !summary.average_price_by_bedrooms.is_empty() {
        let _ = writeln!(out, "{}\nMARKET ANALYSIS - Average Price by Bedroom Count\n{}", RULE, RULE);
        for (bedrooms, avg) in &summary.average_price_by_bedrooms {
            let _ = writeln!(out, "{:>3} bedroom(s): {:>16.0}", bedrooms, avg);
        }

        let _ = writeln!(out, "\n{}\nTOP POTENTIAL DEALS (50% below average)\n{}", RULE, RULE);
        if summary.deals.is_empty() {
            let _ = writeln!(out, "No deals found (properties below 50% of average price)");
        }
        for deal in &summary.deals {
            let _ = writeln!(
                out,
                "{} | {} | {} bed | {}",
                deal.title, deal.price, deal.bedrooms, deal.location.address
            );
        }
    }

    let _ = writeln!(out, "\n{}\nSUMMARY\n{}", RULE, RULE);
    let _ = writeln!(out, "Pages scraped this session: [{}]", join_pages(&summary.pages_fetched));
    if !summary.plan.skipped.is_empty() {
        let _ = writeln!(out, "Pages skipped (already scraped): [{}]", join_pages(&summary.plan.skipped));
    }
    if let Some(page) = summary.end_of_data {
        let _ = writeln!(out, "No more listings from page {}", page);
    }
    if let Some(err) = &summary.interrupted {
        let _ = writeln!(out, "Interrupted: {}", err);
    }
    let _ = writeln!(out, "Listings fetched: {}", summary.raw_records);
    let _ = writeln!(out, "Rejected by cleaning: {}", summary.rejected);
    let _ = writeln!(out, "New records added: {}", summary.new_unique);
    let _ = writeln!(out, "Duplicates removed: {}", summary.duplicates);
    for batch in &summary.batches {
        let _ = writeln!(
            out,
            "  ✓ Batch {} ({} records) → {}",
            batch.number,
            batch.records,
            batch.destinations.join(", ")
        );
    }
    let _ = writeln!(out, "Total unique records so far: {}", summary.totals.total_records);
    let _ = writeln!(out, "Total batches: {}", summary.totals.total_batches);
    let _ = writeln!(out, "{}", RULE);
    out
}
