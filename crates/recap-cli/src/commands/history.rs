use anyhow::{anyhow, Result};
use chrono::Local;
use console::style;

use recap_core::SearchRecord;
use recap_store::SearchHistory;

use super::summarize::print_record;
use super::Context;
use crate::ui;

fn history(ctx: &Context) -> SearchHistory<'_, SearchRecord> {
    SearchHistory::new(&ctx.store)
}

// Users count from 1, the store from 0.
fn index_of(number: usize) -> Result<usize> {
    number
        .checked_sub(1)
        .ok_or_else(|| anyhow!("History entries are numbered from 1."))
}

pub fn list(ctx: &Context) -> Result<()> {
    let entries = history(ctx).list()?;
    if entries.is_empty() {
        ui::info("No saved summaries yet. Run `recap summarize` first.");
        return Ok(());
    }

    println!();
    for (i, record) in entries.iter().enumerate() {
        println!(
            "  {}. #{} · {}  {}",
            i + 1,
            style(&record.channel_name).bold(),
            record.server_name,
            style(format!(
                "{} messages, {}",
                record.message_count,
                record.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            ))
            .dim()
        );
    }
    println!();
    Ok(())
}

pub fn show(ctx: &Context, number: usize) -> Result<()> {
    let index = index_of(number)?;
    let record = history(ctx)
        .list()?
        .into_iter()
        .nth(index)
        .ok_or_else(|| anyhow!("No saved summary #{}.", number))?;
    print_record(&record);
    Ok(())
}

pub fn remove(ctx: &Context, number: usize) -> Result<()> {
    let index = index_of(number)?;
    let removed = history(ctx)
        .remove(index)?
        .ok_or_else(|| anyhow!("No saved summary #{}.", number))?;
    ui::success(&format!(
        "Removed #{} · {} ({} messages).",
        removed.channel_name, removed.server_name, removed.message_count
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_of_is_one_based() {
        assert_eq!(index_of(1).unwrap(), 0);
        assert_eq!(index_of(10).unwrap(), 9);
        assert!(index_of(0).is_err());
    }
}
