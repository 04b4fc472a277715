//! Dedup command: report and repair duplicate catalog entries.

use console::style;

use crate::cli::helpers::format_number;
use crate::config::Settings;

pub fn cmd_dedup(settings: &Settings, fix: bool, compact: bool) -> anyhow::Result<()> {
    let ctx = settings.create_db_context()?;
    let terms = ctx.terms();

    let groups = terms.find_duplicate_urls()?;
    if groups.is_empty() {
        println!("{} No duplicate URLs in the catalog", style("✓").green());
    } else {
        let excess: usize = groups.iter().map(|g| g.excess()).sum();
        println!(
            "{} {} URLs have duplicates ({} excess rows)",
            style("!").yellow(),
            format_number(groups.len() as u64),
            format_number(excess as u64)
        );

        for group in groups.iter().take(10) {
            println!("  {}", group.url);
            for (i, entry) in group.entries.iter().enumerate() {
                let action = if i == 0 { "keep" } else { "delete" };
                println!(
                    "    [{action}] #{} {} ({})",
                    entry.term_id,
                    entry.name,
                    entry.created_at.format("%Y-%m-%d")
                );
            }
        }
        if groups.len() > 10 {
            println!("  ... and {} more URLs", groups.len() - 10);
        }

        if fix {
            let deleted = terms.resolve_duplicates()?;
            println!(
                "{} Deleted {} duplicate rows (kept the earliest entry per URL)",
                style("✓").green(),
                format_number(deleted)
            );
        } else {
            println!("Run with --fix to delete duplicates (keeps the earliest entry)");
        }
    }

    if fix && compact {
        let moved = terms.compact_ids()?;
        println!(
            "{} Compacted term IDs ({} rows renumbered)",
            style("✓").green(),
            format_number(moved)
        );
    }

    println!("Catalog entries: {}", format_number(terms.count()?));
    Ok(())
}
