//! Shared CLI output helpers.

use console::style;

use crate::models::{CrawlSession, SessionStatus};

/// Format a number with thousands separators.
pub fn format_number(n: u64) -> String {
    let digits: Vec<char> = n.to_string().chars().rev().collect();
    let mut out = String::new();
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(*c);
    }
    out.chars().rev().collect()
}

/// Render a session status with color.
pub fn styled_status(status: SessionStatus) -> String {
    match status {
        SessionStatus::Running => style("RUNNING").yellow().to_string(),
        SessionStatus::Completed => style("COMPLETED").green().to_string(),
        SessionStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Print a one-session counter summary.
pub fn print_session_summary(session: &CrawlSession) {
    println!(
        "Session #{} {}",
        session.session_id,
        styled_status(session.status)
    );
    println!("  {:<12} {:>8}", "Total:", format_number(session.total_items));
    println!("  {:<12} {:>8}", "New:", format_number(session.new_items));
    println!(
        "  {:<12} {:>8}",
        "Updated:",
        format_number(session.updated_items)
    );
    println!(
        "  {:<12} {:>8}",
        "Unchanged:",
        format_number(session.unchanged_items)
    );
    println!(
        "  {:<12} {:>8}",
        "Failed:",
        format_number(session.failed_items)
    );
    if let Some(notes) = &session.notes {
        println!("  {:<12} {}", "Notes:", notes);
    }
}
