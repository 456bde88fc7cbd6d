//! CLI output formatting and display helpers.

use docmirror_core::driver::{RootOutcome, SyncSummary};
use docmirror_core::manifest::ManifestEntry;
use docmirror_core::RootSpec;

/// Message when no subcommand was given.
pub const NO_COMMAND_GUIDANCE: &str = "No command given. Configure roots, then run a sync.";

/// Example for a one-off sync.
pub const SYNC_EXAMPLE: &str = "Example: docmirror sync --target-dir ./mirror --roots-file subjects.json";

/// Example for listing synced files.
pub const LIST_EXAMPLE: &str = "Example: docmirror list --search syllabus";

/// Returns terminal width from COLUMNS, or 80 if unset/invalid.
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|width| *width >= 20)
        .unwrap_or(80)
}

/// Truncates text to at most `width` chars, appending ellipsis if truncated.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    let text_len = text.chars().count();
    if text_len <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    if width == 1 {
        return "…".to_string();
    }

    let mut output: String = text.chars().take(width - 1).collect();
    output.push('…');
    output
}

/// Returns lines for quick-start guidance, truncated to width.
pub fn quick_start_guidance_lines(width: usize) -> Vec<String> {
    vec![
        truncate_to_width(NO_COMMAND_GUIDANCE, width),
        truncate_to_width(SYNC_EXAMPLE, width),
        truncate_to_width(LIST_EXAMPLE, width),
    ]
}

/// Prints quick-start guidance to stdout.
pub fn print_quick_start_guidance() {
    let width = terminal_width().min(80);
    for line in quick_start_guidance_lines(width) {
        println!("{line}");
    }
}

fn outcome_label(outcome: &RootOutcome) -> String {
    match outcome {
        RootOutcome::Completed => "ok".to_string(),
        RootOutcome::NavigationTimeout => "not ready".to_string(),
        RootOutcome::Unreachable { reason } => format!("unreachable: {reason}"),
        RootOutcome::Aborted { reason } => format!("aborted: {reason}"),
        RootOutcome::PersistFailed { reason } => format!("not saved: {reason}"),
    }
}

/// One line per root plus a totals line.
pub fn sync_summary_lines(summary: &SyncSummary, width: usize) -> Vec<String> {
    let mut lines = Vec::with_capacity(summary.roots.len() + 1);
    for root in &summary.roots {
        let walk = &root.walk;
        let mut line = format!(
            "{}: {} - {} new, {} converted",
            root.label,
            outcome_label(&root.outcome),
            walk.files_downloaded,
            walk.files_converted
        );
        if walk.files_timed_out > 0 {
            line.push_str(&format!(", {} timed out", walk.files_timed_out));
        }
        if !walk.drift_events.is_empty() {
            line.push_str(&format!(", {} drift", walk.drift_events.len()));
        }
        lines.push(truncate_to_width(&line, width));
    }

    let totals = summary.totals();
    lines.push(format!(
        "Synced {}/{} roots: {} new file(s), {} timed out",
        summary.completed_roots(),
        summary.roots.len(),
        totals.files_downloaded,
        totals.files_timed_out
    ));
    lines
}

pub fn print_sync_summary(summary: &SyncSummary) {
    for line in sync_summary_lines(summary, terminal_width()) {
        println!("{line}");
    }
}

/// Tab-separated rows: date, folder path, name.
pub fn entry_lines(entries: &[ManifestEntry], width: usize) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            truncate_to_width(
                &format!("{}\t{}\t{}", entry.synced_at, entry.folder, entry.name),
                width,
            )
        })
        .collect()
}

pub fn root_lines(roots: &[RootSpec]) -> Vec<String> {
    roots
        .iter()
        .map(|root| format!("{}\t{}", root.label, root.url))
        .collect()
}
