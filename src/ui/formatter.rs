//! Pure formatting functions for UI output.
//!
//! This module contains all display/formatting logic separated from user interaction.
//! Table rendering is split from printing so it can be tested.

use std::path::PathBuf;

use console::style;

use crate::boundary::BoundaryWarning;
use crate::cli::orchestration::StatusEntry;
use crate::engine::BumpPlan;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Display a boundary warning to the user.
pub fn display_boundary_warning(warning: &BoundaryWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// Render the status table: one row per project.
pub fn format_status_table(entries: &[StatusEntry]) -> Vec<String> {
    let header = ["PROJECT", "VERSION", "TAG", "AHEAD", "DIRTY"];
    let rows: Vec<[String; 5]> = entries
        .iter()
        .map(|entry| {
            let state = &entry.state;
            let version = match (&entry.described, &state.current) {
                (Some(described), _) => described.to_string(),
                (None, Some(current)) => current.to_string(),
                (None, None) => "unreleased".to_string(),
            };
            [
                state.pname.clone(),
                version,
                state.tag.clone().unwrap_or_else(|| "-".to_string()),
                state.distance.to_string(),
                if state.is_dirty { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();

    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render = |cells: [&str; 5]| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![render(header)];
    for row in &rows {
        lines.push(render([&row[0], &row[1], &row[2], &row[3], &row[4]]));
    }
    lines
}

/// Display the version state of each project.
pub fn display_status_table(entries: &[StatusEntry]) {
    let mut lines = format_status_table(entries).into_iter();
    if let Some(header) = lines.next() {
        println!("{}", style(header).bold());
    }
    for line in lines {
        println!("{}", line);
    }
}

/// Display the bumps about to happen.
pub fn display_plan(plan: &BumpPlan) {
    println!("\n{}", style("Planned bumps:").bold());
    for entry in plan.entries() {
        let old = entry
            .old
            .as_ref()
            .map_or_else(|| "unreleased".to_string(), |v| v.to_string());
        println!(
            "  {:<20} {} → {}  ({})",
            entry.pname,
            style(old).red(),
            style(entry.new.to_string()).green(),
            style(&entry.tag_name).cyan()
        );
    }
}

/// Display files that were (or would be) engraved.
pub fn display_engraved(paths: &[PathBuf]) {
    for path in paths {
        println!("    {}", style(path.display()).dim());
    }
}

/// Manual recovery for a bump whose commit exists but some tags are missing.
pub fn format_partial_bump_recovery(commit: &str, missing: &[String]) -> Vec<String> {
    missing
        .iter()
        .map(|tag| format!("git tag -a {} {} -m \"{}\"", tag, commit, tag))
        .collect()
}

/// Display the commands that create the missing tags by hand.
pub fn display_partial_bump_recovery(commit: &str, missing: &[String]) {
    println!(
        "\n{} Create the missing tags against commit {}:",
        style("→").yellow(),
        commit
    );
    for line in format_partial_bump_recovery(commit, missing) {
        println!("  {}", style(line).cyan());
    }
}
