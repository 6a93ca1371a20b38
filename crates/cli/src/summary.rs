//! End-of-run summary

use owo_colors::OwoColorize;
use transcode_core::SyncReport;

pub fn print(report: &SyncReport, dry_run: bool) {
    if dry_run {
        println!("{}", "Dry run, nothing was changed".yellow());
    }

    if !report.has_changes() && report.retagged == 0 {
        println!("{}", "Destination is up to date".green());
        return;
    }

    let rows = [
        ("Directories created", report.created_dirs),
        ("Directories deleted", report.deleted_dirs),
        ("Files deleted", report.deleted_files),
        ("Files refreshed", report.refreshed),
        ("Files copied", report.copied),
        ("Files converted", report.converted),
        ("Files retagged", report.retagged),
    ];

    println!("{}", "Summary".bold());
    for (label, count) in rows.iter().filter(|(_, count)| *count > 0) {
        println!("  {}: {}", label.cyan(), count);
    }
}
