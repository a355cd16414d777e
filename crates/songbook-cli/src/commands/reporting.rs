use colored::Colorize;
use songbook_schema::Diagnostic;

use crate::report::RecordFailure;

/// Print warnings in the console style shared by all commands.
pub(crate) fn print_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    println!("\n{}", "Warnings".yellow().bold());
    println!("{}", "--------".dimmed());
    for diagnostic in diagnostics {
        println!("  {} {}", "!".yellow(), diagnostic);
    }
}

/// Print per-record failures.
pub(crate) fn print_failures(failures: &[RecordFailure]) {
    if failures.is_empty() {
        return;
    }
    println!("\n{}", "Failures".red().bold());
    println!("{}", "--------".dimmed());
    for failure in failures {
        println!("  {} {}", "x".red(), failure);
    }
}

/// Print the closing status line.
pub(crate) fn print_status(success: bool, dry_run: bool) {
    let suffix = if dry_run { " (dry run, nothing written)" } else { "" };
    if success {
        println!("\n{}{}", "SUCCESS".green().bold(), suffix.dimmed());
    } else {
        println!("\n{}{}", "FAILED".red().bold(), suffix.dimmed());
    }
}
