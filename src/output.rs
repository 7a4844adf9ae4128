//! Terminal output.
//!
//! Every line the tool prints goes through [`OutputFormatter`], which keeps
//! colors and symbols consistent. Progress over the planned moves is drawn
//! with an `indicatif` bar on stderr.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Styled printing helpers.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// ```no_run
    /// use dirsort::output::OutputFormatter;
    /// OutputFormatter::success("photo.png -> images/");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark, on stderr.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a bold section header preceded by a blank line.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Prints one category and the entries found below its folder.
    pub fn category_listing(label: &str, entries: &[PathBuf]) {
        if entries.is_empty() {
            println!("{}: {}", label.bold(), "(empty)".dimmed());
            return;
        }
        println!("{}: {} entries", label.bold(), entries.len());
        for entry in entries {
            println!("  {}", entry.display());
        }
    }

    /// Creates a progress bar for `total` file moves.
    ///
    /// The bar is hidden when `quiet` is set. It also stays invisible when
    /// stderr is not a terminal.
    pub fn create_progress_bar(total: u64, quiet: bool) -> ProgressBar {
        if quiet {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("█▓░"));
        }
        pb
    }

    /// Prints a table of counts per category.
    ///
    /// ```no_run
    /// use dirsort::output::OutputFormatter;
    /// use std::collections::BTreeMap;
    ///
    /// let mut counts = BTreeMap::new();
    /// counts.insert("documents".to_string(), 15);
    /// counts.insert("images".to_string(), 8);
    /// OutputFormatter::summary_table("SUMMARY", &counts);
    /// ```
    pub fn summary_table(title: &str, counts: &BTreeMap<String, usize>) {
        Self::header(title);

        let total: usize = counts.values().sum();
        let width = counts
            .keys()
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max(8);

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));

        for (category, count) in counts {
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                plural(*count),
                width = width
            );
        }

        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total.to_string().green().bold(),
            plural(total),
            width = width
        );
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
