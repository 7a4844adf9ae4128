//! Command-line interface for dirsort.
//!
//! A run has three strictly ordered phases:
//! 1. sort every file below the root into its category folder
//! 2. unpack the archives that ended up in `archives/`
//! 3. report what each category holds and which extensions were unknown
//!
//! Extraction only starts after every move has been attempted.

use crate::config::Config;
use crate::extractor::{ExtractOutcome, Extractor};
use crate::file_organizer::{OrganizeError, PlannedMove, Sorter};
use crate::file_category::Category;
use crate::output::OutputFormatter;
use crate::report::Report;
use crate::summary::{CorruptRecord, ExtractionRecord, FailureRecord, MoveRecord, RunSummary};
use clap::Parser;
use std::path::{Path, PathBuf};

/// Sort a folder into images, videos, documents, music, archives and others.
#[derive(Parser, Debug)]
#[command(
    name = "dirsort",
    version,
    about = "Sort a folder into category subfolders and unpack its zip archives",
    long_about = "Moves every file below PATH into images/, videos/, documents/, music/, \
                  archives/ or others/ by extension, transliterating Cyrillic names to Latin.\n\n\
                  Zip archives are then unpacked into archives/archives/<name>/; \
                  archives that turn out to be corrupt are deleted."
)]
pub struct Args {
    /// Directory to sort.
    pub path: PathBuf,

    /// Show what would be moved without touching anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Path to a TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Skip unpacking archives.
    #[arg(long)]
    pub no_extract: bool,

    /// Print the run summary as JSON instead of the human-readable report.
    #[arg(long)]
    pub json: bool,

    /// Only print the final summary.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Switches that shape a run, independent of how they were parsed.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub no_extract: bool,
    pub json: bool,
    pub quiet: bool,
}

impl RunOptions {
    fn verbose(&self) -> bool {
        !self.quiet && !self.json
    }
}

impl Args {
    pub fn options(&self) -> RunOptions {
        RunOptions {
            dry_run: self.dry_run,
            no_extract: self.no_extract,
            json: self.json,
            quiet: self.quiet,
        }
    }
}

/// Runs dirsort for parsed command-line arguments.
pub fn run_cli(args: &Args) -> Result<RunSummary, String> {
    run_cli_with_config(&args.path, args.options(), args.config.as_deref())
}

/// Runs all phases on `root`.
///
/// Only problems that make the whole run impossible (bad configuration,
/// missing root) are returned as `Err`. Individual files that fail are
/// reported and recorded in the returned summary.
///
/// # Examples
///
/// ```no_run
/// use dirsort::cli::{RunOptions, run_cli_with_config};
/// use std::path::Path;
///
/// let summary = run_cli_with_config(Path::new("/path/to/mess"), RunOptions::default(), None)
///     .expect("run failed");
/// println!("moved {} files", summary.moved.len());
/// ```
pub fn run_cli_with_config(
    root: &Path,
    options: RunOptions,
    config_path: Option<&Path>,
) -> Result<RunSummary, String> {
    let config =
        Config::load(config_path).map_err(|e| format!("Error loading configuration: {}", e))?;
    let filters = config
        .compile_filters()
        .map_err(|e| format!("Error compiling filters: {}", e))?;
    let case_mode = config.normalize.case_mode();

    let sorter = Sorter::new(filters, case_mode);
    let planned = sorter.plan(root).map_err(|e| e.to_string())?;
    let mut summary = RunSummary::new(root, options.dry_run);

    if options.dry_run {
        if options.verbose() {
            preview_plan(root, &planned);
        }
        summary.planned = planned;
        finish(&summary, options)?;
        return Ok(summary);
    }

    if options.verbose() {
        OutputFormatter::info(&format!("Sorting contents of: {}", root.display()));
    }
    sort_files(root, &planned, &mut summary, options);
    summary.removed_dirs = Sorter::remove_empty_dirs(root, &Sorter::category_dirs(root));

    if config.extract.enabled && !options.no_extract {
        let extractor = Extractor::new(case_mode, config.extract.delete_corrupt);
        extract_archives(root, &extractor, &mut summary, options);
    }

    summary.report = Some(Report::build(root));
    finish(&summary, options)?;
    Ok(summary)
}

fn sort_files(root: &Path, planned: &[PlannedMove], summary: &mut RunSummary, options: RunOptions) {
    let pb = OutputFormatter::create_progress_bar(planned.len() as u64, !options.verbose());

    for item in planned {
        let name = display_name(&item.source);
        pb.set_message(name.clone());

        match Sorter::apply(root, item) {
            Ok(destination) => {
                if options.verbose() {
                    let shown = relative(root, &destination);
                    pb.suspend(|| OutputFormatter::success(&format!("{} → {}", name, shown)));
                }
                summary.moved.push(MoveRecord {
                    source: item.source.clone(),
                    destination,
                    category: item.category,
                });
            }
            Err(OrganizeError::SourceMissing { path }) => {
                if options.verbose() {
                    pb.suspend(|| {
                        OutputFormatter::error(&format!("Failed to move {}. File not found.", name))
                    });
                }
                summary.missing.push(path);
            }
            Err(e) => {
                if options.verbose() {
                    pb.suspend(|| {
                        OutputFormatter::error(&format!("Failed to move {}. Error: {}", name, e))
                    });
                }
                summary.move_failures.push(FailureRecord {
                    path: item.source.clone(),
                    reason: e.to_string(),
                });
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
}

fn extract_archives(
    root: &Path,
    extractor: &Extractor,
    summary: &mut RunSummary,
    options: RunOptions,
) {
    let archives_dir = root.join(Category::Archive.dir_name());
    let planned = extractor.plan(&archives_dir);

    if options.verbose() && !planned.is_empty() {
        OutputFormatter::header("Extracting archives:");
    }

    for item in &planned {
        let name = display_name(&item.archive);
        match extractor.run(item) {
            ExtractOutcome::Extracted(stats) => {
                if options.verbose() {
                    OutputFormatter::success(&format!(
                        "{} → {} ({} files)",
                        name,
                        relative(root, &item.target),
                        stats.files
                    ));
                    if stats.skipped > 0 {
                        OutputFormatter::warning(&format!(
                            "{}: skipped {} entries with unsafe paths",
                            name, stats.skipped
                        ));
                    }
                }
                summary.extracted.push(ExtractionRecord {
                    archive: item.archive.clone(),
                    target: item.target.clone(),
                    stats,
                });
            }
            ExtractOutcome::Corrupt { error, deleted } => {
                if options.verbose() {
                    let action = if deleted { "Removed." } else { "Kept." };
                    OutputFormatter::error(&format!(
                        "Failed to extract {} in {}: {}. {}",
                        name,
                        archives_dir.display(),
                        error,
                        action
                    ));
                }
                summary.corrupt.push(CorruptRecord {
                    archive: item.archive.clone(),
                    reason: error.to_string(),
                    deleted,
                });
            }
            ExtractOutcome::Failed(error) => {
                if options.verbose() {
                    OutputFormatter::error(&format!("Could not extract {}: {}", name, error));
                }
                summary.extract_failures.push(FailureRecord {
                    path: item.archive.clone(),
                    reason: error.to_string(),
                });
            }
        }
    }

    summary
        .removed_dirs
        .extend(Extractor::cleanup(&archives_dir));
}

fn preview_plan(root: &Path, planned: &[PlannedMove]) {
    OutputFormatter::dry_run_notice(&format!("Analyzing contents of: {}", root.display()));
    if planned.is_empty() {
        OutputFormatter::plain("No files found to sort.");
        return;
    }
    for item in planned {
        OutputFormatter::plain(&format!(
            " - {}\n   → Would move to {}",
            relative(root, &item.source),
            relative(root, &item.destination)
        ));
    }
}

fn finish(summary: &RunSummary, options: RunOptions) -> Result<(), String> {
    if options.json {
        OutputFormatter::plain(&summary.to_json()?);
        return Ok(());
    }

    let title = if summary.dry_run { "DRY RUN SUMMARY" } else { "SUMMARY" };
    OutputFormatter::summary_table(title, &summary.category_counts());

    if summary.dry_run {
        OutputFormatter::dry_run_notice("No files were modified.");
        return Ok(());
    }

    if !summary.extracted.is_empty() || !summary.corrupt.is_empty() {
        OutputFormatter::plain(&format!(
            "Archives extracted: {}, corrupt: {}",
            summary.extracted.len(),
            summary.corrupt.len()
        ));
    }

    if summary.has_failures() {
        OutputFormatter::warning("Some files could not be processed:");
        for path in &summary.missing {
            OutputFormatter::plain(&format!("  - {}: file not found", path.display()));
        }
        for failure in summary.move_failures.iter().chain(&summary.extract_failures) {
            OutputFormatter::plain(&format!("  - {}: {}", failure.path.display(), failure.reason));
        }
        for corrupt in &summary.corrupt {
            OutputFormatter::plain(&format!(
                "  - {}: {}",
                corrupt.archive.display(),
                corrupt.reason
            ));
        }
    } else {
        OutputFormatter::success("Files sorted successfully.");
    }

    if !options.quiet
        && let Some(report) = &summary.report
    {
        report.print();
    }

    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
