//! dirsort - sort a folder into category subfolders
//!
//! This library transliterates Cyrillic file names, classifies files by
//! extension, moves them into `images/`, `videos/`, `documents/`, `music/`,
//! `archives/` or `others/`, unpacks zip archives and reports what the
//! classifier did not recognise.

pub mod cli;
pub mod config;
pub mod extractor;
pub mod file_category;
pub mod file_organizer;
pub mod output;
pub mod report;
pub mod summary;
pub mod transliterate;

pub use config::{CompiledFilters, Config, ConfigError};
pub use extractor::{ExtractError, ExtractOutcome, Extractor};
pub use file_category::{Category, classify};
pub use file_organizer::{OrganizeError, PlannedMove, Sorter};
pub use report::Report;
pub use summary::RunSummary;
pub use transliterate::{CaseMode, normalize};

pub use cli::{Args, RunOptions, run_cli, run_cli_with_config};
