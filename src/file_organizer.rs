/// Sorting of a directory tree into category folders.
///
/// Sorting happens in two steps. [`Sorter::plan`] walks the tree once and
/// takes a snapshot of every file to move together with its transliterated
/// name and category; nothing on disk changes. [`Sorter::apply`] then performs
/// a single planned move. Keeping the walk separate from the mutation means
/// moves never disturb the traversal.
///
/// Files already inside one of the top-level category folders are left alone,
/// so sorting an already sorted root is a no-op.
use crate::config::CompiledFilters;
use crate::file_category::{Category, classify_file_name};
use crate::transliterate::{CaseMode, normalize_with};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file move computed by [`Sorter::plan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedMove {
    /// Current location of the file.
    pub source: PathBuf,
    /// `<root>/<category>/<transliterated name>`.
    pub destination: PathBuf,
    /// Category derived from the transliterated name.
    pub category: Category,
}

/// Errors that can occur while sorting.
#[derive(Debug)]
pub enum OrganizeError {
    /// The root directory is missing or not a directory.
    InvalidBasePath {
        path: PathBuf,
        source: io::Error,
    },
    /// A category folder could not be created.
    DirectoryCreationFailed {
        path: PathBuf,
        source: io::Error,
    },
    /// The file disappeared between planning and moving.
    SourceMissing { path: PathBuf },
    /// The move itself failed (permissions, destination is a directory, ...).
    FileMoveFailure {
        source: PathBuf,
        destination: PathBuf,
        source_error: io::Error,
    },
}

impl std::fmt::Display for OrganizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBasePath { path, source } => {
                write!(f, "Invalid base path {}: {}", path.display(), source)
            }
            Self::DirectoryCreationFailed { path, source } => {
                write!(
                    f,
                    "Failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::SourceMissing { path } => {
                write!(f, "Failed to move {}. File not found.", path.display())
            }
            Self::FileMoveFailure {
                source,
                destination,
                source_error,
            } => {
                write!(
                    f,
                    "Failed to move {} to {}: {}",
                    source.display(),
                    destination.display(),
                    source_error
                )
            }
        }
    }
}

impl std::error::Error for OrganizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidBasePath { source, .. } | Self::DirectoryCreationFailed { source, .. } => {
                Some(source)
            }
            Self::FileMoveFailure { source_error, .. } => Some(source_error),
            Self::SourceMissing { .. } => None,
        }
    }
}

/// Result type for sorting operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Moves files into category folders under a root.
#[derive(Debug, Clone, Default)]
pub struct Sorter {
    filters: CompiledFilters,
    case_mode: CaseMode,
}

impl Sorter {
    pub fn new(filters: CompiledFilters, case_mode: CaseMode) -> Self {
        Self { filters, case_mode }
    }

    /// Returns the category folders of `root`, in report order.
    pub fn category_dirs(root: &Path) -> Vec<PathBuf> {
        Category::ALL
            .iter()
            .map(|c| root.join(c.dir_name()))
            .collect()
    }

    /// Checks that `root` exists and is a directory.
    pub fn validate_root(root: &Path) -> OrganizeResult<()> {
        match fs::metadata(root) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(OrganizeError::InvalidBasePath {
                path: root.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
            }),
            Err(e) => Err(OrganizeError::InvalidBasePath {
                path: root.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Collects every regular file below `root` that should be moved.
    ///
    /// The destination name is the transliterated file name, and the category
    /// comes from the extension of that transliterated name. Entries that
    /// cannot be read during the walk are skipped. The result is sorted by
    /// source path.
    pub fn plan(&self, root: &Path) -> OrganizeResult<Vec<PlannedMove>> {
        Self::validate_root(root)?;

        let mut planned: Vec<PlannedMove> = WalkDir::new(root)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| !is_category_dir(entry))
            .flatten()
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
                self.filters.should_include(rel)
            })
            .map(|entry| self.plan_file(root, entry.path()))
            .collect();

        planned.sort_by(|a, b| a.source.cmp(&b.source));
        Ok(planned)
    }

    fn plan_file(&self, root: &Path, path: &Path) -> PlannedMove {
        let (name, category) = match path.file_name().and_then(|n| n.to_str()) {
            Some(original) => {
                let normalized = normalize_with(original, self.case_mode);
                let category = classify_file_name(&normalized);
                (OsString::from(normalized), category)
            }
            // Names that are not valid UTF-8 are moved as they are.
            None => {
                let raw = path.file_name().map(OsString::from).unwrap_or_default();
                let category = classify_file_name(&raw.to_string_lossy());
                (raw, category)
            }
        };

        PlannedMove {
            source: path.to_path_buf(),
            destination: root.join(category.dir_name()).join(name),
            category,
        }
    }

    /// Performs one planned move, creating the category folder if needed.
    ///
    /// An existing file at the destination is replaced. Moves across file
    /// systems fall back to copy and delete.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dirsort::file_organizer::Sorter;
    /// use std::path::Path;
    ///
    /// let root = Path::new("/home/user/Desktop/mess");
    /// let sorter = Sorter::default();
    /// for planned in sorter.plan(root).unwrap() {
    ///     match Sorter::apply(root, &planned) {
    ///         Ok(dest) => println!("moved to {}", dest.display()),
    ///         Err(e) => eprintln!("{}", e),
    ///     }
    /// }
    /// ```
    pub fn apply(root: &Path, planned: &PlannedMove) -> OrganizeResult<PathBuf> {
        let category_path = root.join(planned.category.dir_name());
        fs::create_dir_all(&category_path).map_err(|e| {
            OrganizeError::DirectoryCreationFailed {
                path: category_path.clone(),
                source: e,
            }
        })?;

        match fs::rename(&planned.source, &planned.destination) {
            Ok(()) => Ok(planned.destination.clone()),
            Err(e) if e.kind() == io::ErrorKind::NotFound && !planned.source.exists() => {
                Err(OrganizeError::SourceMissing {
                    path: planned.source.clone(),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                copy_then_remove(&planned.source, &planned.destination)
                    .map(|()| planned.destination.clone())
                    .map_err(|e| OrganizeError::FileMoveFailure {
                        source: planned.source.clone(),
                        destination: planned.destination.clone(),
                        source_error: e,
                    })
            }
            Err(e) => Err(OrganizeError::FileMoveFailure {
                source: planned.source.clone(),
                destination: planned.destination.clone(),
                source_error: e,
            }),
        }
    }

    /// Removes every empty directory below `root`, deepest first.
    ///
    /// Directories listed in `keep` are neither removed nor descended into.
    /// `root` itself is never removed. Returns the removed directories.
    pub fn remove_empty_dirs(root: &Path, keep: &[PathBuf]) -> Vec<PathBuf> {
        let mut removed = Vec::new();

        let walker = WalkDir::new(root)
            .min_depth(1)
            .contents_first(true)
            .into_iter()
            .filter_entry(|entry| !keep.iter().any(|k| k == entry.path()));

        for entry in walker.flatten() {
            if !entry.file_type().is_dir() {
                continue;
            }
            let is_empty = fs::read_dir(entry.path())
                .map(|mut it| it.next().is_none())
                .unwrap_or(false);
            if is_empty && fs::remove_dir(entry.path()).is_ok() {
                removed.push(entry.into_path());
            }
        }

        removed
    }
}

fn is_category_dir(entry: &walkdir::DirEntry) -> bool {
    entry.depth() == 1
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .and_then(Category::from_dir_name)
            .is_some()
}

fn copy_then_remove(source: &Path, destination: &Path) -> io::Result<()> {
    fs::copy(source, destination)?;
    fs::remove_file(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, rel).unwrap();
    }

    #[test]
    fn test_plan_uses_transliterated_name_for_category() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        write(root, "Документ.txt");

        let plan = Sorter::default().plan(root).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].category, Category::Document);
        assert_eq!(plan[0].destination, root.join("documents").join("Dokument.txt"));
    }

    #[test]
    fn test_plan_does_not_touch_filesystem() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "a/b/song.MP3");

        let plan = Sorter::default().plan(root).unwrap();
        assert_eq!(plan[0].category, Category::Music);
        assert!(root.join("a/b/song.MP3").exists());
        assert!(!root.join("music").exists());
    }

    #[test]
    fn test_plan_skips_existing_category_folders() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "images/old.png");
        write(root, "archives/archives/backup/readme.txt");
        write(root, "nested/images/new.png");

        let plan = Sorter::default().plan(root).unwrap();
        let sources: Vec<_> = plan.iter().map(|p| p.source.clone()).collect();
        assert_eq!(sources, vec![root.join("nested/images/new.png")]);
    }

    #[test]
    fn test_plan_applies_filters() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "keep/me.txt");
        write(root, "move.txt");

        let config = crate::config::Config::from_toml(
            "[filters.exclude]\npatterns = [\"keep/**\"]",
        )
        .unwrap();
        let sorter = Sorter::new(config.compile_filters().unwrap(), CaseMode::Preserve);
        let plan = sorter.plan(root).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].source, root.join("move.txt"));
    }

    #[test]
    fn test_apply_creates_category_folder() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "photo.JPG");

        let plan = Sorter::default().plan(root).unwrap();
        let dest = Sorter::apply(root, &plan[0]).unwrap();

        assert_eq!(dest, root.join("images/photo.JPG"));
        assert!(dest.is_file());
        assert!(!root.join("photo.JPG").exists());
    }

    #[test]
    fn test_apply_last_write_wins_on_collision() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "one/notes.txt");
        write(root, "two/notes.txt");

        let plan = Sorter::default().plan(root).unwrap();
        for planned in &plan {
            Sorter::apply(root, planned).unwrap();
        }

        let content = fs::read_to_string(root.join("documents/notes.txt")).unwrap();
        assert_eq!(content, "two/notes.txt");
    }

    #[test]
    fn test_apply_reports_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "gone.txt");

        let plan = Sorter::default().plan(root).unwrap();
        fs::remove_file(root.join("gone.txt")).unwrap();

        let result = Sorter::apply(root, &plan[0]);
        assert!(matches!(result, Err(OrganizeError::SourceMissing { .. })));
    }

    #[test]
    fn test_apply_reports_generic_failure() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "clash.txt");
        // A directory sitting where the file should go.
        fs::create_dir_all(root.join("documents/clash.txt/inner")).unwrap();

        let plan = Sorter::default().plan(root).unwrap();
        let result = Sorter::apply(root, &plan[0]);
        assert!(matches!(result, Err(OrganizeError::FileMoveFailure { .. })));
        assert!(root.join("clash.txt").exists());
    }

    #[test]
    fn test_plan_rejects_missing_root() {
        let result = Sorter::default().plan(Path::new("/non/existent/path"));
        assert!(matches!(result, Err(OrganizeError::InvalidBasePath { .. })));
    }

    #[test]
    fn test_remove_empty_dirs_bottom_up() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("a/b/c")).unwrap();
        fs::create_dir_all(root.join("images")).unwrap();
        write(root, "d/file.txt");

        let keep = Sorter::category_dirs(root);
        let removed = Sorter::remove_empty_dirs(root, &keep);

        assert_eq!(removed.len(), 3);
        assert!(!root.join("a").exists());
        assert!(root.join("d").exists());
        assert!(root.join("images").exists());
    }
}
