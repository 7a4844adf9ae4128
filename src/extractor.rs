//! Unpacking of sorted archives.
//!
//! Runs over the `archives` category folder after sorting has finished. Every
//! file whose name ends in `.zip`, `.gz` or `.tar` is opened as a zip
//! container and unpacked into `archives/archives/<name>`. Only the zip format
//! is understood; gzip and tar streams are recognised by their content and
//! reported without being touched.

use crate::file_category::dotted_extension;
use crate::file_organizer::Sorter;
use crate::transliterate::{CaseMode, normalize_with};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::ZipArchive;
use zip::result::ZipError;

/// Extensions (lowercase, with dot) of files the extractor picks up.
pub const ARCHIVE_EXTENSIONS: [&str; 3] = [".zip", ".gz", ".tar"];

/// Folder inside `archives` that receives unpacked content.
pub const EXTRACTION_DIR: &str = "archives";

/// Archive formats that are valid on their own but are not zip containers.
const NON_ZIP_ARCHIVE_MIMES: &[&str] = &[
    "application/gzip",
    "application/x-tar",
    "application/x-bzip2",
    "application/x-xz",
    "application/x-7z-compressed",
    "application/vnd.rar",
    "application/x-rar-compressed",
    "application/zstd",
];

/// Errors that can occur while unpacking one archive.
#[derive(Debug)]
pub enum ExtractError {
    /// The file is not a well-formed zip container.
    BadZip { reason: String },
    /// The content is a different archive format.
    NotZipContainer { detected: String },
    /// Reading the archive or writing its content failed.
    Io { path: PathBuf, source: io::Error },
}

impl ExtractError {
    /// True when the archive itself is proven broken, as opposed to an
    /// environment problem or an unsupported format.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::BadZip { .. })
    }
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadZip { reason } => write!(f, "Bad zip file: {}", reason),
            Self::NotZipContainer { detected } => {
                write!(f, "Not a zip container (content is {})", detected)
            }
            Self::Io { path, source } => write!(f, "I/O error on {}: {}", path.display(), source),
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

fn io_error(path: &Path, source: io::Error) -> ExtractError {
    ExtractError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Maps errors raised while parsing the archive's own structure.
///
/// A truncated central directory surfaces as an I/O error from the zip
/// reader, so short reads and invalid data count as a broken archive.
fn from_zip_error(err: ZipError, path: &Path) -> ExtractError {
    match err {
        ZipError::Io(source)
            if matches!(
                source.kind(),
                io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData
            ) =>
        {
            ExtractError::BadZip {
                reason: source.to_string(),
            }
        }
        ZipError::Io(source) => io_error(path, source),
        other => ExtractError::BadZip {
            reason: other.to_string(),
        },
    }
}

/// One archive scheduled for extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedExtraction {
    pub archive: PathBuf,
    pub target: PathBuf,
}

/// Counts for a successful extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractStats {
    pub files: usize,
    pub dirs: usize,
    /// Entries whose names would escape the target folder.
    pub skipped: usize,
}

/// What happened to one archive.
#[derive(Debug)]
pub enum ExtractOutcome {
    Extracted(ExtractStats),
    /// Malformed zip. `deleted` tells whether the archive was removed.
    Corrupt { error: ExtractError, deleted: bool },
    /// Any other failure; the archive is left in place.
    Failed(ExtractError),
}

/// Unpacks the archives produced by the sorter.
#[derive(Debug, Clone)]
pub struct Extractor {
    case_mode: CaseMode,
    delete_corrupt: bool,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(CaseMode::Preserve, true)
    }
}

impl Extractor {
    pub fn new(case_mode: CaseMode, delete_corrupt: bool) -> Self {
        Self {
            case_mode,
            delete_corrupt,
        }
    }

    /// Lists archives under `archives_dir`, skipping the extraction folder.
    ///
    /// The extension check uses the original file name. The target folder is
    /// named after the transliterated name with that extension cut off. A
    /// missing `archives_dir` yields an empty plan.
    pub fn plan(&self, archives_dir: &Path) -> Vec<PlannedExtraction> {
        if !archives_dir.is_dir() {
            return Vec::new();
        }
        let extraction_root = archives_dir.join(EXTRACTION_DIR);

        let mut planned: Vec<PlannedExtraction> = WalkDir::new(archives_dir)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| entry.path() != extraction_root)
            .flatten()
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?;
                let ext = dotted_extension(name);
                if !ARCHIVE_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
                    return None;
                }
                let normalized = normalize_with(name, self.case_mode);
                let folder = normalized.strip_suffix(ext).unwrap_or(&normalized);
                Some(PlannedExtraction {
                    archive: entry.path().to_path_buf(),
                    target: extraction_root.join(folder),
                })
            })
            .collect();

        planned.sort_by(|a, b| a.archive.cmp(&b.archive));
        planned
    }

    /// Extracts one archive and applies the corrupt-archive policy.
    pub fn run(&self, planned: &PlannedExtraction) -> ExtractOutcome {
        match extract_zip(&planned.archive, &planned.target) {
            Ok(stats) => ExtractOutcome::Extracted(stats),
            Err(error) => {
                remove_if_empty(&planned.target);
                if !error.is_corrupt() {
                    return ExtractOutcome::Failed(error);
                }
                let deleted = self.delete_corrupt && fs::remove_file(&planned.archive).is_ok();
                ExtractOutcome::Corrupt { error, deleted }
            }
        }
    }

    /// Removes empty folders under `archives_dir`, leaving unpacked content
    /// alone. The extraction folder itself goes only when nothing was
    /// unpacked into it.
    pub fn cleanup(archives_dir: &Path) -> Vec<PathBuf> {
        let extraction_root = archives_dir.join(EXTRACTION_DIR);
        let mut removed =
            Sorter::remove_empty_dirs(archives_dir, std::slice::from_ref(&extraction_root));
        if remove_if_empty(&extraction_root) {
            removed.push(extraction_root);
        }
        removed
    }
}

/// Unpacks every entry of a zip file into `target`.
///
/// Entries with absolute paths or `..` components are skipped. The target
/// folder is created only once the archive has been opened successfully.
pub fn extract_zip(archive_path: &Path, target: &Path) -> Result<ExtractStats, ExtractError> {
    if let Some(kind) = infer::get_from_path(archive_path).map_err(|e| io_error(archive_path, e))?
        && NON_ZIP_ARCHIVE_MIMES.contains(&kind.mime_type())
    {
        return Err(ExtractError::NotZipContainer {
            detected: kind.mime_type().to_string(),
        });
    }

    let file = File::open(archive_path).map_err(|e| io_error(archive_path, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| from_zip_error(e, archive_path))?;

    fs::create_dir_all(target).map_err(|e| io_error(target, e))?;

    let mut stats = ExtractStats::default();
    let mut buf = vec![0u8; 64 * 1024];

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| from_zip_error(e, archive_path))?;

        let Some(entry_path) = entry.enclosed_name() else {
            stats.skipped += 1;
            continue;
        };
        let output_path = target.join(entry_path);

        if entry.is_dir() {
            fs::create_dir_all(&output_path).map_err(|e| io_error(&output_path, e))?;
            stats.dirs += 1;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        let mut outfile = File::create(&output_path).map_err(|e| io_error(&output_path, e))?;

        // Read errors mean broken entry data (bad CRC, truncated stream).
        loop {
            let n = match entry.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(ExtractError::BadZip {
                        reason: format!("entry {}: {}", entry.name(), e),
                    });
                }
            };
            outfile
                .write_all(&buf[..n])
                .map_err(|e| io_error(&output_path, e))?;
        }
        stats.files += 1;
    }

    Ok(stats)
}

fn remove_if_empty(dir: &Path) -> bool {
    fs::read_dir(dir).is_ok_and(|mut it| it.next().is_none()) && fs::remove_dir(dir).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_plan_matches_archive_extensions_only() {
        let temp_dir = TempDir::new().unwrap();
        let archives = temp_dir.path();
        fs::write(archives.join("a.zip"), b"").unwrap();
        fs::write(archives.join("b.GZ"), b"").unwrap();
        fs::write(archives.join("c.tar"), b"").unwrap();
        fs::write(archives.join("d.rar"), b"").unwrap();

        let plan = Extractor::default().plan(archives);
        let names: Vec<_> = plan
            .iter()
            .map(|p| p.target.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_plan_target_uses_transliterated_name() {
        let temp_dir = TempDir::new().unwrap();
        let archives = temp_dir.path();
        fs::write(archives.join("Звіт.ZIP"), b"").unwrap();

        let plan = Extractor::default().plan(archives);
        assert_eq!(plan[0].target, archives.join("archives").join("Zvit"));
    }

    #[test]
    fn test_plan_skips_extraction_folder() {
        let temp_dir = TempDir::new().unwrap();
        let archives = temp_dir.path();
        fs::create_dir_all(archives.join("archives/old")).unwrap();
        fs::write(archives.join("archives/old/nested.zip"), b"").unwrap();

        assert!(Extractor::default().plan(archives).is_empty());
    }

    #[test]
    fn test_plan_missing_folder_is_empty() {
        assert!(Extractor::default().plan(Path::new("/no/such/archives")).is_empty());
    }

    #[test]
    fn test_extract_valid_zip() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("backup.zip");
        write_zip(&archive, &[("a.txt", "alpha"), ("sub/b.txt", "beta")]);
        let target = temp_dir.path().join("out");

        let stats = extract_zip(&archive, &target).unwrap();
        assert_eq!(stats.files, 2);
        assert_eq!(fs::read_to_string(target.join("a.txt")).unwrap(), "alpha");
        assert_eq!(fs::read_to_string(target.join("sub/b.txt")).unwrap(), "beta");
    }

    #[test]
    fn test_unsafe_entry_names_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("evil.zip");
        write_zip(&archive, &[("../escape.txt", "x"), ("ok.txt", "y")]);
        let target = temp_dir.path().join("out");

        let stats = extract_zip(&archive, &target).unwrap();
        assert_eq!(stats.files, 1);
        assert_eq!(stats.skipped, 1);
        assert!(!temp_dir.path().join("escape.txt").exists());
    }

    #[test]
    fn test_corrupt_zip_is_deleted() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("broken.zip");
        fs::write(&archive, "this is definitely not a zip archive, only text\n").unwrap();
        let planned = PlannedExtraction {
            archive: archive.clone(),
            target: temp_dir.path().join("archives/broken"),
        };

        let outcome = Extractor::default().run(&planned);
        assert!(matches!(outcome, ExtractOutcome::Corrupt { deleted: true, .. }));
        assert!(!archive.exists());
        assert!(!planned.target.exists());
    }

    #[test]
    fn test_corrupt_zip_kept_when_deletion_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("broken.zip");
        fs::write(&archive, "this is definitely not a zip archive, only text\n").unwrap();
        let planned = PlannedExtraction {
            archive: archive.clone(),
            target: temp_dir.path().join("archives/broken"),
        };

        let outcome = Extractor::new(CaseMode::Preserve, false).run(&planned);
        assert!(matches!(outcome, ExtractOutcome::Corrupt { deleted: false, .. }));
        assert!(archive.exists());
    }

    #[test]
    fn test_real_gzip_is_reported_not_deleted() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("logs.gz");
        let mut gzip = vec![0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03];
        gzip.extend_from_slice(&[0u8; 32]);
        fs::write(&archive, &gzip).unwrap();
        let planned = PlannedExtraction {
            archive: archive.clone(),
            target: temp_dir.path().join("archives/logs"),
        };

        let outcome = Extractor::default().run(&planned);
        match outcome {
            ExtractOutcome::Failed(ExtractError::NotZipContainer { detected }) => {
                assert_eq!(detected, "application/gzip");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(archive.exists());
    }

    #[test]
    fn test_truncated_zip_is_deleted() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("cut.zip");
        write_zip(&archive, &[("a.txt", "alpha"), ("b.txt", "beta")]);
        let bytes = fs::read(&archive).unwrap();
        fs::write(&archive, &bytes[..bytes.len() - 4]).unwrap();
        let planned = PlannedExtraction {
            archive: archive.clone(),
            target: temp_dir.path().join("archives/cut"),
        };

        let outcome = Extractor::default().run(&planned);
        assert!(
            matches!(outcome, ExtractOutcome::Corrupt { deleted: true, .. }),
            "unexpected outcome: {:?}",
            outcome
        );
        assert!(!archive.exists());
        assert!(!planned.target.exists());
    }

    #[test]
    fn test_bare_end_record_signature_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("stub.zip");
        fs::write(&archive, b"PK\x05\x06garbage").unwrap();
        let planned = PlannedExtraction {
            archive: archive.clone(),
            target: temp_dir.path().join("archives/stub"),
        };

        let outcome = Extractor::default().run(&planned);
        assert!(
            matches!(outcome, ExtractOutcome::Corrupt { deleted: true, .. }),
            "unexpected outcome: {:?}",
            outcome
        );
        assert!(!archive.exists());
    }

    #[test]
    fn test_bad_entry_checksum_deletes_archive_and_keeps_partial_output() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("mixed.zip");
        let payload = "damaged payload that will not match its checksum";
        write_zip(&archive, &[("good.txt", "intact"), ("bad.txt", payload)]);

        let mut bytes = fs::read(&archive).unwrap();
        let offset = bytes
            .windows(payload.len())
            .position(|w| w == payload.as_bytes())
            .unwrap();
        bytes[offset] ^= 0xFF;
        fs::write(&archive, &bytes).unwrap();

        let planned = PlannedExtraction {
            archive: archive.clone(),
            target: temp_dir.path().join("archives/mixed"),
        };

        match Extractor::default().run(&planned) {
            ExtractOutcome::Corrupt { error, deleted } => {
                assert!(deleted);
                assert!(error.to_string().contains("bad.txt"), "{}", error);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(!archive.exists());
        assert_eq!(
            fs::read_to_string(planned.target.join("good.txt")).unwrap(),
            "intact"
        );
    }

    #[test]
    fn test_cleanup_removes_unused_extraction_folder() {
        let temp_dir = TempDir::new().unwrap();
        let archives = temp_dir.path();
        fs::create_dir_all(archives.join("archives")).unwrap();
        fs::create_dir_all(archives.join("leftover/inner")).unwrap();

        let removed = Extractor::cleanup(archives);

        assert!(!archives.join("archives").exists());
        assert!(!archives.join("leftover").exists());
        assert!(removed.contains(&archives.join("archives")));
    }

    #[test]
    fn test_cleanup_keeps_unpacked_content() {
        let temp_dir = TempDir::new().unwrap();
        let archives = temp_dir.path();
        fs::create_dir_all(archives.join("archives/pack/empty_dir")).unwrap();
        fs::write(archives.join("archives/pack/file.txt"), b"x").unwrap();

        let removed = Extractor::cleanup(archives);

        assert!(removed.is_empty());
        assert!(archives.join("archives/pack/empty_dir").is_dir());
    }

    #[test]
    fn test_missing_archive_is_io_failure() {
        let temp_dir = TempDir::new().unwrap();
        let planned = PlannedExtraction {
            archive: temp_dir.path().join("vanished.zip"),
            target: temp_dir.path().join("archives/vanished"),
        };

        let outcome = Extractor::default().run(&planned);
        assert!(matches!(
            outcome,
            ExtractOutcome::Failed(ExtractError::Io { .. })
        ));
    }
}
