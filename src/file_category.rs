/// File categorization by extension.
///
/// Every file lands in exactly one of six categories. The extension table is
/// fixed and built once; anything it does not list is routed to
/// [`Category::Other`].
///
/// # Examples
///
/// ```
/// use dirsort::file_category::{Category, classify};
///
/// assert_eq!(classify(".png"), Category::Image);
/// assert_eq!(classify(".PDF"), Category::Document);
/// assert_eq!(classify(".rs"), Category::Other);
/// assert_eq!(classify(""), Category::Other);
/// ```
use std::collections::HashMap;
use std::sync::LazyLock;

/// Destination class of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// JPEG, PNG, JPG, SVG
    Image,
    /// AVI, MP4, MOV, MKV
    Video,
    /// DOC, DOCX, TXT, PDF, XLSX, PPTX
    Document,
    /// MP3, OGG, WAV, AMR
    Music,
    /// ZIP, GZ, TAR
    Archive,
    /// Everything else
    Other,
}

impl Category {
    /// All categories in report order.
    pub const ALL: [Category; 6] = [
        Category::Image,
        Category::Video,
        Category::Document,
        Category::Music,
        Category::Archive,
        Category::Other,
    ];

    /// Returns the folder name for this category.
    ///
    /// # Examples
    ///
    /// ```
    /// use dirsort::file_category::Category;
    ///
    /// assert_eq!(Category::Image.dir_name(), "images");
    /// assert_eq!(Category::Other.dir_name(), "others");
    /// ```
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Image => "images",
            Category::Video => "videos",
            Category::Document => "documents",
            Category::Music => "music",
            Category::Archive => "archives",
            Category::Other => "others",
        }
    }

    /// Returns the capitalized label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Image => "Images",
            Category::Video => "Videos",
            Category::Document => "Documents",
            Category::Music => "Music",
            Category::Archive => "Archives",
            Category::Other => "Others",
        }
    }

    /// Finds the category whose folder is called `name`.
    pub fn from_dir_name(name: &str) -> Option<Category> {
        Self::ALL.into_iter().find(|c| c.dir_name() == name)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl serde::Serialize for Category {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.dir_name())
    }
}

/// Extension (with the leading dot) to category.
const EXTENSION_TABLE: &[(&str, Category)] = &[
    (".jpeg", Category::Image),
    (".png", Category::Image),
    (".jpg", Category::Image),
    (".svg", Category::Image),
    (".avi", Category::Video),
    (".mp4", Category::Video),
    (".mov", Category::Video),
    (".mkv", Category::Video),
    (".doc", Category::Document),
    (".docx", Category::Document),
    (".txt", Category::Document),
    (".pdf", Category::Document),
    (".xlsx", Category::Document),
    (".pptx", Category::Document),
    (".mp3", Category::Music),
    (".ogg", Category::Music),
    (".wav", Category::Music),
    (".amr", Category::Music),
    (".zip", Category::Archive),
    (".gz", Category::Archive),
    (".tar", Category::Archive),
];

static EXTENSION_MAP: LazyLock<HashMap<&'static str, Category>> =
    LazyLock::new(|| EXTENSION_TABLE.iter().copied().collect());

/// Extensions the classifier knows about, in table order.
pub fn known_extensions() -> impl Iterator<Item = &'static str> {
    EXTENSION_TABLE.iter().map(|(ext, _)| *ext)
}

/// Returns true if `ext` (with its leading dot, any case) is in the table.
pub fn is_known_extension(ext: &str) -> bool {
    EXTENSION_MAP.contains_key(ext.to_lowercase().as_str())
}

/// Maps an extension such as `.JPG` to its category.
///
/// Matching is exact after lowercasing; an empty or unlisted extension
/// yields [`Category::Other`].
pub fn classify(ext: &str) -> Category {
    EXTENSION_MAP
        .get(ext.to_lowercase().as_str())
        .copied()
        .unwrap_or(Category::Other)
}

/// Returns the extension of a file name including its dot, or `""`.
///
/// Only the last dot counts and leading dots are part of the stem, so
/// `.bashrc` has no extension while `backup.tar.gz` has `.gz`.
///
/// # Examples
///
/// ```
/// use dirsort::file_category::dotted_extension;
///
/// assert_eq!(dotted_extension("report.PDF"), ".PDF");
/// assert_eq!(dotted_extension("backup.tar.gz"), ".gz");
/// assert_eq!(dotted_extension(".bashrc"), "");
/// assert_eq!(dotted_extension("README"), "");
/// ```
pub fn dotted_extension(file_name: &str) -> &str {
    let stem_start = file_name.len() - file_name.trim_start_matches('.').len();
    match file_name.rfind('.') {
        Some(idx) if idx > stem_start => &file_name[idx..],
        _ => "",
    }
}

/// Classifies a file by the extension of its name.
pub fn classify_file_name(file_name: &str) -> Category {
    classify(dotted_extension(file_name))
}
