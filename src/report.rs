//! End-of-run report: what each category folder holds and which extensions
//! the classifier does not know.

use crate::file_category::{Category, dotted_extension, is_known_extension, known_extensions};
use crate::output::OutputFormatter;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Entries found under one category folder.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryListing {
    pub category: Category,
    /// Every file and folder below `<root>/<category>`, sorted.
    pub entries: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub categories: Vec<CategoryListing>,
    pub known_extensions: BTreeSet<String>,
    /// Lowercased extensions present under the root that the classifier
    /// would route to `others`.
    pub unknown_extensions: BTreeSet<String>,
}

impl Report {
    /// Reads the tree under `root`. Unreadable entries are ignored.
    pub fn build(root: &Path) -> Self {
        let categories = Category::ALL
            .iter()
            .map(|&category| CategoryListing {
                category,
                entries: list_recursive(&root.join(category.dir_name())),
            })
            .collect();

        Self {
            categories,
            known_extensions: known_extensions().map(str::to_string).collect(),
            unknown_extensions: unknown_extensions(root),
        }
    }

    pub fn listing(&self, category: Category) -> &[PathBuf] {
        self.categories
            .iter()
            .find(|l| l.category == category)
            .map(|l| l.entries.as_slice())
            .unwrap_or_default()
    }

    pub fn print(&self) {
        OutputFormatter::header("Files in each category:");
        for listing in &self.categories {
            OutputFormatter::category_listing(listing.category.label(), &listing.entries);
        }

        OutputFormatter::header("Extensions:");
        OutputFormatter::plain(&format!(
            "Known extensions: {}",
            join(&self.known_extensions)
        ));
        if self.unknown_extensions.is_empty() {
            OutputFormatter::plain("Unknown extensions: none");
        } else {
            OutputFormatter::warning(&format!(
                "Unknown extensions: {}",
                join(&self.unknown_extensions)
            ));
        }
    }
}

fn join(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

fn list_recursive(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let mut entries: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .flatten()
        .map(walkdir::DirEntry::into_path)
        .collect();
    entries.sort();
    entries
}

/// Extensions of files anywhere under `root` missing from the classifier
/// table. Files without an extension are not counted.
pub fn unknown_extensions(root: &Path) -> BTreeSet<String> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .flatten()
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy();
            let ext = dotted_extension(&name).to_lowercase();
            (!ext.is_empty() && !is_known_extension(&ext)).then_some(ext)
        })
        .collect()
}
