//! Defines core data structures used throughout the conversion pipeline.
//!
//! `DocumentEntry` and `DirectoryEntry` are created during discovery and
//! threaded through planning and execution. Per-stage results land in the
//! `Option` fields, which start out `None` and are filled in as stages run.

use std::path::PathBuf;

/// A discovered export document (one page of the source export).
///
/// Created during discovery; `tracked_path` is mutated in place as rename
/// stages resolve where the document currently lives on disk.
///
/// # Examples
///
/// ```
/// use vaultport::core_types::DocumentEntry;
/// use std::path::PathBuf;
///
/// let doc = DocumentEntry {
///     original_path: PathBuf::from("/export/Projects abc/Page 0123.md"),
///     relative_path: PathBuf::from("Projects abc/Page 0123.md"),
///     cleaned_name: "Page.md".to_string(),
///     identifier: Some("0123".to_string()),
///     ..Default::default()
/// };
/// assert_eq!(doc.cleaned_name, "Page.md");
/// ```
#[derive(Debug, Clone, Default)]
pub struct DocumentEntry {
    /// The absolute path the document had at discovery time.
    pub original_path: PathBuf,
    /// The path relative to the export root, used for display and for
    /// deriving folder tags.
    pub relative_path: PathBuf,
    /// The filename after identifier stripping and sanitization, including
    /// the extension.
    pub cleaned_name: String,
    /// The identifier token extracted from the original name, if any.
    pub identifier: Option<String>,
    /// Tags derived from the folder segments of `relative_path` (cleaned).
    pub tags: Vec<String>,
    /// The original filename, kept as an alias when it differs from
    /// `cleaned_name`.
    pub aliases: Vec<String>,
    /// Property lines lifted from the top of the document body during the
    /// rewrite stage (e.g. "Created" / "Status" lines the export emits).
    pub properties: Vec<(String, String)>,
    /// Where the document currently lives on disk. Starts equal to
    /// `original_path`; updated by the merge, remap, and rename stages.
    pub tracked_path: PathBuf,
    /// Set when the planner flags this document for an attachment-folder
    /// merge: the directory sharing its original base name.
    pub merge_into_dir: Option<PathBuf>,
}

impl DocumentEntry {
    /// The original filename (final path component) of the document.
    pub fn original_name(&self) -> String {
        self.original_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A discovered directory under the export root.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    /// The absolute path the directory had at discovery time.
    pub original_path: PathBuf,
    /// The directory name after identifier stripping and sanitization.
    pub cleaned_name: String,
    /// Segment count of `original_path`, used for deepest-first ordering.
    pub depth: usize,
}

impl DirectoryEntry {
    /// The original directory name (final path component).
    pub fn original_name(&self) -> String {
        self.original_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_original_name_is_final_component() {
        let doc = DocumentEntry {
            original_path: PathBuf::from("/export/Folder abc/Note 0123.md"),
            ..Default::default()
        };
        assert_eq!(doc.original_name(), "Note 0123.md");
    }

    #[test]
    fn test_directory_entry_depth_is_caller_provided() {
        let dir = DirectoryEntry {
            original_path: PathBuf::from("/export/a/b"),
            cleaned_name: "b".to_string(),
            depth: 4,
        };
        assert_eq!(dir.depth, 4);
        assert_eq!(dir.original_name(), "b");
    }
}
