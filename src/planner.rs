//! Produces the immutable rename plan for a run.
//!
//! The planner orders directory renames deepest-first so that renaming a
//! parent never invalidates a child's still-pending original path. It also
//! flags attachment-folder merges (a directory whose original name equals a
//! document's original base name) and computes the duplicate set of cleaned
//! names shared across folders. File renames need no list of their own: each
//! document entry already carries its cleaned target name.
//!
//! The plan is never mutated after construction; what collisions actually
//! resolved to is tracked separately by the pipeline's resolved-path table.

use crate::core_types::{DirectoryEntry, DocumentEntry};
use log::debug;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

/// One intended directory rename. The final path may differ once the
/// collision resolver has run.
#[derive(Debug, Clone)]
pub struct DirRename {
    /// Absolute path of the directory at planning time.
    pub source: PathBuf,
    /// The cleaned directory name.
    pub target_name: String,
    /// Path depth (segment count), used for ordering.
    pub depth: usize,
}

/// The ordered, read-only directory rename list for a run.
#[derive(Debug, Default)]
pub struct RenamePlan {
    directories: Vec<DirRename>,
}

impl RenamePlan {
    /// Intended directory renames, deepest path first. For any two
    /// directories where one is an ancestor of the other, the descendant
    /// appears strictly earlier.
    pub fn directories(&self) -> &[DirRename] {
        &self.directories
    }
}

/// Builds the rename plan and flags attachment-folder merges on the
/// documents.
///
/// The merge check runs on *original* names (both sides still carrying their
/// identifier suffix) and must therefore happen before any rename: a page
/// whose original base name matches a sibling directory's original name is an
/// export "page with attachments" and is moved inside that directory instead
/// of being renamed in place.
pub fn build_plan(
    documents: &mut [DocumentEntry],
    directories: &[DirectoryEntry],
) -> RenamePlan {
    let dir_paths: HashSet<&PathBuf> = directories.iter().map(|d| &d.original_path).collect();

    for doc in documents.iter_mut() {
        if let (Some(parent), Some(stem)) =
            (doc.original_path.parent(), doc.original_path.file_stem())
        {
            let candidate = parent.join(stem);
            if dir_paths.contains(&candidate) {
                debug!(
                    "Flagging attachment-folder merge: '{}' -> '{}'",
                    doc.original_path.display(),
                    candidate.display()
                );
                doc.merge_into_dir = Some(candidate);
            }
        }
    }

    let mut dirs: Vec<DirRename> = directories
        .iter()
        .map(|d| DirRename {
            source: d.original_path.clone(),
            target_name: d.cleaned_name.clone(),
            depth: d.depth,
        })
        .collect();
    // Stable sort: deepest first, discovery order breaking ties.
    dirs.sort_by(|a, b| b.depth.cmp(&a.depth));

    debug!("Plan built: {} directory renames.", dirs.len());
    RenamePlan { directories: dirs }
}

/// Cleaned-name -> original paths, for names that two or more documents in
/// different folders clean to.
///
/// This never forces a rename; it only flags that folder-qualified
/// disambiguation metadata must be attached to each member.
pub fn duplicate_sets(documents: &[DocumentEntry]) -> BTreeMap<String, Vec<PathBuf>> {
    let mut by_cleaned: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for doc in documents {
        by_cleaned
            .entry(doc.cleaned_name.clone())
            .or_default()
            .push(doc.original_path.clone());
    }
    by_cleaned.retain(|_, paths| {
        if paths.len() < 2 {
            return false;
        }
        let parents: HashSet<_> = paths.iter().filter_map(|p| p.parent()).collect();
        parents.len() > 1
    });
    by_cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "0123456789abcdef0123456789abcdef";
    const ID2: &str = "fedcba9876543210fedcba9876543210";

    fn doc(path: &str, cleaned: &str) -> DocumentEntry {
        DocumentEntry {
            original_path: PathBuf::from(path),
            relative_path: PathBuf::from(path).file_name().map(PathBuf::from).unwrap(),
            cleaned_name: cleaned.to_string(),
            tracked_path: PathBuf::from(path),
            ..Default::default()
        }
    }

    fn dir(path: &str, cleaned: &str) -> DirectoryEntry {
        DirectoryEntry {
            original_path: PathBuf::from(path),
            cleaned_name: cleaned.to_string(),
            depth: PathBuf::from(path).components().count(),
        }
    }

    #[test]
    fn test_directories_ordered_deepest_first() {
        let dirs = vec![
            dir("/export/a", "a"),
            dir("/export/a/b/c", "c"),
            dir("/export/a/b", "b"),
        ];
        let plan = build_plan(&mut [], &dirs);
        let order: Vec<_> = plan.directories().iter().map(|d| d.depth).collect();
        assert_eq!(order, vec![5, 4, 3]);
    }

    #[test]
    fn test_descendant_strictly_before_ancestor() {
        let dirs = vec![dir("/export/a", "a"), dir("/export/a/b", "b")];
        let plan = build_plan(&mut [], &dirs);
        let sources: Vec<_> = plan
            .directories()
            .iter()
            .map(|d| d.source.clone())
            .collect();
        let ancestor = sources.iter().position(|p| p.ends_with("a")).unwrap();
        let descendant = sources.iter().position(|p| p.ends_with("b")).unwrap();
        assert!(descendant < ancestor);
    }

    #[test]
    fn test_depth_ties_keep_discovery_order() {
        let dirs = vec![
            dir("/export/x/one", "one"),
            dir("/export/x/two", "two"),
            dir("/export/x/three", "three"),
        ];
        let plan = build_plan(&mut [], &dirs);
        let names: Vec<_> = plan
            .directories()
            .iter()
            .map(|d| d.target_name.clone())
            .collect();
        assert_eq!(names, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_attachment_merge_flagged_on_original_names() {
        let dir_path = format!("/export/Projects {ID}");
        let dirs = vec![dir(&dir_path, "Projects")];
        let mut docs = vec![doc(&format!("/export/Projects {ID}.md"), "Projects.md")];

        build_plan(&mut docs, &dirs);
        assert_eq!(docs[0].merge_into_dir, Some(PathBuf::from(dir_path)));
    }

    #[test]
    fn test_no_merge_when_identifiers_differ() {
        let dirs = vec![dir(&format!("/export/Projects {ID2}"), "Projects")];
        let mut docs = vec![doc(&format!("/export/Projects {ID}.md"), "Projects.md")];

        build_plan(&mut docs, &dirs);
        assert!(docs[0].merge_into_dir.is_none());
    }

    #[test]
    fn test_duplicate_sets_cross_folder_only() {
        let docs = vec![
            doc(&format!("/export/Folder1/Notes {ID}.md"), "Notes.md"),
            doc(&format!("/export/Folder2/Notes {ID2}.md"), "Notes.md"),
            doc(&format!("/export/Folder1/Other {ID}.md"), "Other.md"),
        ];
        let dupes = duplicate_sets(&docs);
        assert_eq!(dupes.len(), 1);
        assert_eq!(dupes["Notes.md"].len(), 2);
    }

    #[test]
    fn test_same_folder_collisions_are_not_duplicate_sets() {
        // Physical same-folder collisions are the resolver's job, not the
        // duplicate set's.
        let docs = vec![
            doc(&format!("/export/F/Notes {ID}.md"), "Notes.md"),
            doc(&format!("/export/F/Notes {ID2}.md"), "Notes.md"),
        ];
        assert!(duplicate_sets(&docs).is_empty());
    }
}
