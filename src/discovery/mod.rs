//! Discovers documents and directories under the export root.
//!
//! The walk feeds a channel from the `ignore` crate's parallel walker;
//! nothing here mutates the tree. Symlinks are skipped entirely, with a
//! visited set of canonical real paths guarding against cycles, and backup
//! artifacts from earlier tooling are excluded.
//! Fatal pre-run conditions (missing or unwritable root) abort before the
//! walk starts.

use crate::cancellation::CancellationToken;
use crate::cleaner::NameCleaner;
use crate::config::Config;
use crate::core_types::{DirectoryEntry, DocumentEntry};
use crate::errors::{Error, Result};
use crossbeam_channel::unbounded;
use ignore::{WalkBuilder, WalkState};
use log::{debug, warn};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Everything discovery found, before any planning.
#[derive(Debug, Default)]
pub struct DiscoveredTree {
    /// Documents, sorted by relative path for deterministic planning.
    pub documents: Vec<DocumentEntry>,
    /// Directories, sorted by path; the planner re-orders them deepest-first.
    pub directories: Vec<DirectoryEntry>,
}

enum Found {
    Doc(DocumentEntry),
    Dir(DirectoryEntry),
}

/// Enumerates all documents and directories under the configured root.
///
/// # Errors
/// Returns [`Error::RootMissing`] / [`Error::RootNotWritable`] for the fatal
/// pre-run conditions, and [`Error::Interrupted`] if the token is cancelled
/// during the walk. Unreadable individual entries are logged and skipped.
pub fn discover(config: &Config, token: &CancellationToken) -> Result<DiscoveredTree> {
    let root = &config.input_root;
    check_root(root)?;

    if token.is_cancelled() {
        return Err(Error::Interrupted);
    }

    let walker = build_walker(config);
    let (tx, rx) = unbounded();
    let cleaner = config.cleaner();
    let doc_extension = config.discovery.doc_extension.to_lowercase();
    let visited: Arc<Mutex<HashSet<PathBuf>>> = Arc::new(Mutex::new(HashSet::new()));
    let root_clone = root.clone();
    let token_clone = token.clone();

    walker.run(move || {
        let tx = tx.clone();
        let token = token_clone.clone();
        let cleaner = cleaner.clone();
        let doc_extension = doc_extension.clone();
        let visited = visited.clone();
        let root = root_clone.clone();

        Box::new(move |entry_result| {
            if token.is_cancelled() {
                return WalkState::Quit;
            }
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Walker error: {}", e);
                    return WalkState::Continue;
                }
            };
            if entry.depth() == 0 {
                return WalkState::Continue;
            }
            // Symlinks are never followed; skipping the entry also prunes
            // the subtree when it is a directory.
            if entry.path_is_symlink() {
                debug!("Skipping symlink: {}", entry.path().display());
                return WalkState::Skip;
            }

            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                match fs::canonicalize(entry.path()) {
                    Ok(real) => {
                        let mut seen = visited.lock().expect("visited set lock poisoned");
                        if !seen.insert(real) {
                            debug!("Already visited, pruning: {}", entry.path().display());
                            return WalkState::Skip;
                        }
                    }
                    Err(e) => {
                        warn!(
                            "Cannot canonicalize '{}', pruning: {}",
                            entry.path().display(),
                            e
                        );
                        return WalkState::Skip;
                    }
                }
            }

            match classify(entry.path(), is_dir, &root, &cleaner, &doc_extension) {
                Some(found) => {
                    if tx.send(found).is_err() {
                        return WalkState::Quit;
                    }
                }
                None => { /* not a document or directory of interest */ }
            }
            WalkState::Continue
        })
    });

    if token.is_cancelled() {
        return Err(Error::Interrupted);
    }

    let mut tree = DiscoveredTree::default();
    for found in rx {
        match found {
            Found::Doc(doc) => tree.documents.push(doc),
            Found::Dir(dir) => tree.directories.push(dir),
        }
    }
    tree.documents.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    tree.directories.sort_by(|a, b| a.original_path.cmp(&b.original_path));

    debug!(
        "Discovery complete. Documents: {}, directories: {}.",
        tree.documents.len(),
        tree.directories.len()
    );
    Ok(tree)
}

fn check_root(root: &Path) -> Result<()> {
    let metadata = match fs::metadata(root) {
        Ok(md) if md.is_dir() => md,
        _ => return Err(Error::RootMissing(root.display().to_string())),
    };
    if metadata.permissions().readonly() {
        return Err(Error::RootNotWritable(root.display().to_string()));
    }
    // Permission bits miss a root owned by another user; only an actual
    // write settles whether renames under it can succeed.
    let probe = root.join(format!(".vaultport-probe-{}", std::process::id()));
    match fs::OpenOptions::new().write(true).create_new(true).open(&probe) {
        Ok(_) => {
            let _ = fs::remove_file(&probe);
            Ok(())
        }
        Err(_) => Err(Error::RootNotWritable(root.display().to_string())),
    }
}

/// Configures the parallel walker: no VCS filtering (an export is not a
/// repository), no symlink following, custom ignore globs applied relative to
/// the root.
fn build_walker(config: &Config) -> ignore::WalkParallel {
    let mut builder = WalkBuilder::new(&config.input_root);
    builder
        .standard_filters(false)
        .follow_links(false)
        .hidden(false);

    if let Some(patterns) = &config.discovery.ignore_patterns {
        let globs: Vec<glob::Pattern> = patterns
            .iter()
            .filter_map(|p| match glob::Pattern::new(p) {
                Ok(g) => Some(g),
                Err(e) => {
                    warn!("Invalid ignore glob pattern '{}': {}", p, e);
                    None
                }
            })
            .collect();
        if !globs.is_empty() {
            let root = config.input_root.clone();
            builder.filter_entry(move |entry| {
                let path = entry.path();
                let relative = path.strip_prefix(&root).unwrap_or(path);
                !globs.iter().any(|g| g.matches_path(relative))
            });
        }
    }

    builder.build_parallel()
}

fn classify(
    path: &Path,
    is_dir: bool,
    root: &Path,
    cleaner: &NameCleaner,
    doc_extension: &str,
) -> Option<Found> {
    let name = path.file_name()?.to_string_lossy().into_owned();

    if is_dir {
        return Some(Found::Dir(DirectoryEntry {
            original_path: path.to_path_buf(),
            cleaned_name: cleaner.clean_dir_name(&name),
            depth: path.components().count(),
        }));
    }

    // Backup artifacts from earlier runs or editors are not documents.
    if name.ends_with(".bak") || name.ends_with('~') {
        return None;
    }
    let extension = path.extension()?.to_string_lossy().to_lowercase();
    if extension != doc_extension {
        return None;
    }

    let relative_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();
    let cleaned_name = cleaner.clean_name(&name);
    let tags: Vec<String> = relative_path
        .parent()
        .map(|p| {
            p.components()
                .map(|c| cleaner.clean_dir_name(&c.as_os_str().to_string_lossy()))
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();
    let aliases = if cleaned_name != name {
        vec![name.clone()]
    } else {
        Vec::new()
    };

    Some(Found::Doc(DocumentEntry {
        original_path: path.to_path_buf(),
        relative_path,
        identifier: cleaner.extract_identifier(&name),
        tags,
        aliases,
        properties: Vec::new(),
        tracked_path: path.to_path_buf(),
        cleaned_name,
        merge_into_dir: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const ID: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_discover_documents_and_directories() -> Result<()> {
        let dir = tempdir().unwrap();
        let sub = dir.path().join(format!("Projects {ID}"));
        fs::create_dir(&sub).unwrap();
        fs::write(dir.path().join(format!("Home {ID}.md")), "# Home").unwrap();
        fs::write(sub.join(format!("Task {ID}.md")), "# Task").unwrap();
        fs::write(sub.join("image.png"), b"png").unwrap();

        let config = Config::new_for_test(dir.path());
        let tree = discover(&config, &CancellationToken::new())?;

        assert_eq!(tree.documents.len(), 2);
        assert_eq!(tree.directories.len(), 1);
        assert_eq!(tree.directories[0].cleaned_name, "Projects");
        assert_eq!(tree.documents[0].cleaned_name, "Home.md");
        Ok(())
    }

    #[test]
    fn test_folder_tags_and_aliases() -> Result<()> {
        let dir = tempdir().unwrap();
        let sub = dir.path().join(format!("Q3 Planning {ID}"));
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join(format!("Note {ID}.md")), "# Note").unwrap();

        let config = Config::new_for_test(dir.path());
        let tree = discover(&config, &CancellationToken::new())?;

        let doc = &tree.documents[0];
        assert_eq!(doc.tags, vec!["Q3 Planning".to_string()]);
        assert_eq!(doc.aliases, vec![format!("Note {ID}.md")]);
        assert_eq!(doc.identifier.as_deref(), Some(ID));
        Ok(())
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let config = Config::new_for_test("/definitely/not/here");
        let result = discover(&config, &CancellationToken::new());
        assert!(matches!(result, Err(Error::RootMissing(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_unwritable_root_is_fatal() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("Doc.md"), "# Doc").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        let config = Config::new_for_test(&locked);
        let result = discover(&config, &CancellationToken::new());

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(matches!(result, Err(Error::RootNotWritable(_))));
    }

    #[test]
    fn test_backup_artifacts_and_other_files_excluded() -> Result<()> {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Note.md.bak"), "x").unwrap();
        fs::write(dir.path().join("Note.md~"), "x").unwrap();
        fs::write(dir.path().join("data.csv"), "x").unwrap();
        fs::write(dir.path().join("Real.md"), "# Real").unwrap();

        let config = Config::new_for_test(dir.path());
        let tree = discover(&config, &CancellationToken::new())?;
        assert_eq!(tree.documents.len(), 1);
        assert_eq!(tree.documents[0].cleaned_name, "Real.md");
        Ok(())
    }

    #[test]
    fn test_ignore_patterns_prune_entries() -> Result<()> {
        let dir = tempdir().unwrap();
        let junk = dir.path().join("junk");
        fs::create_dir(&junk).unwrap();
        fs::write(junk.join("Skipped.md"), "x").unwrap();
        fs::write(dir.path().join("Kept.md"), "x").unwrap();

        let mut config = Config::new_for_test(dir.path());
        config.discovery.ignore_patterns = Some(vec!["junk".to_string()]);
        let tree = discover(&config, &CancellationToken::new())?;

        assert_eq!(tree.documents.len(), 1);
        assert_eq!(tree.documents[0].cleaned_name, "Kept.md");
        assert!(tree.directories.is_empty());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_skipped() -> Result<()> {
        let dir = tempdir().unwrap();
        let real = dir.path().join("real");
        fs::create_dir(&real).unwrap();
        fs::write(real.join("Doc.md"), "# Doc").unwrap();
        std::os::unix::fs::symlink(&real, dir.path().join("loop")).unwrap();

        let config = Config::new_for_test(dir.path());
        let tree = discover(&config, &CancellationToken::new())?;

        // The document is found once, through the real directory only.
        assert_eq!(tree.documents.len(), 1);
        assert_eq!(tree.directories.len(), 1);
        Ok(())
    }

    #[test]
    fn test_cancelled_token_interrupts() {
        let dir = tempdir().unwrap();
        let config = Config::new_for_test(dir.path());
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            discover(&config, &token),
            Err(Error::Interrupted)
        ));
    }
}
