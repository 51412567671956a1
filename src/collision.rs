//! Deterministic resolution of target-path collisions.
//!
//! Cleaning names can make two entries want the same path ("Note abc.md" and
//! "Note def.md" both clean to "Note.md"). The resolver takes a proposed
//! target path and returns one guaranteed not to exist on disk at call time,
//! applying a fixed tie-break policy:
//!
//! 1. a free path is returned unchanged;
//! 2. a file whose base name matches an existing directory's base name gets
//!    " Overview" appended (a page colliding with its own attachment folder);
//! 3. otherwise a numeric counter (`-1`, `-2`, ...) is appended until free.
//!
//! Before any of the above, a numeric collision suffix already present in the
//! source export is stripped when its base matches the parent directory's
//! name, so a new counter is never compounded on top of an old one. That
//! stripping is a best-effort heuristic inferred from export quirks and is
//! configurable.
//!
//! The resolver never fails; every deviation from the naive cleaned path is
//! recorded for the report.

use crate::constants::OVERVIEW_SUFFIX;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

static STALE_COUNTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*\S) ?-(\d+)$").expect("static counter pattern is valid"));

/// Whether the proposed entry is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    File,
    Directory,
}

/// Why the resolver deviated from the naive cleaned path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionReason {
    /// A pre-existing `-N` suffix from the source export was stripped.
    StaleCounterStripped,
    /// The file's base name matched an existing directory; " Overview" was
    /// appended.
    OverviewSuffix,
    /// A numeric counter was appended to find a free path.
    CounterAppended,
}

/// One deviation from the naive cleaned path, kept purely for reporting.
#[derive(Debug, Clone)]
pub struct CollisionRecord {
    /// The path the caller asked for.
    pub attempted: PathBuf,
    /// The free path the resolver settled on.
    pub resolved: PathBuf,
    /// The last policy step that was applied.
    pub reason: CollisionReason,
}

/// Stateless apart from the filesystem it queries and the record log it
/// appends to.
#[derive(Debug, Default)]
pub struct CollisionResolver {
    strip_stale_counters: bool,
    records: Vec<CollisionRecord>,
}

impl CollisionResolver {
    /// Creates a resolver. `strip_stale_counters` enables the pre-existing
    /// `-N` suffix heuristic.
    pub fn new(strip_stale_counters: bool) -> Self {
        Self {
            strip_stale_counters,
            records: Vec::new(),
        }
    }

    /// Returns a path guaranteed not to exist on disk at call time.
    ///
    /// Mutation stages are sequential, so the existence check and the act of
    /// claiming the path are not racing other resolver callers.
    pub fn resolve(&mut self, target: &Path, kind: TargetKind) -> PathBuf {
        let mut candidate = target.to_path_buf();
        let mut reason = None;

        if self.strip_stale_counters {
            if let Some(stripped) = strip_stale_counter(&candidate, kind) {
                debug!(
                    "Stripping stale counter suffix: '{}' -> '{}'",
                    candidate.display(),
                    stripped.display()
                );
                candidate = stripped;
                reason = Some(CollisionReason::StaleCounterStripped);
            }
        }

        if kind == TargetKind::File {
            if let Some(with_overview) = overview_candidate(&candidate) {
                candidate = with_overview;
                reason = Some(CollisionReason::OverviewSuffix);
            }
        }

        if candidate.exists() {
            // Counter is unbounded; a free path always exists eventually.
            let mut counter = 1u64;
            loop {
                let numbered = append_to_stem(&candidate, &format!("-{counter}"), kind);
                if !numbered.exists() {
                    candidate = numbered;
                    break;
                }
                counter += 1;
            }
            reason = Some(CollisionReason::CounterAppended);
        }

        if let Some(reason) = reason {
            if candidate != target {
                self.records.push(CollisionRecord {
                    attempted: target.to_path_buf(),
                    resolved: candidate.clone(),
                    reason,
                });
            }
        }
        candidate
    }

    /// The deviations recorded so far.
    pub fn records(&self) -> &[CollisionRecord] {
        &self.records
    }

    /// Drains the record log for the report.
    pub fn take_records(&mut self) -> Vec<CollisionRecord> {
        std::mem::take(&mut self.records)
    }
}

/// If the target's stem carries a `-N` suffix whose base matches the parent
/// directory's name, returns the target with that suffix removed.
fn strip_stale_counter(target: &Path, kind: TargetKind) -> Option<PathBuf> {
    let parent = target.parent()?;
    let parent_name = parent.file_name()?.to_string_lossy();
    let (stem, ext) = stem_and_ext(target, kind);

    let caps = STALE_COUNTER.captures(&stem)?;
    let base = caps.get(1)?.as_str();
    if base != parent_name {
        return None;
    }
    Some(rebuild(parent, base, &ext))
}

/// If a directory exists whose name equals the file's stem, returns the
/// target with " Overview" appended to the stem.
fn overview_candidate(target: &Path) -> Option<PathBuf> {
    let parent = target.parent()?;
    let stem = target.file_stem()?.to_string_lossy();

    let occupant_is_dir = target.is_dir();
    let sibling_dir = parent.join(stem.as_ref()).is_dir();
    if !occupant_is_dir && !sibling_dir {
        return None;
    }

    let (stem, ext) = stem_and_ext(target, TargetKind::File);
    Some(rebuild(parent, &format!("{stem}{OVERVIEW_SUFFIX}"), &ext))
}

fn append_to_stem(target: &Path, suffix: &str, kind: TargetKind) -> PathBuf {
    let parent = target.parent().unwrap_or_else(|| Path::new(""));
    let (stem, ext) = stem_and_ext(target, kind);
    rebuild(parent, &format!("{stem}{suffix}"), &ext)
}

/// Splits a target into stem and extension. Directories have no extension.
fn stem_and_ext(target: &Path, kind: TargetKind) -> (String, Option<String>) {
    if kind == TargetKind::Directory {
        return (
            target
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            None,
        );
    }
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = target.extension().map(|e| e.to_string_lossy().into_owned());
    (stem, ext)
}

fn rebuild(parent: &Path, stem: &str, ext: &Option<String>) -> PathBuf {
    match ext {
        Some(ext) => parent.join(format!("{stem}.{ext}")),
        None => parent.join(stem),
    }
}
