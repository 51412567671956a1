//! Individual pipeline stage implementations.
//!
//! Stage-level orchestration never stops a batch because of a single item's
//! failure; failures are pushed onto the run context and surfaced in the
//! final report. Only the rewrite stage is batched; every mutation stage is
//! strictly sequential because the collision resolver's existence check and
//! the rename that claims the path are not atomic across concurrent callers.

use crate::cleaner::NameCleaner;
use crate::collision::TargetKind;
use crate::config::Config;
use crate::core_types::DocumentEntry;
use crate::errors::io_error_with_path;
use crate::frontmatter;
use crate::pipeline::RunContext;
use crate::progress::ProgressReporter;
use crate::report::{ItemFailure, ReferenceMiss, RewriteStats};
use crate::rewrite::{assets, links};
use log::{debug, info};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use walkdir::WalkDir;

/// Outcome of rewriting one document, merged order-independently.
#[derive(Debug, Default)]
struct DocOutcome {
    stats: RewriteStats,
    misses: Vec<ReferenceMiss>,
    failure: Option<ItemFailure>,
}

/// Rewrites every document's content in bounded-concurrency batches.
///
/// Each document's read/transform/write is self-contained, so documents
/// within a batch run in parallel; the batch size is a tuning knob, not a
/// correctness parameter.
pub(super) fn rewrite_content(
    ctx: &mut RunContext,
    config: &Config,
    cleaner: &NameCleaner,
    progress: &dyn ProgressReporter,
) {
    let dir_renames = directory_rename_table(ctx);
    let disambiguation = disambiguation_folders(ctx, cleaner);
    let doc_extension = config.discovery.doc_extension.clone();
    let done = AtomicUsize::new(0);

    progress.set_length(ctx.documents.len() as u64);
    progress.set_message("Rewriting content...".to_string());

    let batch_size = config.execution.batch_size;
    let mut outcomes: Vec<DocOutcome> = Vec::with_capacity(ctx.documents.len());
    let refmap = &ctx.refmap;
    for batch in ctx.documents.chunks_mut(batch_size) {
        let batch_outcomes: Vec<DocOutcome> = batch
            .par_iter_mut()
            .map(|doc| {
                let folder = disambiguation.get(&doc.original_path).map(String::as_str);
                let outcome =
                    rewrite_document(doc, refmap, cleaner, &dir_renames, folder, &doc_extension);
                progress.set_position(done.fetch_add(1, Ordering::Relaxed) as u64 + 1);
                outcome
            })
            .collect();
        outcomes.extend(batch_outcomes);
    }

    for outcome in outcomes {
        ctx.report.stats.merge(outcome.stats);
        ctx.report.misses.extend(outcome.misses);
        ctx.report.failures.extend(outcome.failure);
    }
}

fn rewrite_document(
    doc: &mut DocumentEntry,
    refmap: &crate::refmap::ReferenceMap,
    cleaner: &NameCleaner,
    dir_renames: &HashMap<String, String>,
    disambiguation: Option<&str>,
    doc_extension: &str,
) -> DocOutcome {
    let mut outcome = DocOutcome::default();
    let original = match fs::read_to_string(&doc.tracked_path) {
        Ok(content) => content,
        Err(e) => {
            outcome.failure = Some(ItemFailure {
                path: doc.tracked_path.clone(),
                detail: io_error_with_path(e, &doc.tracked_path).to_string(),
            });
            return outcome;
        }
    };

    let (properties, body) = frontmatter::split_properties(&original);
    doc.properties = properties;
    let with_header = frontmatter::attach(&body, doc, disambiguation);

    let (with_links, link_outcome) =
        links::rewrite_links(&with_header, refmap, cleaner, doc_extension);
    outcome.stats.links_rewritten = link_outcome.rewritten;
    outcome.misses = link_outcome
        .misses
        .into_iter()
        .map(|target| ReferenceMiss {
            document: doc.relative_path.clone(),
            target,
        })
        .collect();

    let doc_dir = doc.original_path.parent().map(PathBuf::from);
    let (final_content, assets_rewritten) =
        assets::rewrite_asset_refs(&with_links, dir_renames, doc_dir.as_deref());
    outcome.stats.assets_rewritten = assets_rewritten;

    if final_content != original {
        if let Err(e) = fs::write(&doc.tracked_path, final_content) {
            outcome.failure = Some(ItemFailure {
                path: doc.tracked_path.clone(),
                detail: io_error_with_path(e, &doc.tracked_path).to_string(),
            });
            return outcome;
        }
    }
    outcome.stats.documents_processed = 1;
    outcome
}

/// Moves each flagged document into its matching original-named directory,
/// applying its cleaned name at the same time. Runs before directory
/// renaming because the match condition depends on original names.
pub(super) fn merge_attachments(ctx: &mut RunContext, progress: &dyn ProgressReporter) {
    progress.set_message("Merging pages into attachment folders...".to_string());
    for doc in ctx.documents.iter_mut() {
        let Some(dir) = doc.merge_into_dir.clone() else {
            continue;
        };
        let target = dir.join(&doc.cleaned_name);
        let resolved = ctx.resolver.resolve(&target, TargetKind::File);
        match fs::rename(&doc.tracked_path, &resolved) {
            Ok(()) => {
                debug!(
                    "Merged '{}' -> '{}'",
                    doc.tracked_path.display(),
                    resolved.display()
                );
                doc.tracked_path = resolved;
                ctx.report.attachments_merged += 1;
            }
            Err(e) => ctx.report.failures.push(ItemFailure {
                path: doc.tracked_path.clone(),
                detail: io_error_with_path(e, &doc.tracked_path).to_string(),
            }),
        }
    }
}

/// Executes the directory list in its fixed deepest-first order.
///
/// Descendants go first, so every directory's original path remains valid
/// until its own turn. Each move is appended to the resolved-path table in
/// execution order for the remap stage.
pub(super) fn rename_directories(ctx: &mut RunContext, progress: &dyn ProgressReporter) {
    progress.set_message("Renaming directories...".to_string());
    let renames: Vec<_> = ctx.plan.directories().to_vec();
    for dir in renames {
        let current_name = dir
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if current_name == dir.target_name {
            continue;
        }
        let parent = match dir.source.parent() {
            Some(p) => p.to_path_buf(),
            None => continue,
        };
        let target = parent.join(&dir.target_name);
        let resolved = ctx.resolver.resolve(&target, TargetKind::Directory);
        match fs::rename(&dir.source, &resolved) {
            Ok(()) => {
                debug!(
                    "Renamed directory '{}' -> '{}'",
                    dir.source.display(),
                    resolved.display()
                );
                ctx.dir_moves.push((dir.source.clone(), resolved));
                ctx.report.directories_renamed += 1;
            }
            Err(e) => ctx.report.failures.push(ItemFailure {
                path: dir.source.clone(),
                detail: io_error_with_path(e, &dir.source).to_string(),
            }),
        }
    }
}

/// Substitutes every renamed ancestor's original prefix with its actual new
/// path, for all matching ancestors in execution order. A file may sit
/// beneath several renamed directories, so a single substitution is not
/// enough.
pub(super) fn remap_paths(ctx: &mut RunContext) {
    for doc in ctx.documents.iter_mut() {
        for (old, new) in &ctx.dir_moves {
            if let Ok(rest) = doc.tracked_path.strip_prefix(old) {
                doc.tracked_path = new.join(rest);
            }
        }
    }
}

/// Renames every document not already relocated by the merge stage, through
/// the collision resolver.
pub(super) fn rename_remaining_files(ctx: &mut RunContext, progress: &dyn ProgressReporter) {
    progress.set_message("Renaming files...".to_string());
    for doc in ctx.documents.iter_mut() {
        if doc.merge_into_dir.is_some() {
            continue;
        }
        let current_name = doc
            .tracked_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if current_name == doc.cleaned_name {
            continue;
        }
        let parent = match doc.tracked_path.parent() {
            Some(p) => p.to_path_buf(),
            None => continue,
        };
        let target = parent.join(&doc.cleaned_name);
        let resolved = ctx.resolver.resolve(&target, TargetKind::File);
        match fs::rename(&doc.tracked_path, &resolved) {
            Ok(()) => {
                doc.tracked_path = resolved;
                ctx.report.files_renamed += 1;
            }
            Err(e) => ctx.report.failures.push(ItemFailure {
                path: doc.tracked_path.clone(),
                detail: io_error_with_path(e, &doc.tracked_path).to_string(),
            }),
        }
    }
}

/// Final sweep: normalizes on-disk asset filenames and patches any reference
/// whose target moved. Idempotent on an already-normalized tree.
pub(super) fn normalize_assets(ctx: &mut RunContext, config: &Config, progress: &dyn ProgressReporter) {
    progress.set_message("Normalizing asset names...".to_string());
    let doc_extension = config.discovery.doc_extension.to_lowercase();
    let mut renamed: HashMap<String, String> = HashMap::new();

    for entry in WalkDir::new(&config.input_root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_document = entry
            .path()
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase() == doc_extension)
            .unwrap_or(false);
        if is_document || name.ends_with(".bak") || name.ends_with('~') {
            continue;
        }
        let normalized = assets::normalize_asset_name(&name);
        if normalized == name {
            continue;
        }
        let parent = match entry.path().parent() {
            Some(p) => p.to_path_buf(),
            None => continue,
        };
        let resolved = ctx
            .resolver
            .resolve(&parent.join(&normalized), TargetKind::File);
        match fs::rename(entry.path(), &resolved) {
            Ok(()) => {
                let final_name = resolved
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or(normalized);
                renamed.insert(name, final_name);
                ctx.report.assets_normalized += 1;
            }
            Err(e) => ctx.report.failures.push(ItemFailure {
                path: entry.path().to_path_buf(),
                detail: io_error_with_path(e, entry.path()).to_string(),
            }),
        }
    }

    if renamed.is_empty() {
        return;
    }
    info!("Patching references to {} normalized assets.", renamed.len());
    for doc in &ctx.documents {
        let content = match fs::read_to_string(&doc.tracked_path) {
            Ok(c) => c,
            Err(e) => {
                ctx.report.failures.push(ItemFailure {
                    path: doc.tracked_path.clone(),
                    detail: io_error_with_path(e, &doc.tracked_path).to_string(),
                });
                continue;
            }
        };
        let (patched, changed) = assets::patch_renamed_assets(&content, &renamed);
        if changed == 0 {
            continue;
        }
        if let Err(e) = fs::write(&doc.tracked_path, patched) {
            ctx.report.failures.push(ItemFailure {
                path: doc.tracked_path.clone(),
                detail: io_error_with_path(e, &doc.tracked_path).to_string(),
            });
        } else {
            ctx.report.stats.assets_rewritten += changed;
        }
    }
}

/// Relocates the finished tree to the output root, when one was given.
pub(super) fn relocate_output(ctx: &mut RunContext, config: &Config) {
    let Some(output_root) = &config.output_root else {
        return;
    };
    if output_root == &config.input_root {
        return;
    }
    if output_root.exists() {
        ctx.report.failures.push(ItemFailure {
            path: output_root.clone(),
            detail: "output root already exists; converted tree left at the input root"
                .to_string(),
        });
        return;
    }
    match fs::rename(&config.input_root, output_root) {
        Ok(()) => info!("Relocated converted tree to '{}'.", output_root.display()),
        Err(e) => ctx.report.failures.push(ItemFailure {
            path: output_root.clone(),
            detail: io_error_with_path(e, &config.input_root).to_string(),
        }),
    }
}

/// Original directory name -> cleaned name, for names that actually change.
pub(super) fn directory_rename_table(ctx: &RunContext) -> HashMap<String, String> {
    ctx.plan
        .directories()
        .iter()
        .filter_map(|d| {
            let original = d.source.file_name()?.to_string_lossy().into_owned();
            if original == d.target_name {
                None
            } else {
                Some((original, d.target_name.clone()))
            }
        })
        .collect()
}

/// Original document path -> cleaned parent-folder name, for duplicate-set
/// members only.
fn disambiguation_folders(ctx: &RunContext, cleaner: &NameCleaner) -> HashMap<PathBuf, String> {
    let mut folders = HashMap::new();
    for paths in ctx.duplicates.values() {
        for path in paths {
            let folder = path
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| cleaner.clean_dir_name(&n.to_string_lossy()))
                .unwrap_or_default();
            folders.insert(path.clone(), folder);
        }
    }
    folders
}
