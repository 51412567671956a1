//! The conversion pipeline: a fixed sequence of stages over the export tree.
//!
//! Discovery and planning are read-only. A dry run stops after planning and
//! reports planned counts, with rewrite counts estimated from a bounded
//! sample of documents. A real run passes a confirmation gate and then
//! executes the mutation stages in a fixed order; that order is a
//! correctness requirement, not a convenience (merges need original names,
//! directory renames invalidate tracked paths, the remap repairs them before
//! file renames run).

mod stages;

use crate::cancellation::CancellationToken;
use crate::cleaner::NameCleaner;
use crate::collision::CollisionResolver;
use crate::config::Config;
use crate::constants::DRY_RUN_SAMPLE_LIMIT;
use crate::core_types::DocumentEntry;
use crate::discovery;
use crate::errors::{io_error_with_path, Error, Result};
use crate::planner::{build_plan, duplicate_sets, RenamePlan};
use crate::progress::ProgressReporter;
use crate::refmap::ReferenceMap;
use crate::report::{ItemFailure, RunReport};
use crate::rewrite::{assets, links};
use log::{debug, info};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

/// The mutation stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Rewrite document content (frontmatter, links, asset references).
    RewriteContent,
    /// Move "page with attachments" documents into their matching folders.
    MergeAttachments,
    /// Rename directories, deepest first.
    RenameDirectories,
    /// Repair tracked document paths after directory renames.
    RemapPaths,
    /// Rename the documents not already moved by the merge stage.
    RenameRemainingFiles,
    /// Normalize asset filenames and patch references to them.
    NormalizeAssets,
}

/// Execution order. Content is rewritten while every tracked path is still
/// original; merges run before directory renames because the match condition
/// uses original names on both sides; the remap runs before file renames so
/// the rename stage operates on valid paths.
pub const STAGES: [Stage; 6] = [
    Stage::RewriteContent,
    Stage::MergeAttachments,
    Stage::RenameDirectories,
    Stage::RemapPaths,
    Stage::RenameRemainingFiles,
    Stage::NormalizeAssets,
];

impl Stage {
    /// Human-readable stage name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::RewriteContent => "rewrite content",
            Stage::MergeAttachments => "merge attachments",
            Stage::RenameDirectories => "rename directories",
            Stage::RemapPaths => "remap paths",
            Stage::RenameRemainingFiles => "rename files",
            Stage::NormalizeAssets => "normalize assets",
        }
    }

    /// Whether items within the stage may be processed concurrently.
    ///
    /// Rename stages are sequential: the collision resolver's free-path
    /// check and the rename that claims the path must not interleave.
    pub fn is_parallel_safe(&self) -> bool {
        matches!(self, Stage::RewriteContent | Stage::RemapPaths)
    }
}

/// Asks the user (or a policy) whether the run may mutate the tree.
pub trait Confirmer {
    /// Returns `true` to proceed.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Interactive y/N prompt on stdin. Anything but an explicit yes declines.
pub struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{} [y/N]: ", prompt);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            return false;
        }
        matches!(input.trim(), "y" | "Y" | "yes" | "Yes")
    }
}

/// Fixed-answer confirmer for scripted runs and tests.
pub struct AutoConfirm(pub bool);

impl Confirmer for AutoConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

/// Mutable state threaded through the stages.
pub(crate) struct RunContext {
    pub(crate) documents: Vec<DocumentEntry>,
    pub(crate) refmap: ReferenceMap,
    pub(crate) plan: RenamePlan,
    pub(crate) duplicates: BTreeMap<String, Vec<PathBuf>>,
    pub(crate) resolver: CollisionResolver,
    /// Directory moves as executed: (original path, actual new path), in
    /// execution order. The remap stage replays these against tracked paths.
    pub(crate) dir_moves: Vec<(PathBuf, PathBuf)>,
    pub(crate) report: RunReport,
}

/// Runs the full conversion pipeline and returns the report.
///
/// # Errors
/// Returns [`Error::NoDocumentsFound`] when the root holds no documents,
/// [`Error::Interrupted`] when the confirmation is declined or the token is
/// cancelled before mutation begins, and discovery's fatal errors as-is.
/// Per-item failures inside mutation stages do not abort the run; they land
/// in the report.
pub fn run(
    config: &Config,
    token: &CancellationToken,
    progress: &dyn ProgressReporter,
    confirmer: &dyn Confirmer,
) -> Result<RunReport> {
    let tree = discovery::discover(config, token)?;
    if tree.documents.is_empty() {
        return Err(Error::NoDocumentsFound);
    }

    let mut documents = tree.documents;
    // The map is built from pre-mutation names so every link written in the
    // export still resolves during the rewrite stage.
    let refmap = ReferenceMap::build(&documents);
    let plan = build_plan(&mut documents, &tree.directories);
    let duplicates = duplicate_sets(&documents);
    let cleaner = config.cleaner();

    let mut ctx = RunContext {
        documents,
        refmap,
        plan,
        duplicates,
        resolver: CollisionResolver::new(config.execution.strip_stale_counters),
        dir_moves: Vec::new(),
        report: RunReport::default(),
    };
    ctx.report.duplicates = ctx.duplicates.clone();

    let (planned_files, planned_dirs, planned_merges) = planned_counts(&ctx);

    if config.dry_run {
        info!("Dry run: previewing without modifying anything.");
        preview(&mut ctx, config, &cleaner);
        ctx.report.files_renamed = planned_files;
        ctx.report.directories_renamed = planned_dirs;
        ctx.report.attachments_merged = planned_merges;
        progress.finish();
        return Ok(ctx.report);
    }

    if !config.assume_yes {
        let prompt = format!(
            "Convert '{}': rewrite {} documents, rename {} files and {} directories, merge {} pages into attachment folders. Proceed?",
            config.input_root.display(),
            ctx.documents.len(),
            planned_files,
            planned_dirs,
            planned_merges,
        );
        if !confirmer.confirm(&prompt) {
            info!("Declined at the confirmation prompt; nothing was modified.");
            return Err(Error::Interrupted);
        }
    }
    // Last cancellation point. Once mutation stages begin, the run proceeds
    // to completion, collecting per-item failures instead of aborting.
    if token.is_cancelled() {
        return Err(Error::Interrupted);
    }

    for stage in STAGES {
        debug!("Entering stage: {}", stage.name());
        match stage {
            Stage::RewriteContent => stages::rewrite_content(&mut ctx, config, &cleaner, progress),
            Stage::MergeAttachments => stages::merge_attachments(&mut ctx, progress),
            Stage::RenameDirectories => stages::rename_directories(&mut ctx, progress),
            Stage::RemapPaths => stages::remap_paths(&mut ctx),
            Stage::RenameRemainingFiles => stages::rename_remaining_files(&mut ctx, progress),
            Stage::NormalizeAssets => stages::normalize_assets(&mut ctx, config, progress),
        }
    }
    stages::relocate_output(&mut ctx, config);

    ctx.report.collisions = ctx.resolver.take_records();
    progress.finish();
    info!(
        "Conversion complete: {} documents, {} files renamed, {} directories renamed.",
        ctx.report.stats.documents_processed,
        ctx.report.files_renamed,
        ctx.report.directories_renamed,
    );
    Ok(ctx.report)
}

/// Planned mutation counts, shared by the dry-run report and the
/// confirmation prompt: file renames exclude merged documents, directory
/// renames exclude names the cleaner leaves unchanged.
fn planned_counts(ctx: &RunContext) -> (usize, usize, usize) {
    let merges = ctx
        .documents
        .iter()
        .filter(|d| d.merge_into_dir.is_some())
        .count();
    let files = ctx
        .documents
        .iter()
        .filter(|d| d.merge_into_dir.is_none() && d.cleaned_name != d.original_name())
        .count();
    let dirs = ctx
        .plan
        .directories()
        .iter()
        .filter(|d| {
            d.source
                .file_name()
                .map(|n| n.to_string_lossy() != d.target_name.as_str())
                .unwrap_or(false)
        })
        .count();
    (files, dirs, merges)
}

/// Fills the report with rewrite counts extrapolated from a bounded sample
/// of documents, transformed in memory only.
fn preview(ctx: &mut RunContext, config: &Config, cleaner: &NameCleaner) {
    let total = ctx.documents.len();
    let sample_len = total.min(DRY_RUN_SAMPLE_LIMIT);
    let dir_renames = stages::directory_rename_table(ctx);
    let mut sampled_links = 0usize;
    let mut sampled_assets = 0usize;

    for doc in ctx.documents.iter().take(sample_len) {
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
        let (with_links, outcome) = links::rewrite_links(
            &content,
            &ctx.refmap,
            cleaner,
            &config.discovery.doc_extension,
        );
        sampled_links += outcome.rewritten;
        for target in outcome.misses {
            ctx.report.misses.push(crate::report::ReferenceMiss {
                document: doc.relative_path.clone(),
                target,
            });
        }
        let doc_dir = doc.original_path.parent().map(PathBuf::from);
        let (_, asset_count) =
            assets::rewrite_asset_refs(&with_links, &dir_renames, doc_dir.as_deref());
        sampled_assets += asset_count;
    }

    ctx.report.dry_run = true;
    ctx.report.estimated = sample_len < total;
    ctx.report.stats.documents_processed = total;
    if sample_len > 0 {
        ctx.report.stats.links_rewritten = sampled_links * total / sample_len;
        ctx.report.stats.assets_rewritten = sampled_assets * total / sample_len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        let pos = |s: Stage| STAGES.iter().position(|x| *x == s).unwrap();
        assert!(pos(Stage::RewriteContent) < pos(Stage::MergeAttachments));
        assert!(pos(Stage::MergeAttachments) < pos(Stage::RenameDirectories));
        assert!(pos(Stage::RenameDirectories) < pos(Stage::RemapPaths));
        assert!(pos(Stage::RemapPaths) < pos(Stage::RenameRemainingFiles));
        assert!(pos(Stage::RenameRemainingFiles) < pos(Stage::NormalizeAssets));
    }

    #[test]
    fn test_rename_stages_are_sequential() {
        assert!(Stage::RewriteContent.is_parallel_safe());
        assert!(!Stage::MergeAttachments.is_parallel_safe());
        assert!(!Stage::RenameDirectories.is_parallel_safe());
        assert!(!Stage::RenameRemainingFiles.is_parallel_safe());
        assert!(!Stage::NormalizeAssets.is_parallel_safe());
    }

    #[test]
    fn test_auto_confirm() {
        assert!(AutoConfirm(true).confirm("anything"));
        assert!(!AutoConfirm(false).confirm("anything"));
    }
}
