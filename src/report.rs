//! The run report: what happened, what resolved itself, what needs a human.
//!
//! A dry run produces the same report shape as a real run, with rewrite
//! counts marked as estimates and zero filesystem mutation behind them. The
//! report separates "resolved automatically" (collisions, which require no
//! user action) from "needs attention" (reference misses and per-item
//! failures, which may).

use crate::collision::{CollisionReason, CollisionRecord};
use crate::constants::REPORT_SEPARATOR;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;

/// Append-only counters combined across rewrite batches. Combination is
/// associative, so batch completion order does not matter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// Documents whose content passed through the rewrite stage.
    pub documents_processed: usize,
    /// Inter-document links rewritten.
    pub links_rewritten: usize,
    /// Embedded-asset references rewritten.
    pub assets_rewritten: usize,
}

impl RewriteStats {
    /// Folds another batch's counters into this one.
    pub fn merge(&mut self, other: RewriteStats) {
        self.documents_processed += other.documents_processed;
        self.links_rewritten += other.links_rewritten;
        self.assets_rewritten += other.assets_rewritten;
    }
}

/// A link whose target was not found in the reference map. The link was left
/// unmodified; this is a warning, not an error.
#[derive(Debug, Clone)]
pub struct ReferenceMiss {
    /// The document containing the link, relative to the export root.
    pub document: PathBuf,
    /// The link target as written.
    pub target: String,
}

/// A single item that failed during a mutation stage. The run continued past
/// it.
#[derive(Debug, Clone)]
pub struct ItemFailure {
    /// The offending path.
    pub path: PathBuf,
    /// What went wrong.
    pub detail: String,
}

/// Everything a run (dry or real) reports back.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Whether this was a preview-only run.
    pub dry_run: bool,
    /// Whether rewrite counts are extrapolated from a bounded sample.
    pub estimated: bool,
    /// Rewrite-stage counters.
    pub stats: RewriteStats,
    /// Files renamed (planned count for a dry run).
    pub files_renamed: usize,
    /// Directories renamed (planned count for a dry run).
    pub directories_renamed: usize,
    /// Documents moved into their attachment folders.
    pub attachments_merged: usize,
    /// Asset files renamed by the normalization sweep.
    pub assets_normalized: usize,
    /// Deviations the collision resolver recorded.
    pub collisions: Vec<CollisionRecord>,
    /// Link targets not found in the reference map.
    pub misses: Vec<ReferenceMiss>,
    /// Per-item failures collected across mutation stages.
    pub failures: Vec<ItemFailure>,
    /// Cleaned-name -> original paths for names shared across folders.
    pub duplicates: BTreeMap<String, Vec<PathBuf>>,
}

impl RunReport {
    /// `true` when nothing in the report requires user action.
    pub fn is_clean(&self) -> bool {
        self.misses.is_empty() && self.failures.is_empty()
    }
}

fn reason_label(reason: CollisionReason) -> &'static str {
    match reason {
        CollisionReason::StaleCounterStripped => "stale counter stripped",
        CollisionReason::OverviewSuffix => "folder name conflict",
        CollisionReason::CounterAppended => "counter appended",
    }
}

/// Writes the human-readable report.
pub fn write_report(writer: &mut dyn Write, report: &RunReport) -> io::Result<()> {
    writeln!(writer, "\n{}", REPORT_SEPARATOR)?;
    if report.dry_run {
        writeln!(writer, "Conversion report (dry run, nothing was modified)")?;
    } else {
        writeln!(writer, "Conversion report")?;
    }
    let estimate_suffix = if report.estimated { " (estimated)" } else { "" };
    writeln!(
        writer,
        "Documents processed: {}",
        report.stats.documents_processed
    )?;
    writeln!(
        writer,
        "Links rewritten: {}{}",
        report.stats.links_rewritten, estimate_suffix
    )?;
    writeln!(
        writer,
        "Asset references rewritten: {}{}",
        report.stats.assets_rewritten, estimate_suffix
    )?;
    writeln!(writer, "Files renamed: {}", report.files_renamed)?;
    writeln!(writer, "Directories renamed: {}", report.directories_renamed)?;
    writeln!(writer, "Attachments merged: {}", report.attachments_merged)?;
    writeln!(writer, "Assets normalized: {}", report.assets_normalized)?;

    if !report.duplicates.is_empty() {
        writeln!(
            writer,
            "\nDuplicate names across folders: ({})",
            report.duplicates.len()
        )?;
        for (name, paths) in &report.duplicates {
            writeln!(writer, "- {} ({} locations)", name, paths.len())?;
        }
    }

    writeln!(writer, "\nResolved automatically: ({})", report.collisions.len())?;
    for record in &report.collisions {
        writeln!(
            writer,
            "- {} -> {} ({})",
            record.attempted.display(),
            record.resolved.display(),
            reason_label(record.reason)
        )?;
    }

    writeln!(
        writer,
        "\nNeeds attention: ({})",
        report.misses.len() + report.failures.len()
    )?;
    for miss in &report.misses {
        writeln!(
            writer,
            "- unresolved link in {}: {}",
            miss.document.display(),
            miss.target
        )?;
    }
    for failure in &report.failures {
        writeln!(writer, "- failed: {}: {}", failure.path.display(), failure.detail)?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_stats_merge_is_associative() {
        let a = RewriteStats {
            documents_processed: 1,
            links_rewritten: 2,
            assets_rewritten: 3,
        };
        let b = RewriteStats {
            documents_processed: 10,
            links_rewritten: 20,
            assets_rewritten: 30,
        };
        let c = RewriteStats {
            documents_processed: 100,
            links_rewritten: 200,
            assets_rewritten: 300,
        };

        let mut ab_c = a;
        ab_c.merge(b);
        ab_c.merge(c);

        let mut bc = b;
        bc.merge(c);
        let mut a_bc = a;
        a_bc.merge(bc);

        assert_eq!(ab_c, a_bc);
    }

    #[test]
    fn test_report_separates_resolved_from_needs_attention() {
        let mut report = RunReport::default();
        report.misses.push(ReferenceMiss {
            document: PathBuf::from("Doc.md"),
            target: "Gone.md".to_string(),
        });
        let mut writer = Cursor::new(Vec::new());
        write_report(&mut writer, &report).unwrap();

        let output = String::from_utf8(writer.into_inner()).unwrap();
        assert!(output.contains("Resolved automatically: (0)"));
        assert!(output.contains("Needs attention: (1)"));
        assert!(output.contains("unresolved link in Doc.md: Gone.md"));
        assert!(!report.is_clean());
    }

    #[test]
    fn test_dry_run_report_is_labelled() {
        let report = RunReport {
            dry_run: true,
            estimated: true,
            ..Default::default()
        };
        let mut writer = Cursor::new(Vec::new());
        write_report(&mut writer, &report).unwrap();

        let output = String::from_utf8(writer.into_inner()).unwrap();
        assert!(output.contains("dry run"));
        assert!(output.contains("Links rewritten: 0 (estimated)"));
    }
}
