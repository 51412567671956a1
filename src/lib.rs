//! `vaultport` is a library and command-line tool for converting an exported
//! hierarchical Markdown page tree into a cleaned note vault.
//!
//! Exports of this kind append a 32-character hexadecimal identifier to every
//! file and directory name, percent-encode those names inside links, and
//! leave each page's attachments in a sibling folder named after the page.
//! `vaultport` undoes all of that in place:
//!
//! 1.  **Discover**: Walk the export root and collect documents and
//!     directories, extracting identifiers and folder-derived metadata.
//! 2.  **Plan**: Compute every rename up front, flag pages that merge into
//!     their attachment folders, and detect duplicate cleaned names.
//! 3.  **Execute**: Rewrite content (frontmatter, wiki-links, asset
//!     references), then apply the renames through a collision resolver that
//!     guarantees a free target path for every move.
//!
//! A dry run stops after planning and reports what would happen, with
//! rewrite counts estimated from a sample of documents; a real run asks for
//! confirmation before touching anything.
//!
//! # Example: Library Usage
//!
//! The following example previews a conversion of a small export tree
//! without modifying it.
//!
//! ```
//! use vaultport::{run, AutoConfirm, CancellationToken, ConfigBuilder};
//! use std::fs;
//! use tempfile::tempdir;
//!
//! // 1. Set up an export-shaped tree: one page with an identifier suffix.
//! let temp_dir = tempdir().unwrap();
//! let name = "Home 0123456789abcdef0123456789abcdef.md";
//! fs::write(temp_dir.path().join(name), "# Home").unwrap();
//!
//! // 2. Build a configuration for a dry run.
//! let config = ConfigBuilder::new()
//!     .input_path(temp_dir.path().to_str().unwrap())
//!     .dry_run(true)
//!     .build()
//!     .unwrap();
//!
//! // 3. Execute. The dry run never prompts and never mutates.
//! let report = run(
//!     &config,
//!     &CancellationToken::new(),
//!     None,
//!     &AutoConfirm(true),
//! )
//! .unwrap();
//!
//! assert!(report.dry_run);
//! assert_eq!(report.stats.documents_processed, 1);
//! assert_eq!(report.files_renamed, 1);
//! // The tree is untouched.
//! assert!(temp_dir.path().join(name).exists());
//! ```

pub mod cancellation;
pub mod cleaner;
pub mod cli;
pub mod collision;
pub mod config;
pub mod constants;
pub mod core_types;
pub mod discovery;
pub mod errors;
pub mod frontmatter;
pub mod pipeline;
pub mod planner;
pub mod progress;
pub mod refmap;
pub mod report;
pub mod rewrite;
pub mod signal;

// Re-export key public types for easier use as a library
pub use cancellation::CancellationToken;
pub use config::{Config, ConfigBuilder};
pub use errors::{Error, Result};
pub use pipeline::{AutoConfirm, Confirmer, StdinConfirmer};
pub use report::{write_report, RunReport};

use crate::progress::{NoOpProgress, ProgressReporter};
use std::sync::Arc;

/// Executes the complete conversion pipeline: discover, plan, and (unless
/// configured as a dry run) rewrite and rename.
///
/// This is the primary entry point for running the tool programmatically in
/// a way that mirrors command-line execution. Pass `None` for `progress` to
/// run silently, and [`AutoConfirm`] as the confirmer for non-interactive
/// callers.
///
/// # Errors
/// Returns [`Error::NoDocumentsFound`] when the root holds no documents,
/// [`Error::Interrupted`] when the confirmation is declined or the token is
/// cancelled, and the fatal root-check errors from discovery. Individual
/// item failures during execution do not abort the run; they are collected
/// in the returned [`RunReport`].
pub fn run(
    config: &Config,
    token: &CancellationToken,
    progress: Option<Arc<dyn ProgressReporter>>,
    confirmer: &dyn Confirmer,
) -> Result<RunReport> {
    let progress: Arc<dyn ProgressReporter> = progress.unwrap_or_else(|| Arc::new(NoOpProgress));
    pipeline::run(config, token, progress.as_ref(), confirmer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const ID: &str = "0123456789abcdef0123456789abcdef";

    fn test_config(root: &std::path::Path) -> Config {
        ConfigBuilder::new()
            .input_path(root.to_str().unwrap())
            .assume_yes(true)
            .build()
            .unwrap()
    }

    #[test]
    fn test_run_basic_conversion() -> anyhow::Result<()> {
        let temp_dir = tempdir()?;
        fs::write(
            temp_dir.path().join(format!("Home {ID}.md")),
            format!("# Home\n\n[Tasks](Tasks%20{ID}.md)\n"),
        )?;
        fs::write(temp_dir.path().join(format!("Tasks {ID}.md")), "# Tasks\n")?;

        let config = test_config(temp_dir.path());
        let report = run(
            &config,
            &CancellationToken::new(),
            None,
            &AutoConfirm(true),
        )?;

        assert_eq!(report.stats.documents_processed, 2);
        assert_eq!(report.files_renamed, 2);
        assert!(report.is_clean());

        let home = fs::read_to_string(temp_dir.path().join("Home.md"))?;
        assert!(home.contains("[[Tasks]]"));
        assert!(home.starts_with("---\n"));
        assert!(temp_dir.path().join("Tasks.md").exists());
        Ok(())
    }

    #[test]
    fn test_run_dry_run_leaves_tree_untouched() -> anyhow::Result<()> {
        let temp_dir = tempdir()?;
        let name = format!("Home {ID}.md");
        fs::write(temp_dir.path().join(&name), "# Home\n")?;

        let config = ConfigBuilder::new()
            .input_path(temp_dir.path().to_str().unwrap())
            .dry_run(true)
            .build()?;
        let report = run(
            &config,
            &CancellationToken::new(),
            None,
            &AutoConfirm(true),
        )?;

        assert!(report.dry_run);
        assert_eq!(report.files_renamed, 1);
        assert!(temp_dir.path().join(&name).exists());
        assert!(!temp_dir.path().join("Home.md").exists());
        Ok(())
    }

    #[test]
    fn test_run_returns_no_documents_found() -> anyhow::Result<()> {
        let temp_dir = tempdir()?;
        fs::write(temp_dir.path().join("image.png"), b"png")?;

        let config = test_config(temp_dir.path());
        let result = run(
            &config,
            &CancellationToken::new(),
            None,
            &AutoConfirm(true),
        );
        assert!(matches!(result, Err(Error::NoDocumentsFound)));
        Ok(())
    }

    #[test]
    fn test_run_declined_confirmation_mutates_nothing() -> anyhow::Result<()> {
        let temp_dir = tempdir()?;
        let name = format!("Home {ID}.md");
        fs::write(temp_dir.path().join(&name), "# Home\n")?;

        let config = ConfigBuilder::new()
            .input_path(temp_dir.path().to_str().unwrap())
            .build()?;
        let result = run(
            &config,
            &CancellationToken::new(),
            None,
            &AutoConfirm(false),
        );

        assert!(matches!(result, Err(Error::Interrupted)));
        assert!(temp_dir.path().join(&name).exists());
        Ok(())
    }

    #[test]
    fn test_run_respects_cancellation_token() -> anyhow::Result<()> {
        let temp_dir = tempdir()?;
        fs::write(temp_dir.path().join(format!("Home {ID}.md")), "# Home\n")?;

        let config = test_config(temp_dir.path());
        let token = CancellationToken::new();
        token.cancel();
        let result = run(&config, &token, None, &AutoConfirm(true));
        assert!(matches!(result, Err(Error::Interrupted)));
        Ok(())
    }

    #[test]
    fn test_run_is_idempotent() -> anyhow::Result<()> {
        let temp_dir = tempdir()?;
        fs::write(
            temp_dir.path().join(format!("Home {ID}.md")),
            format!("# Home\n\n[Tasks](Tasks%20{ID}.md)\n"),
        )?;
        fs::write(temp_dir.path().join(format!("Tasks {ID}.md")), "# Tasks\n")?;

        let config = test_config(temp_dir.path());
        run(&config, &CancellationToken::new(), None, &AutoConfirm(true))?;
        let first_home = fs::read_to_string(temp_dir.path().join("Home.md"))?;

        let report = run(&config, &CancellationToken::new(), None, &AutoConfirm(true))?;
        assert_eq!(report.files_renamed, 0);
        assert_eq!(report.directories_renamed, 0);
        assert_eq!(report.stats.links_rewritten, 0);

        let second_home = fs::read_to_string(temp_dir.path().join("Home.md"))?;
        assert_eq!(first_home, second_home);
        Ok(())
    }
}
