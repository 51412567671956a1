//! Defines the core `Config` struct and related types for run configuration.
//!
//! All settings parsed and validated from the CLI (or assembled through the
//! [`ConfigBuilder`]) live here, split by the pipeline stage they drive.
//! Pattern constants are injected as configuration values rather than read
//! from process-wide state, so tests can run components with custom
//! identifier patterns.

use crate::cleaner::NameCleaner;
use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_DOC_EXTENSION, DEFAULT_IDENTIFIER_PATTERN};
use regex::Regex;
use std::path::PathBuf;

pub use builder::ConfigBuilder;
mod builder;

/// Configuration options for the discovery stage.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Extension identifying exported documents (without the dot).
    pub doc_extension: String,
    /// Glob patterns (relative to the export root) for entries to skip.
    pub ignore_patterns: Option<Vec<String>>,
}

/// Configuration options for the mutation stages.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Number of documents rewritten per parallel batch. A tuning knob, not
    /// a correctness parameter.
    pub batch_size: usize,
    /// Whether the collision resolver strips a pre-existing `-N` suffix whose
    /// base matches the parent directory's cleaned name.
    pub strip_stale_counters: bool,
}

/// Validated configuration for a whole conversion run.
#[derive(Debug, Clone)]
pub struct Config {
    /// The export root to convert.
    pub input_root: PathBuf,
    /// Optional distinct output root; the converted tree is relocated there
    /// after all stages complete.
    pub output_root: Option<PathBuf>,
    /// If `true`, stop after the preview stage without mutating anything.
    pub dry_run: bool,
    /// If `true`, skip the interactive confirmation gate.
    pub assume_yes: bool,
    /// Pattern an identifier token must match in full.
    pub identifier_pattern: Regex,
    /// Configuration for the discovery stage.
    pub discovery: DiscoveryConfig,
    /// Configuration for the mutation stages.
    pub execution: ExecutionConfig,
}

impl Config {
    /// A [`NameCleaner`] using this run's identifier pattern.
    pub fn cleaner(&self) -> NameCleaner {
        NameCleaner::with_pattern(self.identifier_pattern.clone())
    }

    /// Creates a default `Config` rooted at `input_root` for testing.
    #[doc(hidden)]
    pub fn new_for_test(input_root: impl Into<PathBuf>) -> Self {
        Self {
            input_root: input_root.into(),
            output_root: None,
            dry_run: false,
            assume_yes: true,
            identifier_pattern: DEFAULT_IDENTIFIER_PATTERN.clone(),
            discovery: DiscoveryConfig {
                doc_extension: DEFAULT_DOC_EXTENSION.to_string(),
                ignore_patterns: None,
            },
            execution: ExecutionConfig {
                batch_size: DEFAULT_BATCH_SIZE,
                strip_stale_counters: true,
            },
        }
    }
}
