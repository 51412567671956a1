//! Builds and validates a [`Config`].

use super::{Config, DiscoveryConfig, ExecutionConfig};
use crate::cli::Cli;
use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_DOC_EXTENSION, DEFAULT_IDENTIFIER_PATTERN};
use anyhow::{anyhow, Result};
use regex::Regex;
use std::path::PathBuf;

/// Builder for [`Config`], used programmatically and by the CLI conversion.
///
/// # Examples
///
/// ```
/// use vaultport::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .input_path("export")
///     .dry_run(true)
///     .build()
///     .unwrap();
/// assert!(config.dry_run);
/// ```
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    input_path: Option<String>,
    output_path: Option<String>,
    dry_run: bool,
    assume_yes: bool,
    doc_extension: Option<String>,
    batch_size: Option<usize>,
    keep_counter_suffix: bool,
    ignore_patterns: Option<Vec<String>>,
    identifier_pattern: Option<String>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the builder from parsed CLI arguments.
    pub fn from_cli(cli: Cli) -> Self {
        Self {
            input_path: Some(cli.input_path),
            output_path: cli.output_path,
            dry_run: cli.dry_run,
            assume_yes: cli.assume_yes,
            doc_extension: Some(cli.doc_extension),
            batch_size: cli.batch_size,
            keep_counter_suffix: cli.keep_counter_suffix,
            ignore_patterns: cli.ignore_patterns,
            identifier_pattern: cli.identifier_pattern,
        }
    }

    pub fn input_path(mut self, path: &str) -> Self {
        self.input_path = Some(path.to_string());
        self
    }

    pub fn output_path(mut self, path: &str) -> Self {
        self.output_path = Some(path.to_string());
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn assume_yes(mut self, assume_yes: bool) -> Self {
        self.assume_yes = assume_yes;
        self
    }

    pub fn doc_extension(mut self, ext: &str) -> Self {
        self.doc_extension = Some(ext.to_string());
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    pub fn keep_counter_suffix(mut self, keep: bool) -> Self {
        self.keep_counter_suffix = keep;
        self
    }

    pub fn ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = Some(patterns);
        self
    }

    pub fn identifier_pattern(mut self, pattern: &str) -> Self {
        self.identifier_pattern = Some(pattern.to_string());
        self
    }

    /// Validates the accumulated options and produces a [`Config`].
    ///
    /// Path existence is deliberately not checked here; the pipeline performs
    /// its own fatal pre-run checks so that a dry run and a real run fail the
    /// same way.
    pub fn build(self) -> Result<Config> {
        let input_root = PathBuf::from(
            self.input_path
                .ok_or_else(|| anyhow!("An input path is required"))?,
        );

        let doc_extension = self
            .doc_extension
            .unwrap_or_else(|| DEFAULT_DOC_EXTENSION.to_string());
        let doc_extension = doc_extension.trim_start_matches('.').to_string();
        if doc_extension.is_empty() {
            return Err(anyhow!("Document extension must not be empty"));
        }

        let batch_size = self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(anyhow!("Batch size must be at least 1"));
        }

        let identifier_pattern = match self.identifier_pattern {
            Some(pattern) => {
                let anchored = if pattern.starts_with('^') && pattern.ends_with('$') {
                    pattern
                } else {
                    format!("^(?:{pattern})$")
                };
                Regex::new(&anchored)
                    .map_err(|e| anyhow!("Invalid identifier pattern '{anchored}': {e}"))?
            }
            None => DEFAULT_IDENTIFIER_PATTERN.clone(),
        };

        Ok(Config {
            input_root,
            output_root: self.output_path.map(PathBuf::from),
            dry_run: self.dry_run,
            assume_yes: self.assume_yes,
            identifier_pattern,
            discovery: DiscoveryConfig {
                doc_extension,
                ignore_patterns: self.ignore_patterns,
            },
            execution: ExecutionConfig {
                batch_size,
                strip_stale_counters: !self.keep_counter_suffix,
            },
        })
    }
}
