// src/constants.rs

use once_cell::sync::Lazy;
use regex::Regex;

/// Default pattern an identifier token must match in full: the 32-character
/// hexadecimal suffix the source export appends to every file and directory
/// name.
///
/// Components take the pattern as an injected value (see
/// [`crate::config::Config`]) so tests can substitute a custom one.
pub static DEFAULT_IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{32}$").expect("static identifier pattern is valid"));

/// Characters replaced with `-` during name sanitization. Control characters
/// are replaced as well.
pub const FORBIDDEN_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Default extension of exported documents.
pub const DEFAULT_DOC_EXTENSION: &str = "md";

/// Suffix appended to a document's base name when it would otherwise collide
/// with its own attachment directory.
pub const OVERVIEW_SUFFIX: &str = " Overview";

/// Upper bound on the number of documents sampled when a dry run estimates
/// aggregate rewrite counts.
pub const DRY_RUN_SAMPLE_LIMIT: usize = 64;

/// Default number of documents rewritten per parallel batch.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Separator used before report sections.
pub const REPORT_SEPARATOR: &str = "---";
