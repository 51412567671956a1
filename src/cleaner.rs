//! Identifier stripping and filename sanitization.
//!
//! The source export appends a fixed-length hexadecimal identifier to every
//! file and directory name ("Meeting Notes 0a1b...ff.md"). `NameCleaner`
//! removes that token and replaces characters that are illegal on common
//! target filesystems. Cleaning is best-effort and never fails: any input
//! produces a sanitized output, and cleaning an already-clean name is a
//! no-op.

use crate::constants::{DEFAULT_IDENTIFIER_PATTERN, FORBIDDEN_NAME_CHARS};
use regex::Regex;

/// Strips identifier tokens and sanitizes names.
///
/// The identifier pattern is injected rather than read from a global so tests
/// can exercise the cleaner with shorter patterns.
///
/// # Examples
///
/// ```
/// use vaultport::cleaner::NameCleaner;
///
/// let cleaner = NameCleaner::new();
/// assert_eq!(
///     cleaner.clean_name("Project Alpha 0123456789abcdef0123456789abcdef.md"),
///     "Project Alpha.md"
/// );
/// assert_eq!(cleaner.clean_name("Project Alpha.md"), "Project Alpha.md");
/// ```
#[derive(Debug, Clone)]
pub struct NameCleaner {
    identifier_pattern: Regex,
}

impl NameCleaner {
    /// Creates a cleaner using the default 32-hex-character identifier
    /// pattern.
    pub fn new() -> Self {
        Self {
            identifier_pattern: DEFAULT_IDENTIFIER_PATTERN.clone(),
        }
    }

    /// Creates a cleaner with a custom identifier pattern. The pattern must
    /// match the whole token (anchor it with `^` and `$`).
    pub fn with_pattern(identifier_pattern: Regex) -> Self {
        Self { identifier_pattern }
    }

    /// Extracts the identifier from a file name, if present.
    ///
    /// The identifier is recognized only as the last space-separated token of
    /// the stem (the name with its extension removed). This is a strict
    /// suffix match: hex-like tokens elsewhere in the name are not touched.
    pub fn extract_identifier(&self, name: &str) -> Option<String> {
        let (stem, _ext) = split_extension(name);
        self.extract_from_stem(stem)
    }

    /// Cleans a file name: strips the identifier token (and the separating
    /// space) from the stem if present, sanitizes, and reattaches the
    /// extension.
    ///
    /// Idempotent: `clean_name(clean_name(x)) == clean_name(x)`.
    pub fn clean_name(&self, name: &str) -> String {
        let (stem, ext) = split_extension(name);
        let cleaned_stem = self.clean_stem(stem);
        match ext {
            Some(ext) => format!("{}.{}", cleaned_stem, sanitize(ext)),
            None => cleaned_stem,
        }
    }

    /// Cleans a directory name: same identifier-stripping rule, applied to a
    /// name with no extension.
    pub fn clean_dir_name(&self, name: &str) -> String {
        self.clean_stem(name)
    }

    fn clean_stem(&self, stem: &str) -> String {
        let stripped = match self.extract_from_stem(stem) {
            Some(id) => stem[..stem.len() - id.len()].trim_end(),
            None => stem,
        };
        sanitize(stripped)
    }

    fn extract_from_stem(&self, stem: &str) -> Option<String> {
        let token = stem.rsplit(char::is_whitespace).next()?;
        // A stem that is nothing but an identifier has no name left to keep;
        // leave it alone rather than cleaning down to an empty string.
        if token.len() == stem.len() {
            return None;
        }
        if self.identifier_pattern.is_match(token) {
            Some(token.to_string())
        } else {
            None
        }
    }
}

impl Default for NameCleaner {
    fn default() -> Self {
        Self::new()
    }
}

/// Replaces characters forbidden on common target filesystems (and control
/// characters) with `-`, trimming surrounding whitespace.
pub fn sanitize(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if FORBIDDEN_NAME_CHARS.contains(&c) || c.is_control() {
                '-'
            } else {
                c
            }
        })
        .collect()
}

/// Splits `name` into `(stem, Some(extension))`, or `(name, None)` when there
/// is no extension. A leading dot does not count as an extension separator.
fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}
