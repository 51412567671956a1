//! Rewrites inter-document links and embedded-asset references inside a
//! document's text.
//!
//! Two independent passes, both applied after the document's metadata header
//! is attached but before the pipeline renames the document itself, so
//! current-document-relative resolution uses the pre-rename path:
//!
//! - [`links`]: `[text](target)` markdown links to other documents become
//!   wiki-style references to the cleaned target name; external URLs pass
//!   through; targets missing from the reference map are left alone and
//!   recorded as non-fatal misses.
//! - [`assets`]: image/attachment references get their filename normalized
//!   and their directory segments rewritten using the directory rename
//!   table.

pub mod assets;
pub mod links;

use once_cell::sync::Lazy;
use regex::Regex;

/// Matches both `[text](target)` links and `![alt](target)` embeds; the
/// passes tell them apart by the leading `!`.
pub(crate) static MARKDOWN_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<bang>!?)\[(?P<text>[^\]]*)\]\((?P<target>[^)]*)\)")
        .expect("static markdown reference pattern is valid")
});

/// `true` for targets that point outside the export (absolute URLs, mail
/// links, bare anchors).
pub(crate) fn is_external(target: &str) -> bool {
    if target.starts_with('#') {
        return true;
    }
    url::Url::parse(target).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_external() {
        assert!(is_external("https://example.com/page"));
        assert!(is_external("mailto:someone@example.com"));
        assert!(is_external("#heading-anchor"));
        assert!(!is_external("Meeting%20Notes.md"));
        assert!(!is_external("../Other/Page.md"));
    }
}
