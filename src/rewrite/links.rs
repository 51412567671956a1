//! Inter-document link rewriting.
//!
//! For each matched `[displayText](targetPath)` the target is split into a
//! path and an optional `#fragment`, percent-decoded, and its filename looked
//! up in the [`ReferenceMap`]. A hit becomes a wiki-style reference to the
//! cleaned target name (aliased with the original display text unless the
//! text already equals the cleaned name). Targets that are not documents are
//! passed through with only their filename cleaned. A miss leaves the link
//! untouched and is reported as a warning, never an error.

use crate::cleaner::NameCleaner;
use crate::refmap::ReferenceMap;
use crate::rewrite::{is_external, MARKDOWN_REF};
use log::trace;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

const TARGET_ENCODE_SET: &AsciiSet = &CONTROLS.add(b' ').add(b'%').add(b'(').add(b')');

/// What the link pass did to one document.
#[derive(Debug, Default)]
pub struct LinkOutcome {
    /// Links converted to wiki references or name-cleaned.
    pub rewritten: usize,
    /// Link targets that were not found in the reference map.
    pub misses: Vec<String>,
}

/// Rewrites every inter-document link in `content`.
///
/// `doc_extension` identifies document targets ("md"); anything else is a
/// plain file reference and keeps its markdown form.
pub fn rewrite_links(
    content: &str,
    refmap: &ReferenceMap,
    cleaner: &NameCleaner,
    doc_extension: &str,
) -> (String, LinkOutcome) {
    let mut outcome = LinkOutcome::default();
    let doc_suffix = format!(".{}", doc_extension);

    let rewritten = MARKDOWN_REF.replace_all(content, |caps: &regex::Captures<'_>| {
        let full = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
        // Embeds are the asset pass's business.
        if &caps["bang"] == "!" {
            return full.to_string();
        }
        let display = &caps["text"];
        let target = &caps["target"];
        if is_external(target) {
            return full.to_string();
        }

        let (path_part, fragment) = match target.split_once('#') {
            Some((p, f)) => (p, Some(f)),
            None => (target, None),
        };
        let decoded = percent_decode_str(path_part).decode_utf8_lossy();
        // Relative prefixes (./, ../) only move between folders; the map is
        // keyed by filename, so the final component is what gets resolved.
        let filename = decoded.rsplit('/').next().unwrap_or(&decoded);

        if !filename.ends_with(&doc_suffix) {
            return match clean_plain_target(path_part, filename, cleaner, fragment) {
                Some(cleaned_target) => {
                    outcome.rewritten += 1;
                    format!("[{display}]({cleaned_target})")
                }
                None => full.to_string(),
            };
        }

        match refmap.lookup(filename) {
            Some(entry) => {
                outcome.rewritten += 1;
                let wiki_name = entry
                    .cleaned_name
                    .strip_suffix(&doc_suffix)
                    .unwrap_or(&entry.cleaned_name);
                let decoded_display = percent_decode_str(display).decode_utf8_lossy();
                let mut link = String::from("[[");
                link.push_str(wiki_name);
                if let Some(fragment) = fragment {
                    link.push('#');
                    link.push_str(fragment);
                }
                if decoded_display != wiki_name {
                    link.push('|');
                    link.push_str(&decoded_display);
                }
                link.push_str("]]");
                link
            }
            None => {
                trace!("Reference miss for link target '{}'", target);
                outcome.misses.push(target.to_string());
                full.to_string()
            }
        }
    });

    (rewritten.into_owned(), outcome)
}

/// Cleans only the filename component of a non-document target. Returns
/// `None` when nothing changes.
fn clean_plain_target(
    path_part: &str,
    decoded_filename: &str,
    cleaner: &NameCleaner,
    fragment: Option<&str>,
) -> Option<String> {
    let cleaned = cleaner.clean_name(decoded_filename);
    if cleaned == decoded_filename {
        return None;
    }
    let encoded_name = utf8_percent_encode(&cleaned, TARGET_ENCODE_SET).to_string();
    let prefix = match path_part.rfind('/') {
        Some(idx) => &path_part[..=idx],
        None => "",
    };
    let mut target = format!("{prefix}{encoded_name}");
    if let Some(fragment) = fragment {
        target.push('#');
        target.push_str(fragment);
    }
    Some(target)
}
