//! Embedded-asset reference rewriting.
//!
//! Asset filenames are normalized (internal whitespace to `-`, lower-cased)
//! and directory segments are rewritten using the directory old-name to
//! new-name table. When the document's on-disk directory is available, the
//! rewriter prefers matching the referenced filename against the actual
//! directory listing (case/extension-insensitive) over a purely computed
//! normalization, to tolerate export inconsistencies.

use crate::rewrite::{is_external, MARKDOWN_REF};
use log::trace;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS.add(b' ').add(b'%').add(b'(').add(b')');

/// Normalizes an asset filename: whitespace runs become a single `-`, and the
/// whole name is lower-cased. Idempotent.
pub fn normalize_asset_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_gap = false;
    for c in name.trim().chars() {
        if c.is_whitespace() {
            pending_gap = true;
            continue;
        }
        if pending_gap {
            out.push('-');
            pending_gap = false;
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// Rewrites every `![alt](target)` embed in `content`.
///
/// `dir_renames` maps original directory names to their cleaned names.
/// `doc_dir` is the document's on-disk directory before any rename, used for
/// actual-listing matching; pass `None` for purely computed rewriting.
///
/// Returns the rewritten text and the number of references changed.
pub fn rewrite_asset_refs(
    content: &str,
    dir_renames: &HashMap<String, String>,
    doc_dir: Option<&Path>,
) -> (String, usize) {
    let mut changed = 0usize;

    let rewritten = MARKDOWN_REF.replace_all(content, |caps: &regex::Captures<'_>| {
        let full = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
        if &caps["bang"] != "!" {
            return full.to_string();
        }
        let target = &caps["target"];
        if is_external(target) {
            return full.to_string();
        }

        let decoded: Vec<String> = target
            .split('/')
            .map(|seg| percent_decode_str(seg).decode_utf8_lossy().into_owned())
            .collect();
        let (filename, dirs) = match decoded.split_last() {
            Some(split) => split,
            None => return full.to_string(),
        };

        let mut new_segments: Vec<String> = dirs
            .iter()
            .map(|seg| dir_renames.get(seg).cloned().unwrap_or_else(|| seg.clone()))
            .collect();
        let on_disk_dir = doc_dir.map(|base| dirs.iter().fold(base.to_path_buf(), |p, s| p.join(s)));
        new_segments.push(resolve_asset_name(filename, on_disk_dir.as_deref()));

        let new_target = new_segments
            .iter()
            .map(|seg| utf8_percent_encode(seg, SEGMENT_ENCODE_SET).to_string())
            .collect::<Vec<_>>()
            .join("/");
        if new_target == target {
            return full.to_string();
        }
        changed += 1;
        format!("![{}]({})", &caps["text"], new_target)
    });

    (rewritten.into_owned(), changed)
}

/// Picks the normalized name for a referenced asset, preferring an actual
/// directory entry that matches case/extension-insensitively.
fn resolve_asset_name(referenced: &str, dir: Option<&Path>) -> String {
    if let Some(dir) = dir {
        if let Some(actual) = find_listing_match(referenced, dir) {
            trace!("Asset '{referenced}' matched on-disk entry '{actual}'");
            return normalize_asset_name(&actual);
        }
    }
    normalize_asset_name(referenced)
}

fn find_listing_match(referenced: &str, dir: &Path) -> Option<String> {
    let entries = fs::read_dir(dir).ok()?;
    let wanted = referenced.to_lowercase();
    let wanted_stem = stem_of(&wanted).to_string();

    let mut stem_match = None;
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        let lower = name.to_lowercase();
        if lower == wanted {
            return Some(name);
        }
        if stem_of(&lower) == wanted_stem {
            stem_match.get_or_insert(name);
        }
    }
    stem_match
}

fn stem_of(name: &str) -> &str {
    name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name)
}

/// Patches references whose target asset was renamed during on-disk
/// normalization. `renames` maps old filename to new filename (both literal).
///
/// Applies to embeds and plain links alike; only the filename component is
/// substituted. Returns the patched text and the number of references
/// changed.
pub fn patch_renamed_assets(content: &str, renames: &HashMap<String, String>) -> (String, usize) {
    let mut changed = 0usize;

    let rewritten = MARKDOWN_REF.replace_all(content, |caps: &regex::Captures<'_>| {
        let full = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
        let target = &caps["target"];
        if is_external(target) {
            return full.to_string();
        }
        let mut segments: Vec<String> = target
            .split('/')
            .map(|seg| percent_decode_str(seg).decode_utf8_lossy().into_owned())
            .collect();
        let Some(last) = segments.last_mut() else {
            return full.to_string();
        };
        let Some(new_name) = renames.get(last) else {
            return full.to_string();
        };
        *last = new_name.clone();

        let new_target = segments
            .iter()
            .map(|seg| utf8_percent_encode(seg, SEGMENT_ENCODE_SET).to_string())
            .collect::<Vec<_>>()
            .join("/");
        changed += 1;
        format!("{}[{}]({})", &caps["bang"], &caps["text"], new_target)
    });

    (rewritten.into_owned(), changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_normalize_asset_name() {
        assert_eq!(normalize_asset_name("Screen Shot 1.PNG"), "screen-shot-1.png");
        assert_eq!(normalize_asset_name("already-clean.png"), "already-clean.png");
        // Idempotent.
        assert_eq!(
            normalize_asset_name(&normalize_asset_name("A  B.Png")),
            normalize_asset_name("A  B.Png")
        );
    }

    #[test]
    fn test_rewrite_normalizes_filename_and_dir_segments() {
        let mut dir_renames = HashMap::new();
        dir_renames.insert(
            "Page 0123456789abcdef0123456789abcdef".to_string(),
            "Page".to_string(),
        );
        let content = "![shot](Page%200123456789abcdef0123456789abcdef/Screen%20Shot.PNG)";
        let (out, changed) = rewrite_asset_refs(content, &dir_renames, None);
        assert_eq!(out, "![shot](Page/screen-shot.png)");
        assert_eq!(changed, 1);
    }

    #[test]
    fn test_rewrite_prefers_actual_listing() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("assets");
        std::fs::create_dir(&sub).unwrap();
        // On disk the export wrote a different extension case and an extra word.
        std::fs::write(sub.join("Screen Shot.jpeg"), b"x").unwrap();

        let content = "![shot](assets/Screen%20Shot.jpg)";
        let (out, changed) =
            rewrite_asset_refs(content, &HashMap::new(), Some(dir.path()));
        assert_eq!(out, "![shot](assets/screen-shot.jpeg)");
        assert_eq!(changed, 1);
    }

    #[test]
    fn test_rewrite_leaves_clean_refs_untouched() {
        let content = "![ok](assets/clean.png) and [doc](Other.md)";
        let (out, changed) = rewrite_asset_refs(content, &HashMap::new(), None);
        assert_eq!(out, content);
        assert_eq!(changed, 0);
    }

    #[test]
    fn test_external_embeds_untouched() {
        let content = "![remote](https://cdn.example.com/A%20B.png)";
        let (out, changed) = rewrite_asset_refs(content, &HashMap::new(), None);
        assert_eq!(out, content);
        assert_eq!(changed, 0);
    }

    #[test]
    fn test_patch_renamed_assets() {
        let mut renames = HashMap::new();
        renames.insert("Old Name.png".to_string(), "old-name.png".to_string());
        let content = "![x](media/Old%20Name.png) and ![y](media/other.png)";
        let (out, changed) = patch_renamed_assets(content, &renames);
        assert_eq!(out, "![x](media/old-name.png) and ![y](media/other.png)");
        assert_eq!(changed, 1);
    }
}
