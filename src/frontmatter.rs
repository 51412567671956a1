//! Metadata header generation.
//!
//! Each document gets a YAML frontmatter block carrying its cleaned title,
//! the original name as an alias when it differs, tags derived from its
//! folder segments, a folder-disambiguation tag for duplicate-set members,
//! and any property lines the export wrote at the top of the body
//! ("Created: ...", "Status: ..."). Lifted property lines are removed from
//! the body, so the metadata appears once. Attaching is idempotent: a
//! document that
//! already starts with a frontmatter block is left untouched, so a second
//! run over converted output changes nothing.

use crate::core_types::DocumentEntry;
use once_cell::sync::Lazy;
use regex::Regex;

static PROPERTY_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9 ]{0,40}):\s+(.+)$").expect("static property pattern is valid")
});

/// Splits export property lines off the top of a document body.
///
/// The export emits an H1 title followed by `Key: value` lines; everything up
/// to the first line that is neither is left alone. The matched property
/// lines (and the blank run that separated them from the body) are removed,
/// so once they land in the header the metadata appears only there. Returns
/// the properties in order of appearance alongside the remaining body.
pub fn split_properties(content: &str) -> (Vec<(String, String)>, String) {
    let mut properties = Vec::new();
    let mut body = String::with_capacity(content.len());
    let mut segments = content.split_inclusive('\n').peekable();

    // The title and any blank lines around it stay in the body.
    while let Some(seg) = segments.peek() {
        let line = seg.trim_end();
        if line.is_empty() || line.starts_with("# ") {
            body.push_str(seg);
            segments.next();
        } else {
            break;
        }
    }
    while let Some(seg) = segments.peek() {
        match PROPERTY_LINE.captures(seg.trim_end()) {
            Some(caps) => {
                properties.push((caps[1].trim().to_string(), caps[2].trim().to_string()));
                segments.next();
            }
            None => break,
        }
    }
    if !properties.is_empty() {
        while let Some(seg) = segments.peek() {
            if seg.trim().is_empty() {
                segments.next();
            } else {
                break;
            }
        }
    }
    for seg in segments {
        body.push_str(seg);
    }
    (properties, body)
}

/// Turns a folder segment into a tag slug: lower-cased, whitespace to `-`,
/// anything outside `[a-z0-9_-]` dropped.
pub fn tag_slug(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut pending_gap = false;
    for c in segment.trim().chars() {
        if c.is_whitespace() {
            pending_gap = true;
            continue;
        }
        if pending_gap && !out.is_empty() {
            out.push('-');
        }
        pending_gap = false;
        for lower in c.to_lowercase() {
            if lower.is_ascii_alphanumeric() || lower == '-' || lower == '_' {
                out.push(lower);
            }
        }
    }
    out
}

/// Prepends the generated frontmatter block to `content`.
///
/// `disambiguation` carries the folder-qualified tag for documents whose
/// cleaned name is shared across folders (duplicate-set members). Documents
/// that already start with a frontmatter block pass through unchanged.
pub fn attach(content: &str, doc: &DocumentEntry, disambiguation: Option<&str>) -> String {
    if content.starts_with("---\n") || content.starts_with("---\r\n") {
        return content.to_string();
    }

    let title = doc
        .cleaned_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(&doc.cleaned_name);

    let mut header = String::from("---\n");
    header.push_str(&format!("title: \"{}\"\n", escape(title)));

    if !doc.aliases.is_empty() {
        header.push_str("aliases:\n");
        for alias in &doc.aliases {
            header.push_str(&format!("  - \"{}\"\n", escape(alias)));
        }
    }

    let mut tags: Vec<String> = doc.tags.iter().map(|t| tag_slug(t)).collect();
    if let Some(folder) = disambiguation {
        let slug = tag_slug(folder);
        if !slug.is_empty() {
            tags.push(format!("folder/{slug}"));
        }
    }
    tags.retain(|t| !t.is_empty());
    if !tags.is_empty() {
        header.push_str("tags:\n");
        for tag in &tags {
            header.push_str(&format!("  - {tag}\n"));
        }
    }

    for (key, value) in &doc.properties {
        header.push_str(&format!("{}: \"{}\"\n", tag_slug(key), escape(value)));
    }

    header.push_str("---\n\n");
    header.push_str(content);
    header
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
