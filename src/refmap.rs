//! Builds the lookup table from original document names to their cleaned
//! names and locations.
//!
//! The map is built once per run, from *original* names, before any rename
//! occurs. The rewrite stage resolves link targets against it by original
//! filename, which keeps rewriting independent of rename execution order.
//! Each document contributes its literal filename as a key and, when it
//! differs, a percent-encoded variant, so lookups succeed whether the
//! reference in another document's text was stored literally or URL-encoded.

use crate::core_types::DocumentEntry;
use log::{debug, warn};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::collections::HashMap;
use std::path::PathBuf;

/// Characters the source export percent-encodes in link targets.
const LINK_ENCODE_SET: &AsciiSet = &CONTROLS.add(b' ').add(b'%');

/// Where a referenced document lives and what it will be called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefTarget {
    /// The document's filename after cleaning (extension included).
    pub cleaned_name: String,
    /// The document's folder-relative path at discovery time.
    pub relative_path: PathBuf,
}

/// Mapping from original filename (literal and percent-encoded forms) to its
/// cleaned name and location.
#[derive(Debug, Default)]
pub struct ReferenceMap {
    entries: HashMap<String, RefTarget>,
}

impl ReferenceMap {
    /// Builds the map from all discovered documents.
    ///
    /// Must be called before any rename occurs. Original filenames are unique
    /// per run (the source identifiers guarantee it); a duplicate key is
    /// logged and the first entry wins.
    pub fn build(documents: &[DocumentEntry]) -> Self {
        let mut entries = HashMap::with_capacity(documents.len() * 2);
        for doc in documents {
            let original = doc.original_name();
            if original.is_empty() {
                continue;
            }
            let target = RefTarget {
                cleaned_name: doc.cleaned_name.clone(),
                relative_path: doc.relative_path.clone(),
            };

            let encoded = utf8_percent_encode(&original, LINK_ENCODE_SET).to_string();
            if encoded != original {
                insert_unique(&mut entries, encoded, target.clone());
            }
            insert_unique(&mut entries, original, target);
        }
        debug!("Reference map built with {} keys.", entries.len());
        Self { entries }
    }

    /// Looks up a document by its original filename (either form).
    pub fn lookup(&self, original_name: &str) -> Option<&RefTarget> {
        self.entries.get(original_name)
    }

    /// Number of keys in the map (encoded variants included).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no documents were indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn insert_unique(entries: &mut HashMap<String, RefTarget>, key: String, target: RefTarget) {
    if let Some(existing) = entries.get(&key) {
        warn!(
            "Duplicate original filename '{}' (already mapped to '{}'); keeping the first entry.",
            key, existing.cleaned_name
        );
        return;
    }
    entries.insert(key, target);
}
