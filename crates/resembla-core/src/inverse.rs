//! Inverse maps: indexed key to original corpus texts
//!
//! On disk an inverse map is a TSV file with one row per original text:
//!
//! ```text
//! indexed_key \t original_text [\t attributes [\t serialized_representation]]
//! ```
//!
//! The attribute column carries the corpus row's attributes (for example
//! `keyword=a,b`) and may be empty. The last column caches the
//! representation of the original so the pipeline can skip preprocessing at
//! query time. Without it, the original is rebuilt from its text and
//! attributes, which gives the same representation.

use crate::corpus::CorpusEntry;
use crate::error::{ResemblaError, Result};
use crate::normalize::TextNormalizer;
use crate::preprocess::Preprocess;
use crate::sequence::{Representation, RepresentationKind};
use ahash::AHashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Read-only lookup from indexed keys to original texts
#[derive(Debug, Clone, Default)]
pub struct InverseMap {
    keys: Vec<String>,
    originals: AHashMap<String, Vec<String>>,
    attributes: AHashMap<String, String>,
    cache: AHashMap<String, Representation>,
}

impl InverseMap {
    /// Load an inverse-map file, parsing cached representations as `kind`
    pub fn load(path: impl AsRef<Path>, kind: RepresentationKind) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ResemblaError::io(path, e))?;
        let map = Self::parse(path, &content, kind)?;
        debug!(
            path = %path.display(),
            keys = map.keys.len(),
            cached = map.cache.len(),
            "loaded inverse map"
        );
        Ok(map)
    }

    pub(crate) fn parse(path: &Path, content: &str, kind: RepresentationKind) -> Result<Self> {
        let mut map = Self::default();
        for (i, line) in content.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let mut columns = line.splitn(4, '\t');
            let key = columns.next().unwrap_or_default();
            let Some(original) = columns.next() else {
                return Err(ResemblaError::table(path, i + 1, "missing original text column"));
            };

            if let Some(attributes) = columns.next().filter(|a| !a.is_empty()) {
                map.attributes
                    .entry(original.to_string())
                    .or_insert_with(|| attributes.to_string());
            }
            if let Some(json) = columns.next().filter(|json| !json.is_empty()) {
                let representation = Representation::from_json(kind, json)?;
                map.cache.insert(original.to_string(), representation);
            }
            map.insert(key, original);
        }
        Ok(map)
    }

    fn insert(&mut self, key: &str, original: &str) {
        let originals = self.originals.entry(key.to_string()).or_insert_with(|| {
            self.keys.push(key.to_string());
            Vec::new()
        });
        if !originals.iter().any(|o| o == original) {
            originals.push(original.to_string());
        }
    }

    /// Indexed keys in file order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn originals(&self, key: &str) -> Option<&[String]> {
        self.originals.get(key).map(Vec::as_slice)
    }

    /// Attribute column stored with an original text
    pub fn attributes(&self, original: &str) -> Option<&str> {
        self.attributes.get(original).map(String::as_str)
    }

    /// Precomputed representation of an original text
    pub fn cached(&self, original: &str) -> Option<&Representation> {
        self.cache.get(original)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// One row of an inverse-map file
#[derive(Debug, Clone, PartialEq)]
pub struct InverseEntry {
    pub key: String,
    pub original: String,
    pub attributes: Option<String>,
    pub representation: Option<Representation>,
}

/// Group corpus texts by indexed key, sorted by key then text
///
/// Texts are normalized before indexing and preprocessing; the stored
/// original stays as written in the corpus. Representations are built from
/// the normalized text with its attributes when `with_representation` is set.
pub fn build_inverse_entries(
    corpus: &[CorpusEntry],
    preprocessor: &dyn Preprocess,
    normalizer: Option<&dyn TextNormalizer>,
    with_representation: bool,
) -> Result<Vec<InverseEntry>> {
    let normalize = |text: &str| match normalizer {
        Some(n) => n.normalize(text),
        None => text.to_string(),
    };

    // the first row of a duplicated text decides its attributes
    let mut first_seen: BTreeMap<&str, &CorpusEntry> = BTreeMap::new();
    for entry in corpus {
        first_seen.entry(entry.text.as_str()).or_insert(entry);
    }

    let mut grouped: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
    for (&text, _) in &first_seen {
        let key = preprocessor.index(&normalize(text))?;
        grouped.entry(key).or_default().insert(text);
    }

    let mut rows = Vec::new();
    for (key, texts) in grouped {
        for text in texts {
            let entry = first_seen[&text];
            let representation = if with_representation {
                let normalized = CorpusEntry {
                    text: normalize(&entry.text),
                    ..entry.clone()
                };
                Some(preprocessor.build(&normalized.original(), true)?)
            } else {
                None
            };
            rows.push(InverseEntry {
                key: key.clone(),
                original: entry.text.clone(),
                attributes: entry.attributes.clone(),
                representation,
            });
        }
    }
    Ok(rows)
}

/// Write inverse-map rows to `path`
pub fn write_inverse(path: impl AsRef<Path>, entries: &[InverseEntry]) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).map_err(|e| ResemblaError::io(path, e))?;
    let mut out = BufWriter::new(file);
    for entry in entries {
        let attributes = entry.attributes.as_deref().unwrap_or_default();
        let line = match (&entry.representation, &entry.attributes) {
            (Some(representation), _) => format!(
                "{}\t{}\t{}\t{}",
                entry.key,
                entry.original,
                attributes,
                representation.to_json()?
            ),
            (None, Some(_)) => format!("{}\t{}\t{}", entry.key, entry.original, attributes),
            (None, None) => format!("{}\t{}", entry.key, entry.original),
        };
        writeln!(out, "{}", line).map_err(|e| ResemblaError::io(path, e))?;
    }
    out.flush().map_err(|e| ResemblaError::io(path, e))
}
