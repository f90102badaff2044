//! Text feature extraction
//!
//! Extractors compute numeric features from a raw text. They run on the
//! query and on candidates whose corpus row does not already carry the
//! feature as an attribute.

use crate::error::{ResemblaError, Result};
use crate::sequence::FeatureMap;
use crate::table::TsvTable;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;

/// Scores a text by the first pattern matching it as a whole
///
/// Pattern files hold `score\tpattern` rows, tried in file order. A text no
/// pattern matches scores 0.
#[derive(Debug, Clone)]
pub struct PatternFeature {
    patterns: Vec<(f64, Regex)>,
}

impl PatternFeature {
    pub fn new<'a>(patterns: impl IntoIterator<Item = (f64, &'a str)>) -> Result<Self> {
        let patterns = patterns
            .into_iter()
            .map(|(score, pattern)| Ok((score, anchored(pattern)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn from_table(path: impl AsRef<Path>) -> Result<Self> {
        let table = TsvTable::read(path, 2)?;
        let mut patterns = Vec::with_capacity(table.rows().len());
        for row in table.rows() {
            let score = table.number(row, 0)?;
            let regex = anchored(&row.columns[1]).map_err(|e| {
                ResemblaError::table(table.path(), row.line, e.to_string())
            })?;
            patterns.push((score, regex));
        }
        Ok(Self { patterns })
    }

    pub fn score(&self, text: &str) -> f64 {
        self.patterns
            .iter()
            .find(|(_, regex)| regex.is_match(text))
            .map_or(0.0, |(score, _)| *score)
    }
}

fn anchored(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{})$", pattern))
        .map_err(|e| ResemblaError::Config(format!("invalid pattern '{}': {}", pattern, e)))
}

/// Named pattern features computed together
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    features: BTreeMap<String, PatternFeature>,
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, feature: PatternFeature) {
        self.features.insert(name.into(), feature);
    }

    pub fn extract(&self, text: &str) -> FeatureMap {
        self.features
            .iter()
            .map(|(name, feature)| (name.clone(), feature.score(text)))
            .collect()
    }

    /// Fill in features `given` lacks
    pub fn complete(&self, text: &str, given: &mut FeatureMap) {
        for (name, feature) in &self.features {
            given
                .entry(name.clone())
                .or_insert_with(|| feature.score(text));
        }
    }
}
