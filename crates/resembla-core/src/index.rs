//! Approximate n-gram index
//!
//! The retrieval pipeline asks an [`ApproximateIndex`] for indexed keys
//! similar to the query key. The answer is a lossy superset; exact scoring
//! happens later in reranking.
//!
//! Index readers are not assumed to be safe for concurrent use, so the
//! pipeline holds them in a [`LockedIndex`]: the lock covers one `retrieve`
//! call and nothing else.

use crate::error::Result;
use ahash::AHashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Set similarity between the query's and a key's n-gram sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimMeasure {
    Exact,
    Dice,
    Cosine,
    Jaccard,
    Overlap,
}

impl fmt::Display for SimMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Exact => "exact",
            Self::Dice => "dice",
            Self::Cosine => "cosine",
            Self::Jaccard => "jaccard",
            Self::Overlap => "overlap",
        };
        f.write_str(name)
    }
}

/// Tolerance for floating point comparisons against the threshold
const EPSILON: f64 = 1e-9;

impl SimMeasure {
    /// Whether sets of sizes `x` and `y` sharing `common` grams are similar enough
    fn accepts(&self, x: usize, y: usize, common: usize, threshold: f64) -> bool {
        let (x, y, c) = (x as f64, y as f64, common as f64);
        let score = match self {
            Self::Exact => return x == y && c == x,
            Self::Dice => 2.0 * c / (x + y),
            Self::Cosine => c / (x * y).sqrt(),
            Self::Jaccard => c / (x + y - c),
            Self::Overlap => c / x.min(y),
        };
        score + EPSILON >= threshold
    }
}

/// Source of candidate keys for a query key
pub trait ApproximateIndex: Send {
    fn retrieve(
        &mut self,
        query_key: &str,
        measure: SimMeasure,
        threshold: f64,
    ) -> Result<Vec<String>>;
}

/// Split `text` into character n-grams
///
/// Repeated grams are numbered by occurrence so the result is a set.
/// Texts shorter than `n` form a single gram.
pub fn ngrams(text: &str, n: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    let n = n.max(1);
    let windows: Vec<String> = if chars.len() < n {
        vec![chars.iter().collect()]
    } else {
        chars.windows(n).map(|w| w.iter().collect()).collect()
    };

    let mut seen: AHashMap<String, usize> = AHashMap::new();
    windows
        .into_iter()
        .map(|gram| {
            let count = seen.entry(gram.clone()).or_insert(0);
            *count += 1;
            format!("{}\u{1}{}", gram, count)
        })
        .collect()
}

/// In-memory n-gram index over a fixed set of keys
#[derive(Debug, Clone)]
pub struct NgramIndex {
    n: usize,
    keys: Vec<String>,
    sizes: Vec<usize>,
    postings: AHashMap<String, Vec<usize>>,
}

impl NgramIndex {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            keys: Vec::new(),
            sizes: Vec::new(),
            postings: AHashMap::new(),
        }
    }

    pub fn from_keys<I, S>(n: usize, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = Self::new(n);
        for key in keys {
            index.insert(key);
        }
        index
    }

    pub fn insert(&mut self, key: impl Into<String>) {
        let key = key.into();
        let id = self.keys.len();
        let grams = ngrams(&key, self.n);
        self.sizes.push(grams.len());
        for gram in grams {
            self.postings.entry(gram).or_default().push(id);
        }
        self.keys.push(key);
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys similar to `query_key`, in insertion order
    pub fn search(&self, query_key: &str, measure: SimMeasure, threshold: f64) -> Vec<String> {
        let grams = ngrams(query_key, self.n);
        if grams.is_empty() {
            return Vec::new();
        }

        let mut common: AHashMap<usize, usize> = AHashMap::new();
        for gram in &grams {
            if let Some(ids) = self.postings.get(gram) {
                for &id in ids {
                    *common.entry(id).or_insert(0) += 1;
                }
            }
        }

        let mut matched: Vec<usize> = common
            .into_iter()
            .filter(|&(id, c)| measure.accepts(grams.len(), self.sizes[id], c, threshold))
            .map(|(id, _)| id)
            .collect();
        matched.sort_unstable();
        matched.into_iter().map(|id| self.keys[id].clone()).collect()
    }
}

impl ApproximateIndex for NgramIndex {
    fn retrieve(
        &mut self,
        query_key: &str,
        measure: SimMeasure,
        threshold: f64,
    ) -> Result<Vec<String>> {
        Ok(self.search(query_key, measure, threshold))
    }
}

/// An index reader behind a lock scoped to each lookup
pub struct LockedIndex {
    reader: Mutex<Box<dyn ApproximateIndex>>,
}

impl LockedIndex {
    pub fn new(reader: impl ApproximateIndex + 'static) -> Self {
        Self {
            reader: Mutex::new(Box::new(reader)),
        }
    }

    pub fn retrieve(
        &self,
        query_key: &str,
        measure: SimMeasure,
        threshold: f64,
    ) -> Result<Vec<String>> {
        self.reader.lock().retrieve(query_key, measure, threshold)
    }
}

impl fmt::Debug for LockedIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockedIndex").finish_non_exhaustive()
    }
}
