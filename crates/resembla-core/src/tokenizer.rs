//! Morphological analysis interface

use crate::error::Result;
use crate::sequence::Word;
use crate::table::TsvTable;
use ahash::AHashMap;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Splits text into morphemes with feature tags
///
/// Analyzers are not assumed to be reentrant, hence `&mut self`.
pub trait Tokenizer: Send {
    fn tokenize(&mut self, text: &str) -> Result<Vec<Word>>;
}

/// A tokenizer shared by several preprocessors
///
/// The lock is held only for the duration of one `tokenize` call.
#[derive(Clone)]
pub struct SharedTokenizer {
    inner: Arc<Mutex<Box<dyn Tokenizer>>>,
}

impl SharedTokenizer {
    pub fn new(tokenizer: impl Tokenizer + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(tokenizer))),
        }
    }

    pub fn tokenize(&self, text: &str) -> Result<Vec<Word>> {
        self.inner.lock().tokenize(text)
    }
}

impl std::fmt::Debug for SharedTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedTokenizer").finish_non_exhaustive()
    }
}

/// Splits on whitespace and emits words without features
///
/// Fallback for corpora where no morphological analyzer is wired in;
/// feature-dependent weights and costs see empty tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&mut self, text: &str) -> Result<Vec<Word>> {
        Ok(text
            .split_whitespace()
            .map(|surface| Word::new(surface, Vec::new()))
            .collect())
    }
}

/// Whitespace tokenizer that tags known surfaces from a lexicon
///
/// Lexicon rows are `surface \t comma,separated,features` in the analyzer's
/// feature layout. Unknown surfaces get no features.
#[derive(Debug, Clone, Default)]
pub struct LexiconTokenizer {
    entries: AHashMap<String, Vec<String>>,
}

impl LexiconTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(path: impl AsRef<Path>) -> Result<Self> {
        let table = TsvTable::read(path, 2)?;
        let mut lexicon = Self::new();
        for row in table.rows() {
            let features = row.columns[1].split(',').map(str::to_string).collect();
            lexicon.entries.insert(row.columns[0].clone(), features);
        }
        Ok(lexicon)
    }

    pub fn with_entry(mut self, surface: &str, features: &[&str]) -> Self {
        self.entries.insert(
            surface.to_string(),
            features.iter().map(|f| f.to_string()).collect(),
        );
        self
    }
}

impl Tokenizer for LexiconTokenizer {
    fn tokenize(&mut self, text: &str) -> Result<Vec<Word>> {
        Ok(text
            .split_whitespace()
            .map(|surface| {
                let features = self.entries.get(surface).cloned().unwrap_or_default();
                Word::new(surface, features)
            })
            .collect())
    }
}
