//! Results joined with external corpus ids

use crate::corpus::{load_corpus, CorpusColumns, CorpusEntry};
use crate::error::{ResemblaError, Result};
use crate::pipeline::{Resembla, ScoredResult};
use ahash::AHashMap;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// A scored text and its corpus id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentifiedResult {
    #[serde(flatten)]
    pub result: ScoredResult,
    pub id: Option<i64>,
}

/// Wraps a pipeline and attaches corpus ids to its results
///
/// The first row of a repeated text decides its id. Rows without an id
/// column are numbered after the largest id seen so far.
pub struct ResemblaWithId {
    inner: Arc<dyn Resembla>,
    ids: AHashMap<String, i64>,
}

impl ResemblaWithId {
    pub fn new(inner: Arc<dyn Resembla>, corpus: &[CorpusEntry]) -> Self {
        let mut ids = AHashMap::new();
        let mut max_id = 0_i64;
        for entry in corpus {
            if ids.contains_key(&entry.text) {
                continue;
            }
            let id = match entry.id {
                Some(id) => {
                    max_id = max_id.max(id);
                    id
                }
                None => {
                    max_id += 1;
                    max_id
                }
            };
            ids.insert(entry.text.clone(), id);
        }
        info!(measure = inner.name(), texts = ids.len(), "loaded corpus ids");
        Self { inner, ids }
    }

    pub fn from_corpus(
        inner: Arc<dyn Resembla>,
        corpus_path: impl AsRef<Path>,
        columns: CorpusColumns,
    ) -> Result<Self> {
        let corpus = load_corpus(corpus_path, columns)?;
        Ok(Self::new(inner, &corpus))
    }

    pub fn id(&self, text: &str) -> Option<i64> {
        self.ids.get(text).copied()
    }

    /// Every found text must have an id
    pub fn find(
        &self,
        query: &str,
        threshold: f64,
        max_response: Option<usize>,
    ) -> Result<Vec<IdentifiedResult>> {
        self.inner
            .find(query, threshold, max_response)?
            .into_iter()
            .map(|result| {
                let id = self.id(&result.text).ok_or_else(|| ResemblaError::MissingId {
                    text: result.text.clone(),
                })?;
                Ok(IdentifiedResult {
                    result,
                    id: Some(id),
                })
            })
            .collect()
    }

    /// Candidates outside the corpus come back with no id
    pub fn eval(
        &self,
        query: &str,
        candidates: &[String],
        threshold: f64,
        max_response: Option<usize>,
    ) -> Result<Vec<IdentifiedResult>> {
        Ok(self
            .inner
            .eval(query, candidates, threshold, max_response)?
            .into_iter()
            .map(|result| IdentifiedResult {
                id: self.id(&result.text),
                result,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Echo(Vec<&'static str>);

    impl Resembla for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn find(&self, _: &str, _: f64, _: Option<usize>) -> Result<Vec<ScoredResult>> {
            Ok(self
                .0
                .iter()
                .map(|t| ScoredResult {
                    text: t.to_string(),
                    measure: "echo".into(),
                    score: 1.0,
                })
                .collect())
        }

        fn eval(&self, _: &str, candidates: &[String], _: f64, _: Option<usize>) -> Result<Vec<ScoredResult>> {
            Ok(candidates
                .iter()
                .map(|t| ScoredResult {
                    text: t.clone(),
                    measure: "echo".into(),
                    score: 0.5,
                })
                .collect())
        }
    }

    fn entry(id: Option<i64>, text: &str) -> CorpusEntry {
        CorpusEntry {
            id,
            text: text.into(),
            attributes: None,
        }
    }

    #[test]
    fn test_ids_auto_increment_after_max() {
        let corpus = vec![
            entry(Some(5), "a"),
            entry(None, "b"),
            entry(Some(2), "c"),
            entry(Some(9), "a"),
            entry(None, "d"),
        ];
        let wrapper = ResemblaWithId::new(Arc::new(Echo(vec![])), &corpus);
        assert_eq!(wrapper.id("a"), Some(5));
        assert_eq!(wrapper.id("b"), Some(6));
        assert_eq!(wrapper.id("c"), Some(2));
        assert_eq!(wrapper.id("d"), Some(7));
    }

    #[test]
    fn test_find_requires_ids() {
        let corpus = vec![entry(Some(1), "known")];
        let wrapper = ResemblaWithId::new(Arc::new(Echo(vec!["known"])), &corpus);
        assert_eq!(wrapper.find("q", 0.0, None).unwrap()[0].id, Some(1));

        let wrapper = ResemblaWithId::new(Arc::new(Echo(vec!["known", "stranger"])), &corpus);
        assert!(matches!(
            wrapper.find("q", 0.0, None),
            Err(ResemblaError::MissingId { text }) if text == "stranger"
        ));
    }

    #[test]
    fn test_eval_tolerates_unknown_texts() {
        let corpus = vec![entry(Some(1), "known")];
        let wrapper = ResemblaWithId::new(Arc::new(Echo(vec![])), &corpus);
        let results = wrapper
            .eval("q", &["known".into(), "other".into()], 0.0, None)
            .unwrap();
        let ids: Vec<Option<i64>> = results.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![Some(1), None]);
    }
}
