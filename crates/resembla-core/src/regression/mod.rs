//! Regression reranking
//!
//! Candidates from a base pipeline are described by a [`FeatureMap`]: the
//! eval scores of named child pipelines, numeric corpus attributes and
//! features extracted from the text. The query gets extracted features too.
//! A [`FeatureAggregator`] merges candidate and query features and a
//! [`Predictor`] turns the merged map into the final score.

mod extract;
mod svr;

pub use extract::{FeatureExtractor, PatternFeature};
pub use svr::{Kernel, SvrPredictor};

use crate::corpus::CorpusEntry;
use crate::error::{ResemblaError, Result};
use crate::measure::Scorer;
use crate::pipeline::{Resembla, ScoredResult};
use crate::reranker::{rerank, Candidate};
use crate::sequence::{FeatureMap, Representation};
use crate::table::TsvTable;
use ahash::AHashMap;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

const ATTRIBUTE_DELIMITER: char = '&';
const KEY_VALUE_DELIMITER: char = '=';

/// Maps aggregated features to a similarity
pub trait Predictor: Send + Sync + fmt::Debug {
    fn predict(&self, features: &FeatureMap) -> Result<f64>;
}

/// How a feature present on both sides is merged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Agreement of two values in `[-1, 1]`
    Real,
    /// Keep the candidate's value
    Passthrough,
}

impl FromStr for Aggregation {
    type Err = ResemblaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "real" => Ok(Self::Real),
            "-" => Ok(Self::Passthrough),
            other => Err(ResemblaError::Config(format!("unknown feature aggregator '{}'", other))),
        }
    }
}

impl Aggregation {
    fn apply(&self, candidate: f64, query: f64) -> f64 {
        match self {
            Self::Real => {
                let agreement = (candidate.abs() + query.abs() - 2.0 * (candidate - query).abs()) / 2.0;
                agreement.clamp(-1.0, 1.0)
            }
            Self::Passthrough => candidate,
        }
    }
}

/// Merges candidate and query features; only registered keys survive
#[derive(Debug, Clone, Default)]
pub struct FeatureAggregator {
    functions: BTreeMap<String, Aggregation>,
}

impl FeatureAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, aggregation: Aggregation) -> Self {
        self.functions.insert(key.into(), aggregation);
        self
    }

    pub fn aggregate(&self, candidate: &FeatureMap, query: &FeatureMap) -> FeatureMap {
        let mut merged = FeatureMap::new();
        for (key, aggregation) in &self.functions {
            let value = match (candidate.get(key), query.get(key)) {
                (Some(&c), Some(&q)) => aggregation.apply(c, q),
                (Some(&c), None) => c,
                (None, Some(&q)) => q,
                (None, None) => continue,
            };
            merged.insert(key.clone(), value);
        }
        merged
    }
}

/// Aggregate then predict, clamped to `[0, 1]`
#[derive(Debug, Clone)]
pub struct RegressionScorer {
    aggregator: FeatureAggregator,
    predictor: Arc<dyn Predictor>,
}

impl RegressionScorer {
    pub fn new(aggregator: FeatureAggregator, predictor: Arc<dyn Predictor>) -> Self {
        Self {
            aggregator,
            predictor,
        }
    }

    pub fn score(&self, query: &FeatureMap, candidate: &FeatureMap) -> Result<f64> {
        let merged = self.aggregator.aggregate(candidate, query);
        let prediction = self.predictor.predict(&merged)?;
        if !prediction.is_finite() {
            return Err(ResemblaError::Prediction(format!(
                "predictor returned {} for features {:?}",
                prediction, merged
            )));
        }
        Ok(prediction.clamp(0.0, 1.0))
    }
}

/// Reranks a base pipeline's candidates by regression over child scores
pub struct ResemblaRegression {
    name: String,
    base: Arc<dyn Resembla>,
    children: Vec<(String, Arc<dyn Resembla>)>,
    scorer: Scorer,
    corpus_features: AHashMap<String, FeatureMap>,
    extractor: FeatureExtractor,
    max_candidate: Option<usize>,
}

impl ResemblaRegression {
    /// `max_candidate` bounds how many texts the base pipeline hands over
    pub fn new(
        name: impl Into<String>,
        base: Arc<dyn Resembla>,
        scorer: RegressionScorer,
        max_candidate: Option<usize>,
    ) -> Self {
        let name = name.into();
        info!(measure = %name, base = base.name(), "constructed regression reranker");
        Self {
            name,
            base,
            children: Vec::new(),
            scorer: Scorer::Regression(scorer),
            corpus_features: AHashMap::new(),
            extractor: FeatureExtractor::new(),
            max_candidate,
        }
    }

    /// Extract text features from the query and from candidates lacking them
    pub fn with_extractor(mut self, extractor: FeatureExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Add a pipeline whose eval score becomes feature `key`
    pub fn append(&mut self, key: impl Into<String>, child: Arc<dyn Resembla>) {
        self.children.push((key.into(), child));
    }

    /// Load numeric `key=value&...` attributes of corpus entries as features
    pub fn with_corpus_features(mut self, corpus: &[CorpusEntry]) -> Result<Self> {
        for entry in corpus {
            let Some(attributes) = &entry.attributes else {
                continue;
            };
            let features = parse_features(attributes)?;
            if !features.is_empty() {
                self.corpus_features.entry(entry.text.clone()).or_insert(features);
            }
        }
        debug!(measure = %self.name, texts = self.corpus_features.len(), "loaded corpus features");
        Ok(self)
    }
}

/// How one regression feature is obtained and merged
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDefinition {
    pub name: String,
    /// Feature computed from text patterns in `<patterns_home>/<name>.tsv`
    pub extracted: bool,
    pub aggregation: Aggregation,
}

/// Read a feature definition file of `name\textractor\taggregator` rows
///
/// The first row names the base similarity feature. Extractor `re` reads a
/// pattern file and `-` means the value comes from a child score or a corpus
/// attribute. Rows without exactly three columns are skipped.
pub fn load_feature_definitions(path: impl AsRef<Path>) -> Result<Vec<FeatureDefinition>> {
    let table = TsvTable::read(path, 3)?;
    let mut definitions = Vec::new();
    for row in table.rows().iter().filter(|row| row.columns.len() == 3) {
        let invalid = |reason: String| ResemblaError::table(table.path(), row.line, reason);
        let name = row.columns[0].clone();
        let extracted = match row.columns[1].as_str() {
            "re" => true,
            "-" => false,
            other => return Err(invalid(format!("unsupported feature extractor '{}'", other))),
        };
        let aggregation = row.columns[2]
            .parse::<Aggregation>()
            .map_err(|e| invalid(e.to_string()))?;
        definitions.push(FeatureDefinition {
            name,
            extracted,
            aggregation,
        });
    }
    if definitions.is_empty() {
        return Err(ResemblaError::Config(format!(
            "no feature defined in '{}'",
            table.path().display()
        )));
    }
    Ok(definitions)
}

/// Parse `key=value&key=value`; pairs with a non-numeric value are ignored
fn parse_features(attributes: &str) -> Result<FeatureMap> {
    let mut features = FeatureMap::new();
    for pair in attributes.split(ATTRIBUTE_DELIMITER) {
        let Some((key, value)) = pair.split_once(KEY_VALUE_DELIMITER) else {
            continue;
        };
        if key.is_empty() {
            return Err(ResemblaError::Config(format!(
                "feature attribute without a name: '{}'",
                pair
            )));
        }
        if let Ok(value) = value.trim().parse::<f64>() {
            features.insert(key.to_string(), value);
        }
    }
    Ok(features)
}

impl Resembla for ResemblaRegression {
    fn name(&self) -> &str {
        &self.name
    }

    fn find(
        &self,
        query: &str,
        threshold: f64,
        max_response: Option<usize>,
    ) -> Result<Vec<ScoredResult>> {
        let limit = match (self.max_candidate, max_response) {
            (Some(c), Some(r)) => Some(c.max(r)),
            (Some(c), None) => Some(c),
            (None, _) => None,
        };
        let candidates: Vec<String> = self
            .base
            .find(query, 0.0, limit)?
            .into_iter()
            .map(|r| r.text)
            .collect();
        self.eval(query, &candidates, threshold, max_response)
    }

    fn eval(
        &self,
        query: &str,
        candidates: &[String],
        threshold: f64,
        max_response: Option<usize>,
    ) -> Result<Vec<ScoredResult>> {
        let mut features: Vec<FeatureMap> = candidates
            .iter()
            .map(|c| {
                let mut f = self.corpus_features.get(c).cloned().unwrap_or_default();
                self.extractor.complete(c, &mut f);
                f
            })
            .collect();
        let positions: AHashMap<&str, usize> = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();

        for (key, child) in &self.children {
            for r in child.eval(query, candidates, 0.0, None)? {
                if let Some(&i) = positions.get(r.text.as_str()) {
                    features[i].insert(key.clone(), r.score);
                }
            }
        }

        let query = Representation::Features(self.extractor.extract(query));
        let candidates: Vec<Candidate<'_, Representation>> = candidates
            .iter()
            .zip(features)
            .map(|(text, f)| Candidate::built(text.as_str(), Representation::Features(f)))
            .collect();
        let ranked = rerank(
            &query,
            &candidates,
            |candidate, query| self.scorer.score(candidate, query),
            threshold,
            max_response,
        )?;

        Ok(ranked
            .into_iter()
            .map(|r| ScoredResult {
                text: r.text,
                measure: self.name.clone(),
                score: r.score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    /// `bias + Σ weight · feature`; absent features count as 0
    #[derive(Debug, Clone, Default)]
    struct LinearPredictor {
        bias: f64,
        weights: FeatureMap,
    }

    impl Predictor for LinearPredictor {
        fn predict(&self, features: &FeatureMap) -> Result<f64> {
            Ok(self.bias
                + self
                    .weights
                    .iter()
                    .map(|(k, w)| w * features.get(k).copied().unwrap_or(0.0))
                    .sum::<f64>())
        }
    }

    fn features(pairs: &[(&str, f64)]) -> FeatureMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_real_aggregation() {
        assert_eq!(Aggregation::Real.apply(0.5, 0.5), 0.5);
        assert_eq!(Aggregation::Real.apply(1.0, 0.0), -0.5);
        assert_eq!(Aggregation::Real.apply(3.0, -3.0), -1.0);
        assert_eq!(Aggregation::Passthrough.apply(0.2, 0.9), 0.2);
    }

    #[test]
    fn test_aggregator_keeps_registered_keys() {
        let aggregator = FeatureAggregator::new()
            .with("sim", Aggregation::Passthrough)
            .with("len", Aggregation::Real)
            .with("absent", Aggregation::Real);
        let merged = aggregator.aggregate(
            &features(&[("sim", 0.7), ("len", 0.5), ("extra", 1.0)]),
            &features(&[("len", 0.5), ("sim", 0.1)]),
        );
        assert_eq!(merged, features(&[("len", 0.5), ("sim", 0.7)]));

        let one_sided = aggregator.aggregate(&FeatureMap::new(), &features(&[("len", 0.3)]));
        assert_eq!(one_sided, features(&[("len", 0.3)]));
    }

    #[test]
    fn test_scorer_clamps_prediction() {
        let predictor = LinearPredictor {
            bias: 0.5,
            weights: features(&[("sim", 2.0)]),
        };
        let scorer = RegressionScorer::new(
            FeatureAggregator::new().with("sim", Aggregation::Passthrough),
            Arc::new(predictor),
        );
        let empty = FeatureMap::new();
        assert_eq!(scorer.score(&empty, &features(&[("sim", 0.9)])).unwrap(), 1.0);
        assert_eq!(scorer.score(&empty, &features(&[("sim", -0.5)])).unwrap(), 0.0);
        assert!((scorer.score(&empty, &features(&[("sim", 0.1)])).unwrap() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_parse_features_skips_text_values() {
        assert_eq!(
            parse_features("keyword=a,b&popularity=0.25").unwrap(),
            features(&[("popularity", 0.25)])
        );
        assert!(matches!(parse_features("=1"), Err(ResemblaError::Config(_))));
    }

    #[test]
    fn test_feature_definitions() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "base_similarity\t-\t-").unwrap();
        writeln!(file, "weather\tre\treal").unwrap();
        writeln!(file, "short\trow").unwrap();
        writeln!(file, "popularity\t-\t-").unwrap();
        let definitions = load_feature_definitions(file.path()).unwrap();
        assert_eq!(
            definitions,
            vec![
                FeatureDefinition {
                    name: "base_similarity".into(),
                    extracted: false,
                    aggregation: Aggregation::Passthrough,
                },
                FeatureDefinition {
                    name: "weather".into(),
                    extracted: true,
                    aggregation: Aggregation::Real,
                },
                FeatureDefinition {
                    name: "popularity".into(),
                    extracted: false,
                    aggregation: Aggregation::Passthrough,
                },
            ]
        );
    }

    #[test]
    fn test_feature_definitions_reject_unknown_kinds() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "base_similarity\t-\t-").unwrap();
        writeln!(file, "when\tdate_period\tinterval").unwrap();
        assert!(matches!(
            load_feature_definitions(file.path()),
            Err(ResemblaError::Table { line: 2, .. })
        ));

        let empty = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            load_feature_definitions(empty.path()),
            Err(ResemblaError::Config(_))
        ));
    }

    #[derive(Debug)]
    struct Broken;

    impl Predictor for Broken {
        fn predict(&self, _: &FeatureMap) -> Result<f64> {
            Ok(f64::NAN)
        }
    }

    #[test]
    fn test_non_finite_prediction_is_an_error() {
        let scorer = RegressionScorer::new(FeatureAggregator::new(), Arc::new(Broken));
        let empty = FeatureMap::new();
        assert!(matches!(
            scorer.score(&empty, &empty),
            Err(ResemblaError::Prediction(_))
        ));
    }

    struct Fixed(Vec<(&'static str, f64)>);

    impl Resembla for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn find(&self, _: &str, _: f64, max_response: Option<usize>) -> Result<Vec<ScoredResult>> {
            Ok(self
                .0
                .iter()
                .take(max_response.unwrap_or(usize::MAX))
                .map(|(t, s)| ScoredResult {
                    text: t.to_string(),
                    measure: "fixed".into(),
                    score: *s,
                })
                .collect())
        }

        fn eval(
            &self,
            query: &str,
            candidates: &[String],
            _: f64,
            _: Option<usize>,
        ) -> Result<Vec<ScoredResult>> {
            let mut results = self.find(query, 0.0, None)?;
            results.retain(|r| candidates.contains(&r.text));
            Ok(results)
        }
    }

    #[test]
    fn test_child_scores_drive_ranking() {
        let base: Arc<dyn Resembla> = Arc::new(Fixed(vec![("a", 0.9), ("b", 0.8), ("c", 0.7)]));
        let child: Arc<dyn Resembla> = Arc::new(Fixed(vec![("a", 0.1), ("b", 0.6), ("c", 0.3)]));
        let scorer = RegressionScorer::new(
            FeatureAggregator::new()
                .with("child", Aggregation::Passthrough)
                .with("bonus", Aggregation::Passthrough),
            Arc::new(LinearPredictor {
                bias: 0.0,
                weights: features(&[("child", 1.0), ("bonus", 1.0)]),
            }),
        );
        let corpus = vec![CorpusEntry {
            id: None,
            text: "c".into(),
            attributes: Some("bonus=0.5".into()),
        }];
        let mut regression = ResemblaRegression::new("regression", base, scorer, Some(3))
            .with_corpus_features(&corpus)
            .unwrap();
        regression.append("child", child);

        let results = regression.find("q", 0.2, None).unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["c", "b"]);
        assert!((results[0].score - 0.8).abs() < 1e-12);
        assert!(results.iter().all(|r| r.measure == "regression"));
    }

    #[test]
    fn test_query_features_meet_candidate_features() {
        let base: Arc<dyn Resembla> = Arc::new(Fixed(vec![("明日の天気", 0.5), ("駅への行き方", 0.5)]));
        let scorer = RegressionScorer::new(
            FeatureAggregator::new().with("weather", Aggregation::Real),
            Arc::new(LinearPredictor {
                bias: 0.0,
                weights: features(&[("weather", 1.0)]),
            }),
        );
        let mut extractor = FeatureExtractor::new();
        extractor.append("weather", PatternFeature::new([(1.0, ".*天気.*")]).unwrap());
        let regression =
            ResemblaRegression::new("regression", base, scorer, None).with_extractor(extractor);

        // agreement of 1 and 1 is 1; of 1 and 0 is -0.5, clamped to 0
        let results = regression.find("今日の天気", 0.0, None).unwrap();
        let scored: Vec<(&str, f64)> = results.iter().map(|r| (r.text.as_str(), r.score)).collect();
        assert_eq!(scored, vec![("明日の天気", 1.0), ("駅への行き方", 0.0)]);
    }
}
