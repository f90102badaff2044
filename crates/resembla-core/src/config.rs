//! Configuration
//!
//! Loaded with figment from a TOML file, then overridden by `RESEMBLA_*`
//! environment variables (`__` separates nested keys, e.g.
//! `RESEMBLA_INDEX__THRESHOLD=0.3`). Every field has a default, so an empty
//! file is a valid configuration apart from `corpus_path`.
//!
//! ```toml
//! corpus_path = "corpus.tsv"
//! measures = ["weighted_word_edit_distance", "keyword_match"]
//! threshold = 0.3
//!
//! [index]
//! measure = "cosine"
//! threshold = 0.2
//!
//! [weighted_word_edit_distance]
//! ensemble_weight = 0.7
//!
//! [svr]
//! enabled = true
//! features_path = "features.tsv"
//! model_path = "model"
//! ```

use crate::corpus::CorpusColumns;
use crate::error::{ResemblaError, Result};
use crate::index::SimMeasure;
use crate::measure::MeasureKind;
use crate::pipeline::PipelineSettings;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "RESEMBLA_";
const INVERSE_SUFFIX: &str = ".inverse.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResemblaConfig {
    #[serde(default)]
    pub corpus_path: PathBuf,
    #[serde(default = "default_measures")]
    pub measures: Vec<MeasureKind>,
    /// Default response threshold for `find`
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_max_response")]
    pub max_response: usize,
    /// Reranking cap for measures that do not set their own; 0 disables
    #[serde(default = "default_max_reranking_num")]
    pub max_reranking_num: usize,
    #[serde(default)]
    pub id_col: usize,
    #[serde(default = "default_text_col")]
    pub text_col: usize,
    #[serde(default = "default_features_col")]
    pub features_col: usize,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub tokenizer: TokenizerConfig,
    #[serde(default)]
    pub edit_distance: MeasureConfig,
    #[serde(default)]
    pub weighted_word_edit_distance: WordMeasureConfig,
    #[serde(default)]
    pub weighted_pronunciation_edit_distance: PronunciationMeasureConfig,
    #[serde(default)]
    pub weighted_romaji_edit_distance: RomajiMeasureConfig,
    #[serde(default)]
    pub keyword_match: MeasureConfig,
    #[serde(default)]
    pub ensemble: EnsembleConfig,
    #[serde(default)]
    pub svr: SvrConfig,
}

fn default_measures() -> Vec<MeasureKind> {
    vec![MeasureKind::WeightedWordEditDistance]
}
fn default_threshold() -> f64 {
    0.2
}
fn default_max_response() -> usize {
    10
}
fn default_max_reranking_num() -> usize {
    1000
}
fn default_text_col() -> usize {
    1
}
fn default_features_col() -> usize {
    2
}

/// Approximate index lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub ngram_unit: usize,
    pub measure: SimMeasure,
    pub threshold: f64,
    /// Keys kept after elimination; 0 keeps every key
    pub max_candidate: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            ngram_unit: 2,
            measure: SimMeasure::Cosine,
            threshold: 0.2,
            max_candidate: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    pub enabled: bool,
    pub lowercase: bool,
}

/// Morphological analysis for word, pronunciation and romaji measures
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// `surface \t features` lexicon; whitespace splitting without it
    pub lexicon_path: Option<PathBuf>,
}

/// Settings every measure section accepts
///
/// Unset values fall back to the common section or the measure's default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasureConfig {
    pub sim_threshold: Option<f64>,
    pub max_reranking_num: Option<usize>,
    pub ensemble_weight: Option<f64>,
    pub inverse_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordMeasureConfig {
    #[serde(flatten)]
    pub common: MeasureConfig,
    pub base_weight: f64,
    pub delete_insert_ratio: f64,
    pub noun_coefficient: f64,
    pub verb_coefficient: f64,
    pub adjective_coefficient: f64,
    pub homonym_cost: f64,
}

impl Default for WordMeasureConfig {
    fn default() -> Self {
        Self {
            common: MeasureConfig::default(),
            base_weight: 1.0,
            delete_insert_ratio: 10.0,
            noun_coefficient: 10.0,
            verb_coefficient: 10.0,
            adjective_coefficient: 5.0,
            homonym_cost: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PronunciationMeasureConfig {
    #[serde(flatten)]
    pub common: MeasureConfig,
    /// Feature position holding the reading
    pub feature_pos: usize,
    /// Reading the analyzer reports for punctuation and symbols
    pub pronunciation_of_marks: String,
    pub base_weight: f64,
    pub delete_insert_ratio: f64,
    pub letter_weight_path: Option<PathBuf>,
    pub mismatch_cost_path: Option<PathBuf>,
}

impl Default for PronunciationMeasureConfig {
    fn default() -> Self {
        Self {
            common: MeasureConfig::default(),
            feature_pos: 7,
            pronunciation_of_marks: String::new(),
            base_weight: 1.0,
            delete_insert_ratio: 10.0,
            letter_weight_path: None,
            mismatch_cost_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RomajiMeasureConfig {
    #[serde(flatten)]
    pub common: MeasureConfig,
    pub feature_pos: usize,
    pub pronunciation_of_marks: String,
    pub keep_case: bool,
    pub base_weight: f64,
    pub delete_insert_ratio: f64,
    pub uppercase_coefficient: f64,
    pub lowercase_coefficient: f64,
    pub vowel_coefficient: f64,
    pub consonant_coefficient: f64,
    pub case_mismatch_cost: f64,
    pub mismatch_cost_path: Option<PathBuf>,
}

impl Default for RomajiMeasureConfig {
    fn default() -> Self {
        Self {
            common: MeasureConfig::default(),
            feature_pos: 7,
            pronunciation_of_marks: String::new(),
            keep_case: false,
            base_weight: 1.0,
            delete_insert_ratio: 10.0,
            uppercase_coefficient: 1.0,
            lowercase_coefficient: 1.0,
            vowel_coefficient: 1.0,
            consonant_coefficient: 1.0,
            case_mismatch_cost: 1.0,
            mismatch_cost_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Per-member result count during ensemble retrieval; 0 lets members
    /// use the caller's limits
    pub max_reranking_num: usize,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            max_reranking_num: 100,
        }
    }
}

/// Regression reranking over the configured measures
///
/// When enabled, the measures (or their ensemble) become the base
/// similarity feature and keyword match, if configured next to other
/// measures, becomes a feature instead of an ensemble member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvrConfig {
    pub enabled: bool,
    /// Candidates taken from the base measures; 0 means unbounded
    pub max_candidate: usize,
    /// Rows of `name\textractor\taggregator`
    pub features_path: PathBuf,
    /// Directory holding `<feature>.tsv` pattern files
    pub patterns_home: PathBuf,
    /// LIBSVM regression model
    pub model_path: PathBuf,
}

impl Default for SvrConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_candidate: 100,
            features_path: PathBuf::from("features.tsv"),
            patterns_home: PathBuf::from("."),
            model_path: PathBuf::from("model"),
        }
    }
}

impl Default for ResemblaConfig {
    fn default() -> Self {
        Self {
            corpus_path: PathBuf::new(),
            measures: default_measures(),
            threshold: default_threshold(),
            max_response: default_max_response(),
            max_reranking_num: default_max_reranking_num(),
            id_col: 0,
            text_col: default_text_col(),
            features_col: default_features_col(),
            index: IndexConfig::default(),
            normalize: NormalizeConfig::default(),
            tokenizer: TokenizerConfig::default(),
            edit_distance: MeasureConfig::default(),
            weighted_word_edit_distance: WordMeasureConfig::default(),
            weighted_pronunciation_edit_distance: PronunciationMeasureConfig::default(),
            weighted_romaji_edit_distance: RomajiMeasureConfig::default(),
            keyword_match: MeasureConfig::default(),
            ensemble: EnsembleConfig::default(),
            svr: SvrConfig::default(),
        }
    }
}

impl MeasureKind {
    /// Ensemble weight used when the measure's section sets none
    pub fn default_ensemble_weight(&self) -> f64 {
        match self {
            Self::EditDistance => 0.0,
            Self::WeightedWordEditDistance
            | Self::WeightedPronunciationEditDistance
            | Self::WeightedRomajiEditDistance => 0.5,
            Self::KeywordMatch => 0.2,
        }
    }
}

/// Inverse-map file of every enabled measure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurePaths {
    paths: BTreeMap<MeasureKind, PathBuf>,
}

impl MeasurePaths {
    pub fn inverse(&self, kind: MeasureKind) -> Option<&Path> {
        self.paths.get(&kind).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MeasureKind, &Path)> {
        self.paths.iter().map(|(k, p)| (*k, p.as_path()))
    }
}

impl ResemblaConfig {
    /// Load `path` (if any) and apply `RESEMBLA_*` overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            if !path.exists() {
                return Err(ResemblaError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document without consulting the environment
    pub fn from_toml(toml: &str) -> Result<Self> {
        let config: Self = Figment::new().merge(Toml::string(toml)).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.measures.is_empty() {
            return Err(ResemblaError::Config("at least one measure is required".into()));
        }
        if self.text_col == 0 {
            return Err(ResemblaError::Config("text_col must be 1 or greater".into()));
        }
        if self.index.ngram_unit == 0 {
            return Err(ResemblaError::Config("index.ngram_unit must be 1 or greater".into()));
        }
        for &kind in &self.measures {
            let weight = self.ensemble_weight(kind);
            if !(weight >= 0.0 && weight.is_finite()) {
                return Err(ResemblaError::Config(format!(
                    "{}.ensemble_weight must be a non-negative number, got {}",
                    kind, weight
                )));
            }
        }
        Ok(())
    }

    pub fn columns(&self) -> CorpusColumns {
        CorpusColumns {
            id_col: self.id_col,
            text_col: self.text_col,
            features_col: self.features_col,
        }
    }

    /// Settings every measure section shares
    pub fn measure(&self, kind: MeasureKind) -> &MeasureConfig {
        match kind {
            MeasureKind::EditDistance => &self.edit_distance,
            MeasureKind::WeightedWordEditDistance => &self.weighted_word_edit_distance.common,
            MeasureKind::WeightedPronunciationEditDistance => {
                &self.weighted_pronunciation_edit_distance.common
            }
            MeasureKind::WeightedRomajiEditDistance => &self.weighted_romaji_edit_distance.common,
            MeasureKind::KeywordMatch => &self.keyword_match,
        }
    }

    pub fn ensemble_weight(&self, kind: MeasureKind) -> f64 {
        self.measure(kind)
            .ensemble_weight
            .unwrap_or_else(|| kind.default_ensemble_weight())
    }

    /// Index lookup and candidate limits for one measure's pipeline
    pub fn pipeline_settings(&self, kind: MeasureKind) -> PipelineSettings {
        let section = self.measure(kind);
        let max_reranking_num = section.max_reranking_num.unwrap_or(self.max_reranking_num);
        PipelineSettings {
            sim_measure: self.index.measure,
            sim_threshold: section.sim_threshold.unwrap_or(self.index.threshold),
            max_candidate: non_zero(self.index.max_candidate),
            max_reranking_num: non_zero(max_reranking_num),
        }
    }

    /// Resolve inverse-map paths once for every enabled measure
    ///
    /// A measure without an explicit `inverse_path` uses
    /// `<corpus_path>.inverse.<measure>`.
    pub fn measure_paths(&self) -> Result<MeasurePaths> {
        let mut paths = BTreeMap::new();
        for &kind in &self.measures {
            let path = match &self.measure(kind).inverse_path {
                Some(path) => path.clone(),
                None => {
                    if self.corpus_path.as_os_str().is_empty() {
                        return Err(ResemblaError::Config(format!(
                            "corpus_path is required to locate the inverse map of {}",
                            kind
                        )));
                    }
                    let mut path = self.corpus_path.clone().into_os_string();
                    path.push(INVERSE_SUFFIX);
                    path.push(kind.name());
                    PathBuf::from(path)
                }
            };
            paths.insert(kind, path);
        }
        Ok(MeasurePaths { paths })
    }
}

fn non_zero(n: usize) -> Option<usize> {
    (n > 0).then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ResemblaConfig::from_toml("").unwrap();
        assert_eq!(config, ResemblaConfig::default());
        assert_eq!(config.measures, vec![MeasureKind::WeightedWordEditDistance]);
        assert_eq!(config.weighted_word_edit_distance.delete_insert_ratio, 10.0);
        assert_eq!(config.ensemble_weight(MeasureKind::KeywordMatch), 0.2);
    }

    #[test]
    fn test_sections_override_common_values() {
        let config = ResemblaConfig::from_toml(
            r#"
            corpus_path = "data/corpus.tsv"
            measures = ["edit_distance", "weighted_romaji_edit_distance"]
            max_reranking_num = 50

            [index]
            measure = "dice"
            threshold = 0.4
            max_candidate = 20

            [weighted_romaji_edit_distance]
            sim_threshold = 0.1
            max_reranking_num = 0
            ensemble_weight = 0.9
            case_mismatch_cost = 0.3
            "#,
        )
        .unwrap();

        let romaji = config.pipeline_settings(MeasureKind::WeightedRomajiEditDistance);
        assert_eq!(
            romaji,
            PipelineSettings {
                sim_measure: SimMeasure::Dice,
                sim_threshold: 0.1,
                max_candidate: Some(20),
                max_reranking_num: None,
            }
        );
        assert_eq!(config.weighted_romaji_edit_distance.case_mismatch_cost, 0.3);
        assert_eq!(config.ensemble_weight(MeasureKind::WeightedRomajiEditDistance), 0.9);

        let edit = config.pipeline_settings(MeasureKind::EditDistance);
        assert_eq!(edit.sim_threshold, 0.4);
        assert_eq!(edit.max_reranking_num, Some(50));
    }

    #[test]
    fn test_svr_section() {
        let config = ResemblaConfig::from_toml(
            r#"
            [svr]
            enabled = true
            model_path = "models/svr"
            "#,
        )
        .unwrap();
        assert!(config.svr.enabled);
        assert_eq!(config.svr.model_path, PathBuf::from("models/svr"));
        assert_eq!(config.svr.features_path, PathBuf::from("features.tsv"));
        assert_eq!(config.svr.max_candidate, 100);
    }

    #[test]
    fn test_measure_paths() {
        let config = ResemblaConfig::from_toml(
            r#"
            corpus_path = "corpus.tsv"
            measures = ["edit_distance", "keyword_match"]

            [keyword_match]
            inverse_path = "/srv/keywords.inverse"
            "#,
        )
        .unwrap();
        let paths = config.measure_paths().unwrap();
        assert_eq!(
            paths.inverse(MeasureKind::EditDistance),
            Some(Path::new("corpus.tsv.inverse.edit_distance"))
        );
        assert_eq!(
            paths.inverse(MeasureKind::KeywordMatch),
            Some(Path::new("/srv/keywords.inverse"))
        );
        assert_eq!(paths.inverse(MeasureKind::WeightedWordEditDistance), None);
    }

    #[test]
    fn test_invalid_configurations() {
        assert!(matches!(
            ResemblaConfig::from_toml("measures = []"),
            Err(ResemblaError::Config(_))
        ));
        assert!(matches!(
            ResemblaConfig::from_toml("measures = [\"levenshtein\"]"),
            Err(ResemblaError::Config(_))
        ));
        assert!(matches!(
            ResemblaConfig::from_toml("[keyword_match]\nensemble_weight = -1.0"),
            Err(ResemblaError::Config(_))
        ));
        assert!(matches!(
            ResemblaConfig::default().measure_paths(),
            Err(ResemblaError::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("resembla.toml", "threshold = 0.5\n[index]\nngram_unit = 3")?;
            jail.set_env("RESEMBLA_INDEX__NGRAM_UNIT", "4");
            let config = ResemblaConfig::load(Some(Path::new("resembla.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.threshold, 0.5);
            assert_eq!(config.index.ngram_unit, 4);
            Ok(())
        });
    }
}
