//! Assemble pipelines from configuration

use crate::config::{MeasurePaths, NormalizeConfig, ResemblaConfig, TokenizerConfig};
use crate::corpus::load_corpus;
use crate::ensemble::ResemblaEnsemble;
use crate::error::{ResemblaError, Result};
use crate::index::{LockedIndex, NgramIndex};
use crate::inverse::{build_inverse_entries, write_inverse, InverseMap};
use crate::measure::{
    EditDistance, KanaMismatchCost, KeywordMatcher, LetterCost, MeasureKind, RomajiMismatchCost,
    Scorer, UniformCost, WeightedEdit, WeightedEditDistance, WordMismatchCost,
};
use crate::normalize::{TextNormalizer, UnicodeNormalizer};
use crate::pipeline::{BoundedResembla, Resembla};
use crate::regression::{
    load_feature_definitions, Aggregation, FeatureAggregator, FeatureExtractor, PatternFeature,
    RegressionScorer, ResemblaRegression, SvrPredictor,
};
use crate::preprocess::{
    AsIsPreprocessor, KeywordMatchPreprocessor, Preprocess, PronunciationPreprocessor,
    RomajiPreprocessor, WeightedSequenceBuilder, WordPreprocessor,
};
use crate::sequence::{LetterWeight, RomajiWeight, WordWeight};
use crate::tokenizer::{LexiconTokenizer, SharedTokenizer, WhitespaceTokenizer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

const ENSEMBLE_NAME: &str = "ensemble";
const SVR_NAME: &str = "svr";

/// A preprocessor and the scorer that compares its output
pub struct Measure {
    pub preprocessor: Arc<dyn Preprocess>,
    pub scorer: Scorer,
}

pub fn build_tokenizer(config: &TokenizerConfig) -> Result<SharedTokenizer> {
    match &config.lexicon_path {
        Some(path) => Ok(SharedTokenizer::new(LexiconTokenizer::from_table(path)?)),
        None => Ok(SharedTokenizer::new(WhitespaceTokenizer)),
    }
}

pub fn build_normalizer(config: &NormalizeConfig) -> Option<Arc<dyn TextNormalizer>> {
    config.enabled.then(|| {
        Arc::new(UnicodeNormalizer {
            lowercase: config.lowercase,
        }) as Arc<dyn TextNormalizer>
    })
}

/// Build the preprocessor and scorer of one measure, loading its tables
pub fn build_measure(
    config: &ResemblaConfig,
    kind: MeasureKind,
    tokenizer: &SharedTokenizer,
) -> Result<Measure> {
    let measure = match kind {
        MeasureKind::EditDistance => Measure {
            preprocessor: Arc::new(AsIsPreprocessor),
            scorer: Scorer::UniformEdit(EditDistance::new(UniformCost)),
        },
        MeasureKind::WeightedWordEditDistance => {
            let c = &config.weighted_word_edit_distance;
            let weight = WordWeight {
                base_weight: c.base_weight,
                delete_insert_ratio: c.delete_insert_ratio,
                noun_coefficient: c.noun_coefficient,
                verb_coefficient: c.verb_coefficient,
                adjective_coefficient: c.adjective_coefficient,
            };
            let cost = WordMismatchCost {
                homonym_cost: c.homonym_cost,
            };
            Measure {
                preprocessor: Arc::new(WeightedSequenceBuilder::new(
                    WordPreprocessor::new(tokenizer.clone()),
                    weight,
                )),
                scorer: Scorer::WeightedEdit(WeightedEdit::Words(WeightedEditDistance::new(cost))),
            }
        }
        MeasureKind::WeightedPronunciationEditDistance => {
            let c = &config.weighted_pronunciation_edit_distance;
            let source = PronunciationPreprocessor::new(
                tokenizer.clone(),
                c.feature_pos,
                c.pronunciation_of_marks.as_str(),
            );
            let weight = match &c.letter_weight_path {
                Some(path) => LetterWeight::from_table(c.base_weight, c.delete_insert_ratio, path)?,
                None => LetterWeight::new(c.base_weight, c.delete_insert_ratio),
            };
            let cost = match &c.mismatch_cost_path {
                Some(path) => LetterCost::Kana(KanaMismatchCost::from_table(path)?),
                None => LetterCost::Uniform,
            };
            Measure {
                preprocessor: Arc::new(WeightedSequenceBuilder::new(source, weight)),
                scorer: Scorer::WeightedEdit(WeightedEdit::Letters(WeightedEditDistance::new(cost))),
            }
        }
        MeasureKind::WeightedRomajiEditDistance => {
            let c = &config.weighted_romaji_edit_distance;
            let source = RomajiPreprocessor::new(
                PronunciationPreprocessor::new(
                    tokenizer.clone(),
                    c.feature_pos,
                    c.pronunciation_of_marks.as_str(),
                ),
                c.keep_case,
            );
            let weight = RomajiWeight {
                base_weight: c.base_weight,
                delete_insert_ratio: c.delete_insert_ratio,
                uppercase_coefficient: c.uppercase_coefficient,
                lowercase_coefficient: c.lowercase_coefficient,
                vowel_coefficient: c.vowel_coefficient,
                consonant_coefficient: c.consonant_coefficient,
            };
            let cost = match &c.mismatch_cost_path {
                Some(path) => RomajiMismatchCost::from_table(path, c.case_mismatch_cost)?,
                None => RomajiMismatchCost::new(c.case_mismatch_cost),
            };
            Measure {
                preprocessor: Arc::new(WeightedSequenceBuilder::new(source, weight)),
                scorer: Scorer::WeightedEdit(WeightedEdit::Letters(WeightedEditDistance::new(
                    LetterCost::Romaji(cost),
                ))),
            }
        }
        MeasureKind::KeywordMatch => Measure {
            preprocessor: Arc::new(KeywordMatchPreprocessor),
            scorer: Scorer::KeywordMatch(KeywordMatcher),
        },
    };
    Ok(measure)
}

/// Build the pipeline of one measure over its inverse map
pub fn construct_pipeline(
    config: &ResemblaConfig,
    kind: MeasureKind,
    paths: &MeasurePaths,
    tokenizer: &SharedTokenizer,
) -> Result<BoundedResembla> {
    let path = paths
        .inverse(kind)
        .ok_or_else(|| ResemblaError::Config(format!("no inverse map resolved for {}", kind)))?;
    let Measure {
        preprocessor,
        scorer,
    } = build_measure(config, kind, tokenizer)?;

    let inverse = InverseMap::load(path, preprocessor.kind())?;
    let index = NgramIndex::from_keys(config.index.ngram_unit, inverse.keys());

    let pipeline = BoundedResembla::new(
        kind.name(),
        LockedIndex::new(index),
        inverse,
        preprocessor,
        scorer,
        config.pipeline_settings(kind),
    )?;
    Ok(match build_normalizer(&config.normalize) {
        Some(normalizer) => pipeline.with_normalizer(normalizer),
        None => pipeline,
    })
}

/// Build every configured measure; several measures form an ensemble
///
/// Ensemble members with weight 0 are left out. With `svr.enabled` the
/// result is reranked by regression over the measures' scores.
pub fn construct_resembla(
    config: &ResemblaConfig,
    tokenizer: SharedTokenizer,
) -> Result<Arc<dyn Resembla>> {
    config.validate()?;
    let paths = config.measure_paths()?;

    // under regression, keyword match is a feature rather than a member
    let keyword_feature = config.svr.enabled
        && config.measures.len() > 1
        && config.measures.contains(&MeasureKind::KeywordMatch);
    let members: Vec<MeasureKind> = config
        .measures
        .iter()
        .copied()
        .filter(|&kind| !(keyword_feature && kind == MeasureKind::KeywordMatch))
        .collect();
    let base = construct_base(config, &members, &paths, &tokenizer)?;
    if !config.svr.enabled {
        return Ok(base);
    }

    let keyword = if keyword_feature {
        let pipeline = construct_pipeline(config, MeasureKind::KeywordMatch, &paths, &tokenizer)?;
        Some(Arc::new(pipeline) as Arc<dyn Resembla>)
    } else {
        None
    };
    Ok(Arc::new(construct_regression(config, base, keyword)?))
}

fn construct_base(
    config: &ResemblaConfig,
    kinds: &[MeasureKind],
    paths: &MeasurePaths,
    tokenizer: &SharedTokenizer,
) -> Result<Arc<dyn Resembla>> {
    if let [kind] = kinds {
        return Ok(Arc::new(construct_pipeline(config, *kind, paths, tokenizer)?));
    }

    let max_reranking_num = (config.ensemble.max_reranking_num > 0)
        .then_some(config.ensemble.max_reranking_num);
    let mut ensemble = ResemblaEnsemble::new(ENSEMBLE_NAME, max_reranking_num);
    for &kind in kinds {
        let weight = config.ensemble_weight(kind);
        if weight <= 0.0 {
            warn!(measure = %kind, "skipping ensemble member with zero weight");
            continue;
        }
        let member = construct_pipeline(config, kind, paths, tokenizer)?;
        ensemble.append(Arc::new(member), weight)?;
    }
    info!(members = ensemble.len(), total_weight = ensemble.total_weight(), "constructed ensemble");
    Ok(Arc::new(ensemble))
}

/// Regression over `base` and, when given, keyword match scores
///
/// The first feature definition names the base similarity feature.
pub fn construct_regression(
    config: &ResemblaConfig,
    base: Arc<dyn Resembla>,
    keyword: Option<Arc<dyn Resembla>>,
) -> Result<ResemblaRegression> {
    let svr = &config.svr;
    let definitions = load_feature_definitions(&svr.features_path)?;
    let Some((base_definition, rest)) = definitions.split_first() else {
        return Err(ResemblaError::Config("svr needs at least one feature".into()));
    };
    let base_feature = base_definition.name.clone();

    let mut aggregator = FeatureAggregator::new().with(base_feature.as_str(), Aggregation::Passthrough);
    let mut extractor = FeatureExtractor::new();
    for definition in rest {
        aggregator = aggregator.with(definition.name.as_str(), definition.aggregation);
        if definition.extracted {
            let path = svr.patterns_home.join(format!("{}.tsv", definition.name));
            extractor.append(definition.name.as_str(), PatternFeature::from_table(path)?);
        }
    }

    let names = definitions.into_iter().map(|d| d.name).collect();
    let predictor = SvrPredictor::load(names, &svr.model_path)?;
    let corpus = load_corpus(&config.corpus_path, config.columns())?;

    let max_candidate = (svr.max_candidate > 0).then_some(svr.max_candidate);
    let mut regression = ResemblaRegression::new(
        SVR_NAME,
        base.clone(),
        RegressionScorer::new(aggregator, Arc::new(predictor)),
        max_candidate,
    )
    .with_extractor(extractor)
    .with_corpus_features(&corpus)?;
    regression.append(base_feature, base);
    if let Some(keyword) = keyword {
        regression.append(MeasureKind::KeywordMatch.name(), keyword);
    }
    Ok(regression)
}

/// Inverse-map file written for one measure
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSummary {
    pub measure: MeasureKind,
    pub path: PathBuf,
    pub rows: usize,
}

/// Build and write the inverse maps of every configured measure
///
/// Rows carry cached representations so pipelines skip preprocessing
/// corpus texts at query time.
pub fn build_inverse_files(
    config: &ResemblaConfig,
    tokenizer: &SharedTokenizer,
) -> Result<Vec<IndexSummary>> {
    config.validate()?;
    let paths = config.measure_paths()?;
    let corpus = load_corpus(&config.corpus_path, config.columns())?;
    let normalizer = build_normalizer(&config.normalize);
    info!(path = %config.corpus_path.display(), entries = corpus.len(), "loaded corpus");

    let mut summaries = Vec::new();
    for (kind, path) in paths.iter() {
        let measure = build_measure(config, kind, tokenizer)?;
        let entries = build_inverse_entries(
            &corpus,
            measure.preprocessor.as_ref(),
            normalizer.as_deref(),
            true,
        )?;
        write_inverse(path, &entries)?;
        info!(measure = %kind, path = %path.display(), rows = entries.len(), "wrote inverse map");
        summaries.push(IndexSummary {
            measure: kind,
            path: path.to_path_buf(),
            rows: entries.len(),
        });
    }
    Ok(summaries)
}
