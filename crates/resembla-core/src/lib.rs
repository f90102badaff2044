//! Resembla core engine
//!
//! Similar-sentence retrieval in two phases: an approximate n-gram index
//! proposes candidate texts, then an exact similarity measure reranks them.
//!
//! # Pieces
//!
//! - [`preprocess`] turns text into a [`sequence::Representation`] and an
//!   index key; [`measure::Scorer`] compares two representations
//! - [`Eliminator`] prunes candidates with a bit-parallel edit distance
//! - [`reranker::rerank`] sorts and cuts scored candidates
//! - [`BoundedResembla`] runs one measure end to end; [`ResemblaEnsemble`]
//!   and [`ResemblaRegression`] combine several
//! - [`construct_resembla`] assembles everything from a [`ResemblaConfig`]
//!
//! # Example
//!
//! ```no_run
//! use resembla_core::{construct_resembla, ResemblaConfig, SharedTokenizer, WhitespaceTokenizer};
//!
//! let config = ResemblaConfig::load(Some("resembla.toml".as_ref()))?;
//! let resembla = construct_resembla(&config, SharedTokenizer::new(WhitespaceTokenizer))?;
//! for result in resembla.find("東京駅への行き方", config.threshold, Some(config.max_response))? {
//!     println!("{:.3}\t{}", result.score, result.text);
//! }
//! # Ok::<(), resembla_core::ResemblaError>(())
//! ```

pub mod builder;
pub mod config;
pub mod corpus;
pub mod eliminator;
pub mod ensemble;
pub mod error;
pub mod index;
pub mod inverse;
pub mod measure;
pub mod normalize;
pub mod pipeline;
pub mod preprocess;
pub mod regression;
pub mod reranker;
pub mod sequence;
pub mod table;
pub mod tokenizer;
pub mod with_id;

// Re-export main types at crate root
pub use builder::{build_inverse_files, build_normalizer, build_tokenizer, construct_resembla};
pub use config::{MeasurePaths, ResemblaConfig, SvrConfig};
pub use corpus::{load_corpus, CorpusColumns, CorpusEntry};
pub use eliminator::Eliminator;
pub use ensemble::ResemblaEnsemble;
pub use error::{ResemblaError, Result};
pub use index::{ApproximateIndex, LockedIndex, NgramIndex, SimMeasure};
pub use inverse::InverseMap;
pub use measure::{MeasureKind, Scorer};
pub use normalize::{TextNormalizer, UnicodeNormalizer};
pub use pipeline::{BoundedResembla, PipelineSettings, Resembla, ScoredResult};
pub use regression::{ResemblaRegression, SvrPredictor};
pub use tokenizer::{LexiconTokenizer, SharedTokenizer, Tokenizer, WhitespaceTokenizer};
pub use with_id::{IdentifiedResult, ResemblaWithId};
