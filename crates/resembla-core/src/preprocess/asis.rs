use super::{original_text, Preprocess};
use crate::error::Result;
use crate::sequence::{Representation, RepresentationKind};

/// Uses the characters of the text itself
#[derive(Debug, Clone, Copy, Default)]
pub struct AsIsPreprocessor;

impl Preprocess for AsIsPreprocessor {
    fn kind(&self) -> RepresentationKind {
        RepresentationKind::Symbols
    }

    fn build(&self, text: &str, is_original: bool) -> Result<Representation> {
        Ok(Representation::Symbols(
            original_text(text, is_original).chars().collect(),
        ))
    }

    fn index(&self, text: &str) -> Result<String> {
        Ok(text.to_string())
    }
}
