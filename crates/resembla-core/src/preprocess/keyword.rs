use super::{Preprocess, COLUMN_DELIMITER};
use crate::error::Result;
use crate::sequence::{KeywordText, Representation, RepresentationKind};

const ATTRIBUTE_DELIMITER: char = '&';
const KEY_VALUE_DELIMITER: char = '=';
const VALUE_DELIMITER: char = ',';
const KEYWORD_ATTRIBUTE: &str = "keyword";

/// Splits corpus entries into text and keywords
///
/// Corpus entries look like `text\tkeyword=a,b&other=x`; only the
/// `keyword` attribute is used. Queries never carry keywords.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordMatchPreprocessor;

impl KeywordMatchPreprocessor {
    fn parse(raw: &str) -> KeywordText {
        let Some((text, attributes)) = raw.split_once(COLUMN_DELIMITER) else {
            return KeywordText {
                text: raw.to_string(),
                keywords: Vec::new(),
            };
        };
        let attributes = attributes.split(COLUMN_DELIMITER).next().unwrap_or_default();

        let keywords = attributes
            .split(ATTRIBUTE_DELIMITER)
            .filter_map(|attribute| attribute.split_once(KEY_VALUE_DELIMITER))
            .find(|(key, value)| *key == KEYWORD_ATTRIBUTE && !value.contains(KEY_VALUE_DELIMITER))
            .map(|(_, value)| value.split(VALUE_DELIMITER).map(str::to_string).collect())
            .unwrap_or_default();

        KeywordText {
            text: text.to_string(),
            keywords,
        }
    }
}

impl Preprocess for KeywordMatchPreprocessor {
    fn kind(&self) -> RepresentationKind {
        RepresentationKind::Keywords
    }

    fn build(&self, text: &str, is_original: bool) -> Result<Representation> {
        let parsed = if is_original {
            Self::parse(text)
        } else {
            KeywordText {
                text: text.to_string(),
                keywords: Vec::new(),
            }
        };
        Ok(Representation::Keywords(parsed))
    }

    fn index(&self, text: &str) -> Result<String> {
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keywords(raw: &str) -> KeywordText {
        match KeywordMatchPreprocessor.build(raw, true).unwrap() {
            Representation::Keywords(k) => k,
            other => panic!("unexpected representation {:?}", other),
        }
    }

    #[test]
    fn test_parses_keyword_attribute() {
        let parsed = keywords("東京駅への行き方\tcategory=route&keyword=東京,駅");
        assert_eq!(parsed.text, "東京駅への行き方");
        assert_eq!(parsed.keywords, vec!["東京", "駅"]);
    }

    #[test]
    fn test_entries_without_keywords() {
        assert!(keywords("plain text").keywords.is_empty());
        assert!(keywords("text\tcategory=x").keywords.is_empty());
        assert_eq!(keywords("text\tcategory=x").text, "text");
    }

    #[test]
    fn test_query_has_no_keywords() {
        let built = KeywordMatchPreprocessor
            .build("text\tkeyword=a", false)
            .unwrap();
        assert_eq!(
            built,
            Representation::Keywords(KeywordText {
                text: "text\tkeyword=a".into(),
                keywords: vec![],
            })
        );
    }
}
