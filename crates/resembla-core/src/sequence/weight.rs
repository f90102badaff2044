//! Token weighting policies
//!
//! A weight is the cost of inserting or deleting a token. Weighting is
//! independent of tokenization: the same policy can weight the output of
//! any preprocessor that emits its token type.

use super::Word;
use crate::error::Result;
use crate::table::TsvTable;
use ahash::AHashMap;
use std::path::Path;

/// Maps `(token, is_original, sequence_length, position)` to a weight
pub trait WeightFunction<T>: Send + Sync {
    fn weight(&self, token: &T, is_original: bool, total: usize, position: usize) -> f64;
}

/// Same weight for every token
#[derive(Debug, Clone, Copy)]
pub struct UniformWeight {
    pub weight: f64,
}

impl Default for UniformWeight {
    fn default() -> Self {
        Self { weight: 1.0 }
    }
}

impl<T> WeightFunction<T> for UniformWeight {
    fn weight(&self, _: &T, _: bool, _: usize, _: usize) -> f64 {
        self.weight
    }
}

/// Per-letter weights from a `letters \t weight` table
#[derive(Debug, Clone)]
pub struct LetterWeight {
    base_weight: f64,
    delete_insert_ratio: f64,
    letters: AHashMap<char, f64>,
}

impl LetterWeight {
    pub fn new(base_weight: f64, delete_insert_ratio: f64) -> Self {
        Self {
            base_weight,
            delete_insert_ratio,
            letters: AHashMap::new(),
        }
    }

    /// Load letter weights; every letter of a row's first column gets that row's weight
    pub fn from_table(
        base_weight: f64,
        delete_insert_ratio: f64,
        path: impl AsRef<Path>,
    ) -> Result<Self> {
        let table = TsvTable::read(path, 2)?;
        let mut weight = Self::new(base_weight, delete_insert_ratio);
        for row in table.rows() {
            let w = table.number(row, 1)?;
            for c in row.columns[0].chars() {
                weight.letters.insert(c, w);
            }
        }
        Ok(weight)
    }

    pub fn with_letter(mut self, letter: char, weight: f64) -> Self {
        self.letters.insert(letter, weight);
        self
    }
}

impl WeightFunction<char> for LetterWeight {
    fn weight(&self, token: &char, is_original: bool, _: usize, _: usize) -> f64 {
        let mut w = self.base_weight;
        if is_original {
            w *= self.delete_insert_ratio;
        }
        if let Some(letter) = self.letters.get(token) {
            w *= letter;
        }
        w
    }
}

/// Grammatical-category weights for morphemes (IPADIC feature layout)
#[derive(Debug, Clone)]
pub struct WordWeight {
    pub base_weight: f64,
    pub delete_insert_ratio: f64,
    pub noun_coefficient: f64,
    pub verb_coefficient: f64,
    pub adjective_coefficient: f64,
}

impl Default for WordWeight {
    fn default() -> Self {
        Self {
            base_weight: 1.0,
            delete_insert_ratio: 1.0,
            noun_coefficient: 1.0,
            verb_coefficient: 1.0,
            adjective_coefficient: 1.0,
        }
    }
}

const POS: usize = 0;
const POS_DETAIL: usize = 1;
const READING: usize = 7;

impl WeightFunction<Word> for WordWeight {
    fn weight(&self, word: &Word, is_original: bool, _: usize, _: usize) -> f64 {
        let reading = word.feature(READING);
        let length = if reading.is_empty() || reading == "*" {
            word.surface.chars().count()
        } else {
            reading.chars().count()
        };

        let mut weight = self.base_weight * length as f64;
        if is_original {
            weight *= self.delete_insert_ratio;
        }

        let detail = word.feature(POS_DETAIL);
        match word.feature(POS) {
            "名詞" if !matches!(detail, "接尾" | "非自立" | "副詞可能" | "代名詞") => {
                weight *= self.noun_coefficient
            }
            "動詞" if !matches!(detail, "接尾" | "非自立") => weight *= self.verb_coefficient,
            "形容詞" => weight *= self.adjective_coefficient,
            _ => {}
        }
        weight
    }
}

/// Case and vowel/consonant weights for romaji letters
#[derive(Debug, Clone)]
pub struct RomajiWeight {
    pub base_weight: f64,
    pub delete_insert_ratio: f64,
    pub uppercase_coefficient: f64,
    pub lowercase_coefficient: f64,
    pub vowel_coefficient: f64,
    pub consonant_coefficient: f64,
}

impl Default for RomajiWeight {
    fn default() -> Self {
        Self {
            base_weight: 1.0,
            delete_insert_ratio: 1.0,
            uppercase_coefficient: 1.0,
            lowercase_coefficient: 1.0,
            vowel_coefficient: 1.0,
            consonant_coefficient: 1.0,
        }
    }
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'A' | 'E' | 'I' | 'O' | 'U' | 'a' | 'e' | 'i' | 'o' | 'u' | '-')
}

fn is_consonant(c: char) -> bool {
    c.is_ascii_alphabetic() && !is_vowel(c)
}

impl WeightFunction<char> for RomajiWeight {
    fn weight(&self, c: &char, is_original: bool, _: usize, _: usize) -> f64 {
        let mut weight = self.base_weight;
        if is_original {
            weight *= self.delete_insert_ratio;
        }

        if c.is_ascii_uppercase() {
            weight *= self.uppercase_coefficient;
        } else if c.is_ascii_lowercase() {
            weight *= self.lowercase_coefficient;
        }

        if is_vowel(*c) {
            weight *= self.vowel_coefficient;
        } else if is_consonant(*c) {
            weight *= self.consonant_coefficient;
        }
        weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn word(surface: &str, pos: &str, detail: &str, reading: &str) -> Word {
        let mut features = vec![String::new(); 9];
        features[0] = pos.into();
        features[1] = detail.into();
        features[7] = reading.into();
        Word::new(surface, features)
    }

    #[test]
    fn test_letter_weight_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# vowels are cheap").unwrap();
        writeln!(file, "アイウエオ\t0.5").unwrap();
        let weight = LetterWeight::from_table(2.0, 3.0, file.path()).unwrap();

        assert_eq!(weight.weight(&'ア', false, 0, 0), 1.0);
        assert_eq!(weight.weight(&'カ', false, 0, 0), 2.0);
        assert_eq!(weight.weight(&'オ', true, 0, 0), 3.0);
    }

    #[test]
    fn test_letter_weight_rejects_bad_number() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "アイ\theavy").unwrap();
        assert!(LetterWeight::from_table(1.0, 1.0, file.path()).is_err());
    }

    #[test]
    fn test_word_weight_uses_reading_length() {
        let weight = WordWeight::default();
        assert_eq!(weight.weight(&word("猫", "名詞", "一般", "ネコ"), false, 0, 0), 2.0);
        assert_eq!(weight.weight(&word("猫", "名詞", "一般", "*"), false, 0, 0), 1.0);
    }

    #[test]
    fn test_word_weight_part_of_speech() {
        let weight = WordWeight {
            noun_coefficient: 3.0,
            verb_coefficient: 5.0,
            adjective_coefficient: 7.0,
            delete_insert_ratio: 10.0,
            ..Default::default()
        };
        assert_eq!(weight.weight(&word("犬", "名詞", "一般", "イヌ"), false, 0, 0), 6.0);
        assert_eq!(weight.weight(&word("彼", "名詞", "代名詞", "カレ"), false, 0, 0), 2.0);
        assert_eq!(weight.weight(&word("走る", "動詞", "自立", "ハシル"), false, 0, 0), 15.0);
        assert_eq!(weight.weight(&word("いる", "動詞", "非自立", "イル"), false, 0, 0), 2.0);
        assert_eq!(weight.weight(&word("赤い", "形容詞", "自立", "アカイ"), true, 0, 0), 210.0);
    }

    #[test]
    fn test_romaji_weight_classes() {
        let weight = RomajiWeight {
            uppercase_coefficient: 2.0,
            lowercase_coefficient: 1.0,
            vowel_coefficient: 0.5,
            consonant_coefficient: 3.0,
            ..Default::default()
        };
        assert_eq!(weight.weight(&'A', false, 0, 0), 1.0);
        assert_eq!(weight.weight(&'k', false, 0, 0), 3.0);
        assert_eq!(weight.weight(&'-', false, 0, 0), 0.5);
        assert_eq!(weight.weight(&'ア', false, 0, 0), 1.0);
    }

    #[test]
    fn test_uniform_weight() {
        let weight = UniformWeight { weight: 0.25 };
        assert_eq!(WeightFunction::<char>::weight(&weight, &'x', true, 3, 1), 0.25);
    }
}
