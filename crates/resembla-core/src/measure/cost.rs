//! Mismatch (substitution) cost models
//!
//! A cost is in `[0, 1]`: 0 for interchangeable tokens, 1 for unrelated ones.

use crate::error::Result;
use crate::sequence::Word;
use crate::table::TsvTable;
use ahash::AHashMap;
use std::path::Path;

/// Substitution cost between two tokens
pub trait MismatchCost<T>: Send + Sync {
    fn cost(&self, a: &T, b: &T) -> f64;
}

/// 0 for equal tokens, 1 otherwise
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformCost;

impl<T: PartialEq> MismatchCost<T> for UniformCost {
    fn cost(&self, a: &T, b: &T) -> f64 {
        if a == b {
            0.0
        } else {
            1.0
        }
    }
}

fn ordered(a: char, b: char) -> (char, char) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Expand `letters \t cost` rows into costs for every pair within a row
fn load_pair_table(path: &Path) -> Result<AHashMap<(char, char), f64>> {
    let table = TsvTable::read(path, 2)?;
    let mut pairs = AHashMap::new();
    for row in table.rows() {
        let cost = table.number(row, 1)?;
        let mut letters: Vec<char> = row.columns[0].chars().collect();
        letters.sort_unstable();
        for (i, &a) in letters.iter().enumerate() {
            for &b in &letters[i + 1..] {
                pairs.insert((a, b), cost);
            }
        }
    }
    Ok(pairs)
}

/// Similar-letter costs for kana (e.g. voiced/unvoiced pairs)
#[derive(Debug, Clone, Default)]
pub struct KanaMismatchCost {
    similarities: AHashMap<(char, char), f64>,
}

impl KanaMismatchCost {
    pub fn from_table(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            similarities: load_pair_table(path.as_ref())?,
        })
    }

    pub fn with_pair(mut self, a: char, b: char, cost: f64) -> Self {
        self.similarities.insert(ordered(a, b), cost);
        self
    }
}

impl MismatchCost<char> for KanaMismatchCost {
    fn cost(&self, a: &char, b: &char) -> f64 {
        if a == b {
            return 0.0;
        }
        self.similarities
            .get(&ordered(*a, *b))
            .copied()
            .unwrap_or(1.0)
    }
}

/// Case-insensitive romaji cost with a similar-letter table
///
/// Letters differing only in case cost `case_mismatch_cost`. Similar letters
/// cost their table value, plus the case penalty (capped at 1) when exactly
/// one of the two is upper case.
#[derive(Debug, Clone)]
pub struct RomajiMismatchCost {
    case_mismatch_cost: f64,
    similarities: AHashMap<(char, char), f64>,
}

impl RomajiMismatchCost {
    pub fn new(case_mismatch_cost: f64) -> Self {
        Self {
            case_mismatch_cost,
            similarities: AHashMap::new(),
        }
    }

    pub fn from_table(path: impl AsRef<Path>, case_mismatch_cost: f64) -> Result<Self> {
        Ok(Self {
            case_mismatch_cost,
            similarities: load_pair_table(path.as_ref())?,
        })
    }

    pub fn with_pair(mut self, a: char, b: char, cost: f64) -> Self {
        self.similarities.insert(ordered(a, b), cost);
        self
    }
}

impl MismatchCost<char> for RomajiMismatchCost {
    fn cost(&self, a: &char, b: &char) -> f64 {
        if a == b {
            return 0.0;
        }

        let (al, bl) = (a.to_ascii_lowercase(), b.to_ascii_lowercase());
        if al == bl {
            return self.case_mismatch_cost;
        }

        match self.similarities.get(&ordered(al, bl)) {
            Some(&similar) if a.is_ascii_uppercase() == b.is_ascii_uppercase() => similar,
            Some(&similar) => (self.case_mismatch_cost + similar).min(1.0),
            None => 1.0,
        }
    }
}

/// Letter cost selected by configuration
#[derive(Debug, Clone)]
pub enum LetterCost {
    Uniform,
    Kana(KanaMismatchCost),
    Romaji(RomajiMismatchCost),
}

impl MismatchCost<char> for LetterCost {
    fn cost(&self, a: &char, b: &char) -> f64 {
        match self {
            Self::Uniform => UniformCost.cost(a, b),
            Self::Kana(cost) => cost.cost(a, b),
            Self::Romaji(cost) => cost.cost(a, b),
        }
    }
}

const BASE_FORM: usize = 6;
const READING: usize = 7;

/// Morpheme cost: homonyms are cheap, otherwise compare character multisets
#[derive(Debug, Clone, Copy)]
pub struct WordMismatchCost {
    pub homonym_cost: f64,
}

impl Default for WordMismatchCost {
    fn default() -> Self {
        Self { homonym_cost: 0.1 }
    }
}

fn shares_feature(a: &Word, b: &Word, pos: usize) -> bool {
    let f = a.feature(pos);
    !f.is_empty() && f != "*" && f == b.feature(pos)
}

impl MismatchCost<Word> for WordMismatchCost {
    fn cost(&self, a: &Word, b: &Word) -> f64 {
        if a.surface == b.surface {
            return 0.0;
        }
        if shares_feature(a, b, BASE_FORM) || shares_feature(a, b, READING) {
            return self.homonym_cost;
        }

        let mut x: Vec<char> = a.surface.chars().collect();
        let mut y: Vec<char> = b.surface.chars().collect();
        x.sort_unstable();
        y.sort_unstable();

        let total = x.len() + y.len();
        let (mut i, mut j, mut common) = (0, 0, 0);
        while i < x.len() && j < y.len() {
            match x[i].cmp(&y[j]) {
                std::cmp::Ordering::Equal => {
                    common += 1;
                    i += 1;
                    j += 1;
                }
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
            }
        }
        (total - 2 * common) as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn romaji_cost(case_cost: f64, similar_cost: f64) -> RomajiMismatchCost {
        let mut cost = RomajiMismatchCost::new(case_cost);
        for (a, b) in [
            ('b', 'v'),
            ('c', 'k'),
            ('c', 'q'),
            ('k', 'q'),
            ('s', 'c'),
            ('f', 'h'),
            ('l', 'r'),
            ('j', 'z'),
            ('x', 'z'),
            ('a', '-'),
            ('i', '-'),
            ('u', '-'),
            ('e', '-'),
            ('o', '-'),
        ] {
            cost = cost.with_pair(a, b, similar_cost);
        }
        cost
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_romaji_typical_costs() {
        let cost = romaji_cost(0.1, 0.2);
        let cases = [
            ('A', 'I', 1.0),
            ('U', 'e', 1.0),
            ('o', 'O', 0.1),
            ('K', 'S', 1.0),
            ('D', 'd', 0.1),
            ('B', 'V', 0.2),
            ('c', 'k', 0.2),
            ('c', 'Q', 0.3),
            ('K', 'q', 0.3),
            ('s', 'c', 0.2),
            ('l', 'r', 0.2),
            ('a', '-', 0.2),
            ('-', 'e', 0.2),
        ];
        for (a, b, expected) in cases {
            assert!(
                approx(cost.cost(&a, &b), expected),
                "cost({a}, {b}) should be {expected}"
            );
            assert!(approx(cost.cost(&b, &a), expected), "cost must be symmetric");
        }
    }

    #[test]
    fn test_romaji_same_letters_are_free() {
        let cost = romaji_cost(0.1, 0.2);
        for c in ['A', 'i', 'z', '0', 'あ', '宛'] {
            assert_eq!(cost.cost(&c, &c), 0.0);
        }
    }

    #[test]
    fn test_romaji_penalty_is_capped() {
        let cost = romaji_cost(0.8, 0.9);
        assert!(approx(cost.cost(&'o', &'O'), 0.8));
        assert!(approx(cost.cost(&'B', &'V'), 0.9));
        assert!(approx(cost.cost(&'l', &'R'), 1.0));
    }

    #[test]
    fn test_kana_table_expands_rows_pairwise() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "カガ\t0.2").unwrap();
        writeln!(file, "ハバパ\t0.3").unwrap();
        let cost = KanaMismatchCost::from_table(file.path()).unwrap();

        assert_eq!(cost.cost(&'カ', &'カ'), 0.0);
        assert_eq!(cost.cost(&'ガ', &'カ'), 0.2);
        assert_eq!(cost.cost(&'バ', &'パ'), 0.3);
        assert_eq!(cost.cost(&'パ', &'ハ'), 0.3);
        assert_eq!(cost.cost(&'カ', &'ハ'), 1.0);
    }

    #[test]
    fn test_word_cost() {
        let cost = WordMismatchCost::default();
        let mut features = vec![String::new(); 9];
        features[7] = "ハシ".into();
        let bridge = Word::new("橋", features.clone());
        let chopsticks = Word::new("箸", features);

        assert_eq!(cost.cost(&bridge, &bridge), 0.0);
        assert_eq!(cost.cost(&bridge, &chopsticks), 0.1);

        let a = Word::new("abc", vec![]);
        let b = Word::new("cbd", vec![]);
        // {a,b,c} vs {b,c,d}: two shared letters out of six
        assert!(approx(cost.cost(&a, &b), 2.0 / 6.0));

        let starred = Word::new("x", vec!["*".into(); 9]);
        let other = Word::new("y", vec!["*".into(); 9]);
        assert_eq!(cost.cost(&starred, &other), 1.0);
    }
}
