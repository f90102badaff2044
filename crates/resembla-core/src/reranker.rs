//! Generic reranking
//!
//! Scores every candidate against the query with any scoring function,
//! sorts by descending score and cuts the list by threshold and count.

use std::borrow::Cow;

/// A text and the representation it is scored through
///
/// Representations are borrowed from a precomputed cache when available and
/// owned when built on demand.
#[derive(Debug, Clone)]
pub struct Candidate<'a, R: Clone> {
    pub text: &'a str,
    pub representation: Cow<'a, R>,
}

impl<'a, R: Clone> Candidate<'a, R> {
    pub fn cached(text: &'a str, representation: &'a R) -> Self {
        Self {
            text,
            representation: Cow::Borrowed(representation),
        }
    }

    pub fn built(text: &'a str, representation: R) -> Self {
        Self {
            text,
            representation: Cow::Owned(representation),
        }
    }
}

/// A reranked text and its score
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    pub text: String,
    pub score: f64,
}

/// Rank `candidates` by `score_fn(candidate, query)`
///
/// Returns at most `max_count` entries (all when `None`) scoring at least
/// `threshold`, highest first. Equal scores keep candidate order. The first
/// error from `score_fn` aborts the whole call.
pub fn rerank<R, F, E>(
    query: &R,
    candidates: &[Candidate<'_, R>],
    mut score_fn: F,
    threshold: f64,
    max_count: Option<usize>,
) -> Result<Vec<Ranked>, E>
where
    R: Clone,
    F: FnMut(&R, &R) -> Result<f64, E>,
{
    let mut scored = Vec::with_capacity(candidates.len());
    for (i, candidate) in candidates.iter().enumerate() {
        let score = score_fn(&*candidate.representation, query)?;
        // NaN never reaches a threshold
        if score >= threshold {
            scored.push((i, score));
        }
    }
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    Ok(scored
        .into_iter()
        .take(max_count.unwrap_or(usize::MAX))
        .map(|(i, score)| Ranked {
            text: candidates[i].text.to_string(),
            score,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn score_by_length(candidate: &String, query: &String) -> Result<f64, String> {
        let (a, b) = (candidate.len() as f64, query.len() as f64);
        Ok(a.min(b) / a.max(b))
    }

    fn candidates(texts: &[String]) -> Vec<Candidate<'_, String>> {
        texts.iter().map(|t| Candidate::cached(t.as_str(), t)).collect()
    }

    fn texts(ranked: &[Ranked]) -> Vec<&str> {
        ranked.iter().map(|r| r.text.as_str()).collect()
    }

    #[test]
    fn test_sorted_descending() {
        let corpus: Vec<String> = ["a", "abcd", "ab", "abc"].iter().map(|s| s.to_string()).collect();
        let query = "abcd".to_string();
        let ranked = rerank(&query, &candidates(&corpus), score_by_length, 0.0, None).unwrap();
        assert_eq!(texts(&ranked), vec!["abcd", "abc", "ab", "a"]);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_threshold_and_count() {
        let corpus: Vec<String> = ["a", "abcd", "ab", "abc"].iter().map(|s| s.to_string()).collect();
        let query = "abcd".to_string();

        let ranked = rerank(&query, &candidates(&corpus), score_by_length, 0.5, None).unwrap();
        assert_eq!(texts(&ranked), vec!["abcd", "abc", "ab"]);

        let ranked = rerank(&query, &candidates(&corpus), score_by_length, 0.0, Some(2)).unwrap();
        assert_eq!(texts(&ranked), vec!["abcd", "abc"]);

        let ranked = rerank(&query, &candidates(&corpus), score_by_length, 1.5, None).unwrap();
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_ties_keep_candidate_order_and_repeat() {
        let corpus: Vec<String> = ["xy", "ab", "cd", "abcd"].iter().map(|s| s.to_string()).collect();
        let query = "zz".to_string();
        let first = rerank(&query, &candidates(&corpus), score_by_length, 0.0, None).unwrap();
        let second = rerank(&query, &candidates(&corpus), score_by_length, 0.0, None).unwrap();
        assert_eq!(texts(&first), vec!["xy", "ab", "cd", "abcd"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_nan_scores_are_dropped_without_disturbing_order() {
        let corpus: Vec<String> = ["ab", "nan", "abcd", "abc"].iter().map(|s| s.to_string()).collect();
        let query = "abcd".to_string();
        let score = |c: &String, q: &String| {
            if c == "nan" {
                Ok(f64::NAN)
            } else {
                score_by_length(c, q)
            }
        };
        let ranked = rerank(&query, &candidates(&corpus), score, f64::NEG_INFINITY, None).unwrap();
        assert_eq!(texts(&ranked), vec!["abcd", "abc", "ab"]);
    }

    #[test]
    fn test_error_aborts() {
        let corpus: Vec<String> = vec!["ok".into(), "bad".into()];
        let query = "q".to_string();
        let result = rerank(
            &query,
            &candidates(&corpus),
            |c: &String, _: &String| {
                if c == "bad" {
                    Err("unscorable".to_string())
                } else {
                    Ok(1.0)
                }
            },
            0.0,
            None,
        );
        assert_eq!(result, Err("unscorable".to_string()));
    }
}
