//! Weighted combination of retrieval pipelines
//!
//! Each member scores texts independently; a text's combined score is the
//! weighted quadratic mean of its member scores:
//!
//! ```text
//! score(t) = sqrt( Σ w_i · s_i(t)² / Σ w_i )
//! ```
//!
//! A member that does not return `t` contributes 0 for it, so a text found
//! by only one measure is pulled down by the others' weights.

use crate::error::{ResemblaError, Result};
use crate::pipeline::{Resembla, ScoredResult};
use ahash::AHashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub struct ResemblaEnsemble {
    name: String,
    max_reranking_num: Option<usize>,
    members: Vec<(Arc<dyn Resembla>, f64)>,
    total_weight: f64,
}

impl ResemblaEnsemble {
    /// `max_reranking_num` loosens members to threshold 0 and that many
    /// results each; without it members use the caller's limits.
    pub fn new(name: impl Into<String>, max_reranking_num: Option<usize>) -> Self {
        Self {
            name: name.into(),
            max_reranking_num,
            members: Vec::new(),
            total_weight: 0.0,
        }
    }

    pub fn append(&mut self, member: Arc<dyn Resembla>, weight: f64) -> Result<()> {
        if !(weight >= 0.0 && weight.is_finite()) {
            return Err(ResemblaError::Config(format!(
                "ensemble weight for '{}' must be a non-negative number, got {}",
                member.name(),
                weight
            )));
        }
        info!(ensemble = %self.name, member = member.name(), weight, "appended ensemble member");
        self.members.push((member, weight));
        self.total_weight += weight;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    fn member_limits(&self, threshold: f64, max_response: Option<usize>) -> (f64, Option<usize>) {
        match self.max_reranking_num {
            Some(n) => (0.0, Some(n)),
            None => (threshold, max_response),
        }
    }

    /// Run `run` on every member and sum `w · s²` per text in first-seen order
    fn aggregate<F>(&self, mut run: F) -> Result<Vec<(String, f64)>>
    where
        F: FnMut(&dyn Resembla) -> Result<Vec<ScoredResult>>,
    {
        let mut positions: AHashMap<String, usize> = AHashMap::new();
        let mut aggregated: Vec<(String, f64)> = Vec::new();
        for (member, weight) in &self.members {
            let results = run(member.as_ref())?;
            debug!(ensemble = %self.name, member = member.name(), results = results.len(), "member results");
            for r in results {
                let contribution = weight * r.score * r.score;
                match positions.get(&r.text) {
                    Some(&i) => aggregated[i].1 += contribution,
                    None => {
                        positions.insert(r.text.clone(), aggregated.len());
                        aggregated.push((r.text, contribution));
                    }
                }
            }
        }
        Ok(aggregated)
    }

    fn combine(
        &self,
        aggregated: Vec<(String, f64)>,
        threshold: f64,
        max_response: Option<usize>,
    ) -> Vec<ScoredResult> {
        // all weights zero: nothing can be ranked
        if self.total_weight <= 0.0 {
            return Vec::new();
        }

        let mut results: Vec<ScoredResult> = aggregated
            .into_iter()
            .map(|(text, sum)| ScoredResult {
                text,
                measure: self.name.clone(),
                score: (sum / self.total_weight).sqrt(),
            })
            .filter(|r| r.score >= threshold)
            .collect();
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        if let Some(n) = max_response {
            results.truncate(n);
        }
        results
    }
}

impl Resembla for ResemblaEnsemble {
    fn name(&self) -> &str {
        &self.name
    }

    fn find(
        &self,
        query: &str,
        threshold: f64,
        max_response: Option<usize>,
    ) -> Result<Vec<ScoredResult>> {
        let (t, n) = self.member_limits(threshold, max_response);
        let aggregated = self.aggregate(|member| member.find(query, t, n))?;
        Ok(self.combine(aggregated, threshold, max_response))
    }

    fn eval(
        &self,
        query: &str,
        candidates: &[String],
        threshold: f64,
        max_response: Option<usize>,
    ) -> Result<Vec<ScoredResult>> {
        let (t, n) = self.member_limits(threshold, max_response);
        let aggregated = self.aggregate(|member| member.eval(query, candidates, t, n))?;
        Ok(self.combine(aggregated, threshold, None))
    }
}
