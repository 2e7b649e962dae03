//! Pairwise project similarity scoring and ranking.
//!
//! The composite score blends five weighted terms: commodity overlap
//! (Jaccard), capex ratio, npv ratio, stage equality, and jurisdiction
//! (country) equality. Every degenerate input degrades its term to 0, so
//! scoring never fails and never produces NaN.

use std::cmp::Ordering;
use std::collections::HashSet;

use lithos_core::Project;
use serde::Serialize;

pub const CRATE_NAME: &str = "lithos-similarity";

/// Per-term weights. Each term caps at its weight, so a full match on all
/// five dimensions totals 1.0.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityWeights {
    pub commodity: f64,
    pub capex: f64,
    pub npv: f64,
    pub stage: f64,
    pub jurisdiction: f64,
}

impl SimilarityWeights {
    pub fn sum(&self) -> f64 {
        self.commodity + self.capex + self.npv + self.stage + self.jurisdiction
    }
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            commodity: 0.40,
            capex: 0.20,
            npv: 0.20,
            stage: 0.10,
            jurisdiction: 0.10,
        }
    }
}

/// A candidate paired with its composite score. Ephemeral ranking output,
/// recomputed on every call.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredProject {
    pub project: Project,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityEngine {
    weights: SimilarityWeights,
}

impl SimilarityEngine {
    pub fn new(weights: SimilarityWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> SimilarityWeights {
        self.weights
    }

    /// Jaccard overlap of lowercased commodity labels. Either list empty
    /// means 0, never a division by zero.
    pub fn commodity_overlap(a: &[String], b: &[String]) -> f64 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        let set_a: HashSet<String> = a.iter().map(|label| label.to_lowercase()).collect();
        let set_b: HashSet<String> = b.iter().map(|label| label.to_lowercase()).collect();
        let union = set_a.union(&set_b).count();
        if union == 0 {
            return 0.0;
        }
        let intersection = set_a.intersection(&set_b).count();
        intersection as f64 / union as f64
    }

    /// min/max ratio for a pair of financial figures, symmetric in its
    /// arguments. Only strictly positive pairs are comparable: absence,
    /// zero, and negative values all yield 0.
    pub fn magnitude_ratio(a: Option<f64>, b: Option<f64>) -> f64 {
        match (a, b) {
            (Some(a), Some(b)) if a > 0.0 && b > 0.0 => a.min(b) / a.max(b),
            _ => 0.0,
        }
    }

    /// Country token of a location: the substring after the last comma,
    /// trimmed and lowercased. A location without commas is its own token.
    pub fn country_token(location: Option<&str>) -> String {
        match location {
            Some(location) => location
                .rsplit(',')
                .next()
                .unwrap_or_default()
                .trim()
                .to_lowercase(),
            None => String::new(),
        }
    }

    /// Composite similarity of `candidate` to `reference`, in `[0, 1]`.
    pub fn score(&self, reference: &Project, candidate: &Project) -> f64 {
        let w = &self.weights;
        let mut score =
            Self::commodity_overlap(&reference.commodities, &candidate.commodities) * w.commodity;
        score += Self::magnitude_ratio(reference.capex, candidate.capex) * w.capex;
        score += Self::magnitude_ratio(reference.npv, candidate.npv) * w.npv;

        if let (Some(a), Some(b)) = (&reference.stage, &candidate.stage) {
            if a == b {
                score += w.stage;
            }
        }

        let country_a = Self::country_token(reference.location.as_deref());
        let country_b = Self::country_token(candidate.location.as_deref());
        if !country_a.is_empty() && country_a == country_b {
            score += w.jurisdiction;
        }

        // Terms each cap at their weight; the clamp keeps float drift of the
        // five-way sum inside [0, 1].
        score.clamp(0.0, 1.0)
    }

    /// Score every candidate against `reference`, sort descending, keep the
    /// top `top_k`. The sort is stable: exact ties keep candidate order.
    pub fn rank(
        &self,
        reference: &Project,
        candidates: Vec<Project>,
        top_k: usize,
    ) -> Vec<ScoredProject> {
        let mut scored: Vec<ScoredProject> = candidates
            .into_iter()
            .map(|candidate| ScoredProject {
                score: self.score(reference, &candidate),
                project: candidate,
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);
        scored
    }
}
