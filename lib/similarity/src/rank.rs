//! Similarity Ranker
//!
//! Scores candidates against a query vector, applies the similarity
//! threshold and result cap, and orders the survivors by score.
//! Price, category and brand filters are the catalog's job and are never
//! re-applied here.

use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use vismatch_core::{clamp01, Product, Vector};

/// Decimal places kept in display scores
pub const SCORE_PRECISION: i32 = 3;

/// Round a score for display
#[inline]
pub fn round_score(score: f32) -> f32 {
    let factor = 10f64.powi(SCORE_PRECISION);
    ((f64::from(score) * factor).round() / factor) as f32
}

/// Result of ranking: a product and its similarity to the query
#[derive(Debug, Clone)]
pub struct RankedResult {
    /// The candidate product
    pub product: Product,
    /// Clamped cosine similarity, full precision
    pub score: f32,
}

impl RankedResult {
    /// Get the product ID as a string
    pub fn id_string(&self) -> String {
        self.product.id_string()
    }

    /// Score rounded to [`SCORE_PRECISION`] places
    pub fn display_score(&self) -> f32 {
        round_score(self.score)
    }
}

/// Threshold, cap and fallback settings for one ranking pass
#[derive(Debug, Clone, PartialEq)]
pub struct RankingConfig {
    /// Candidates scoring below this are dropped
    pub min_similarity: f32,
    /// At most this many results are returned
    pub max_results: usize,
    /// Return the single best candidate when the threshold drops them all
    pub best_effort_fallback: bool,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            min_similarity: 0.1,
            max_results: 20,
            best_effort_fallback: true,
        }
    }
}

/// Ranker that orders candidates by cosine similarity
#[derive(Debug, Clone, Default)]
pub struct Ranker {
    config: RankingConfig,
}

impl Ranker {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Score every candidate's stored vector against `query` and rank.
    ///
    /// Vectors of the wrong length score 0 rather than failing.
    pub fn rank(&self, query: &Vector, candidates: Vec<Product>) -> Vec<RankedResult> {
        let scored = candidates
            .into_iter()
            .map(|product| {
                let score = clamp01(query.cosine_similarity(&product.vector));
                (product, score)
            })
            .collect();
        self.rank_scored(scored)
    }

    /// Rank candidates whose scores are already known.
    ///
    /// Ordering is by descending score; equal scores keep input order.
    /// If the threshold removes every candidate and the fallback is
    /// enabled, the best candidate is returned on its own.
    pub fn rank_scored(&self, scored: Vec<(Product, f32)>) -> Vec<RankedResult> {
        let mut results: Vec<RankedResult> = scored
            .into_iter()
            .map(|(product, score)| RankedResult { product, score })
            .collect();

        // stable: ties stay in candidate order
        results.sort_by_key(|r| Reverse(OrderedFloat(r.score)));

        let passing = results
            .iter()
            .take_while(|r| r.score >= self.config.min_similarity)
            .count();

        if passing == 0 {
            if self.config.best_effort_fallback {
                results.truncate(1);
            } else {
                results.clear();
            }
            return results;
        }

        results.truncate(passing.min(self.config.max_results.max(1)));
        results
    }
}
