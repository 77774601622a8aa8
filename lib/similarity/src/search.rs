//! Search Engine
//!
//! Glue between a query, the encoder, the catalog and the ranker:
//! resolve the query to a vector, fetch coarse-filtered candidates,
//! rank them and shape the response.

use crate::encoder::FeatureEncoder;
use crate::query::{QuerySource, SearchFilters, SearchQuery};
use crate::rank::{RankedResult, Ranker};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::debug;
use vismatch_core::{CatalogSource, Vector};

/// Errors surfaced by a search
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("no image, image URL or query term provided")]
    MissingQuery,

    #[error("catalog error: {0}")]
    Catalog(#[from] vismatch_core::Error),
}

/// One product in a search response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub brand: String,
    pub description: String,
    pub image_url: String,
    pub tags: Vec<String>,
    /// Rounded to three decimal places
    pub similarity_score: f32,
}

impl From<RankedResult> for SearchHit {
    fn from(result: RankedResult) -> Self {
        let similarity_score = result.display_score();
        let id = result.id_string();
        let fields = result.product.fields;
        Self {
            id,
            name: fields.name,
            category: fields.category,
            price: fields.price,
            brand: fields.brand,
            description: fields.description,
            image_url: fields.image_url,
            tags: fields.tags,
            similarity_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    /// Number of results returned, after threshold and cap
    pub total_found: usize,
    pub query_time_ms: u64,
    /// The filters actually applied
    pub filters: SearchFilters,
}

/// Similarity search over any [`CatalogSource`]
#[derive(Debug, Clone)]
pub struct SearchEngine<S> {
    source: S,
    encoder: FeatureEncoder,
    best_effort_fallback: bool,
}

impl<S: CatalogSource> SearchEngine<S> {
    pub fn new(source: S, encoder: FeatureEncoder) -> Self {
        Self {
            source,
            encoder,
            best_effort_fallback: true,
        }
    }

    /// Whether an empty threshold pass returns the single best candidate
    #[must_use]
    pub fn with_best_effort_fallback(mut self, enabled: bool) -> Self {
        self.best_effort_fallback = enabled;
        self
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Resolve a query to the vector it will be compared with
    pub fn encode_query(&self, query: &SearchQuery) -> Result<Vector, SearchError> {
        let vector = match query.source().ok_or(SearchError::MissingQuery)? {
            QuerySource::Image(bytes) => self.encoder.encode_image_bytes(bytes),
            QuerySource::ImageUrl(url) => self.encoder.encode_opaque(url),
            QuerySource::Term(term) => self.encoder.encode_query_term(term),
        };
        Ok(vector)
    }

    /// Run a search.
    ///
    /// Filters are normalized first; the normalized copy is echoed back in
    /// the response.
    pub fn search(
        &self,
        query: &SearchQuery,
        filters: &SearchFilters,
    ) -> Result<SearchResponse, SearchError> {
        let start = Instant::now();
        let filters = filters.normalized();
        let query_vector = self.encode_query(query)?;

        let candidates = self.source.find_candidates(&filters.catalog_filter())?;
        let candidate_count = candidates.len();

        let ranker = Ranker::new(filters.ranking_config(self.best_effort_fallback));
        let results: Vec<SearchHit> = ranker
            .rank(&query_vector, candidates)
            .into_iter()
            .map(SearchHit::from)
            .collect();

        let elapsed = start.elapsed();
        debug!(
            candidates = candidate_count,
            returned = results.len(),
            elapsed_us = elapsed.as_micros() as u64,
            "search complete"
        );

        Ok(SearchResponse {
            total_found: results.len(),
            query_time_ms: elapsed.as_millis() as u64,
            results,
            filters,
        })
    }
}
