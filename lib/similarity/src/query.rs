//! Search requests: what to look for and how to filter it

use crate::rank::RankingConfig;
use serde::{Deserialize, Serialize};
use vismatch_core::CatalogFilter;

pub const DEFAULT_MIN_SIMILARITY: f32 = 0.1;
pub const DEFAULT_MAX_RESULTS: usize = 20;

/// The inputs a search can start from.
///
/// Several may be present; [`SearchQuery::source`] decides which one is used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(default, skip_serializing)]
    pub image_bytes: Option<Vec<u8>>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub query_term: Option<String>,
}

/// The input that will actually be encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuerySource<'a> {
    /// Uploaded bytes with no usable text
    Image(&'a [u8]),
    ImageUrl(&'a str),
    Term(&'a str),
}

impl SearchQuery {
    pub fn text(term: impl Into<String>) -> Self {
        Self {
            query_term: Some(term.into()),
            ..Default::default()
        }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        Self {
            image_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn image(bytes: Vec<u8>) -> Self {
        Self {
            image_bytes: Some(bytes),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_query_term(mut self, term: impl Into<String>) -> Self {
        self.query_term = Some(term.into());
        self
    }

    /// Pick the input to encode.
    ///
    /// Uploaded bytes win, but a query term sent alongside them is encoded
    /// instead of the bytes. Without bytes an image URL is used, then a
    /// query term. Blank strings count as absent.
    pub fn source(&self) -> Option<QuerySource<'_>> {
        let term = non_blank(self.query_term.as_deref());
        let url = non_blank(self.image_url.as_deref());

        match (&self.image_bytes, url, term) {
            (Some(_), _, Some(term)) => Some(QuerySource::Term(term)),
            (Some(bytes), _, None) => Some(QuerySource::Image(bytes)),
            (None, Some(url), _) => Some(QuerySource::ImageUrl(url)),
            (None, None, Some(term)) => Some(QuerySource::Term(term)),
            (None, None, None) => None,
        }
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

/// Filters supplied with a search request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    /// Category pattern, or `"all"`
    pub category: String,
    pub min_similarity: f32,
    pub max_results: usize,
    /// Inclusive `[min, max]` price bounds
    pub price_range: [f64; 2],
    /// Brand allow-list; empty allows every brand
    pub brands: Vec<String>,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            category: "all".to_string(),
            min_similarity: DEFAULT_MIN_SIMILARITY,
            max_results: DEFAULT_MAX_RESULTS,
            price_range: [0.0, f64::MAX],
            brands: Vec::new(),
        }
    }
}

impl SearchFilters {
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    #[must_use]
    pub fn with_min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    #[must_use]
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    #[must_use]
    pub fn with_price_range(mut self, min: f64, max: f64) -> Self {
        self.price_range = [min, max];
        self
    }

    #[must_use]
    pub fn with_brands<I, S>(mut self, brands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.brands = brands.into_iter().map(Into::into).collect();
        self
    }

    /// Copy with out-of-range values replaced.
    ///
    /// `min_similarity` is clamped into `[0, 1]` (NaN becomes the default;
    /// an explicit 0 is kept and disables the threshold), a zero
    /// `max_results` becomes the default, and a blank category means `"all"`.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut filters = self.clone();
        filters.min_similarity = if filters.min_similarity.is_nan() {
            DEFAULT_MIN_SIMILARITY
        } else {
            filters.min_similarity.clamp(0.0, 1.0)
        };
        if filters.max_results == 0 {
            filters.max_results = DEFAULT_MAX_RESULTS;
        }
        if filters.category.trim().is_empty() {
            filters.category = "all".to_string();
        }
        filters
    }

    /// The coarse part of the request, handed to the catalog
    pub fn catalog_filter(&self) -> CatalogFilter {
        let [min, max] = self.price_range;
        CatalogFilter::new()
            .with_price_range(min, max)
            .with_category(self.category.clone())
            .with_brands(self.brands.iter().cloned())
    }

    pub fn ranking_config(&self, best_effort_fallback: bool) -> RankingConfig {
        RankingConfig {
            min_similarity: self.min_similarity,
            max_results: self.max_results,
            best_effort_fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_precedence() {
        let bytes = vec![1u8, 2, 3];

        let q = SearchQuery::image(bytes.clone()).with_query_term("red shoes");
        assert_eq!(q.source(), Some(QuerySource::Term("red shoes")));

        let q = SearchQuery {
            image_bytes: Some(bytes.clone()),
            image_url: Some("https://x/y.jpg".to_string()),
            query_term: None,
        };
        assert_eq!(q.source(), Some(QuerySource::Image(&bytes)));

        let q = SearchQuery::image_url("https://x/y.jpg").with_query_term("shoes");
        assert_eq!(q.source(), Some(QuerySource::ImageUrl("https://x/y.jpg")));

        assert_eq!(SearchQuery::text("book").source(), Some(QuerySource::Term("book")));
    }

    #[test]
    fn test_blank_inputs_are_absent() {
        assert_eq!(SearchQuery::default().source(), None);
        assert_eq!(SearchQuery::text("   ").source(), None);
        assert_eq!(SearchQuery::image_url("").source(), None);
        assert_eq!(
            SearchQuery::image_url(" ").with_query_term("book").source(),
            Some(QuerySource::Term("book"))
        );
    }

    #[test]
    fn test_filter_defaults_from_empty_json() {
        let filters: SearchFilters = serde_json::from_str("{}").unwrap();
        assert_eq!(filters, SearchFilters::default());
        assert_eq!(filters.category, "all");
        assert_eq!(filters.min_similarity, 0.1);
        assert_eq!(filters.max_results, 20);
    }

    #[test]
    fn test_filters_from_camel_case_json() {
        let filters: SearchFilters = serde_json::from_str(
            r#"{"category":"Shoes","minSimilarity":0.4,"maxResults":5,"priceRange":[10,200],"brands":["Nike"]}"#,
        )
        .unwrap();
        assert_eq!(filters.max_results, 5);
        assert_eq!(filters.price_range, [10.0, 200.0]);
        assert_eq!(filters.brands, vec!["Nike"]);
    }

    #[test]
    fn test_normalized() {
        let filters = SearchFilters::default()
            .with_min_similarity(1.5)
            .with_max_results(0)
            .with_category(" ")
            .normalized();
        assert_eq!(filters.min_similarity, 1.0);
        assert_eq!(filters.max_results, DEFAULT_MAX_RESULTS);
        assert_eq!(filters.category, "all");

        let nan = SearchFilters::default().with_min_similarity(f32::NAN).normalized();
        assert_eq!(nan.min_similarity, DEFAULT_MIN_SIMILARITY);

        let zero = SearchFilters::default().with_min_similarity(0.0).normalized();
        assert_eq!(zero.min_similarity, 0.0);
    }

    #[test]
    fn test_catalog_filter() {
        let filter = SearchFilters::default()
            .with_category("All")
            .with_price_range(5.0, 50.0)
            .with_brands(["Nike"])
            .catalog_filter();
        assert_eq!(filter.category, None);
        assert_eq!(filter.price_min, Some(5.0));
        assert_eq!(filter.price_max, Some(50.0));
        assert_eq!(filter.brands, vec!["Nike"]);
    }
}
