//! # vismatch
//!
//! A product catalog with "find visually similar products" search.
//!
//! Every product is stored with a 512-wide feature vector computed
//! deterministically from its metadata. A search (free text, an image URL
//! or uploaded image bytes) is turned into a vector of the same shape and
//! ranked against the catalog by cosine similarity.
//!
//! ## Quick Start
//!
//! ### As a CLI
//!
//! ```bash
//! vismatch seed
//! vismatch search --query "running shoes" --max-results 5
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use vismatch::prelude::*;
//!
//! let storage = StorageManager::open("./data", FeatureEncoder::default()).unwrap();
//! storage
//!     .create_product(
//!         ProductFields::new("Nike Air Max Running Shoes", "Shoes")
//!             .with_brand("Nike")
//!             .with_tags(["shoes", "running"]),
//!     )
//!     .unwrap();
//!
//! let engine = SearchEngine::new(&storage, storage.encoder().clone());
//! let response = engine
//!     .search(&SearchQuery::text("running shoes"), &SearchFilters::default())
//!     .unwrap();
//! println!("{} results", response.total_found);
//! storage.close().unwrap();
//! ```
//!
//! ## Crate Structure
//!
//! - `vismatch-core` - Core data structures (Vector, Product, Catalog, CatalogFilter)
//! - `vismatch-similarity` - Feature tables, encoder, ranker and search engine
//! - `vismatch-storage` - Persistence layer (WAL, checksummed snapshots)

// Re-export core types
pub use vismatch_core::{
    clamp01, cosine_similarity, Catalog, CatalogConfig, CatalogFilter, CatalogSource, Error,
    Filter, Product, ProductFields, ProductId, Result, Vector,
};

// Re-export similarity
pub use vismatch_similarity::{
    FeatureEncoder, FeatureTables, QuerySource, RankedResult, Ranker, RankingConfig,
    SearchEngine, SearchError, SearchFilters, SearchHit, SearchQuery, SearchResponse,
    FEATURE_DIM,
};

// Re-export storage
pub use vismatch_storage::{CatalogStats, Pagination, ProductPage, ProductView, StorageManager};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Catalog, CatalogConfig, CatalogFilter, CatalogSource, Error, FeatureEncoder,
        FeatureTables, Product, ProductFields, ProductId, Result, SearchEngine, SearchFilters,
        SearchQuery, SearchResponse, StorageManager, Vector,
    };
}
