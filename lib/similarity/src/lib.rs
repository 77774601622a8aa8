//! # vismatch Similarity
//!
//! Deterministic feature encoding and similarity ranking for product search.
//!
//! ## Features
//!
//! - **Feature Tables**: every tag, keyword, brand and category weight in one serde structure
//! - **Feature Encoder**: metadata or free text to a 512-wide vector, no randomness
//! - **Ranker**: clamped cosine scoring with threshold, cap and best-effort fallback
//! - **Search Engine**: query resolution, coarse catalog filtering and ranking in one call
//!
//! ## Example
//!
//! ```rust
//! use vismatch_core::{Catalog, CatalogConfig, Product, ProductFields, ProductId};
//! use vismatch_similarity::{FeatureEncoder, SearchEngine, SearchFilters, SearchQuery};
//!
//! let encoder = FeatureEncoder::default();
//! let catalog = Catalog::new(CatalogConfig::default());
//!
//! let fields = ProductFields::new("Nike Air Max Running Shoes", "Shoes")
//!     .with_brand("Nike")
//!     .with_tags(["shoes", "running"]);
//! let vector = encoder.encode_product(&fields);
//! catalog.insert(Product::new(ProductId::new_v4(), fields, vector)).unwrap();
//!
//! let engine = SearchEngine::new(&catalog, encoder);
//! let response = engine
//!     .search(&SearchQuery::text("running shoes"), &SearchFilters::default())
//!     .unwrap();
//! assert_eq!(response.results[0].name, "Nike Air Max Running Shoes");
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Query     │────>│  Encoder    │────>│   Query     │
//! │ (term/url)  │     │  (tables)   │     │   Vector    │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                                                │
//! ┌─────────────┐                                │
//! │  Catalog    │     ┌─────────────┐            │
//! │ (filtered)  │────>│   Ranker    │<───────────┘
//! └─────────────┘     └─────────────┘
//!                            │
//!                     ┌─────────────┐
//!                     │  Response   │
//!                     └─────────────┘
//! ```

pub mod encoder;
pub mod hash;
pub mod query;
pub mod rank;
pub mod search;
pub mod tables;

pub use encoder::{FeatureEncoder, Metadata, FEATURE_DIM};
pub use hash::{hash_bucket, rolling_hash, seeded_fraction};
pub use query::{QuerySource, SearchFilters, SearchQuery};
pub use rank::{round_score, RankedResult, Ranker, RankingConfig};
pub use search::{SearchEngine, SearchError, SearchHit, SearchResponse};
pub use tables::{CategoryKeywords, FeatureTables, TableError, Template};
