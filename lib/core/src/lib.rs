//! # vismatch Core
//!
//! Core library for the vismatch visual product search.
//!
//! This crate provides the fundamental data structures:
//!
//! - [`Vector`] - Dense feature vector with cosine and Euclidean measures
//! - [`Product`] - A catalog record with its stored feature vector
//! - [`CatalogFilter`] - Coarse price/category/brand restrictions
//! - [`Catalog`] - In-memory product store implementing [`CatalogSource`]
//!
//! ## Example
//!
//! ```rust
//! use vismatch_core::{Catalog, CatalogConfig, CatalogFilter, CatalogSource};
//! use vismatch_core::{Product, ProductFields, ProductId, Vector};
//!
//! let catalog = Catalog::new(CatalogConfig {
//!     name: "test".to_string(),
//!     vector_dim: 3,
//! });
//!
//! let fields = ProductFields::new("Air Max", "Shoes").with_brand("Nike").with_price(150.0);
//! let product = Product::new(ProductId::from("p1"), fields, Vector::new(vec![1.0, 0.0, 0.0]));
//! catalog.upsert(product).unwrap();
//!
//! let filter = CatalogFilter::new().with_category("shoes");
//! let candidates = catalog.find_candidates(&filter).unwrap();
//! assert_eq!(candidates.len(), 1);
//! ```

pub mod catalog;
pub mod vector;
pub mod error;
pub mod product;
pub mod filter;

pub use catalog::{Catalog, CatalogConfig, CatalogSource};
pub use vector::{clamp01, cosine_similarity, euclidean_distance, Vector};
pub use error::{Error, Result};
pub use product::{Product, ProductFields, ProductId};
pub use filter::{CatalogFilter, CompiledFilter, Filter};
