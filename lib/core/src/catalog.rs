use crate::{CatalogFilter, Error, Filter, Product, Result};
use ahash::AHashMap;
use parking_lot::RwLock;
use std::collections::BTreeSet;

/// Anything that can hand out candidate products for a coarse filter.
///
/// Candidates carry their stored vectors. Implementations must return them
/// in a stable order so that equal scores rank reproducibly.
pub trait CatalogSource {
    fn find_candidates(&self, filter: &CatalogFilter) -> Result<Vec<Product>>;
}

impl<T: CatalogSource + ?Sized> CatalogSource for &T {
    fn find_candidates(&self, filter: &CatalogFilter) -> Result<Vec<Product>> {
        (**self).find_candidates(filter)
    }
}

impl<T: CatalogSource + ?Sized> CatalogSource for std::sync::Arc<T> {
    fn find_candidates(&self, filter: &CatalogFilter) -> Result<Vec<Product>> {
        (**self).find_candidates(filter)
    }
}

/// Configuration for a catalog
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub name: String,
    pub vector_dim: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            name: "products".to_string(),
            vector_dim: 512,
        }
    }
}

/// In-memory product catalog.
///
/// Writes replace a whole record under the lock, so readers never observe a
/// product whose fields and vector disagree.
pub struct Catalog {
    config: CatalogConfig,
    products: RwLock<AHashMap<String, Product>>,
}

impl Catalog {
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            config,
            products: RwLock::new(AHashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn vector_dim(&self) -> usize {
        self.config.vector_dim
    }

    pub fn count(&self) -> usize {
        self.products.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.read().is_empty()
    }

    fn check_dim(&self, product: &Product) -> Result<()> {
        if product.vector.dim() != self.config.vector_dim {
            return Err(Error::InvalidDimension {
                expected: self.config.vector_dim,
                actual: product.vector.dim(),
            });
        }
        Ok(())
    }

    /// Insert or replace a product.
    ///
    /// Replacing bumps the version and keeps the original creation time.
    /// Returns the record as stored.
    pub fn upsert(&self, mut product: Product) -> Result<Product> {
        self.check_dim(&product)?;

        let id = product.id_string();
        let mut products = self.products.write();
        if let Some(existing) = products.get(&id) {
            product.version = existing.version + 1;
            product.created_at = existing.created_at;
        }
        products.insert(id, product.clone());
        Ok(product)
    }

    /// Insert a product that must not exist yet
    pub fn insert(&self, product: Product) -> Result<Product> {
        self.check_dim(&product)?;

        let id = product.id_string();
        let mut products = self.products.write();
        if products.contains_key(&id) {
            return Err(Error::ProductExists(id));
        }
        products.insert(id, product.clone());
        Ok(product)
    }

    /// Put a record back exactly as it was persisted (recovery path)
    pub fn restore(&self, product: Product) -> Result<()> {
        self.check_dim(&product)?;
        self.products.write().insert(product.id_string(), product);
        Ok(())
    }

    /// Get a product by ID
    pub fn get(&self, id: &str) -> Option<Product> {
        self.products.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.products.read().contains_key(id)
    }

    /// Delete a product by ID
    pub fn delete(&self, id: &str) -> bool {
        self.products.write().remove(id).is_some()
    }

    pub fn clear(&self) {
        self.products.write().clear();
    }

    /// All products ordered by creation time, then id
    pub fn iter(&self) -> Vec<Product> {
        let mut products: Vec<Product> = self.products.read().values().cloned().collect();
        sort_by_creation(&mut products);
        products
    }

    /// Products matching `filter`, ordered by creation time, then id
    pub fn find(&self, filter: &dyn Filter) -> Vec<Product> {
        let mut products: Vec<Product> = self
            .products
            .read()
            .values()
            .filter(|product| filter.matches(product))
            .cloned()
            .collect();
        sort_by_creation(&mut products);
        products
    }

    pub fn distinct_categories(&self) -> Vec<String> {
        self.distinct(|p| p.category())
    }

    pub fn distinct_brands(&self) -> Vec<String> {
        self.distinct(|p| p.brand())
    }

    fn distinct(&self, field: impl Fn(&Product) -> &str) -> Vec<String> {
        self.products
            .read()
            .values()
            .map(|p| field(p).to_string())
            .filter(|v| !v.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl CatalogSource for Catalog {
    fn find_candidates(&self, filter: &CatalogFilter) -> Result<Vec<Product>> {
        Ok(self.find(&filter.compile()))
    }
}

fn sort_by_creation(products: &mut [Product]) {
    products.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id_string().cmp(&b.id_string()))
    });
}
