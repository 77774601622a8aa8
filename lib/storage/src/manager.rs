use crate::snapshot::{CatalogSnapshot, SnapshotDescription, SnapshotManager};
use crate::wal::{WalRecord, WriteAheadLog};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vismatch_core::{
    Catalog, CatalogConfig, CatalogFilter, CatalogSource, Error, Product, ProductFields,
    ProductId, Result,
};
use vismatch_similarity::FeatureEncoder;

/// Name of the catalog kept by a [`StorageManager`]
pub const CATALOG_NAME: &str = "products";

/// Page size used when a listing asks for zero items
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// A product as shown in listings: everything but the vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: ProductId,
    pub version: u64,
    #[serde(flatten)]
    pub fields: ProductFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            version: product.version,
            fields: product.fields,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// 1-based page number
    pub current: usize,
    pub total_pages: usize,
    /// Products on this page
    pub count: usize,
    /// Products matching the filter across all pages
    pub total_products: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<ProductView>,
    pub pagination: Pagination,
}

/// Catalog health summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub total_products: usize,
    pub categories: Vec<String>,
    pub brands: Vec<String>,
    /// Products whose vector has the encoder's dimension
    pub products_with_vectors: usize,
    /// First few products by creation time
    pub sample: Vec<ProductView>,
}

/// Owns the catalog and everything needed to persist it.
///
/// Opening loads the last snapshot and replays the WAL on top of it. Every
/// mutation is logged before it is applied; [`StorageManager::save`] folds
/// the log into a fresh snapshot.
pub struct StorageManager {
    catalog: Arc<Catalog>,
    encoder: FeatureEncoder,
    data_dir: PathBuf,
    wal: Arc<WriteAheadLog>,
    snapshots: Arc<SnapshotManager>,
    // serializes log-then-apply against snapshotting
    write_lock: Mutex<()>,
}

impl StorageManager {
    pub fn open<P: AsRef<Path>>(data_dir: P, encoder: FeatureEncoder) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;

        let wal = Arc::new(
            WriteAheadLog::new(data_dir.join("wal.log"))
                .map_err(|e| Error::Storage(e.to_string()))?,
        );
        let snapshots = Arc::new(
            SnapshotManager::new(data_dir.join("snapshots"))
                .map_err(|e| Error::Storage(e.to_string()))?,
        );

        let catalog = Arc::new(Catalog::new(CatalogConfig {
            name: CATALOG_NAME.to_string(),
            vector_dim: encoder.dim(),
        }));

        let manager = Self {
            catalog,
            encoder,
            data_dir,
            wal,
            snapshots,
            write_lock: Mutex::new(()),
        };
        manager.recover()?;

        info!(
            data_dir = %manager.data_dir.display(),
            products = manager.catalog.count(),
            "catalog opened"
        );
        Ok(manager)
    }

    fn recover(&self) -> Result<()> {
        if let Some(snapshot) = self
            .snapshots
            .load(CATALOG_NAME)
            .map_err(|e| Error::Persistence(e.to_string()))?
        {
            debug!(products = snapshot.products.len(), "loading snapshot");
            for product in snapshot.products {
                self.restore(product);
            }
        }

        let records = self
            .wal
            .replay()
            .map_err(|e| Error::Persistence(e.to_string()))?;
        let replayed = records.len();
        for record in records {
            match record {
                WalRecord::Upsert(product) => self.restore(product),
                WalRecord::Delete { id } => {
                    self.catalog.delete(&id);
                }
            }
        }
        if replayed > 0 {
            info!(records = replayed, "replayed write-ahead log");
        }
        Ok(())
    }

    /// Put back a persisted record; a vector of the wrong size is recomputed
    fn restore(&self, mut product: Product) {
        if product.vector.dim() != self.encoder.dim() {
            warn!(
                id = %product.id,
                dim = product.vector.dim(),
                "stored vector has wrong dimension, re-encoding"
            );
            product.vector = self.encoder.encode_product(&product.fields);
        }
        let id = product.id_string();
        if let Err(e) = self.catalog.restore(product) {
            warn!(id = %id, error = %e, "skipping product during recovery");
        }
    }

    fn log(&self, record: &WalRecord) -> Result<()> {
        self.wal
            .append(record)
            .map_err(|e| Error::Storage(e.to_string()))
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Store a new product with a fresh id and a vector computed from its fields
    pub fn create_product(&self, fields: ProductFields) -> Result<Product> {
        let vector = self.encoder.encode_product(&fields);
        let product = Product::new(ProductId::new_v4(), fields, vector);

        let _guard = self.write_lock.lock();
        self.log(&WalRecord::Upsert(product.clone()))?;
        let product = self.catalog.insert(product)?;
        debug!(id = %product.id, "product created");
        Ok(product)
    }

    /// Replace a product's fields and recompute its vector
    pub fn update_product(&self, id: &str, fields: ProductFields) -> Result<Product> {
        let _guard = self.write_lock.lock();
        let existing = self
            .catalog
            .get(id)
            .ok_or_else(|| Error::ProductNotFound(id.to_string()))?;

        let vector = self.encoder.encode_product(&fields);
        let product = Product {
            id: existing.id,
            version: existing.version + 1,
            fields,
            vector,
            created_at: existing.created_at,
            updated_at: Utc::now(),
        };

        self.log(&WalRecord::Upsert(product.clone()))?;
        self.catalog.restore(product.clone())?;
        debug!(id = %product.id, version = product.version, "product updated");
        Ok(product)
    }

    /// Returns `false` if there was nothing to delete
    pub fn delete_product(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock();
        if !self.catalog.contains(id) {
            return Ok(false);
        }
        self.log(&WalRecord::Delete { id: id.to_string() })?;
        Ok(self.catalog.delete(id))
    }

    #[inline]
    pub fn get_product(&self, id: &str) -> Option<Product> {
        self.catalog.get(id)
    }

    /// One page of matching products, newest first.
    ///
    /// `page` is 1-based; 0 is treated as 1, and a `limit` of 0 as
    /// [`DEFAULT_PAGE_SIZE`].
    pub fn list_products(&self, filter: &CatalogFilter, page: usize, limit: usize) -> ProductPage {
        let page = page.max(1);
        let limit = if limit == 0 { DEFAULT_PAGE_SIZE } else { limit };

        let mut matching = self.catalog.find(&filter.compile());
        matching.reverse();
        let total_products = matching.len();

        let products: Vec<ProductView> = matching
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .map(ProductView::from)
            .collect();

        ProductPage {
            pagination: Pagination {
                current: page,
                total_pages: total_products.div_ceil(limit),
                count: products.len(),
                total_products,
            },
            products,
        }
    }

    pub fn stats(&self) -> CatalogStats {
        let products = self.catalog.iter();
        let dim = self.encoder.dim();
        CatalogStats {
            total_products: products.len(),
            categories: self.catalog.distinct_categories(),
            brands: self.catalog.distinct_brands(),
            products_with_vectors: products.iter().filter(|p| p.vector.dim() == dim).count(),
            sample: products.into_iter().take(3).map(ProductView::from).collect(),
        }
    }

    /// Recompute every stored vector from its fields.
    ///
    /// Only products whose vector actually changes are rewritten. Returns
    /// how many were.
    pub fn reindex(&self) -> Result<usize> {
        let _guard = self.write_lock.lock();
        let mut changed = 0;
        for mut product in self.catalog.iter() {
            let vector = self.encoder.encode_product(&product.fields);
            if vector == product.vector {
                continue;
            }
            product.vector = vector;
            product.version += 1;
            product.updated_at = Utc::now();

            self.log(&WalRecord::Upsert(product.clone()))?;
            self.catalog.restore(product)?;
            changed += 1;
        }
        info!(changed, total = self.catalog.count(), "reindex complete");
        Ok(changed)
    }

    /// Add a batch of records, optionally after removing everything else
    pub fn seed(&self, records: Vec<ProductFields>, reset: bool) -> Result<Vec<Product>> {
        if reset {
            let ids: Vec<String> = self.catalog.iter().iter().map(Product::id_string).collect();
            for id in &ids {
                self.delete_product(id)?;
            }
            info!(removed = ids.len(), "catalog cleared");
        }

        let created = records
            .into_iter()
            .map(|fields| self.create_product(fields))
            .collect::<Result<Vec<_>>>()?;
        info!(count = created.len(), "seeded products");
        Ok(created)
    }

    /// Write a snapshot of the whole catalog and empty the WAL
    pub fn save(&self) -> Result<SnapshotDescription> {
        let _guard = self.write_lock.lock();
        let snapshot = CatalogSnapshot {
            name: CATALOG_NAME.to_string(),
            vector_dim: self.catalog.vector_dim(),
            products: self.catalog.iter(),
            created_at: Utc::now(),
        };

        let description = self
            .snapshots
            .write(&snapshot)
            .map_err(|e| Error::Persistence(e.to_string()))?;
        self.wal
            .truncate()
            .map_err(|e| Error::Persistence(e.to_string()))?;
        Ok(description)
    }

    pub fn snapshot_info(&self) -> Result<Option<SnapshotDescription>> {
        self.snapshots
            .describe(CATALOG_NAME)
            .map_err(|e| Error::Persistence(e.to_string()))
    }

    /// Save and release the handle
    pub fn close(self) -> Result<()> {
        self.save()?;
        self.wal
            .sync()
            .map_err(|e| Error::Persistence(e.to_string()))?;
        Ok(())
    }
}

impl CatalogSource for StorageManager {
    fn find_candidates(&self, filter: &CatalogFilter) -> Result<Vec<Product>> {
        self.catalog.find_candidates(filter)
    }
}
