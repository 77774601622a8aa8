// Checksummed catalog snapshots
use anyhow::{anyhow, Context, Result};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use vismatch_core::Product;

const HEADER_PREFIX: &str = "sha256:";

/// Snapshot description for status output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDescription {
    pub name: String,
    pub creation_time: Option<String>,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    pub product_count: usize,
}

/// Catalog snapshot data - every product, vectors included
#[derive(Debug, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub name: String,
    pub vector_dim: usize,
    pub products: Vec<Product>,
    pub created_at: DateTime<Utc>,
}

/// Reads and writes `<dir>/<catalog>.snapshot`.
///
/// The file is a `sha256:<hex>` header line followed by the gzip payload it
/// covers, replaced with a single atomic rename. A snapshot whose payload
/// does not match its header is refused.
pub struct SnapshotManager {
    snapshot_dir: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_dir: P) -> Result<Self> {
        let snapshot_dir = snapshot_dir.as_ref().to_path_buf();
        fs::create_dir_all(&snapshot_dir)
            .with_context(|| format!("creating {}", snapshot_dir.display()))?;
        Ok(Self { snapshot_dir })
    }

    pub fn snapshot_path(&self, catalog_name: &str) -> PathBuf {
        self.snapshot_dir.join(format!("{}.snapshot", catalog_name))
    }

    /// Write a snapshot, replacing the previous one
    pub fn write(&self, data: &CatalogSnapshot) -> Result<SnapshotDescription> {
        let json_data = serde_json::to_vec(data)?;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json_data)?;
        let compressed = encoder.finish()?;
        let checksum = format!("{:x}", Sha256::digest(&compressed));

        let mut contents = Vec::with_capacity(HEADER_PREFIX.len() + 65 + compressed.len());
        contents.extend_from_slice(HEADER_PREFIX.as_bytes());
        contents.extend_from_slice(checksum.as_bytes());
        contents.push(b'\n');
        contents.extend_from_slice(&compressed);

        let snapshot_path = self.snapshot_path(&data.name);
        write_atomic(&snapshot_path, &contents)?;

        info!(
            path = %snapshot_path.display(),
            products = data.products.len(),
            bytes = compressed.len(),
            "snapshot written"
        );

        Ok(SnapshotDescription {
            name: file_name(&snapshot_path),
            creation_time: Some(data.created_at.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
            size: contents.len() as u64,
            checksum: Some(checksum),
            product_count: data.products.len(),
        })
    }

    /// Load the catalog's snapshot, or `None` if it was never saved
    pub fn load(&self, catalog_name: &str) -> Result<Option<CatalogSnapshot>> {
        let snapshot_path = self.snapshot_path(catalog_name);
        if !snapshot_path.exists() {
            return Ok(None);
        }

        let contents = fs::read(&snapshot_path)
            .with_context(|| format!("reading {}", snapshot_path.display()))?;
        let (expected, compressed) = split_header(&contents)
            .with_context(|| format!("reading header of {}", snapshot_path.display()))?;

        let actual = format!("{:x}", Sha256::digest(compressed));
        if expected != actual {
            return Err(anyhow!(
                "Checksum mismatch for {}: expected {}, got {}",
                snapshot_path.display(),
                expected,
                actual
            ));
        }

        let mut decoder = GzDecoder::new(compressed);
        let mut json_data = Vec::new();
        decoder.read_to_end(&mut json_data)?;

        let data: CatalogSnapshot = serde_json::from_slice(&json_data)
            .with_context(|| format!("decoding {}", snapshot_path.display()))?;
        Ok(Some(data))
    }

    /// Describe the stored snapshot without decoding its products
    pub fn describe(&self, catalog_name: &str) -> Result<Option<SnapshotDescription>> {
        let snapshot_path = self.snapshot_path(catalog_name);
        if !snapshot_path.exists() {
            return Ok(None);
        }

        let metadata = fs::metadata(&snapshot_path)?;
        let contents = fs::read(&snapshot_path)?;
        let checksum = split_header(&contents)
            .ok()
            .map(|(digest, _)| digest.to_string());
        let creation_time = metadata
            .modified()
            .ok()
            .map(|t| DateTime::<Utc>::from(t).format("%Y-%m-%dT%H:%M:%SZ").to_string());

        Ok(Some(SnapshotDescription {
            name: file_name(&snapshot_path),
            creation_time,
            size: metadata.len(),
            checksum,
            product_count: self.load(catalog_name)?.map_or(0, |s| s.products.len()),
        }))
    }
}

/// Split a snapshot file into its header digest and the payload
fn split_header(contents: &[u8]) -> Result<(&str, &[u8])> {
    let newline = contents
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| anyhow!("missing checksum header"))?;
    let header = std::str::from_utf8(&contents[..newline])?;
    let digest = header
        .strip_prefix(HEADER_PREFIX)
        .ok_or_else(|| anyhow!("unrecognised snapshot header '{}'", header))?;
    Ok((digest, &contents[newline + 1..]))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
        .write(|f| f.write_all(bytes))
        .map_err(|e| anyhow!("writing {}: {}", path.display(), e))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use vismatch_core::{ProductFields, ProductId, Vector};

    fn snapshot(products: Vec<Product>) -> CatalogSnapshot {
        CatalogSnapshot {
            name: "products".to_string(),
            vector_dim: 2,
            products,
            created_at: Utc::now(),
        }
    }

    fn product(id: &str) -> Product {
        Product::new(
            ProductId::from(id),
            ProductFields::new(id, "Home").with_brand("IKEA"),
            Vector::new(vec![0.1, 0.9]),
        )
    }

    #[test]
    fn test_missing_snapshot_is_none() {
        let dir = tempdir().unwrap();
        let manager = SnapshotManager::new(dir.path()).unwrap();
        assert!(manager.load("products").unwrap().is_none());
        assert!(manager.describe("products").unwrap().is_none());
    }

    #[test]
    fn test_write_and_load() {
        let dir = tempdir().unwrap();
        let manager = SnapshotManager::new(dir.path()).unwrap();
        let desc = manager
            .write(&snapshot(vec![product("a"), product("b")]))
            .unwrap();
        assert_eq!(desc.name, "products.snapshot");
        assert_eq!(desc.product_count, 2);
        assert_eq!(desc.checksum.as_ref().map(String::len), Some(64));

        let loaded = manager.load("products").unwrap().unwrap();
        assert_eq!(loaded.vector_dim, 2);
        assert_eq!(loaded.products.len(), 2);
        assert_eq!(loaded.products[0], product_like(&loaded.products[0], "a"));
    }

    fn product_like(p: &Product, id: &str) -> Product {
        let mut expected = product(id);
        expected.created_at = p.created_at;
        expected.updated_at = p.updated_at;
        expected
    }

    #[test]
    fn test_overwrite_keeps_latest() {
        let dir = tempdir().unwrap();
        let manager = SnapshotManager::new(dir.path()).unwrap();
        manager.write(&snapshot(vec![product("a")])).unwrap();
        manager.write(&snapshot(Vec::new())).unwrap();
        assert!(manager.load("products").unwrap().unwrap().products.is_empty());
    }

    #[test]
    fn test_corrupted_snapshot_is_rejected() {
        let dir = tempdir().unwrap();
        let manager = SnapshotManager::new(dir.path()).unwrap();
        manager.write(&snapshot(vec![product("a")])).unwrap();

        let path = manager.snapshot_path("products");
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        fs::write(&path, bytes).unwrap();

        let err = manager.load("products").unwrap_err();
        assert!(err.to_string().contains("Checksum mismatch"));
    }

    #[test]
    fn test_digest_travels_with_payload() {
        let dir = tempdir().unwrap();
        let manager = SnapshotManager::new(dir.path()).unwrap();
        let first = manager.write(&snapshot(vec![product("a")])).unwrap();
        let second = manager.write(&snapshot(vec![product("a"), product("b")])).unwrap();
        assert_ne!(first.checksum, second.checksum);

        // a single file holds both, so there is no digest to fall out of step
        let entries: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| !name.starts_with('.'))
            .collect();
        assert_eq!(entries, vec!["products.snapshot"]);

        let contents = fs::read(manager.snapshot_path("products")).unwrap();
        let (digest, payload) = split_header(&contents).unwrap();
        assert_eq!(Some(digest.to_string()), second.checksum);
        assert_eq!(digest, format!("{:x}", Sha256::digest(payload)));
        assert_eq!(manager.load("products").unwrap().unwrap().products.len(), 2);
    }

    #[test]
    fn test_snapshot_without_header_is_rejected() {
        let dir = tempdir().unwrap();
        let manager = SnapshotManager::new(dir.path()).unwrap();
        fs::write(manager.snapshot_path("products"), b"not a snapshot").unwrap();
        assert!(manager.load("products").is_err());
    }
}
