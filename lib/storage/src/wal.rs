use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;
use vismatch_core::Product;

/// One logged mutation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum WalRecord {
    /// Full replacement of a product, vector included
    Upsert(Product),
    Delete { id: String },
}

/// Write-Ahead Log for durability
///
/// One JSON record per line, appended before the change is applied to the
/// in-memory catalog. A snapshot makes the log redundant, so it is truncated
/// after every successful save.
pub struct WriteAheadLog {
    file: Arc<Mutex<BufWriter<File>>>,
    raw_file: Arc<Mutex<File>>, // for fsync
    path: PathBuf,
}

impl WriteAheadLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening WAL {}", path.display()))?;

        let raw_file = file.try_clone()?;

        Ok(Self {
            file: Arc::new(Mutex::new(BufWriter::new(file))),
            raw_file: Arc::new(Mutex::new(raw_file)),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record and flush it to the OS
    #[inline]
    pub fn append(&self, record: &WalRecord) -> Result<()> {
        let line = serde_json::to_vec(record)?;
        let mut writer = self.file.lock();
        writer.write_all(&line)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Sync WAL to disk. Uses `sync_data`, the fdatasync equivalent
    #[inline]
    pub fn sync(&self) -> Result<()> {
        let mut writer = self.file.lock();
        writer.flush()?;

        let raw = self.raw_file.lock();
        raw.sync_data()?;
        Ok(())
    }

    /// Read every complete record in order.
    ///
    /// Replay stops at the first line that does not parse, which is what a
    /// write torn by a crash looks like; the records before it are kept.
    pub fn replay(&self) -> Result<Vec<WalRecord>> {
        self.file.lock().flush()?;

        let file = File::open(&self.path)
            .with_context(|| format!("reading WAL {}", self.path.display()))?;
        let mut records = Vec::new();

        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<WalRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(line = line_no + 1, error = %e, "corrupt WAL tail, ignoring rest of log");
                    break;
                }
            }
        }

        Ok(records)
    }

    /// Drop every record, after a snapshot has captured them
    pub fn truncate(&self) -> Result<()> {
        let mut writer = self.file.lock();
        writer.flush()?;

        let raw = self.raw_file.lock();
        raw.set_len(0)?;
        raw.sync_all()?;
        Ok(())
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.file.lock().flush()?;
        Ok(std::fs::metadata(&self.path)?.len() == 0)
    }
}
