use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::BreakerStore;
use crate::{BreakerError, CircuitRecord};

/// One JSON document per provider under a directory
#[derive(Debug, Clone)]
pub struct FileBreakerStore {
    dir: PathBuf,
}

impl FileBreakerStore {
    pub const fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, provider: &str) -> PathBuf {
        let name: String = provider
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();

        self.dir.join(format!("{name}.json"))
    }
}

async fn read_record(path: &Path) -> Option<CircuitRecord> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read circuit record");
            return None;
        }
    };

    match serde_json::from_slice(&raw) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "skipping corrupt circuit record");
            None
        }
    }
}

#[async_trait]
impl BreakerStore for FileBreakerStore {
    async fn load_all(&self) -> Result<Vec<CircuitRecord>, BreakerError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(BreakerError::Storage(format!(
                    "failed to list {}: {e}",
                    self.dir.display()
                )));
            }
        };

        let mut records = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BreakerError::Storage(format!("failed to list {}: {e}", self.dir.display())))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && let Some(record) = read_record(&path).await
            {
                records.push(record);
            }
        }

        Ok(records)
    }

    async fn save(&self, record: &CircuitRecord) -> Result<(), BreakerError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| BreakerError::Storage(format!("failed to create {}: {e}", self.dir.display())))?;

        let json = serde_json::to_vec_pretty(record).map_err(|e| BreakerError::Storage(format!("encode failed: {e}")))?;

        let path = self.path_for(&record.provider);
        let tmp = path.with_extension("json.tmp");

        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| BreakerError::Storage(format!("failed to write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| BreakerError::Storage(format!("failed to replace {}: {e}", path.display())))?;

        Ok(())
    }
}
