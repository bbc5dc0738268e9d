use crate::core::Storage;
use crate::domain::model::{ScannedFunction, SnapshotRecord};
use crate::utils::error::{Result, SecOpsError};
use crate::utils::validation::LATEST_BASELINE;

pub fn snapshot_file_name(name: &str) -> String {
    format!("{}.json", name)
}

/// 快照檔讀寫，檔案名稱為 `<日期>.json` 與 `$LATEST.json`
pub struct SnapshotStore<S: Storage> {
    storage: S,
}

impl<S: Storage> SnapshotStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// 讀取基準快照；檔案不存在時回傳 `None`
    pub async fn load(&self, baseline: &str) -> Result<Option<Vec<SnapshotRecord>>> {
        let file_name = snapshot_file_name(baseline);
        tracing::info!("Reading snapshot from {}", self.storage.location(&file_name));

        match self.storage.read_file(&file_name).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(SecOpsError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Snapshot {} not found, nothing to compare with", file_name);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// 寫入當日與 `$LATEST` 兩份快照，回傳寫入位置
    pub async fn save(&self, functions: &[ScannedFunction], date: &str) -> Result<Vec<String>> {
        let records: Vec<SnapshotRecord> = functions
            .iter()
            .map(|f| SnapshotRecord::from(&f.meta))
            .collect();
        let data = serde_json::to_vec_pretty(&records)?;

        let mut written = Vec::new();
        for name in [date, LATEST_BASELINE] {
            let file_name = snapshot_file_name(name);
            self.storage.write_file(&file_name, &data).await?;
            let location = self.storage.location(&file_name);
            tracing::info!("✅ Snapshot written to {}", location);
            written.push(location);
        }
        Ok(written)
    }
}
