use std::path::{Path, PathBuf};

use crate::error::{Result, SlateError};
use crate::models::RunState;

/// Persists one pretty-JSON snapshot file per run under the state
/// directory. A snapshot is written after every task transition, so the
/// newest file always reflects the exact resume boundary.
pub struct RunStateStore {
    state_dir: PathBuf,
}

impl RunStateStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            state_dir: state_dir.to_path_buf(),
        }
    }

    fn run_path(&self, run_id: &str) -> PathBuf {
        self.state_dir.join(format!("{run_id}.json"))
    }

    pub async fn save(&self, run: &RunState) -> Result<()> {
        tokio::fs::create_dir_all(&self.state_dir)
            .await
            .map_err(|e| SlateError::State(format!("failed to create state dir: {e}")))?;
        let json = serde_json::to_string_pretty(run)?;
        tokio::fs::write(self.run_path(&run.run_id), json)
            .await
            .map_err(|e| SlateError::State(format!("failed to write run snapshot: {e}")))?;
        Ok(())
    }

    pub async fn load(&self, run_id: &str) -> Result<RunState> {
        let path = self.run_path(run_id);
        if !path.exists() {
            return Err(SlateError::RunNotFound(run_id.to_string()));
        }
        let json = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| SlateError::State(format!("failed to read run snapshot: {e}")))?;
        let run: RunState = serde_json::from_str(&json)?;
        Ok(run)
    }

    /// All persisted run ids, sorted.
    pub async fn list(&self) -> Result<Vec<String>> {
        if !self.state_dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.state_dir)
            .await
            .map_err(|e| SlateError::State(format!("reading state dir: {e}")))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SlateError::State(format!("reading state entry: {e}")))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}
