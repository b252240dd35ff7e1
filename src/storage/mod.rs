//! Persistence adapter
//!
//! Two fixed keys in a local state directory, one JSON document each, written
//! whole and overwritten unconditionally — no versioning, no migration. Loads
//! absorb malformed or absent data with a logged warning so startup can always
//! fall back to default state; availability wins over correctness here.

use crate::model::AiModel;
use crate::types::Portfolio;
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const KEY_PORTFOLIO: &str = "portfolio";
pub const KEY_AI_MODEL: &str = "ai_model";

/// JSON-file key-value store scoped to one state directory.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Snapshot both structures. The adapter only ever reads the state it is
    /// given; it never mutates the book or the model.
    pub async fn save(&self, portfolio: &Portfolio, model: &AiModel) -> Result<()> {
        self.write_key(KEY_PORTFOLIO, portfolio).await?;
        self.write_key(KEY_AI_MODEL, model).await?;
        debug!(dir = %self.dir.display(), "state snapshot written");
        Ok(())
    }

    /// Load whatever deserializes; each side independently falls back to
    /// `None` on absence or corruption.
    pub async fn load(&self) -> (Option<Portfolio>, Option<AiModel>) {
        (
            self.read_key(KEY_PORTFOLIO).await,
            self.read_key(KEY_AI_MODEL).await,
        )
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    async fn write_key<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let bytes = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(self.path_for(key), bytes).await?;
        Ok(())
    }

    async fn read_key<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(key, error = %e, "state read failed, falling back to defaults");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(key, error = %e, "state deserialization failed, falling back to defaults");
                None
            }
        }
    }
}
