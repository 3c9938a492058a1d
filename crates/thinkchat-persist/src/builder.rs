use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::dbs::memory::MemoryStore;
use crate::error::{PersistError, Result};
use crate::store::ChatStore;

/// Which backend to open, as it appears in configuration files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    Memory,
    Sqlite { path: PathBuf },
    Mongodb { uri: String, database: String },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("thinkchat.db"),
        }
    }
}

/// Builder that opens a [`ChatStore`] for the selected backend
#[derive(Debug, Default)]
pub struct PersistClientBuilder {
    config: Option<StoreConfig>,
}

impl PersistClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn memory(self) -> Self {
        self.config(StoreConfig::Memory)
    }

    pub fn sqlite(self, path: impl Into<PathBuf>) -> Self {
        self.config(StoreConfig::Sqlite { path: path.into() })
    }

    pub fn mongodb(self, uri: impl Into<String>, database: impl Into<String>) -> Self {
        self.config(StoreConfig::Mongodb {
            uri: uri.into(),
            database: database.into(),
        })
    }

    pub async fn build(self) -> Result<Arc<dyn ChatStore>> {
        let config = self
            .config
            .ok_or_else(|| PersistError::Internal("store backend not set".to_string()))?;

        match config {
            StoreConfig::Memory => Ok(Arc::new(MemoryStore::new())),
            StoreConfig::Sqlite { path } => open_sqlite(path).await,
            StoreConfig::Mongodb { uri, database } => open_mongodb(&uri, &database).await,
        }
    }
}

#[cfg(feature = "sqlite")]
async fn open_sqlite(path: PathBuf) -> Result<Arc<dyn ChatStore>> {
    Ok(Arc::new(crate::dbs::sqlite::SqliteStore::open(path).await?))
}

#[cfg(not(feature = "sqlite"))]
async fn open_sqlite(_path: PathBuf) -> Result<Arc<dyn ChatStore>> {
    Err(PersistError::Internal(
        "sqlite backend requested but the `sqlite` feature is disabled".to_string(),
    ))
}

#[cfg(feature = "mongodb")]
async fn open_mongodb(uri: &str, database: &str) -> Result<Arc<dyn ChatStore>> {
    Ok(Arc::new(crate::dbs::mongo::MongoStore::connect(uri, database).await?))
}

#[cfg(not(feature = "mongodb"))]
async fn open_mongodb(_uri: &str, _database: &str) -> Result<Arc<dyn ChatStore>> {
    Err(PersistError::Internal(
        "mongodb backend requested but the `mongodb` feature is disabled".to_string(),
    ))
}
