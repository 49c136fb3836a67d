//! 存储工厂模块
//!
//! 根据配置创建记录存储和对象存储实例。

use std::sync::Arc;

use crate::config::{BackendConfig, BackendKind};
use crate::error::Result;
use crate::models::QUESTIONS_TABLE;
use crate::models::questionnaire::default_questions;
use crate::storage::blob::{BlobStore, MemoryBlobStore, SupabaseBlobStore};
use crate::storage::memory::MemoryStore;
use crate::storage::postgrest::PostgrestStore;
use crate::storage::store::{Query, RecordStore};

/// 存储实例
#[derive(Clone)]
pub struct StorageInstance {
    pub records: Arc<dyn RecordStore>,
    pub blobs: Arc<dyn BlobStore>,
}

/// 存储工厂
pub struct StorageFactory;

impl StorageFactory {
    /// 根据配置创建存储实例
    pub fn create(config: &BackendConfig) -> Result<StorageInstance> {
        match config.kind {
            BackendKind::Hosted => {
                tracing::info!("Using hosted record store at {}", config.url);
                Ok(StorageInstance {
                    records: Arc::new(PostgrestStore::new(config)?),
                    blobs: Arc::new(SupabaseBlobStore::new(config)?),
                })
            }
            BackendKind::Memory => {
                tracing::warn!("Using in-memory storage, data is lost on restart");
                let records = MemoryStore::new();
                let questions = default_questions()
                    .iter()
                    .map(serde_json::to_value)
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                records.seed(QUESTIONS_TABLE, questions)?;
                Ok(Self::in_memory(Arc::new(records)))
            }
        }
    }

    /// 基于已有的进程内记录存储创建实例
    pub fn in_memory(records: Arc<MemoryStore>) -> StorageInstance {
        StorageInstance {
            records,
            blobs: Arc::new(MemoryBlobStore::new()),
        }
    }

    /// 检查存储是否可用
    pub async fn health_check(storage: &StorageInstance) -> Result<bool> {
        let query = Query::table(QUESTIONS_TABLE).limit(1);
        storage.records.select(&query).await.map(|_| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[tokio::test]
    async fn test_memory_backend_is_healthy() {
        let config = AppConfig::development();
        let storage = StorageFactory::create(&config.backend).unwrap();
        assert_eq!(storage.records.store_type(), "memory");
        assert!(StorageFactory::health_check(&storage).await.unwrap());

        let seeded = storage
            .records
            .count(&Query::table(QUESTIONS_TABLE))
            .await
            .unwrap();
        assert_eq!(seeded, 10);
    }

    #[test]
    fn test_hosted_backend_uses_postgrest() {
        let config = AppConfig::production();
        let storage = StorageFactory::create(&config.backend).unwrap();
        assert_eq!(storage.records.store_type(), "postgrest");
    }
}
