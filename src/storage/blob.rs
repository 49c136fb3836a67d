//! 对象存储
//!
//! 头像和回忆图片上传到公开存储桶，返回可直接访问的地址。

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::Duration;

use crate::config::BackendConfig;
use crate::error::{AppError, Result};

/// 对象存储 trait
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// 上传对象（同路径覆盖），返回公开地址
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String>;

    /// 对象的公开地址
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// 托管后端的对象存储
pub struct SupabaseBlobStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SupabaseBlobStore {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout.max(1)))
            .build()?;
        Ok(Self::with_client(client, &config.url, config.data_key()))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for SupabaseBlobStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path);
        tracing::debug!("Uploading {} bytes to {}", bytes.len(), url);

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Upload to {}/{} failed ({}): {}",
                bucket, path, status, error_text
            )));
        }

        Ok(self.public_url(bucket, path))
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, bucket, path
        )
    }
}

/// 进程内对象存储
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: DashMap<String, (String, Vec<u8>)>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取已上传对象：(content_type, bytes)
    pub fn get(&self, bucket: &str, path: &str) -> Option<(String, Vec<u8>)> {
        self.objects
            .get(&format!("{}/{}", bucket, path))
            .map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        if bytes.is_empty() {
            return Err(AppError::Validation("Empty upload".to_string()));
        }
        self.objects.insert(
            format!("{}/{}", bucket, path),
            (content_type.to_string(), bytes),
        );
        Ok(self.public_url(bucket, path))
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://{}/{}", bucket, path)
    }
}
