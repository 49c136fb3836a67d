//! 用户资料服务
//!
//! 资料读取、更新、完整性判定、头像上传和候选配对列表。

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{ImageUpload, PROFILES_TABLE, Profile, ProfileUpdate};
use crate::storage::{BlobStore, Query, RecordStore};

/// 候选配对数量上限
pub const POTENTIAL_MATCH_LIMIT: usize = 10;

/// 资料完整性
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileCompletion {
    pub complete: bool,
    pub missing_fields: Vec<String>,
}

impl From<&Profile> for ProfileCompletion {
    fn from(profile: &Profile) -> Self {
        let missing_fields: Vec<String> = profile
            .missing_fields()
            .into_iter()
            .map(str::to_string)
            .collect();
        Self {
            complete: missing_fields.is_empty(),
            missing_fields,
        }
    }
}

/// 资料服务 trait
#[async_trait]
pub trait ProfileService: Send + Sync {
    /// 根据用户 ID 获取资料
    async fn get(&self, user_id: &str) -> Result<Option<Profile>>;

    /// 注册后创建资料空壳；已存在时原样返回
    async fn ensure_profile(
        &self,
        user_id: &str,
        email: Option<&str>,
        name: Option<&str>,
    ) -> Result<Profile>;

    /// 更新资料
    async fn update(&self, user_id: &str, update: &ProfileUpdate) -> Result<Profile>;

    /// 资料完整性；资料不存在视为全部未填
    async fn completion(&self, user_id: &str) -> Result<ProfileCompletion>;

    /// 上传头像并写回资料
    async fn upload_avatar(&self, user_id: &str, image: ImageUpload) -> Result<Profile>;

    /// 候选配对（除自己以外的资料）
    async fn potential_matches(&self, user_id: &str) -> Result<Vec<Profile>>;
}

/// 资料服务实现
pub struct ProfileServiceImpl {
    store: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    avatar_bucket: String,
}

impl ProfileServiceImpl {
    pub fn new(store: Arc<dyn RecordStore>, blobs: Arc<dyn BlobStore>, avatar_bucket: &str) -> Self {
        Self {
            store,
            blobs,
            avatar_bucket: avatar_bucket.to_string(),
        }
    }

    fn by_id(user_id: &str) -> Query {
        Query::table(PROFILES_TABLE).eq("id", user_id)
    }

    async fn apply_patch(&self, user_id: &str, patch: serde_json::Value) -> Result<Profile> {
        let updated: Vec<Profile> = self.store.modify(&Self::by_id(user_id), patch).await?;
        updated
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user_id)))
    }
}

#[async_trait]
impl ProfileService for ProfileServiceImpl {
    async fn get(&self, user_id: &str) -> Result<Option<Profile>> {
        self.store.fetch_one(&Self::by_id(user_id)).await
    }

    async fn ensure_profile(
        &self,
        user_id: &str,
        email: Option<&str>,
        name: Option<&str>,
    ) -> Result<Profile> {
        if let Some(existing) = self.get(user_id).await? {
            return Ok(existing);
        }
        tracing::info!("Creating profile stub for {}", user_id);
        let stub = Profile::stub(user_id, email, name);
        let row = serde_json::json!({
            "id": stub.id,
            "email": stub.email,
            "name": stub.name,
        });
        self.store.create(PROFILES_TABLE, &row).await
    }

    async fn update(&self, user_id: &str, update: &ProfileUpdate) -> Result<Profile> {
        if update.is_empty() {
            return self
                .get(user_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user_id)));
        }
        if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(AppError::Validation("Name cannot be empty".to_string()));
        }
        self.apply_patch(user_id, update.to_patch()).await
    }

    async fn completion(&self, user_id: &str) -> Result<ProfileCompletion> {
        let profile = self
            .get(user_id)
            .await?
            .unwrap_or_else(|| Profile::stub(user_id, None, None));
        Ok(ProfileCompletion::from(&profile))
    }

    async fn upload_avatar(&self, user_id: &str, image: ImageUpload) -> Result<Profile> {
        if image.bytes.is_empty() {
            return Err(AppError::Validation("Avatar image is empty".to_string()));
        }
        if !image.content_type.starts_with("image/") {
            return Err(AppError::Validation(format!(
                "Unsupported avatar type: {}",
                image.content_type
            )));
        }

        let path = format!(
            "{}/{}.{}",
            user_id,
            Utc::now().timestamp_millis(),
            image.extension
        );
        let url = self
            .blobs
            .upload(&self.avatar_bucket, &path, &image.content_type, image.bytes)
            .await?;
        tracing::debug!("Avatar for {} stored at {}", user_id, url);

        self.apply_patch(user_id, serde_json::json!({ "avatar": url }))
            .await
    }

    async fn potential_matches(&self, user_id: &str) -> Result<Vec<Profile>> {
        let query = Query::table(PROFILES_TABLE)
            .neq("id", user_id)
            .limit(POTENTIAL_MATCH_LIMIT);
        self.store.fetch(&query).await
    }
}

/// 创建资料服务
pub fn create_profile_service(
    store: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    avatar_bucket: &str,
) -> Box<dyn ProfileService> {
    Box::new(ProfileServiceImpl::new(store, blobs, avatar_bucket))
}
