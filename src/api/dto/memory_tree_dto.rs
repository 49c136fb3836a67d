//! 回忆树 DTO

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::ImageUpload;
use crate::services::NewMemory;

/// 新增分支请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddBranchRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// base64 编码的图片
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ImagePayload {
    #[serde(alias = "fileName")]
    #[validate(length(min = 1))]
    pub file_name: String,

    #[serde(alias = "contentType")]
    pub content_type: String,

    /// base64 内容，允许带 `data:<type>;base64,` 前缀
    pub data: String,
}

impl ImagePayload {
    pub fn decode(&self) -> Result<ImageUpload> {
        let data = self
            .data
            .split_once(";base64,")
            .map_or(self.data.as_str(), |(_, rest)| rest);
        let bytes = STANDARD
            .decode(data.trim())
            .map_err(|e| AppError::Validation(format!("Invalid image data: {}", e)))?;
        Ok(ImageUpload::from_file_name(
            &self.file_name,
            &self.content_type,
            bytes,
        ))
    }
}

/// 新增回忆请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddMemoryRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 5000))]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub image: Option<ImagePayload>,
}

impl AddMemoryRequest {
    pub fn into_new_memory(self) -> Result<NewMemory> {
        let image = self.image.as_ref().map(ImagePayload::decode).transpose()?;
        Ok(NewMemory {
            title: self.title,
            description: self.description,
            image,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_url() {
        let payload = ImagePayload {
            file_name: "beach.png".into(),
            content_type: "image/png".into(),
            data: format!("data:image/png;base64,{}", STANDARD.encode([1u8, 2, 3])),
        };
        let image = payload.decode().unwrap();
        assert_eq!(image.bytes, vec![1, 2, 3]);
        assert_eq!(image.extension, "png");
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        let payload = ImagePayload {
            file_name: "beach.png".into(),
            content_type: "image/png".into(),
            data: "!!!".into(),
        };
        assert!(matches!(payload.decode(), Err(AppError::Validation(_))));
    }
}
