//! AI 功能 DTO
//!
//! 同时接受 snake_case 和 camelCase 字段名。

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::ai::ChatMessage;
use crate::models::Profile;

/// 兼容性分析请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CompatibilityRequest {
    #[serde(alias = "userOneId")]
    #[validate(length(min = 1))]
    pub user_one_id: String,

    #[serde(alias = "userTwoId")]
    #[validate(length(min = 1))]
    pub user_two_id: String,
}

/// 对话分析请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConversationAnalysisRequest {
    #[serde(alias = "otherUserId")]
    #[validate(length(min = 1))]
    pub other_user_id: String,
}

/// 资料建议请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct ProfileSuggestionsRequest {
    #[serde(default, alias = "currentProfile")]
    pub current_profile: Option<Profile>,
}

/// 约会助手请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AssistantRequest {
    #[validate(length(min = 1, message = "At least one message is required"))]
    pub messages: Vec<ChatMessage>,

    #[serde(default, alias = "userProfile")]
    pub user_profile: Option<Profile>,

    #[serde(default, alias = "otherUserProfile")]
    pub other_user_profile: Option<Profile>,
}
