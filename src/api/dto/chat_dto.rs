//! 私信 DTO

use serde::{Deserialize, Serialize};
use validator::Validate;

/// 发送消息请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}

/// 未读数
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UnreadResponse {
    pub unread: u64,
}
