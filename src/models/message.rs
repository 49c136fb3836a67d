//! 私信数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::profile::Profile;

/// 私信表名
pub const MESSAGES_TABLE: &str = "messages";

/// 私信，除已读标记外只追加不修改
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: i64,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// 对话中的另一方
    pub fn counterpart(&self, user_id: &str) -> &str {
        if self.sender_id == user_id {
            &self.receiver_id
        } else {
            &self.sender_id
        }
    }

    /// 是否是发给该用户的未读消息
    pub fn is_unread_for(&self, user_id: &str) -> bool {
        self.receiver_id == user_id && !self.read
    }
}

/// 最近会话摘要
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub user: Profile,
    pub last_message: Message,
    pub unread_count: u64,
}
