//! 配对数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::profile::Profile;

/// 配对表名
pub const MATCHES_TABLE: &str = "matches";

/// 配对状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// 等待处理
    #[default]
    Pending,
    /// 已接受
    Accepted,
    /// 已拒绝
    Rejected,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Accepted => "accepted",
            MatchStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 两个用户之间的配对记录（无序对）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Match {
    pub id: i64,
    pub user_id_1: String,
    pub user_id_2: String,
    pub match_score: f64,
    #[serde(default)]
    pub status: MatchStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Match {
    /// 用户是否是该配对的一方
    pub fn involves(&self, user_id: &str) -> bool {
        self.user_id_1 == user_id || self.user_id_2 == user_id
    }

    /// 获取配对中的另一方
    pub fn counterpart(&self, user_id: &str) -> Option<&str> {
        if self.user_id_1 == user_id {
            Some(&self.user_id_2)
        } else if self.user_id_2 == user_id {
            Some(&self.user_id_1)
        } else {
            None
        }
    }
}

/// 从某个用户视角看到的配对
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchView {
    pub id: i64,
    pub user: Profile,
    pub match_score: f64,
    pub status: MatchStatus,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_favorite: bool,
}

impl MatchView {
    pub fn new(record: &Match, user: Profile) -> Self {
        Self {
            id: record.id,
            user,
            match_score: record.match_score,
            status: record.status,
            created_at: record.created_at,
            is_favorite: false,
        }
    }
}
