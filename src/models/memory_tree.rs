//! 回忆树数据模型
//!
//! 一棵树属于一对用户，树下有多个命名分支，每个分支按时间顺序保存回忆。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MEMORY_TREES_TABLE: &str = "memory_trees";
pub const MEMORY_BRANCHES_TABLE: &str = "memory_branches";
pub const MEMORIES_TABLE: &str = "memories";

/// 新建树时自动创建的分支名
pub const DEFAULT_BRANCH_NAME: &str = "First Meeting";

/// 单条回忆
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Memory {
    pub id: String,
    pub memory_branch_id: String,
    pub memory_tree_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_by: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// 回忆分支
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryBranch {
    pub id: String,
    pub memory_tree_id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub memories: Vec<Memory>,
}

/// 回忆树
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryTree {
    pub id: String,
    pub user_id_1: String,
    pub user_id_2: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub branches: Vec<MemoryBranch>,
}

impl MemoryTree {
    pub fn involves(&self, user_id: &str) -> bool {
        self.user_id_1 == user_id || self.user_id_2 == user_id
    }

    pub fn memory_count(&self) -> usize {
        self.branches.iter().map(|b| b.memories.len()).sum()
    }
}

/// 待上传的图片
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    /// 文件扩展名，不含点
    pub extension: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// 从原始文件名推断扩展名
    pub fn from_file_name(file_name: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .unwrap_or_else(|| "bin".to_string());
        Self {
            extension,
            content_type: content_type.to_string(),
            bytes,
        }
    }
}
