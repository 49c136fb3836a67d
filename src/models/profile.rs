//! 用户资料数据模型
//!
//! 资料以认证用户 ID 为主键，注册时自动创建空壳记录，之后由资料表单更新。

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 资料表名
pub const PROFILES_TABLE: &str = "profiles";

/// 用户资料
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Profile {
    /// 资料 ID（等于认证用户 ID）
    pub id: String,

    /// 邮箱
    #[serde(default)]
    pub email: Option<String>,

    /// 姓名
    #[serde(default)]
    pub name: Option<String>,

    /// 头像公开地址
    #[serde(default)]
    pub avatar: Option<String>,

    /// 个人简介
    #[serde(default)]
    pub bio: Option<String>,

    /// 所在地
    #[serde(default)]
    pub location: Option<String>,

    /// 性别
    #[serde(default)]
    pub gender: Option<String>,

    /// 出生日期
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,

    /// 创建时间
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn filled(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl Profile {
    /// 创建注册时的资料空壳
    pub fn stub(id: &str, email: Option<&str>, name: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            email: email.map(str::to_string),
            name: name.map(str::to_string),
            ..Default::default()
        }
    }

    /// 资料是否完整：姓名、简介、所在地、性别均非空
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// 列出尚未填写的必填字段
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("bio", &self.bio),
            ("location", &self.location),
            ("gender", &self.gender),
        ]
        .into_iter()
        .filter(|(_, value)| !filled(value))
        .map(|(field, _)| field)
        .collect()
    }

    /// 展示用名称
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("Someone")
    }
}

/// 资料更新内容，仅包含需要修改的字段
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

impl ProfileUpdate {
    /// 是否没有任何字段需要更新
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// 转换为记录存储的局部更新
    pub fn to_patch(&self) -> Value {
        let mut patch = Map::new();
        let text_fields = [
            ("name", &self.name),
            ("avatar", &self.avatar),
            ("bio", &self.bio),
            ("location", &self.location),
            ("gender", &self.gender),
        ];
        for (key, value) in text_fields {
            if let Some(v) = value {
                patch.insert(key.to_string(), Value::String(v.trim().to_string()));
            }
        }
        if let Some(dob) = self.date_of_birth {
            patch.insert("date_of_birth".into(), Value::String(dob.to_string()));
        }
        Value::Object(patch)
    }
}
