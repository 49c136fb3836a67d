//! 用户资料 DTO

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::ProfileUpdate;

/// 更新资料请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct UpdateProfileRequest {
    /// 姓名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub name: Option<String>,

    /// 头像地址
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub avatar: Option<String>,

    /// 个人简介
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000))]
    pub bio: Option<String>,

    /// 所在地
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200))]
    pub location: Option<String>,

    /// 性别
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 50))]
    pub gender: Option<String>,

    /// 出生日期
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
}

impl From<UpdateProfileRequest> for ProfileUpdate {
    fn from(request: UpdateProfileRequest) -> Self {
        Self {
            name: request.name,
            avatar: request.avatar,
            bio: request.bio,
            location: request.location,
            gender: request.gender,
            date_of_birth: request.date_of_birth,
        }
    }
}
