//! 配对 DTO

use serde::{Deserialize, Serialize};
use validator::Validate;

/// 创建配对请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateMatchRequest {
    #[serde(alias = "otherUserId")]
    #[validate(length(min = 1))]
    pub other_user_id: String,

    #[serde(default, alias = "matchScore")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub match_score: f64,
}
