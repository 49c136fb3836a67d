//! 问卷 DTO

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::QuestionnaireStatus;
use crate::services::AnswerInput;

/// 保存回答请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SaveAnswersRequest {
    #[validate(length(min = 1, message = "At least one answer is required"))]
    pub answers: Vec<AnswerInput>,
}

/// 问卷状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionnaireStatusResponse {
    #[serde(flatten)]
    pub status: QuestionnaireStatus,
    pub complete: bool,
}

impl From<QuestionnaireStatus> for QuestionnaireStatusResponse {
    fn from(status: QuestionnaireStatus) -> Self {
        Self {
            complete: status.is_complete(),
            status,
        }
    }
}
