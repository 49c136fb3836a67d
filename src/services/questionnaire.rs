//! 问卷服务

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{ANSWERS_TABLE, AnsweredQuestion, QUESTIONS_TABLE, Question, QuestionnaireStatus, UserAnswer};
use crate::storage::{Direction, Query, RecordStore};

/// 单条待保存的回答
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerInput {
    pub question_id: i64,
    pub answer: String,
}

/// 问卷服务 trait
#[async_trait]
pub trait QuestionnaireService: Send + Sync {
    /// 按 ID 顺序列出问题
    async fn questions(&self) -> Result<Vec<Question>>;

    /// 用户的全部回答
    async fn answers(&self, user_id: &str) -> Result<Vec<UserAnswer>>;

    /// 回答与问题合并
    async fn answered_questions(&self, user_id: &str) -> Result<Vec<AnsweredQuestion>>;

    /// 保存回答：同一问题已有回答时覆盖，空回答跳过
    async fn save_answers(&self, user_id: &str, answers: &[AnswerInput]) -> Result<Vec<UserAnswer>>;

    /// 是否存在任何问题
    async fn questions_exist(&self) -> Result<bool>;

    /// 用户是否至少回答过一题
    async fn has_answer(&self, user_id: &str) -> Result<bool>;

    /// 问卷状态
    async fn status(&self, user_id: &str) -> Result<QuestionnaireStatus>;
}

/// 问卷服务实现
pub struct QuestionnaireServiceImpl {
    store: Arc<dyn RecordStore>,
}

impl QuestionnaireServiceImpl {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    fn answers_of(user_id: &str) -> Query {
        Query::table(ANSWERS_TABLE).eq("user_id", user_id)
    }
}

#[async_trait]
impl QuestionnaireService for QuestionnaireServiceImpl {
    async fn questions(&self) -> Result<Vec<Question>> {
        let query = Query::table(QUESTIONS_TABLE).order_by("id", Direction::Asc);
        self.store.fetch(&query).await
    }

    async fn answers(&self, user_id: &str) -> Result<Vec<UserAnswer>> {
        let query = Self::answers_of(user_id).order_by("question_id", Direction::Asc);
        self.store.fetch(&query).await
    }

    async fn answered_questions(&self, user_id: &str) -> Result<Vec<AnsweredQuestion>> {
        let (questions, answers) = tokio::try_join!(self.questions(), self.answers(user_id))?;
        Ok(AnsweredQuestion::join(&questions, &answers))
    }

    async fn save_answers(&self, user_id: &str, answers: &[AnswerInput]) -> Result<Vec<UserAnswer>> {
        let questions = self.questions().await?;

        // 整批校验通过后才写入
        let pending: Vec<(i64, &str)> = answers
            .iter()
            .map(|input| (input.question_id, input.answer.trim()))
            .filter(|(_, answer)| !answer.is_empty())
            .collect();
        if let Some((unknown, _)) = pending
            .iter()
            .find(|(id, _)| !questions.iter().any(|q| q.id == *id))
        {
            return Err(AppError::Validation(format!("Unknown question {}", unknown)));
        }

        let mut saved = Vec::with_capacity(pending.len());
        for (question_id, answer) in pending {
            let row = UserAnswer {
                id: None,
                user_id: user_id.to_string(),
                question_id,
                answer: answer.to_string(),
            };
            let stored = self
                .store
                .upsert(
                    ANSWERS_TABLE,
                    serde_json::to_value(&row)?,
                    &["user_id", "question_id"],
                )
                .await?;
            saved.push(serde_json::from_value(stored)?);
        }

        tracing::debug!("Saved {} answers for {}", saved.len(), user_id);
        Ok(saved)
    }

    async fn questions_exist(&self) -> Result<bool> {
        self.store.exists(&Query::table(QUESTIONS_TABLE)).await
    }

    async fn has_answer(&self, user_id: &str) -> Result<bool> {
        self.store.exists(&Self::answers_of(user_id)).await
    }

    async fn status(&self, user_id: &str) -> Result<QuestionnaireStatus> {
        let questions = Query::table(QUESTIONS_TABLE);
        let answers = Self::answers_of(user_id);
        let (total, answered) =
            tokio::try_join!(self.store.count(&questions), self.store.count(&answers))?;
        Ok(QuestionnaireStatus::new(total, answered))
    }
}

/// 创建问卷服务
pub fn create_questionnaire_service(store: Arc<dyn RecordStore>) -> Box<dyn QuestionnaireService> {
    Box::new(QuestionnaireServiceImpl::new(store))
}
