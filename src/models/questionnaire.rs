//! 问卷数据模型

use serde::{Deserialize, Serialize};

/// 问题表名
pub const QUESTIONS_TABLE: &str = "questions";

/// 回答表名
pub const ANSWERS_TABLE: &str = "user_answers";

/// 问卷问题
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: i64,
    pub question: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl Question {
    fn new(id: i64, question: &str, category: &str) -> Self {
        Self {
            id,
            question: question.to_string(),
            category: Some(category.to_string()),
        }
    }
}

/// 进程内存储的默认问卷
pub fn default_questions() -> Vec<Question> {
    vec![
        Question::new(1, "What are your top three hobbies?", "interests"),
        Question::new(2, "How do you prefer to spend your weekends?", "lifestyle"),
        Question::new(3, "What is your ideal vacation destination?", "travel"),
        Question::new(4, "Describe your perfect date.", "relationships"),
        Question::new(5, "What values are most important to you in a relationship?", "values"),
        Question::new(6, "Do you prefer outdoor or indoor activities?", "lifestyle"),
        Question::new(7, "Are you a morning person or a night owl?", "personality"),
        Question::new(8, "What type of books/movies/TV shows do you enjoy?", "entertainment"),
        Question::new(9, "Do you have any pets or would you like to have pets?", "lifestyle"),
        Question::new(10, "What are your career goals?", "goals"),
    ]
}

/// 用户对某个问题的回答
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserAnswer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub user_id: String,
    pub question_id: i64,
    pub answer: String,
}

/// 与问题文本合并后的回答，用于提示词构造
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnsweredQuestion {
    pub question: String,
    pub category: Option<String>,
    pub answer: String,
}

impl AnsweredQuestion {
    /// 按问题 ID 合并回答和问题，找不到问题的回答会被跳过
    pub fn join(questions: &[Question], answers: &[UserAnswer]) -> Vec<AnsweredQuestion> {
        answers
            .iter()
            .filter_map(|a| {
                questions
                    .iter()
                    .find(|q| q.id == a.question_id)
                    .map(|q| AnsweredQuestion {
                        question: q.question.clone(),
                        category: q.category.clone(),
                        answer: a.answer.clone(),
                    })
            })
            .collect()
    }
}

/// 问卷完成状态
///
/// `complete` 沿用“至少一条回答即完成，或者根本没有问题”的规则；
/// `answered`/`total` 供客户端展示进度。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionnaireStatus {
    pub questions_exist: bool,
    pub has_answer: bool,
    pub answered: u64,
    pub total: u64,
}

impl QuestionnaireStatus {
    pub fn new(total: u64, answered: u64) -> Self {
        Self {
            questions_exist: total > 0,
            has_answer: answered > 0,
            answered,
            total,
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.questions_exist || self.has_answer
    }
}
