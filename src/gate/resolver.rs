//! 守卫事实的获取
//!
//! 只查询当前页面需要的事实，并发执行；单项查询失败记为 `Fact::Failed`。

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::gate::{Fact, GateOutcome, GateSnapshot, Route, decide};
use crate::services::{ProfileService, QuestionnaireService};

/// 守卫事实来源
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FactSource: Send + Sync {
    async fn profile_complete(&self, user_id: &str) -> Result<bool>;

    async fn questions_exist(&self) -> Result<bool>;

    async fn has_answer(&self, user_id: &str) -> Result<bool>;
}

/// 基于资料和问卷服务的事实来源
pub struct ServiceFactSource {
    profiles: Arc<dyn ProfileService>,
    questionnaire: Arc<dyn QuestionnaireService>,
}

impl ServiceFactSource {
    pub fn new(
        profiles: Arc<dyn ProfileService>,
        questionnaire: Arc<dyn QuestionnaireService>,
    ) -> Self {
        Self {
            profiles,
            questionnaire,
        }
    }
}

#[async_trait]
impl FactSource for ServiceFactSource {
    async fn profile_complete(&self, user_id: &str) -> Result<bool> {
        Ok(self.profiles.completion(user_id).await?.complete)
    }

    async fn questions_exist(&self) -> Result<bool> {
        self.questionnaire.questions_exist().await
    }

    async fn has_answer(&self, user_id: &str) -> Result<bool> {
        self.questionnaire.has_answer(user_id).await
    }
}

/// 按页面要求拉取事实并给出判定
#[derive(Clone)]
pub struct GateResolver {
    source: Arc<dyn FactSource>,
}

impl std::fmt::Debug for GateResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateResolver").finish_non_exhaustive()
    }
}

impl GateResolver {
    pub fn new(source: Arc<dyn FactSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> Arc<dyn FactSource> {
        Arc::clone(&self.source)
    }

    /// 构造快照；页面不需要的事实保持 `Pending`
    pub async fn snapshot(&self, route: &Route, user_id: Option<&str>) -> GateSnapshot {
        let mut snapshot = GateSnapshot {
            session: Fact::Ready(user_id.map(str::to_string)),
            ..Default::default()
        };
        let guard = route.guard();
        let Some(user_id) = user_id.filter(|_| guard.protected) else {
            return snapshot;
        };

        let profile = async {
            if guard.requires_profile {
                Fact::from_result("profile", self.source.profile_complete(user_id).await)
            } else {
                Fact::Pending
            }
        };
        let questions = async {
            if guard.requires_questionnaire {
                Fact::from_result("questions", self.source.questions_exist().await)
            } else {
                Fact::Pending
            }
        };
        let answers = async {
            if guard.requires_questionnaire {
                Fact::from_result("answers", self.source.has_answer(user_id).await)
            } else {
                Fact::Pending
            }
        };

        let (profile_complete, questions_exist, has_answer) =
            tokio::join!(profile, questions, answers);
        snapshot.profile_complete = profile_complete;
        snapshot.questions_exist = questions_exist;
        snapshot.has_answer = has_answer;
        snapshot
    }

    pub async fn resolve(&self, route: &Route, user_id: Option<&str>) -> GateOutcome {
        decide(route, &self.snapshot(route, user_id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::gate::{GateDecision, QUESTIONS_NOTICE};

    fn resolver(source: MockFactSource) -> GateResolver {
        GateResolver::new(Arc::new(source))
    }

    #[tokio::test]
    async fn test_unauthenticated_skips_lookups() {
        let mut source = MockFactSource::new();
        source.expect_profile_complete().times(0);
        source.expect_questions_exist().times(0);
        source.expect_has_answer().times(0);

        let outcome = resolver(source)
            .resolve(&Route::Chat("42".into()), None)
            .await;
        assert_eq!(outcome.decision, GateDecision::Redirect(Route::Auth));
    }

    #[tokio::test]
    async fn test_profile_route_only_needs_session() {
        let mut source = MockFactSource::new();
        source.expect_profile_complete().times(0);
        source.expect_questions_exist().times(0);
        source.expect_has_answer().times(0);

        let outcome = resolver(source).resolve(&Route::Profile, Some("u1")).await;
        assert_eq!(outcome.decision, GateDecision::Render);
    }

    #[tokio::test]
    async fn test_incomplete_profile_redirects() {
        let mut source = MockFactSource::new();
        source
            .expect_profile_complete()
            .withf(|user| user == "u1")
            .returning(|_| Ok(false));
        source.expect_questions_exist().returning(|| Ok(true));
        source.expect_has_answer().returning(|_| Ok(true));

        let outcome = resolver(source).resolve(&Route::Matches, Some("u1")).await;
        assert_eq!(outcome.decision, GateDecision::Redirect(Route::Profile));
    }

    #[tokio::test]
    async fn test_no_questions_bypasses_answers() {
        let mut source = MockFactSource::new();
        source.expect_profile_complete().returning(|_| Ok(true));
        source.expect_questions_exist().returning(|| Ok(false));
        source.expect_has_answer().returning(|_| Ok(false));

        let outcome = resolver(source).resolve(&Route::Matches, Some("u1")).await;
        assert_eq!(outcome.decision, GateDecision::Render);
    }

    #[tokio::test]
    async fn test_failed_questions_lookup_fails_closed() {
        let mut source = MockFactSource::new();
        source.expect_profile_complete().returning(|_| Ok(true));
        source
            .expect_questions_exist()
            .returning(|| Err(AppError::Connection("timeout".into())));
        source.expect_has_answer().returning(|_| Ok(false));

        let gate = resolver(source);
        let snapshot = gate.snapshot(&Route::Matches, Some("u1")).await;
        assert!(matches!(snapshot.questions_exist, Fact::Failed(_)));

        let outcome = decide(&Route::Matches, &snapshot);
        assert_eq!(outcome.decision, GateDecision::Redirect(Route::Questionnaire));
        assert_eq!(outcome.notice.as_deref(), Some(QUESTIONS_NOTICE));
    }

    #[tokio::test]
    async fn test_service_fact_source() {
        use crate::models::QUESTIONS_TABLE;
        use crate::services::{AnswerInput, ProfileServiceImpl, QuestionnaireServiceImpl};
        use crate::storage::{MemoryBlobStore, MemoryStore, RecordStore};
        use serde_json::json;

        let memory = MemoryStore::new();
        memory
            .seed(QUESTIONS_TABLE, vec![json!({"id": 1, "question": "Q1"})])
            .unwrap();
        let store: Arc<dyn RecordStore> = Arc::new(memory);
        let profiles: Arc<dyn ProfileService> = Arc::new(ProfileServiceImpl::new(
            Arc::clone(&store),
            Arc::new(MemoryBlobStore::new()),
            "avatars",
        ));
        let questionnaire: Arc<dyn QuestionnaireService> =
            Arc::new(QuestionnaireServiceImpl::new(Arc::clone(&store)));
        profiles
            .ensure_profile("u1", Some("u1@example.com"), Some("Ada"))
            .await
            .unwrap();

        let source = ServiceFactSource::new(Arc::clone(&profiles), Arc::clone(&questionnaire));
        assert!(!source.profile_complete("u1").await.unwrap());
        assert!(source.questions_exist().await.unwrap());
        assert!(!source.has_answer("u1").await.unwrap());

        questionnaire
            .save_answers(
                "u1",
                &[AnswerInput {
                    question_id: 1,
                    answer: "yes".into(),
                }],
            )
            .await
            .unwrap();
        assert!(source.has_answer("u1").await.unwrap());
    }
}
