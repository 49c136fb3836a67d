//! AI 顾问服务
//!
//! 兼容性评分、对话分析、资料建议和约会助手。模型输出无法结构化时
//! 返回兜底值并计数，只有 LLM 调用本身失败才返回错误。

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use validator::Validate;

use crate::ai::prompts::{self, ProfileDigest};
use crate::ai::{
    AssistantReply, ChatCompletion, ChatMessage, CompatibilityReport, Completion,
    CompletionRequest, ConversationAnalysis, ProfileSuggestions, parse_or, try_parse,
};
use crate::error::{AppError, Result};
use crate::models::Profile;
use crate::observability::AppMetrics;
use crate::services::chat::ChatService;
use crate::services::matching::MatchService;
use crate::services::profile::ProfileService;
use crate::services::questionnaire::QuestionnaireService;

const COMPATIBILITY_TEMPERATURE: f32 = 0.5;
const COACHING_TEMPERATURE: f32 = 0.7;
const ANALYSIS_MAX_TOKENS: u32 = 1000;
const ASSISTANT_MAX_TOKENS: u32 = 800;

/// AI 顾问服务 trait
#[async_trait]
pub trait AdvisorService: Send + Sync {
    /// 两个用户的兼容性，分数记为待处理的配对
    async fn compatibility(&self, user_one_id: &str, user_two_id: &str)
    -> Result<CompatibilityReport>;

    /// 分析我和对方的对话
    async fn conversation_analysis(
        &self,
        user_id: &str,
        other_id: &str,
    ) -> Result<ConversationAnalysis>;

    /// 资料优化建议，未提供资料时从存储读取
    async fn profile_suggestions(
        &self,
        user_id: &str,
        current_profile: Option<Profile>,
    ) -> Result<ProfileSuggestions>;

    /// 自由对话的约会助手
    async fn assistant(
        &self,
        messages: Vec<ChatMessage>,
        user_profile: Option<Profile>,
        other_user_profile: Option<Profile>,
    ) -> Result<AssistantReply>;
}

/// AI 顾问服务实现
pub struct AdvisorServiceImpl {
    llm: Arc<dyn ChatCompletion>,
    profiles: Arc<dyn ProfileService>,
    questionnaire: Arc<dyn QuestionnaireService>,
    matches: Arc<dyn MatchService>,
    chat: Arc<dyn ChatService>,
    metrics: Arc<AppMetrics>,
}

impl AdvisorServiceImpl {
    pub fn new(
        llm: Arc<dyn ChatCompletion>,
        profiles: Arc<dyn ProfileService>,
        questionnaire: Arc<dyn QuestionnaireService>,
        matches: Arc<dyn MatchService>,
        chat: Arc<dyn ChatService>,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            llm,
            profiles,
            questionnaire,
            matches,
            chat,
            metrics,
        }
    }

    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Completion> {
        self.metrics.record_ai_request();
        let completion = self
            .llm
            .complete(CompletionRequest {
                messages,
                temperature,
                max_tokens,
            })
            .await;
        if completion.is_err() {
            self.metrics.record_error();
        }
        completion
    }

    /// `parse_or` 自己会记录失败原因，这里只计数
    fn parse<T, F>(&self, text: &str, fallback: F) -> T
    where
        T: DeserializeOwned + Validate,
        F: FnOnce(&str) -> T,
    {
        let parsed = parse_or(text, fallback);
        if parsed.is_fallback() {
            self.metrics.record_ai_fallback();
        }
        parsed.into_inner()
    }

    /// 结构化结果和兜底结果是不同形状时使用
    fn structure<T, U>(
        &self,
        what: &str,
        text: &str,
        structured: impl FnOnce(T) -> U,
        fallback: impl FnOnce(&str) -> U,
    ) -> U
    where
        T: DeserializeOwned + Validate,
    {
        match try_parse::<T>(text) {
            Ok(value) => structured(value),
            Err(e) => {
                tracing::warn!("{} fell back to default payload ({})", what, e);
                self.metrics.record_ai_fallback();
                fallback(text)
            }
        }
    }

    async fn require_profile(&self, user_id: &str) -> Result<Profile> {
        self.profiles
            .get(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user_id)))
    }
}

#[async_trait]
impl AdvisorService for AdvisorServiceImpl {
    async fn compatibility(
        &self,
        user_one_id: &str,
        user_two_id: &str,
    ) -> Result<CompatibilityReport> {
        if user_one_id == user_two_id {
            return Err(AppError::Validation(
                "Compatibility needs two different users".to_string(),
            ));
        }

        let (one, two, one_answers, two_answers) = tokio::try_join!(
            self.require_profile(user_one_id),
            self.require_profile(user_two_id),
            self.questionnaire.answered_questions(user_one_id),
            self.questionnaire.answered_questions(user_two_id),
        )?;

        let messages = prompts::compatibility(
            &ProfileDigest {
                profile: &one,
                answers: &one_answers,
            },
            &ProfileDigest {
                profile: &two,
                answers: &two_answers,
            },
        );
        let completion = self
            .complete(messages, COMPATIBILITY_TEMPERATURE, ANALYSIS_MAX_TOKENS)
            .await?;
        let report: CompatibilityReport =
            self.parse(&completion.content, CompatibilityReport::fallback);

        if let Err(e) = self
            .matches
            .record_score(user_one_id, user_two_id, report.compatibility_score)
            .await
        {
            tracing::error!(
                "Failed to record compatibility {} <-> {}: {}",
                user_one_id,
                user_two_id,
                e
            );
        }
        Ok(report)
    }

    async fn conversation_analysis(
        &self,
        user_id: &str,
        other_id: &str,
    ) -> Result<ConversationAnalysis> {
        let messages = self.chat.history(user_id, other_id).await?;
        if messages.is_empty() {
            tracing::debug!("No messages between {} and {}", user_id, other_id);
            return Ok(ConversationAnalysis::not_enough_data());
        }

        let (me, other) = tokio::try_join!(
            self.require_profile(user_id),
            self.require_profile(other_id),
        )?;

        let prompt = prompts::conversation(user_id, &me, &other, &messages);
        let completion = self
            .complete(prompt, COACHING_TEMPERATURE, ANALYSIS_MAX_TOKENS)
            .await?;

        Ok(self.structure(
            "Conversation analysis",
            &completion.content,
            ConversationAnalysis::Insights,
            ConversationAnalysis::fallback,
        ))
    }

    async fn profile_suggestions(
        &self,
        user_id: &str,
        current_profile: Option<Profile>,
    ) -> Result<ProfileSuggestions> {
        let profile = match current_profile {
            Some(profile) => profile,
            None => self.require_profile(user_id).await?,
        };
        let answers = self.questionnaire.answered_questions(user_id).await?;

        let prompt = prompts::profile_suggestions(&ProfileDigest {
            profile: &profile,
            answers: &answers,
        });
        let completion = self
            .complete(prompt, COACHING_TEMPERATURE, ANALYSIS_MAX_TOKENS)
            .await?;

        Ok(self.structure(
            "Profile suggestions",
            &completion.content,
            ProfileSuggestions::Insights,
            ProfileSuggestions::fallback,
        ))
    }

    async fn assistant(
        &self,
        messages: Vec<ChatMessage>,
        user_profile: Option<Profile>,
        other_user_profile: Option<Profile>,
    ) -> Result<AssistantReply> {
        if messages.is_empty() {
            return Err(AppError::Validation(
                "At least one message is required".to_string(),
            ));
        }

        let system = prompts::assistant_system(user_profile.as_ref(), other_user_profile.as_ref());
        let mut prompt = Vec::with_capacity(messages.len() + 1);
        prompt.push(ChatMessage::system(system));
        prompt.extend(messages);

        let completion = self
            .complete(prompt, COACHING_TEMPERATURE, ASSISTANT_MAX_TOKENS)
            .await?;
        Ok(AssistantReply {
            message: completion.content,
            model: completion.model,
        })
    }
}

/// 创建 AI 顾问服务
pub fn create_advisor_service(
    llm: Arc<dyn ChatCompletion>,
    profiles: Arc<dyn ProfileService>,
    questionnaire: Arc<dyn QuestionnaireService>,
    matches: Arc<dyn MatchService>,
    chat: Arc<dyn ChatService>,
    metrics: Arc<AppMetrics>,
) -> Box<dyn AdvisorService> {
    Box::new(AdvisorServiceImpl::new(
        llm,
        profiles,
        questionnaire,
        matches,
        chat,
        metrics,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockChatCompletion;
    use crate::models::{PROFILES_TABLE, QUESTIONS_TABLE};
    use crate::services::chat::ChatServiceImpl;
    use crate::services::matching::MatchServiceImpl;
    use crate::services::profile::ProfileServiceImpl;
    use crate::services::questionnaire::{AnswerInput, QuestionnaireServiceImpl};
    use crate::storage::{MemoryBlobStore, MemoryStore, RecordStore};
    use serde_json::json;
    use std::sync::atomic::Ordering;

    struct Fixture {
        advisor: AdvisorServiceImpl,
        matches: Arc<dyn MatchService>,
        chat: Arc<dyn ChatService>,
        metrics: Arc<AppMetrics>,
    }

    async fn fixture(llm: MockChatCompletion) -> Fixture {
        let memory = MemoryStore::new();
        memory
            .seed(
                QUESTIONS_TABLE,
                vec![json!({"id": 1, "question": "Ideal weekend?"})],
            )
            .unwrap();
        let store: Arc<dyn RecordStore> = Arc::new(memory);
        for (id, name) in [("a", "Ada"), ("b", "Grace")] {
            store
                .insert(
                    PROFILES_TABLE,
                    json!({"id": id, "name": name, "bio": "hi", "location": "Lisbon", "gender": "f"}),
                )
                .await
                .unwrap();
        }

        let profiles: Arc<dyn ProfileService> = Arc::new(ProfileServiceImpl::new(
            Arc::clone(&store),
            Arc::new(MemoryBlobStore::new()),
            "avatars",
        ));
        let questionnaire: Arc<dyn QuestionnaireService> =
            Arc::new(QuestionnaireServiceImpl::new(Arc::clone(&store)));
        questionnaire
            .save_answers(
                "a",
                &[AnswerInput {
                    question_id: 1,
                    answer: "Hiking".into(),
                }],
            )
            .await
            .unwrap();
        let matches: Arc<dyn MatchService> = Arc::new(MatchServiceImpl::new(Arc::clone(&store)));
        let chat: Arc<dyn ChatService> = Arc::new(ChatServiceImpl::new(Arc::clone(&store)));
        let metrics = Arc::new(AppMetrics::default());

        Fixture {
            advisor: AdvisorServiceImpl::new(
                Arc::new(llm),
                profiles,
                questionnaire,
                Arc::clone(&matches),
                Arc::clone(&chat),
                Arc::clone(&metrics),
            ),
            matches,
            chat,
            metrics,
        }
    }

    fn reply(content: &str) -> Result<Completion> {
        Ok(Completion {
            content: content.to_string(),
            model: "llama3-8b-8192".to_string(),
        })
    }

    #[tokio::test]
    async fn test_compatibility_structured_records_match() {
        let mut llm = MockChatCompletion::new();
        llm.expect_complete()
            .withf(|r| {
                r.temperature == 0.5
                    && r.max_tokens == 1000
                    && r.messages[1].content.contains("Ideal weekend?")
            })
            .times(1)
            .returning(|_| {
                reply(r#"{"compatibilityScore": 88, "compatibilityReasons": ["Both hike"]}"#)
            });
        let f = fixture(llm).await;

        let report = f.advisor.compatibility("a", "b").await.unwrap();
        assert_eq!(report.compatibility_score, 88.0);
        assert_eq!(f.metrics.ai_fallbacks_total.load(Ordering::SeqCst), 0);

        let stored = f.matches.find_pair("b", "a").await.unwrap().unwrap();
        assert_eq!(stored.match_score, 88.0);
    }

    #[tokio::test]
    async fn test_compatibility_non_json_falls_back() {
        let mut llm = MockChatCompletion::new();
        llm.expect_complete()
            .returning(|_| reply("You two would be a lovely pair."));
        let f = fixture(llm).await;

        let report = f.advisor.compatibility("a", "b").await.unwrap();
        assert!((70.0..=90.0).contains(&report.compatibility_score));
        assert_eq!(
            report.compatibility_reasons,
            vec!["Based on shared interests", "Complementary personalities"]
        );
        assert_eq!(f.metrics.ai_fallbacks_total.load(Ordering::SeqCst), 1);
        assert!(f.matches.find_pair("a", "b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_compatibility_missing_profile_is_not_found() {
        let mut llm = MockChatCompletion::new();
        llm.expect_complete().times(0);
        let f = fixture(llm).await;

        let err = f.advisor.compatibility("a", "nobody").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_llm_failure_is_an_error() {
        let mut llm = MockChatCompletion::new();
        llm.expect_complete()
            .returning(|_| Err(AppError::Upstream("LLM API error: boom".into())));
        let f = fixture(llm).await;

        let err = f.advisor.compatibility("a", "b").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
        assert_eq!(f.metrics.errors_total.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_conversation_skips_llm() {
        let mut llm = MockChatCompletion::new();
        llm.expect_complete().times(0);
        let f = fixture(llm).await;

        let analysis = f.advisor.conversation_analysis("a", "b").await.unwrap();
        assert_eq!(analysis, ConversationAnalysis::not_enough_data());
    }

    #[tokio::test]
    async fn test_conversation_analysis_structured_and_fallback() {
        let mut llm = MockChatCompletion::new();
        let mut calls = 0;
        llm.expect_complete().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                reply(
                    "```json\n{\"conversationQuality\": \"warm\", \"suggestedTopics\": [\"travel\"]}\n```",
                )
            } else {
                reply("Looks fine to me")
            }
        });
        let f = fixture(llm).await;
        f.chat.send("a", "b", "hey").await.unwrap();
        f.chat.send("b", "a", "hi!").await.unwrap();

        match f.advisor.conversation_analysis("a", "b").await.unwrap() {
            ConversationAnalysis::Insights(insights) => {
                assert_eq!(insights.conversation_quality, "warm");
                assert_eq!(insights.suggested_topics, vec!["travel"]);
            }
            other => panic!("unexpected {:?}", other),
        }

        match f.advisor.conversation_analysis("a", "b").await.unwrap() {
            ConversationAnalysis::Fallback { raw_analysis, .. } => {
                assert_eq!(raw_analysis, "Looks fine to me")
            }
            other => panic!("unexpected {:?}", other),
        }

        // 分析不修改已读状态
        assert_eq!(f.chat.unread_count("a").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_profile_suggestions_uses_provided_profile() {
        let mut llm = MockChatCompletion::new();
        llm.expect_complete()
            .withf(|r| r.messages[1].content.contains("Draft bio"))
            .returning(|_| reply("not json"));
        let f = fixture(llm).await;

        let draft = Profile {
            id: "a".into(),
            bio: Some("Draft bio".into()),
            ..Default::default()
        };
        let suggestions = f
            .advisor
            .profile_suggestions("a", Some(draft))
            .await
            .unwrap();
        assert!(matches!(suggestions, ProfileSuggestions::Fallback { .. }));
    }

    #[tokio::test]
    async fn test_assistant_prepends_system_prompt() {
        let mut llm = MockChatCompletion::new();
        llm.expect_complete()
            .withf(|r| {
                r.max_tokens == 800
                    && r.messages.len() == 2
                    && r.messages[0].role == "system"
                    && r.messages[0].content.contains("You're helping Ada chat with Grace.")
            })
            .returning(|_| reply("Ask about her favorite trail!"));
        let f = fixture(llm).await;

        let me = Profile {
            id: "a".into(),
            name: Some("Ada".into()),
            ..Default::default()
        };
        let other = Profile {
            id: "b".into(),
            name: Some("Grace".into()),
            ..Default::default()
        };
        let answer = f
            .advisor
            .assistant(
                vec![ChatMessage::user("What should I say?")],
                Some(me),
                Some(other),
            )
            .await
            .unwrap();
        assert_eq!(answer.message, "Ask about her favorite trail!");
        assert_eq!(answer.model, "llama3-8b-8192");
    }

    #[tokio::test]
    async fn test_assistant_requires_messages() {
        let mut llm = MockChatCompletion::new();
        llm.expect_complete().times(0);
        let f = fixture(llm).await;
        assert!(matches!(
            f.advisor.assistant(Vec::new(), None, None).await,
            Err(AppError::Validation(_))
        ));
    }
}
