//! AI 功能的结构化结果和兜底值
//!
//! 模型按 camelCase 字段返回，接口统一以 snake_case 输出。

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// 兜底兼容性分数区间
pub const FALLBACK_SCORE_MIN: u32 = 70;
pub const FALLBACK_SCORE_MAX: u32 = 90;

/// [70, 90] 内的均匀随机分数
pub fn fallback_score() -> f64 {
    let span = u128::from(FALLBACK_SCORE_MAX - FALLBACK_SCORE_MIN + 1);
    (Uuid::new_v4().as_u128() % span) as f64 + f64::from(FALLBACK_SCORE_MIN)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// 兼容性分析
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all(deserialize = "camelCase", serialize = "snake_case"))]
pub struct CompatibilityReport {
    #[serde(alias = "compatibility_score")]
    #[validate(range(exclusive_min = 0.0, max = 100.0))]
    pub compatibility_score: f64,

    #[serde(alias = "compatibility_reasons")]
    pub compatibility_reasons: Vec<String>,

    #[serde(default, alias = "potential_challenges")]
    pub potential_challenges: Vec<String>,

    #[serde(default, alias = "recommended_activities")]
    pub recommended_activities: Vec<String>,

    /// 兜底时附带的模型原始输出
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub ai_response: Option<String>,
}

impl CompatibilityReport {
    pub fn fallback(raw: &str) -> Self {
        Self {
            compatibility_score: fallback_score(),
            compatibility_reasons: strings(&[
                "Based on shared interests",
                "Complementary personalities",
            ]),
            potential_challenges: strings(&["Communication differences", "Different expectations"]),
            recommended_activities: strings(&["Coffee date", "Outdoor activities"]),
            ai_response: Some(raw.to_string()),
        }
    }
}

/// 对话分析的结构化结果
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all(deserialize = "camelCase", serialize = "snake_case"))]
pub struct ConversationInsights {
    #[serde(alias = "conversation_quality")]
    #[validate(length(min = 1))]
    pub conversation_quality: String,

    #[serde(default, alias = "engagement_level")]
    pub engagement_level: String,

    #[serde(default, alias = "suggested_topics")]
    pub suggested_topics: Vec<String>,

    #[serde(default, alias = "improvement_tips")]
    pub improvement_tips: Vec<String>,

    #[serde(default, alias = "readiness_for_meeting")]
    pub readiness_for_meeting: String,
}

/// 对话分析结果
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ConversationAnalysis {
    Insights(ConversationInsights),
    /// 还没有任何消息
    NotEnoughData {
        analysis: String,
        suggestions: Vec<String>,
    },
    Fallback {
        analysis: String,
        raw_analysis: String,
        suggested_topics: Vec<String>,
    },
}

impl ConversationAnalysis {
    pub fn not_enough_data() -> Self {
        ConversationAnalysis::NotEnoughData {
            analysis: "Not enough conversation data to analyze.".to_string(),
            suggestions: strings(&[
                "Start a conversation by asking about their interests.",
                "Share something about yourself to encourage reciprocation.",
            ]),
        }
    }

    pub fn fallback(raw: &str) -> Self {
        ConversationAnalysis::Fallback {
            analysis: "Analysis could not be structured properly.".to_string(),
            raw_analysis: raw.to_string(),
            suggested_topics: strings(&[
                "Ask about their hobbies",
                "Share a recent experience",
                "Discuss favorite places",
            ]),
        }
    }
}

/// 资料建议的结构化结果
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all(deserialize = "camelCase", serialize = "snake_case"))]
pub struct ProfileInsights {
    #[serde(default, alias = "profile_strengths")]
    pub profile_strengths: Vec<String>,

    #[serde(default, alias = "bio_suggestions")]
    pub bio_suggestions: String,

    #[serde(default, alias = "interest_suggestions")]
    pub interest_suggestions: Vec<String>,

    #[serde(default, alias = "answer_tips")]
    pub answer_tips: Vec<String>,

    #[serde(alias = "overall_impression")]
    #[validate(length(min = 1))]
    pub overall_impression: String,
}

/// 资料建议结果
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ProfileSuggestions {
    Insights(ProfileInsights),
    Fallback {
        analysis: String,
        suggestions: Vec<String>,
        raw_analysis: String,
    },
}

impl ProfileSuggestions {
    pub fn fallback(raw: &str) -> Self {
        ProfileSuggestions::Fallback {
            analysis: "Analysis could not be structured properly.".to_string(),
            suggestions: strings(&[
                "Add more detail to your bio to showcase your personality",
                "Include specific interests rather than general ones",
                "Add a friendly, approachable photo",
                "Be more specific in your questionnaire answers",
            ]),
            raw_analysis: raw.to_string(),
        }
    }
}

/// 约会助手回复
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistantReply {
    pub message: String,
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::extract::{Parsed, parse_or};
    use serde_json::json;

    #[test]
    fn test_fallback_score_range() {
        for _ in 0..500 {
            let score = fallback_score();
            assert!((70.0..=90.0).contains(&score));
            assert_eq!(score.fract(), 0.0);
        }
    }

    #[test]
    fn test_compatibility_reads_camel_case_and_writes_snake_case() {
        let text = r#"```json
{
  "compatibilityScore": 82,
  "compatibilityReasons": ["Both love hiking"],
  "potentialChallenges": ["Schedules"],
  "recommendedActivities": ["Trail walk"]
}
```"#;
        let report = parse_or(text, CompatibilityReport::fallback);
        let Parsed::Structured(report) = report else {
            panic!("expected structured report");
        };
        assert_eq!(report.compatibility_score, 82.0);
        assert!(report.ai_response.is_none());

        let out = serde_json::to_value(&report).unwrap();
        assert_eq!(out["compatibility_score"], 82.0);
        assert_eq!(out["compatibility_reasons"], json!(["Both love hiking"]));
        assert!(out.get("ai_response").is_none());
    }

    #[test]
    fn test_zero_or_out_of_range_score_falls_back() {
        for score in ["0", "-5", "101"] {
            let text = format!(
                r#"{{"compatibilityScore": {}, "compatibilityReasons": []}}"#,
                score
            );
            let parsed = parse_or(&text, CompatibilityReport::fallback);
            assert!(parsed.is_fallback(), "score {} should fall back", score);
        }
    }

    #[test]
    fn test_non_json_compatibility_falls_back() {
        let parsed = parse_or("They seem great together!", CompatibilityReport::fallback);
        let report = parsed.into_inner();
        assert!((70.0..=90.0).contains(&report.compatibility_score));
        assert_eq!(
            report.compatibility_reasons,
            vec!["Based on shared interests", "Complementary personalities"]
        );
        assert_eq!(report.ai_response.as_deref(), Some("They seem great together!"));

        let out = serde_json::to_value(&report).unwrap();
        assert_eq!(out["ai_response"], "They seem great together!");
    }

    #[test]
    fn test_conversation_payload_shapes() {
        let out = serde_json::to_value(ConversationAnalysis::not_enough_data()).unwrap();
        assert_eq!(out["analysis"], "Not enough conversation data to analyze.");
        assert_eq!(out["suggestions"].as_array().unwrap().len(), 2);

        let out = serde_json::to_value(ConversationAnalysis::fallback("meh")).unwrap();
        assert_eq!(out["raw_analysis"], "meh");
        assert_eq!(out["suggested_topics"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_profile_suggestions_fallback_shape() {
        let out = serde_json::to_value(ProfileSuggestions::fallback("raw")).unwrap();
        assert_eq!(out["analysis"], "Analysis could not be structured properly.");
        assert_eq!(out["suggestions"].as_array().unwrap().len(), 4);
        assert_eq!(out["raw_analysis"], "raw");
    }
}
