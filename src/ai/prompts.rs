//! 提示词构造

use serde::Serialize;

use crate::ai::client::ChatMessage;
use crate::models::{AnsweredQuestion, Message, Profile};

pub const COMPATIBILITY_SYSTEM: &str = "You are an AI dating compatibility analyst. You'll analyze two user profiles and their questionnaire answers to determine compatibility.";

pub const CONVERSATION_SYSTEM: &str = "You are an AI dating conversation coach. You'll analyze conversations between two people who are in the early stages of dating, and provide helpful insights.";

pub const PROFILE_SYSTEM: &str = "You are an AI dating profile consultant. You'll analyze a user's dating profile and questionnaire answers to provide helpful suggestions for improvement.";

pub const ASSISTANT_SYSTEM: &str = "You are a helpful AI dating assistant. Your goal is to provide advice, suggestions, and conversation starters to help people connect better.";

/// 资料和问卷回答，作为提示词中的用户描述
#[derive(Debug, Serialize)]
pub struct ProfileDigest<'a> {
    pub profile: &'a Profile,
    pub answers: &'a [AnsweredQuestion],
}

#[derive(Serialize)]
struct TranscriptLine<'a> {
    speaker: &'static str,
    message: &'a str,
    sent_at: String,
}

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// 兼容性分析提示词
pub fn compatibility(one: &ProfileDigest<'_>, two: &ProfileDigest<'_>) -> Vec<ChatMessage> {
    let prompt = format!(
        r#"Analyze the compatibility between these two users and provide a compatibility score between 0-100 as well as reasons for compatibility:

User 1: {}

User 2: {}

Return the analysis in JSON format with these fields:
{{
  "compatibilityScore": number,
  "compatibilityReasons": string[],
  "potentialChallenges": string[],
  "recommendedActivities": string[]
}}"#,
        pretty(one),
        pretty(two)
    );
    vec![
        ChatMessage::system(COMPATIBILITY_SYSTEM),
        ChatMessage::user(prompt),
    ]
}

/// 对话分析提示词，`user_id` 一方的发言标记为 "You"
pub fn conversation(
    user_id: &str,
    me: &Profile,
    other: &Profile,
    messages: &[Message],
) -> Vec<ChatMessage> {
    let transcript: Vec<TranscriptLine<'_>> = messages
        .iter()
        .map(|m| TranscriptLine {
            speaker: if m.sender_id == user_id { "You" } else { "Other" },
            message: &m.content,
            sent_at: m.created_at.to_rfc3339(),
        })
        .collect();

    let prompt = format!(
        r#"Analyze this conversation between two people who are dating and provide insights:

User profiles:
You: {}
Other person: {}

Conversation:
{}

Provide:
1. An analysis of the conversation flow and engagement
2. Potential conversation topics based on shared interests
3. Suggestions for how to improve the conversation
4. When it might be appropriate to suggest meeting in person

Return your analysis in JSON format with these fields:
{{
  "conversationQuality": string,
  "engagementLevel": string,
  "suggestedTopics": string[],
  "improvementTips": string[],
  "readinessForMeeting": string
}}"#,
        pretty(me),
        pretty(other),
        pretty(&transcript)
    );
    vec![
        ChatMessage::system(CONVERSATION_SYSTEM),
        ChatMessage::user(prompt),
    ]
}

/// 资料优化建议提示词
pub fn profile_suggestions(digest: &ProfileDigest<'_>) -> Vec<ChatMessage> {
    let prompt = format!(
        r#"Analyze this dating profile and provide suggestions for improvement:

Profile: {}

Provide:
1. An analysis of the current profile strengths
2. Suggestions for improving the bio
3. Recommendations for additional interests or topics to mention
4. Tips for better questionnaire answers

Return your analysis in JSON format with these fields:
{{
  "profileStrengths": string[],
  "bioSuggestions": string,
  "interestSuggestions": string[],
  "answerTips": string[],
  "overallImpression": string
}}"#,
        pretty(digest)
    );
    vec![ChatMessage::system(PROFILE_SYSTEM), ChatMessage::user(prompt)]
}

/// 约会助手的系统提示词，双方资料都提供时补充对方的信息
pub fn assistant_system(me: Option<&Profile>, other: Option<&Profile>) -> String {
    let mut system = ASSISTANT_SYSTEM.to_string();
    let (Some(me), Some(other)) = (me, other) else {
        return system;
    };

    system.push_str(&format!(
        " You're helping {} chat with {}.",
        me.display_name(),
        other.display_name()
    ));
    if let Some(bio) = other.bio.as_deref().filter(|b| !b.trim().is_empty()) {
        system.push_str(&format!(" {}'s bio says: \"{}\".", other.display_name(), bio));
    }
    if let Some(location) = other.location.as_deref().filter(|l| !l.trim().is_empty()) {
        system.push_str(&format!(" They are from {}.", location));
    }
    system
}
