//! AI 模块
//!
//! LLM 客户端、模型输出的结构化提取，以及各 AI 功能的提示词和结果类型。

pub mod client;
pub mod extract;
pub mod prompts;
pub mod reports;

pub use client::{ChatCompletion, ChatMessage, Completion, CompletionRequest, OpenAiCompatibleClient};
pub use extract::{Parsed, parse_or, try_parse};
pub use reports::{
    AssistantReply, CompatibilityReport, ConversationAnalysis, ConversationInsights,
    ProfileInsights, ProfileSuggestions,
};

#[cfg(test)]
pub use client::MockChatCompletion;
