//! Kindred - 约会服务后端
//!
//! 新用户引导守卫（登录、资料、问卷）、配对、私信、共享回忆树，
//! 以及基于 LLM 的兼容性分析、对话分析、资料建议和约会助手。

pub mod ai;
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod gate;
pub mod models;
pub mod observability;
pub mod security;
pub mod services;
pub mod storage;
