//! Handlers 模块
//!
//! HTTP 请求处理程序。

pub mod ai_handler;
pub mod auth_handler;
pub mod chat_handler;
pub mod gate_handler;
pub mod match_handler;
pub mod memory_tree_handler;
pub mod profile_handler;
pub mod questionnaire_handler;
