//! Routes 模块
//!
//! 定义 API 路由。

pub mod ai_routes;
pub mod auth_routes;
pub mod chat_routes;
pub mod gate_routes;
pub mod match_routes;
pub mod memory_tree_routes;
pub mod profile_routes;
pub mod questionnaire_routes;
