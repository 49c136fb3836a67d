//! DTO 模块
//!
//! 数据传输对象，用于 API 请求和响应的序列化。

pub mod ai_dto;
pub mod auth_dto;
pub mod chat_dto;
pub mod gate_dto;
pub mod match_dto;
pub mod memory_tree_dto;
pub mod profile_dto;
pub mod questionnaire_dto;

pub use ai_dto::*;
pub use auth_dto::*;
pub use chat_dto::*;
pub use gate_dto::*;
pub use match_dto::*;
pub use memory_tree_dto::*;
pub use profile_dto::*;
pub use questionnaire_dto::*;
