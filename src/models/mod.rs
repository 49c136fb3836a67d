//! 数据模型模块
//!
//! 定义托管记录存储中各张表对应的领域类型及其派生判定。

pub mod matches;
pub mod memory_tree;
pub mod message;
pub mod profile;
pub mod questionnaire;

pub use matches::{Match, MatchStatus, MatchView};
pub use memory_tree::{ImageUpload, Memory, MemoryBranch, MemoryTree};
pub use message::{Conversation, Message};
pub use profile::{Profile, ProfileUpdate};
pub use questionnaire::{AnsweredQuestion, Question, QuestionnaireStatus, UserAnswer};

pub use matches::MATCHES_TABLE;
pub use memory_tree::{MEMORIES_TABLE, MEMORY_BRANCHES_TABLE, MEMORY_TREES_TABLE};
pub use message::MESSAGES_TABLE;
pub use profile::PROFILES_TABLE;
pub use questionnaire::{ANSWERS_TABLE, QUESTIONS_TABLE};
