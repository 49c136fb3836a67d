//! 服务模块

pub mod advisor;
pub mod chat;
pub mod matching;
pub mod memory_tree;
pub mod profile;
pub mod questionnaire;

pub use advisor::{AdvisorService, AdvisorServiceImpl, create_advisor_service};
pub use chat::{ChatService, ChatServiceImpl, create_chat_service};
pub use matching::{FAVORITES_LIMIT, MatchService, MatchServiceImpl, create_match_service};
pub use memory_tree::{MemoryTreeService, MemoryTreeServiceImpl, NewMemory, create_memory_tree_service};
pub use profile::{
    POTENTIAL_MATCH_LIMIT, ProfileCompletion, ProfileService, ProfileServiceImpl,
    create_profile_service,
};
pub use questionnaire::{
    AnswerInput, QuestionnaireService, QuestionnaireServiceImpl, create_questionnaire_service,
};
