use crate::ai::{ChatCompletion, OpenAiCompatibleClient};
use crate::auth::{AuthClient, create_auth_client};
use crate::config::AppConfig;
use crate::error::Result;
use crate::gate::{GateResolver, ServiceFactSource};
use crate::observability::AppMetrics;
use crate::security::auth::JwtVerifier;
use crate::services::{
    AdvisorService, ChatService, MatchService, MemoryTreeService, ProfileService,
    QuestionnaireService, create_advisor_service, create_chat_service, create_match_service,
    create_memory_tree_service, create_profile_service, create_questionnaire_service,
};
use crate::storage::{StorageFactory, StorageInstance};
use std::sync::Arc;

/// Application state containing all shared services and security components
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<AppConfig>,
    /// Record and blob stores
    pub storage: StorageInstance,
    /// Local bearer token verification
    pub verifier: Arc<JwtVerifier>,
    /// Auth service client for sign up / sign in / sign out
    pub auth_client: Arc<dyn AuthClient>,
    /// Profile reads, updates and avatar uploads
    pub profile_service: Arc<dyn ProfileService>,
    /// Questions and answers
    pub questionnaire_service: Arc<dyn QuestionnaireService>,
    /// Match lifecycle
    pub match_service: Arc<dyn MatchService>,
    /// Direct messages
    pub chat_service: Arc<dyn ChatService>,
    /// Shared memory trees
    pub memory_tree_service: Arc<dyn MemoryTreeService>,
    /// LLM backed features
    pub advisor_service: Arc<dyn AdvisorService>,
    /// Onboarding gate fact lookups
    pub gate_resolver: GateResolver,
    /// Request, AI and gate counters
    pub metrics: Arc<AppMetrics>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config.app_name)
            .field("storage", &self.storage.records.store_type())
            .field("verifier", &"Arc<JwtVerifier>")
            .field("auth_client", &"Arc<dyn AuthClient>")
            .field("profile_service", &"Arc<dyn ProfileService>")
            .field("questionnaire_service", &"Arc<dyn QuestionnaireService>")
            .field("match_service", &"Arc<dyn MatchService>")
            .field("chat_service", &"Arc<dyn ChatService>")
            .field("memory_tree_service", &"Arc<dyn MemoryTreeService>")
            .field("advisor_service", &"Arc<dyn AdvisorService>")
            .field("gate_resolver", &self.gate_resolver)
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl AppState {
    /// Wire services over the given storage, auth client and LLM
    pub fn new(
        config: AppConfig,
        storage: StorageInstance,
        auth_client: Arc<dyn AuthClient>,
        llm: Arc<dyn ChatCompletion>,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        let records = Arc::clone(&storage.records);
        let blobs = Arc::clone(&storage.blobs);

        let profile_service: Arc<dyn ProfileService> = Arc::from(create_profile_service(
            Arc::clone(&records),
            Arc::clone(&blobs),
            &config.storage.avatar_bucket,
        ));
        let questionnaire_service: Arc<dyn QuestionnaireService> =
            Arc::from(create_questionnaire_service(Arc::clone(&records)));
        let match_service: Arc<dyn MatchService> =
            Arc::from(create_match_service(Arc::clone(&records)));
        let chat_service: Arc<dyn ChatService> =
            Arc::from(create_chat_service(Arc::clone(&records)));
        let memory_tree_service: Arc<dyn MemoryTreeService> = Arc::from(create_memory_tree_service(
            Arc::clone(&records),
            blobs,
            &config.storage.memory_image_bucket,
        ));
        let advisor_service: Arc<dyn AdvisorService> = Arc::from(create_advisor_service(
            llm,
            Arc::clone(&profile_service),
            Arc::clone(&questionnaire_service),
            Arc::clone(&match_service),
            Arc::clone(&chat_service),
            Arc::clone(&metrics),
        ));
        let gate_resolver = GateResolver::new(Arc::new(ServiceFactSource::new(
            Arc::clone(&profile_service),
            Arc::clone(&questionnaire_service),
        )));

        Self {
            verifier: Arc::new(JwtVerifier::from_config(&config.backend)),
            config: Arc::new(config),
            storage,
            auth_client,
            profile_service,
            questionnaire_service,
            match_service,
            chat_service,
            memory_tree_service,
            advisor_service,
            gate_resolver,
            metrics,
        }
    }

    /// Build application state from configuration
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let storage = StorageFactory::create(&config.backend)?;
        let auth_client = create_auth_client(&config.backend)?;
        let llm: Arc<dyn ChatCompletion> = Arc::new(OpenAiCompatibleClient::new(&config.llm)?);
        Ok(Self::new(
            config,
            storage,
            auth_client,
            llm,
            Arc::new(AppMetrics::default()),
        ))
    }
}
