//! 引导守卫集成测试：真实服务 + 进程内存储和认证

use std::sync::Arc;
use std::time::Duration;

use kindred::auth::{AuthClient, MemoryAuthClient, SessionContext};
use kindred::config::AppConfig;
use kindred::gate::{
    FactSource, GateDecision, GateDriver, GateOutcome, GateResolver, Route, ServiceFactSource,
};
use kindred::models::ProfileUpdate;
use kindred::services::{
    AnswerInput, ProfileService, QuestionnaireService, create_profile_service,
    create_questionnaire_service,
};
use kindred::storage::StorageFactory;
use tokio::time::timeout;

struct World {
    client: Arc<dyn AuthClient>,
    profiles: Arc<dyn ProfileService>,
    questionnaire: Arc<dyn QuestionnaireService>,
    source: Arc<dyn FactSource>,
    user_id: String,
}

async fn world() -> World {
    let config = AppConfig::development();
    let storage = StorageFactory::create(&config.backend).unwrap();
    let profiles: Arc<dyn ProfileService> = Arc::from(create_profile_service(
        Arc::clone(&storage.records),
        Arc::clone(&storage.blobs),
        &config.storage.avatar_bucket,
    ));
    let questionnaire: Arc<dyn QuestionnaireService> =
        Arc::from(create_questionnaire_service(Arc::clone(&storage.records)));

    let client: Arc<dyn AuthClient> = Arc::new(MemoryAuthClient::new(&config.backend));
    let outcome = client
        .sign_up("ada@example.com", "secret1", Some("Ada"))
        .await
        .unwrap();
    profiles
        .ensure_profile(&outcome.user.id, outcome.user.email.as_deref(), Some("Ada"))
        .await
        .unwrap();

    let source: Arc<dyn FactSource> = Arc::new(ServiceFactSource::new(
        Arc::clone(&profiles),
        Arc::clone(&questionnaire),
    ));
    World {
        client,
        profiles,
        questionnaire,
        source,
        user_id: outcome.user.id,
    }
}

impl World {
    async fn complete_profile(&self) {
        let update = ProfileUpdate {
            bio: Some("Hiker and amateur cook".into()),
            location: Some("Lisbon".into()),
            gender: Some("female".into()),
            ..Default::default()
        };
        self.profiles.update(&self.user_id, &update).await.unwrap();
    }

    async fn answer_first_question(&self) {
        let first = self.questionnaire.questions().await.unwrap()[0].id;
        self.questionnaire
            .save_answers(
                &self.user_id,
                &[AnswerInput {
                    question_id: first,
                    answer: "Long walks".into(),
                }],
            )
            .await
            .unwrap();
    }
}

async fn next(driver: &mut GateDriver) -> GateOutcome {
    timeout(Duration::from_secs(2), driver.next_outcome())
        .await
        .expect("gate outcome in time")
        .expect("driver running")
}

#[tokio::test]
async fn test_resolver_walks_new_user_through_onboarding() {
    let world = world().await;
    let gate = GateResolver::new(Arc::clone(&world.source));
    let user = Some(world.user_id.as_str());

    let outcome = gate.resolve(&Route::Matches, user).await;
    assert_eq!(outcome.decision, GateDecision::Redirect(Route::Profile));
    assert_eq!(
        gate.resolve(&Route::Profile, user).await.decision,
        GateDecision::Render
    );

    world.complete_profile().await;
    let outcome = gate.resolve(&Route::Chat("42".into()), user).await;
    assert_eq!(outcome.decision, GateDecision::Redirect(Route::Questionnaire));
    assert_eq!(
        gate.resolve(&Route::Questionnaire, user).await.decision,
        GateDecision::Render
    );

    world.answer_first_question().await;
    for route in [
        Route::Matches,
        Route::Chat("42".into()),
        Route::MemoryTree("7".into()),
    ] {
        let outcome = gate.resolve(&route, user).await;
        assert_eq!(outcome.decision, GateDecision::Render, "{}", route);
        assert_eq!(outcome.notice, None);
    }
}

#[tokio::test]
async fn test_unauthenticated_user_is_sent_to_auth() {
    let world = world().await;
    let gate = GateResolver::new(Arc::clone(&world.source));

    let outcome = gate.resolve(&Route::parse("/chat/42"), None).await;
    assert_eq!(outcome.redirect_target(), Some(&Route::Auth));
    assert_eq!(
        gate.resolve(&Route::Home, None).await.decision,
        GateDecision::Render
    );
}

#[tokio::test]
async fn test_driver_follows_session_and_refetches_on_sign_in() {
    let world = world().await;
    let ctx = SessionContext::new(Arc::clone(&world.client));
    let mut driver = GateDriver::spawn(Route::Matches, ctx.subscribe(), Arc::clone(&world.source));
    assert_eq!(driver.current(), None);

    ctx.sign_in("ada@example.com", "secret1").await.unwrap();
    assert_eq!(
        next(&mut driver).await.decision,
        GateDecision::Redirect(Route::Profile)
    );

    world.complete_profile().await;
    world.answer_first_question().await;

    // 新会话开启新纪元，重新拉取事实
    ctx.sign_in("ada@example.com", "secret1").await.unwrap();
    assert_eq!(next(&mut driver).await.decision, GateDecision::Render);

    ctx.sign_out().await.unwrap();
    assert_eq!(
        next(&mut driver).await.decision,
        GateDecision::Redirect(Route::Auth)
    );
}
