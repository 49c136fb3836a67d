//! 事件驱动的守卫
//!
//! 订阅会话变化，在后台并发拉取事实，通过 [`GateTracker`] 归约后发布判定。
//! 会话变化开启新纪元，旧纪元尚未返回的查询结果会被丢弃。

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::auth::{SessionState, SessionSubscription};
use crate::gate::resolver::FactSource;
use crate::gate::tracker::{FactUpdate, GateTracker};
use crate::gate::{Fact, GateOutcome, Route};

type Tagged = (u64, FactUpdate);

/// 后台守卫
pub struct GateDriver {
    route: watch::Sender<Route>,
    outcome: watch::Receiver<Option<GateOutcome>>,
    task: JoinHandle<()>,
}

fn session_fact(state: &SessionState) -> Fact<Option<String>> {
    match state {
        SessionState::Unknown => Fact::Pending,
        SessionState::SignedIn(session) => Fact::Ready(Some(session.user_id().to_string())),
        SessionState::SignedOut => Fact::Ready(None),
    }
}

/// 为当前页面拉取尚未就绪的事实
fn fetch_missing(
    tracker: &GateTracker,
    source: &Arc<dyn FactSource>,
    facts: &mpsc::UnboundedSender<Tagged>,
) {
    let Some(user_id) = tracker.snapshot().user_id().map(str::to_string) else {
        return;
    };
    let guard = tracker.route().guard();
    if !guard.protected {
        return;
    }
    let epoch = tracker.epoch();
    let snapshot = tracker.snapshot();

    if guard.requires_profile && snapshot.profile_complete.is_pending() {
        let (source, facts, user_id) = (Arc::clone(source), facts.clone(), user_id.clone());
        tokio::spawn(async move {
            let fact = Fact::from_result("profile", source.profile_complete(&user_id).await);
            let _ = facts.send((epoch, FactUpdate::ProfileComplete(fact)));
        });
    }
    if guard.requires_questionnaire && snapshot.questions_exist.is_pending() {
        let (source, facts) = (Arc::clone(source), facts.clone());
        tokio::spawn(async move {
            let fact = Fact::from_result("questions", source.questions_exist().await);
            let _ = facts.send((epoch, FactUpdate::QuestionsExist(fact)));
        });
    }
    if guard.requires_questionnaire && snapshot.has_answer.is_pending() {
        let (source, facts) = (Arc::clone(source), facts.clone());
        tokio::spawn(async move {
            let fact = Fact::from_result("answers", source.has_answer(&user_id).await);
            let _ = facts.send((epoch, FactUpdate::HasAnswer(fact)));
        });
    }
}

impl GateDriver {
    /// 启动守卫，初始判定基于订阅时的会话状态
    pub fn spawn(
        route: Route,
        mut session: SessionSubscription,
        source: Arc<dyn FactSource>,
    ) -> Self {
        let (route_tx, mut route_rx) = watch::channel(route.clone());
        let (outcome_tx, outcome_rx) = watch::channel(None);

        let task = tokio::spawn(async move {
            let (facts_tx, mut facts_rx) = mpsc::unbounded_channel::<Tagged>();
            let mut tracker = GateTracker::new(route);

            let on_session = |tracker: &mut GateTracker, state: &SessionState| {
                let epoch = tracker.remount(tracker.route().clone());
                let published = tracker.apply(epoch, FactUpdate::Session(session_fact(state)));
                fetch_missing(tracker, &source, &facts_tx);
                published
            };

            let initial = session.current().unwrap_or_default();
            if let Some(outcome) = on_session(&mut tracker, &initial) {
                outcome_tx.send_replace(Some(outcome));
            }

            loop {
                let published = tokio::select! {
                    Some(state) = session.changed(), if session.is_active() => {
                        tracing::debug!("Gate saw session change: {:?}", state.user_id());
                        on_session(&mut tracker, &state)
                    }
                    Ok(()) = route_rx.changed() => {
                        let next = route_rx.borrow_and_update().clone();
                        let published = tracker.navigate(next);
                        fetch_missing(&tracker, &source, &facts_tx);
                        published
                    }
                    Some((epoch, update)) = facts_rx.recv() => tracker.apply(epoch, update),
                    else => break,
                };
                if let Some(outcome) = published {
                    outcome_tx.send_replace(Some(outcome));
                }
            }
        });

        Self {
            route: route_tx,
            outcome: outcome_rx,
            task,
        }
    }

    /// 切换页面，保留同一会话内已知的事实
    pub fn navigate(&self, route: Route) {
        self.route.send_replace(route);
    }

    /// 最近一次落定的判定
    pub fn current(&self) -> Option<GateOutcome> {
        self.outcome.borrow().clone()
    }

    /// 等待下一次判定变化
    pub async fn next_outcome(&mut self) -> Option<GateOutcome> {
        self.outcome.changed().await.ok()?;
        self.outcome.borrow_and_update().clone()
    }
}

impl Drop for GateDriver {
    fn drop(&mut self) {
        self.task.abort();
    }
}
