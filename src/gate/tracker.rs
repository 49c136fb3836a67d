//! 守卫事实的归约器
//!
//! 事实可能乱序到达，也可能在页面卸载后才到达。每次挂载对应一个纪元，
//! 过期纪元的更新直接丢弃；只在判定已落定且与上次不同的时候输出。

use crate::gate::{Fact, GateOutcome, GateSnapshot, Route, decide};

/// 单项事实更新
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactUpdate {
    Session(Fact<Option<String>>),
    ProfileComplete(Fact<bool>),
    QuestionsExist(Fact<bool>),
    HasAnswer(Fact<bool>),
}

/// 守卫状态机
#[derive(Debug, Clone)]
pub struct GateTracker {
    route: Route,
    epoch: u64,
    snapshot: GateSnapshot,
    last: Option<GateOutcome>,
}

impl GateTracker {
    pub fn new(route: Route) -> Self {
        Self {
            route,
            epoch: 0,
            snapshot: GateSnapshot::default(),
            last: None,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn snapshot(&self) -> &GateSnapshot {
        &self.snapshot
    }

    /// 当前判定（可能仍在加载）
    pub fn current(&self) -> GateOutcome {
        decide(&self.route, &self.snapshot)
    }

    /// 重新挂载：进入新纪元并清空所有事实
    pub fn remount(&mut self, route: Route) -> u64 {
        self.epoch += 1;
        self.route = route;
        self.snapshot = GateSnapshot::default();
        self.last = None;
        self.epoch
    }

    /// 同一会话内切换页面，保留已知事实
    pub fn navigate(&mut self, route: Route) -> Option<GateOutcome> {
        self.route = route;
        self.last = None;
        self.emit()
    }

    /// 应用一项更新；纪元过期时忽略
    pub fn apply(&mut self, epoch: u64, update: FactUpdate) -> Option<GateOutcome> {
        if epoch != self.epoch {
            tracing::debug!(
                "Ignoring gate fact from epoch {} (current {})",
                epoch,
                self.epoch
            );
            return None;
        }

        match update {
            FactUpdate::Session(session) => {
                // 换了用户，之前的完整性事实不再可信
                let known = self.snapshot.session.ready();
                if known.is_some() && known != session.ready() {
                    self.snapshot = GateSnapshot::default();
                }
                self.snapshot.session = session;
            }
            FactUpdate::ProfileComplete(fact) => self.snapshot.profile_complete = fact,
            FactUpdate::QuestionsExist(fact) => self.snapshot.questions_exist = fact,
            FactUpdate::HasAnswer(fact) => self.snapshot.has_answer = fact,
        }
        self.emit()
    }

    fn emit(&mut self) -> Option<GateOutcome> {
        let outcome = self.current();
        if !outcome.is_settled() || self.last.as_ref() == Some(&outcome) {
            return None;
        }
        self.last = Some(outcome.clone());
        Some(outcome)
    }
}
