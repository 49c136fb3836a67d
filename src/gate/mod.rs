//! 引导守卫模块
//!
//! 决定受保护页面是直接渲染、继续等待，还是重定向到登录、资料或问卷页。
//!
//! 判定只依赖一份事实快照（会话、资料完整性、问卷是否存在、是否已回答），
//! 每项事实要么仍在加载，要么已就绪，要么加载失败。加载失败按“不满足”处理，
//! 并附带一条给客户端展示的提示。

pub mod driver;
pub mod resolver;
pub mod tracker;

pub use driver::GateDriver;
pub use resolver::{FactSource, GateResolver, ServiceFactSource};
pub use tracker::{FactUpdate, GateTracker};

use serde::{Deserialize, Serialize};
use std::fmt;

/// 客户端页面
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Auth,
    Profile,
    Questionnaire,
    Matches,
    Chat(String),
    MemoryTree(String),
    NotFound(String),
}

/// 页面的守卫要求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteGuard {
    pub protected: bool,
    pub requires_profile: bool,
    pub requires_questionnaire: bool,
}

impl RouteGuard {
    const OPEN: RouteGuard = RouteGuard {
        protected: false,
        requires_profile: false,
        requires_questionnaire: false,
    };
}

impl Route {
    /// 解析客户端路径，忽略查询串和末尾斜杠
    pub fn parse(path: &str) -> Route {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Route::Home,
            ["auth"] => Route::Auth,
            ["profile"] => Route::Profile,
            ["questionnaire"] => Route::Questionnaire,
            ["matches"] => Route::Matches,
            ["chat", id] => Route::Chat(id.to_string()),
            ["memory-tree", id] => Route::MemoryTree(id.to_string()),
            _ => Route::NotFound(format!("/{}", segments.join("/"))),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Auth => "/auth".to_string(),
            Route::Profile => "/profile".to_string(),
            Route::Questionnaire => "/questionnaire".to_string(),
            Route::Matches => "/matches".to_string(),
            Route::Chat(id) => format!("/chat/{}", id),
            Route::MemoryTree(id) => format!("/memory-tree/{}", id),
            Route::NotFound(path) => path.clone(),
        }
    }

    pub fn guard(&self) -> RouteGuard {
        match self {
            Route::Home | Route::Auth | Route::NotFound(_) => RouteGuard::OPEN,
            Route::Profile => RouteGuard {
                protected: true,
                ..RouteGuard::OPEN
            },
            Route::Questionnaire => RouteGuard {
                protected: true,
                requires_profile: true,
                requires_questionnaire: false,
            },
            Route::Matches | Route::Chat(_) | Route::MemoryTree(_) => RouteGuard {
                protected: true,
                requires_profile: true,
                requires_questionnaire: true,
            },
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl From<&str> for Route {
    fn from(path: &str) -> Self {
        Route::parse(path)
    }
}

/// 一项异步获取的事实
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Fact<T> {
    Pending,
    Ready(T),
    Failed(String),
}

impl<T> Default for Fact<T> {
    fn default() -> Self {
        Fact::Pending
    }
}

impl<T> Fact<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Fact::Pending)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Fact::Ready(v) => Some(v),
            _ => None,
        }
    }

    /// 把一次查询结果变成事实；失败会被记录下来
    pub fn from_result<E: fmt::Display>(
        what: &str,
        result: std::result::Result<T, E>,
    ) -> Self {
        match result {
            Ok(v) => Fact::Ready(v),
            Err(e) => {
                tracing::warn!("Gate lookup for {} failed: {}", what, e);
                Fact::Failed(e.to_string())
            }
        }
    }
}

/// 守卫判定所需的事实快照
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GateSnapshot {
    /// 当前登录用户 ID；`Ready(None)` 表示未登录
    pub session: Fact<Option<String>>,
    pub profile_complete: Fact<bool>,
    pub questions_exist: Fact<bool>,
    pub has_answer: Fact<bool>,
}

impl GateSnapshot {
    /// 所有事实都已就绪的快照
    pub fn settled(
        user_id: Option<&str>,
        profile_complete: bool,
        questions_exist: bool,
        has_answer: bool,
    ) -> Self {
        Self {
            session: Fact::Ready(user_id.map(str::to_string)),
            profile_complete: Fact::Ready(profile_complete),
            questions_exist: Fact::Ready(questions_exist),
            has_answer: Fact::Ready(has_answer),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.session.ready().and_then(|u| u.as_deref())
    }
}

/// 守卫判定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Loading,
    Render,
    Redirect(Route),
}

/// 判定结果及可选提示
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    pub decision: GateDecision,
    pub notice: Option<String>,
}

impl GateOutcome {
    pub fn loading() -> Self {
        Self {
            decision: GateDecision::Loading,
            notice: None,
        }
    }

    pub fn render(notice: Option<String>) -> Self {
        Self {
            decision: GateDecision::Render,
            notice,
        }
    }

    /// 重定向；目标就是当前页时改为渲染
    pub fn redirect(from: &Route, to: Route, notice: Option<String>) -> Self {
        if *from == to {
            return Self::render(notice);
        }
        Self {
            decision: GateDecision::Redirect(to),
            notice,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.decision != GateDecision::Loading
    }

    pub fn redirect_target(&self) -> Option<&Route> {
        match &self.decision {
            GateDecision::Redirect(route) => Some(route),
            _ => None,
        }
    }
}

pub const SESSION_NOTICE: &str = "We couldn't verify your session. Please sign in again.";
pub const PROFILE_NOTICE: &str = "We couldn't load your profile. Please review it before continuing.";
pub const QUESTIONS_NOTICE: &str = "We couldn't check the questionnaire right now.";
pub const ANSWERS_NOTICE: &str = "We couldn't load your questionnaire answers.";

/// 守卫判定
///
/// 只读取当前分支需要的事实，无关事实仍在加载时不会阻塞。
pub fn decide(route: &Route, snapshot: &GateSnapshot) -> GateOutcome {
    let guard = route.guard();
    if !guard.protected {
        return GateOutcome::render(None);
    }

    match &snapshot.session {
        Fact::Pending => return GateOutcome::loading(),
        Fact::Failed(_) => {
            return GateOutcome::redirect(route, Route::Auth, Some(SESSION_NOTICE.into()));
        }
        Fact::Ready(None) => return GateOutcome::redirect(route, Route::Auth, None),
        Fact::Ready(Some(_)) => {}
    }

    if guard.requires_profile {
        match &snapshot.profile_complete {
            Fact::Pending => return GateOutcome::loading(),
            Fact::Ready(true) => {}
            Fact::Ready(false) => return GateOutcome::redirect(route, Route::Profile, None),
            Fact::Failed(_) => {
                return GateOutcome::redirect(route, Route::Profile, Some(PROFILE_NOTICE.into()));
            }
        }
    }

    if !guard.requires_questionnaire {
        return GateOutcome::render(None);
    }

    // 存在性查询失败按“有问题”处理
    let (questions_exist, notice) = match &snapshot.questions_exist {
        Fact::Pending => return GateOutcome::loading(),
        Fact::Ready(exist) => (*exist, None),
        Fact::Failed(_) => (true, Some(QUESTIONS_NOTICE.to_string())),
    };
    if !questions_exist {
        return GateOutcome::render(notice);
    }

    match &snapshot.has_answer {
        Fact::Pending => GateOutcome::loading(),
        Fact::Ready(true) => GateOutcome::render(notice),
        Fact::Ready(false) => GateOutcome::redirect(route, Route::Questionnaire, notice),
        Fact::Failed(_) => GateOutcome::redirect(
            route,
            Route::Questionnaire,
            Some(notice.unwrap_or_else(|| ANSWERS_NOTICE.to_string())),
        ),
    }
}
