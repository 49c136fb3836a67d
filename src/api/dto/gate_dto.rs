//! 引导守卫 DTO

use serde::{Deserialize, Serialize};

use crate::gate::{GateDecision, GateOutcome, GateSnapshot, Route};

/// 守卫查询
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateQuery {
    /// 客户端路径，例如 `/chat/42`
    pub path: String,
}

/// 守卫判定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateResponse {
    pub path: String,
    /// `loading` / `render` / `redirect`
    pub decision: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    pub facts: GateSnapshot,
}

impl GateResponse {
    pub fn new(route: &Route, outcome: GateOutcome, facts: GateSnapshot) -> Self {
        let (decision, redirect_to) = match outcome.decision {
            GateDecision::Loading => ("loading", None),
            GateDecision::Render => ("render", None),
            GateDecision::Redirect(target) => ("redirect", Some(target.path())),
        };
        Self {
            path: route.path(),
            decision: decision.to_string(),
            redirect_to,
            notice: outcome.notice,
            facts,
        }
    }
}
