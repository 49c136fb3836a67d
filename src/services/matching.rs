//! 配对服务
//!
//! 配对是无序用户对；同一对用户只会有一条记录。

use async_trait::async_trait;
use futures_util::future::join_all;
use serde_json::json;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{MATCHES_TABLE, Match, MatchStatus, MatchView, PROFILES_TABLE, Profile};
use crate::storage::{Direction, Filter, Query, RecordStore, either_pair};

/// 收藏列表长度
pub const FAVORITES_LIMIT: usize = 5;

/// 配对服务 trait
#[async_trait]
pub trait MatchService: Send + Sync {
    /// 创建配对；已存在（任一方向）时返回已有记录
    async fn create_match(&self, user_id: &str, other_id: &str, score: f64) -> Result<Match>;

    /// 记录兼容性分数：已有配对只更新分数，否则新建待处理配对
    async fn record_score(&self, user_id: &str, other_id: &str, score: f64) -> Result<Match>;

    /// 查找两人之间的配对
    async fn find_pair(&self, user_id: &str, other_id: &str) -> Result<Option<Match>>;

    /// 接受配对
    async fn accept(&self, user_id: &str, match_id: i64) -> Result<Match>;

    /// 拒绝配对
    async fn reject(&self, user_id: &str, match_id: i64) -> Result<Match>;

    /// 我的配对，最新的在前
    async fn list(&self, user_id: &str) -> Result<Vec<MatchView>>;

    /// 收藏：已接受的配对按分数从高到低取前几个
    async fn favorites(&self, user_id: &str) -> Result<Vec<MatchView>>;
}

/// 配对服务实现
pub struct MatchServiceImpl {
    store: Arc<dyn RecordStore>,
}

fn validate_score(score: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&score) {
        return Err(AppError::Validation(format!(
            "Match score must be between 0 and 100, got {}",
            score
        )));
    }
    Ok(())
}

fn validate_pair(user_id: &str, other_id: &str) -> Result<()> {
    if user_id == other_id {
        return Err(AppError::Validation("Cannot match with yourself".to_string()));
    }
    Ok(())
}

impl MatchServiceImpl {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    fn involving(user_id: &str) -> Query {
        Query::table(MATCHES_TABLE).any_of(vec![
            vec![Filter::eq("user_id_1", user_id)],
            vec![Filter::eq("user_id_2", user_id)],
        ])
    }

    async fn transition(&self, user_id: &str, match_id: i64, to: MatchStatus) -> Result<Match> {
        let record: Match = self
            .store
            .fetch_one(&Query::table(MATCHES_TABLE).eq("id", match_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Match {} not found", match_id)))?;

        if !record.involves(user_id) {
            return Err(AppError::Authorization(format!(
                "User {} is not part of match {}",
                user_id, match_id
            )));
        }
        if record.status != MatchStatus::Pending {
            return Err(AppError::Validation(format!(
                "Match {} is already {}",
                match_id, record.status
            )));
        }

        // 状态条件随更新一起提交，并发的接受/拒绝只有一个生效
        let guarded = Query::table(MATCHES_TABLE)
            .eq("id", match_id)
            .eq("status", MatchStatus::Pending.as_str());
        let updated: Vec<Match> = self.store.modify(&guarded, json!({ "status": to })).await?;
        let Some(record) = updated.into_iter().next() else {
            return Err(AppError::Validation(format!(
                "Match {} is no longer pending",
                match_id
            )));
        };
        tracing::info!("Match {} {} by {}", match_id, to, user_id);
        Ok(record)
    }

    async fn with_profiles(&self, user_id: &str, records: Vec<Match>) -> Result<Vec<MatchView>> {
        let lookups = records.iter().map(|record| {
            let other = record.counterpart(user_id).unwrap_or_default().to_string();
            let store = Arc::clone(&self.store);
            async move {
                store
                    .fetch_one::<Profile>(&Query::table(PROFILES_TABLE).eq("id", other.as_str()))
                    .await
            }
        });
        let profiles = join_all(lookups).await;

        let mut views = Vec::with_capacity(records.len());
        for (record, profile) in records.iter().zip(profiles) {
            match profile? {
                Some(profile) => views.push(MatchView::new(record, profile)),
                None => tracing::warn!(
                    "Skipping match {}: profile of counterpart missing",
                    record.id
                ),
            }
        }
        Ok(views)
    }
}

#[async_trait]
impl MatchService for MatchServiceImpl {
    async fn create_match(&self, user_id: &str, other_id: &str, score: f64) -> Result<Match> {
        validate_pair(user_id, other_id)?;
        validate_score(score)?;

        if let Some(existing) = self.find_pair(user_id, other_id).await? {
            tracing::debug!("Match between {} and {} already exists", user_id, other_id);
            return Ok(existing);
        }

        let row = json!({
            "user_id_1": user_id,
            "user_id_2": other_id,
            "match_score": score,
            "status": MatchStatus::Pending,
        });
        self.store.create(MATCHES_TABLE, &row).await
    }

    async fn record_score(&self, user_id: &str, other_id: &str, score: f64) -> Result<Match> {
        validate_pair(user_id, other_id)?;
        validate_score(score)?;

        if let Some(existing) = self.find_pair(user_id, other_id).await? {
            let updated: Vec<Match> = self
                .store
                .modify(
                    &Query::table(MATCHES_TABLE).eq("id", existing.id),
                    json!({ "match_score": score }),
                )
                .await?;
            return updated.into_iter().next().ok_or_else(|| {
                AppError::NotFound(format!("Match {} not found", existing.id))
            });
        }

        let row = json!({
            "user_id_1": user_id,
            "user_id_2": other_id,
            "match_score": score,
            "status": MatchStatus::Pending,
        });
        let stored = self
            .store
            .upsert(MATCHES_TABLE, row, &["user_id_1", "user_id_2"])
            .await?;
        Ok(serde_json::from_value(stored)?)
    }

    async fn find_pair(&self, user_id: &str, other_id: &str) -> Result<Option<Match>> {
        let query = Query::table(MATCHES_TABLE).any_of(either_pair(
            "user_id_1",
            "user_id_2",
            user_id,
            other_id,
        ));
        self.store.fetch_one(&query).await
    }

    async fn accept(&self, user_id: &str, match_id: i64) -> Result<Match> {
        self.transition(user_id, match_id, MatchStatus::Accepted)
            .await
    }

    async fn reject(&self, user_id: &str, match_id: i64) -> Result<Match> {
        self.transition(user_id, match_id, MatchStatus::Rejected)
            .await
    }

    async fn list(&self, user_id: &str) -> Result<Vec<MatchView>> {
        let query = Self::involving(user_id).order_by("created_at", Direction::Desc);
        let records: Vec<Match> = self.store.fetch(&query).await?;
        self.with_profiles(user_id, records).await
    }

    async fn favorites(&self, user_id: &str) -> Result<Vec<MatchView>> {
        let query = Self::involving(user_id)
            .eq("status", MatchStatus::Accepted.as_str())
            .order_by("match_score", Direction::Desc)
            .limit(FAVORITES_LIMIT);
        let records: Vec<Match> = self.store.fetch(&query).await?;
        let mut views = self.with_profiles(user_id, records).await?;
        for view in &mut views {
            view.is_favorite = true;
        }
        Ok(views)
    }
}

/// 创建配对服务
pub fn create_match_service(store: Arc<dyn RecordStore>) -> Box<dyn MatchService> {
    Box::new(MatchServiceImpl::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    async fn setup(users: &[&str]) -> (Arc<dyn RecordStore>, MatchServiceImpl) {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        for id in users {
            store
                .insert(PROFILES_TABLE, json!({"id": id, "name": id.to_uppercase()}))
                .await
                .unwrap();
        }
        (Arc::clone(&store), MatchServiceImpl::new(store))
    }

    #[tokio::test]
    async fn test_create_is_idempotent_for_unordered_pair() {
        let (_, service) = setup(&["a", "b"]).await;
        let first = service.create_match("a", "b", 80.0).await.unwrap();
        let second = service.create_match("b", "a", 60.0).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.match_score, 80.0);
        assert_eq!(first.status, MatchStatus::Pending);
    }

    #[tokio::test]
    async fn test_invalid_pairs_and_scores() {
        let (_, service) = setup(&["a"]).await;
        assert!(matches!(
            service.create_match("a", "a", 50.0).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.create_match("a", "b", 101.0).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_accept_only_by_participant_and_only_once() {
        let (_, service) = setup(&["a", "b"]).await;
        let m = service.create_match("a", "b", 70.0).await.unwrap();

        assert!(matches!(
            service.accept("c", m.id).await,
            Err(AppError::Authorization(_))
        ));
        let accepted = service.accept("b", m.id).await.unwrap();
        assert_eq!(accepted.status, MatchStatus::Accepted);
        assert!(matches!(
            service.reject("a", m.id).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.accept("a", 999).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_transitions_apply_once() {
        let (store, service) = setup(&["a", "b"]).await;
        let m = service.create_match("a", "b", 70.0).await.unwrap();

        let (accepted, rejected) = tokio::join!(service.accept("b", m.id), service.reject("a", m.id));
        let outcomes = [accepted.is_ok(), rejected.is_ok()];
        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);

        let loser = if outcomes[0] { rejected } else { accepted };
        assert!(matches!(loser, Err(AppError::Validation(_))));

        let stored: Match = store
            .fetch_one(&Query::table(MATCHES_TABLE).eq("id", m.id))
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored.status, MatchStatus::Pending);
    }

    #[tokio::test]
    async fn test_list_joins_profiles_and_skips_missing() {
        let (_, service) = setup(&["a", "b", "c"]).await;
        service.create_match("a", "b", 70.0).await.unwrap();
        service.create_match("c", "a", 90.0).await.unwrap();
        service.create_match("a", "ghost", 50.0).await.unwrap();

        let views = service.list("a").await.unwrap();
        let names: Vec<&str> = views.iter().map(|v| v.user.id.as_str()).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"b"));
        assert!(names.contains(&"c"));
    }

    #[tokio::test]
    async fn test_favorites_are_top_accepted_by_score() {
        let users = ["me", "u1", "u2", "u3", "u4", "u5", "u6", "u7"];
        let (_, service) = setup(&users).await;
        for (i, other) in users.iter().skip(1).enumerate() {
            let m = service
                .create_match("me", other, 50.0 + i as f64)
                .await
                .unwrap();
            if *other != "u7" {
                service.accept(other, m.id).await.unwrap();
            }
        }

        let favorites = service.favorites("me").await.unwrap();
        assert_eq!(favorites.len(), FAVORITES_LIMIT);
        assert!(favorites.iter().all(|f| f.is_favorite));
        assert_eq!(favorites[0].user.id, "u6");
        assert!(
            favorites
                .windows(2)
                .all(|w| w[0].match_score >= w[1].match_score)
        );
    }

    #[tokio::test]
    async fn test_record_score_updates_existing_pair() {
        let (_, service) = setup(&["a", "b"]).await;
        let created = service.record_score("a", "b", 72.0).await.unwrap();
        let updated = service.record_score("b", "a", 88.0).await.unwrap();
        assert_eq!(created.id, updated.id);
        assert_eq!(updated.match_score, 88.0);
    }
}
