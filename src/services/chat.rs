//! 私信服务

use async_trait::async_trait;
use futures_util::future::join_all;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{Conversation, MESSAGES_TABLE, Message, PROFILES_TABLE, Profile};
use crate::storage::{Direction, Filter, Query, RecordStore, either_pair};

/// 私信服务 trait
#[async_trait]
pub trait ChatService: Send + Sync {
    /// 两人之间的消息，按时间先后；同时把对方发给我的未读消息标为已读
    async fn thread(&self, user_id: &str, other_id: &str) -> Result<Vec<Message>>;

    /// 只读取消息，不修改已读状态
    async fn history(&self, user_id: &str, other_id: &str) -> Result<Vec<Message>>;

    /// 发送消息
    async fn send(&self, user_id: &str, other_id: &str, content: &str) -> Result<Message>;

    /// 我的未读消息数
    async fn unread_count(&self, user_id: &str) -> Result<u64>;

    /// 最近会话，最新的在前
    async fn conversations(&self, user_id: &str) -> Result<Vec<Conversation>>;
}

/// 私信服务实现
pub struct ChatServiceImpl {
    store: Arc<dyn RecordStore>,
}

impl ChatServiceImpl {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ChatService for ChatServiceImpl {
    async fn thread(&self, user_id: &str, other_id: &str) -> Result<Vec<Message>> {
        let mut messages = self.history(user_id, other_id).await?;

        if messages.iter().any(|m| m.sender_id == other_id && m.is_unread_for(user_id)) {
            let unread = Query::table(MESSAGES_TABLE)
                .eq("sender_id", other_id)
                .eq("receiver_id", user_id)
                .eq("read", false);
            let marked: Vec<Message> = self.store.modify(&unread, json!({ "read": true })).await?;
            tracing::debug!("Marked {} messages read for {}", marked.len(), user_id);

            for message in messages
                .iter_mut()
                .filter(|m| m.sender_id == other_id && m.receiver_id == user_id)
            {
                message.read = true;
            }
        }
        Ok(messages)
    }

    async fn history(&self, user_id: &str, other_id: &str) -> Result<Vec<Message>> {
        let query = Query::table(MESSAGES_TABLE)
            .any_of(either_pair("sender_id", "receiver_id", user_id, other_id))
            .order_by("created_at", Direction::Asc);
        self.store.fetch(&query).await
    }

    async fn send(&self, user_id: &str, other_id: &str, content: &str) -> Result<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Message cannot be empty".to_string()));
        }
        if user_id == other_id {
            return Err(AppError::Validation(
                "Cannot send a message to yourself".to_string(),
            ));
        }

        let row = json!({
            "sender_id": user_id,
            "receiver_id": other_id,
            "content": content,
            "read": false,
        });
        self.store.create(MESSAGES_TABLE, &row).await
    }

    async fn unread_count(&self, user_id: &str) -> Result<u64> {
        let query = Query::table(MESSAGES_TABLE)
            .eq("receiver_id", user_id)
            .eq("read", false);
        self.store.count(&query).await
    }

    async fn conversations(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let query = Query::table(MESSAGES_TABLE)
            .any_of(vec![
                vec![Filter::eq("sender_id", user_id)],
                vec![Filter::eq("receiver_id", user_id)],
            ])
            .order_by("created_at", Direction::Desc);
        let messages: Vec<Message> = self.store.fetch(&query).await?;

        // 按对方分组，第一条即最新消息
        let mut order: Vec<String> = Vec::new();
        let mut latest: HashMap<String, (Message, u64)> = HashMap::new();
        for message in messages {
            let other = message.counterpart(user_id).to_string();
            let unread = u64::from(message.is_unread_for(user_id));
            match latest.get_mut(&other) {
                Some((_, count)) => *count += unread,
                None => {
                    order.push(other.clone());
                    latest.insert(other, (message, unread));
                }
            }
        }

        let lookups = order.iter().map(|other| {
            let store = Arc::clone(&self.store);
            let other = other.clone();
            async move {
                store
                    .fetch_one::<Profile>(&Query::table(PROFILES_TABLE).eq("id", other.as_str()))
                    .await
            }
        });
        let profiles = join_all(lookups).await;

        let mut conversations = Vec::with_capacity(order.len());
        for (other, profile) in order.iter().zip(profiles) {
            let Some((last_message, unread_count)) = latest.remove(other) else {
                continue;
            };
            match profile? {
                Some(user) => conversations.push(Conversation {
                    user,
                    last_message,
                    unread_count,
                }),
                None => tracing::warn!("Skipping conversation with {}: profile missing", other),
            }
        }
        Ok(conversations)
    }
}

/// 创建私信服务
pub fn create_chat_service(store: Arc<dyn RecordStore>) -> Box<dyn ChatService> {
    Box::new(ChatServiceImpl::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    async fn setup() -> ChatServiceImpl {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        for id in ["a", "b", "c"] {
            store
                .insert(PROFILES_TABLE, json!({"id": id, "name": id}))
                .await
                .unwrap();
        }
        ChatServiceImpl::new(store)
    }

    #[tokio::test]
    async fn test_send_validation() {
        let chat = setup().await;
        assert!(matches!(
            chat.send("a", "b", "   ").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            chat.send("a", "a", "hi").await,
            Err(AppError::Validation(_))
        ));
        let message = chat.send("a", "b", " hi ").await.unwrap();
        assert_eq!(message.content, "hi");
        assert!(!message.read);
    }

    #[tokio::test]
    async fn test_opening_thread_marks_incoming_read() {
        let chat = setup().await;
        chat.send("a", "b", "hello").await.unwrap();
        chat.send("b", "a", "hey").await.unwrap();
        chat.send("b", "a", "how are you?").await.unwrap();
        chat.send("c", "a", "psst").await.unwrap();
        assert_eq!(chat.unread_count("a").await.unwrap(), 3);

        let thread = chat.thread("a", "b").await.unwrap();
        let contents: Vec<&str> = thread.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hello", "hey", "how are you?"]);
        assert!(thread.iter().filter(|m| m.receiver_id == "a").all(|m| m.read));

        // 我发出的消息保持未读，其他会话不受影响
        assert_eq!(chat.unread_count("a").await.unwrap(), 1);
        assert_eq!(chat.unread_count("b").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_conversations_latest_first_with_unread() {
        let chat = setup().await;
        chat.send("b", "a", "one").await.unwrap();
        chat.send("b", "a", "two").await.unwrap();
        chat.send("a", "c", "yo").await.unwrap();
        chat.send("a", "ghost", "anyone?").await.unwrap();

        let conversations = chat.conversations("a").await.unwrap();
        assert_eq!(conversations.len(), 2);

        let with_b = conversations.iter().find(|c| c.user.id == "b").unwrap();
        assert_eq!(with_b.unread_count, 2);
        assert_eq!(with_b.last_message.content, "two");

        let with_c = conversations.iter().find(|c| c.user.id == "c").unwrap();
        assert_eq!(with_c.unread_count, 0);
    }
}
