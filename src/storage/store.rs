//! 记录存储抽象
//!
//! 托管后端以表为单位提供 CRUD，查询只支持等值/不等过滤、一组“或”条件、
//! 单列排序和数量限制，这里的 `Query` 恰好覆盖这些能力。

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cmp::Ordering;

use crate::error::{AppError, Result};

/// 单列过滤条件
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Neq(String, Value),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn neq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Neq(column.to_string(), value.into())
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(c, _) | Filter::Neq(c, _) => c,
        }
    }

    /// 判断一行记录是否满足条件
    pub fn matches(&self, row: &Value) -> bool {
        let field = row.get(self.column()).unwrap_or(&Value::Null);
        match self {
            Filter::Eq(_, v) => values_equal(field, v),
            Filter::Neq(_, v) => !values_equal(field, v),
        }
    }
}

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// 表查询
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    /// 全部需要满足
    pub filters: Vec<Filter>,
    /// 非空时至少满足其中一组（组内全部满足）
    pub any_of: Vec<Vec<Filter>>,
    pub order: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            filters: Vec::new(),
            any_of: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn neq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::neq(column, value));
        self
    }

    pub fn any_of(mut self, groups: Vec<Vec<Filter>>) -> Self {
        self.any_of = groups;
        self
    }

    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.order = Some((column.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// 判断一行记录是否满足全部条件
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(row))
            && (self.any_of.is_empty()
                || self
                    .any_of
                    .iter()
                    .any(|group| group.iter().all(|f| f.matches(row))))
    }
}

/// 无序用户对的“或”条件：(a, b) 或 (b, a)
pub fn either_pair(column_1: &str, column_2: &str, a: &str, b: &str) -> Vec<Vec<Filter>> {
    vec![
        vec![Filter::eq(column_1, a), Filter::eq(column_2, b)],
        vec![Filter::eq(column_1, b), Filter::eq(column_2, a)],
    ]
}

pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// 记录存储 trait
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 查询记录
    async fn select(&self, query: &Query) -> Result<Vec<Value>>;

    /// 插入一行并返回存储后的记录（含生成的 id、created_at）
    async fn insert(&self, table: &str, row: Value) -> Result<Value>;

    /// 按条件局部更新，返回更新后的记录
    async fn update(&self, query: &Query, patch: Value) -> Result<Vec<Value>>;

    /// 按冲突列插入或合并
    async fn upsert(&self, table: &str, row: Value, on_conflict: &[&str]) -> Result<Value>;

    /// 统计满足条件的记录数
    async fn count(&self, query: &Query) -> Result<u64>;

    /// 存储类型
    fn store_type(&self) -> &'static str;
}

fn decode<T: DeserializeOwned>(table: &str, row: Value) -> Result<T> {
    serde_json::from_value(row)
        .map_err(|e| AppError::Database(format!("Failed to deserialize {} row: {}", table, e)))
}

/// 带类型的便捷方法
impl dyn RecordStore {
    pub async fn fetch<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>> {
        let rows = self.select(query).await?;
        rows.into_iter().map(|row| decode(&query.table, row)).collect()
    }

    pub async fn fetch_one<T: DeserializeOwned>(&self, query: &Query) -> Result<Option<T>> {
        let query = query.clone().limit(1);
        let mut rows = self.select(&query).await?;
        match rows.pop() {
            Some(row) => decode(&query.table, row).map(Some),
            None => Ok(None),
        }
    }

    pub async fn create<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        table: &str,
        row: &T,
    ) -> Result<R> {
        let row = serde_json::to_value(row)?;
        let stored = self.insert(table, row).await?;
        decode(table, stored)
    }

    pub async fn modify<R: DeserializeOwned>(&self, query: &Query, patch: Value) -> Result<Vec<R>> {
        let rows = self.update(query, patch).await?;
        rows.into_iter().map(|row| decode(&query.table, row)).collect()
    }

    pub async fn exists(&self, query: &Query) -> Result<bool> {
        Ok(self.count(query).await? > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_matches_filters_and_groups() {
        let q = Query::table("messages")
            .eq("read", false)
            .any_of(either_pair("sender_id", "receiver_id", "a", "b"));

        assert!(q.matches(&json!({"sender_id": "a", "receiver_id": "b", "read": false})));
        assert!(q.matches(&json!({"sender_id": "b", "receiver_id": "a", "read": false})));
        assert!(!q.matches(&json!({"sender_id": "a", "receiver_id": "c", "read": false})));
        assert!(!q.matches(&json!({"sender_id": "a", "receiver_id": "b", "read": true})));
    }

    #[test]
    fn test_numeric_equality_ignores_representation() {
        assert!(values_equal(&json!(3), &json!(3.0)));
        assert!(Filter::eq("id", 3).matches(&json!({"id": 3.0})));
        assert!(Filter::neq("id", 3).matches(&json!({"id": 4})));
        // missing column compares as null
        assert!(Filter::neq("id", 3).matches(&json!({})));
    }

    #[test]
    fn test_compare_values_orders_nulls_first() {
        assert_eq!(compare_values(&Value::Null, &json!(1)), Ordering::Less);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
    }
}
