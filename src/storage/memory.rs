//! 进程内记录存储
//!
//! 行为与托管记录存储保持一致：自增/UUID 主键、自动填充 `created_at`、
//! 返回写入后的完整记录。用于开发环境和测试。

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{ANSWERS_TABLE, MATCHES_TABLE, MESSAGES_TABLE, QUESTIONS_TABLE};
use crate::storage::store::{Direction, Query, RecordStore, compare_values, values_equal};

/// 使用自增整数主键的表
const SERIAL_TABLES: [&str; 4] = [MATCHES_TABLE, MESSAGES_TABLE, QUESTIONS_TABLE, ANSWERS_TABLE];

#[derive(Default)]
struct Tables {
    rows: HashMap<String, Vec<Value>>,
    sequences: HashMap<String, i64>,
}

/// 进程内记录存储
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn as_object(table: &str, row: Value) -> Result<Map<String, Value>> {
    match row {
        Value::Object(map) => Ok(map),
        other => Err(AppError::Database(format!(
            "Rows for {} must be objects, got {}",
            table, other
        ))),
    }
}

impl Tables {
    fn prepare(&mut self, table: &str, mut row: Map<String, Value>) -> Value {
        let id_missing = row.get("id").is_none_or(Value::is_null);
        if id_missing {
            let id = if SERIAL_TABLES.contains(&table) {
                let next = self.sequences.entry(table.to_string()).or_insert(0);
                *next += 1;
                Value::from(*next)
            } else {
                Value::String(Uuid::new_v4().to_string())
            };
            row.insert("id".into(), id);
        } else if let Some(id) = row.get("id").and_then(Value::as_i64) {
            // 显式 id 需要推高序列，避免后续冲突
            let next = self.sequences.entry(table.to_string()).or_insert(0);
            *next = (*next).max(id);
        }
        if row.get("created_at").is_none_or(Value::is_null) {
            row.insert("created_at".into(), Value::String(now_timestamp()));
        }
        Value::Object(row)
    }

    fn push(&mut self, table: &str, row: Map<String, Value>) -> Value {
        let row = self.prepare(table, row);
        self.rows
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        row
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接写入初始数据（问卷题目等）
    pub fn seed(&self, table: &str, rows: Vec<Value>) -> Result<()> {
        let mut tables = self.tables.write();
        for row in rows {
            let row = as_object(table, row)?;
            tables.push(table, row);
        }
        Ok(())
    }

    /// 某张表的行数
    pub fn len(&self, table: &str) -> usize {
        self.tables.read().rows.get(table).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn select(&self, query: &Query) -> Result<Vec<Value>> {
        let tables = self.tables.read();
        let mut rows: Vec<Value> = tables
            .rows
            .get(&query.table)
            .map(|rows| rows.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();

        if let Some((column, direction)) = &query.order {
            // 同值按写入顺序：升序先写的在前，降序后写的在前
            if *direction == Direction::Desc {
                rows.reverse();
            }
            rows.sort_by(|a, b| {
                let a = a.get(column).unwrap_or(&Value::Null);
                let b = b.get(column).unwrap_or(&Value::Null);
                let ordering = compare_values(a, b);
                match direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value> {
        let row = as_object(table, row)?;
        let mut tables = self.tables.write();
        if let Some(id) = row.get("id").filter(|v| !v.is_null()) {
            let duplicate = tables
                .rows
                .get(table)
                .is_some_and(|rows| rows.iter().any(|r| values_equal(&r["id"], id)));
            if duplicate {
                return Err(AppError::Database(format!(
                    "duplicate key value violates unique constraint on {}.id",
                    table
                )));
            }
        }
        Ok(tables.push(table, row))
    }

    async fn update(&self, query: &Query, patch: Value) -> Result<Vec<Value>> {
        let patch = as_object(&query.table, patch)?;
        let mut tables = self.tables.write();
        let Some(rows) = tables.rows.get_mut(&query.table) else {
            return Ok(Vec::new());
        };

        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|r| query.matches(r)) {
            if let Value::Object(fields) = row {
                for (key, value) in &patch {
                    fields.insert(key.clone(), value.clone());
                }
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn upsert(&self, table: &str, row: Value, on_conflict: &[&str]) -> Result<Value> {
        let incoming = as_object(table, row)?;
        let conflict_columns: Vec<&str> = if on_conflict.is_empty() {
            vec!["id"]
        } else {
            on_conflict.to_vec()
        };

        let mut tables = self.tables.write();
        if let Some(rows) = tables.rows.get_mut(table) {
            let existing = rows.iter_mut().find(|r| {
                conflict_columns.iter().all(|c| {
                    incoming
                        .get(*c)
                        .is_some_and(|v| values_equal(r.get(*c).unwrap_or(&Value::Null), v))
                })
            });
            if let Some(Value::Object(fields)) = existing {
                for (key, value) in incoming {
                    if key != "id" {
                        fields.insert(key, value);
                    }
                }
                return Ok(Value::Object(fields.clone()));
            }
        }
        Ok(tables.push(table, incoming))
    }

    async fn count(&self, query: &Query) -> Result<u64> {
        let tables = self.tables.read();
        let total = tables
            .rows
            .get(&query.table)
            .map_or(0, |rows| rows.iter().filter(|r| query.matches(r)).count());
        Ok(total as u64)
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}
