//! 托管记录存储（PostgREST 协议）
//!
//! 通过 HTTP 访问托管后端的 `/rest/v1/<table>` 接口。

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;

use crate::config::BackendConfig;
use crate::error::{AppError, Result};
use crate::storage::store::{Direction, Filter, Query, RecordStore};

/// PostgREST 记录存储
#[derive(Clone)]
pub struct PostgrestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PostgrestStore {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout.max(1)))
            .build()?;
        Ok(Self::with_client(client, &config.url, config.data_key()))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
    }

    async fn rows(table: &str, response: Response) -> Result<Vec<Value>> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Database(format!(
                "Record store error on {} ({}): {}",
                table, status, error_text
            )));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(&body)? {
            Value::Array(rows) => Ok(rows),
            row @ Value::Object(_) => Ok(vec![row]),
            other => Err(AppError::Database(format!(
                "Unexpected record store payload for {}: {}",
                table, other
            ))),
        }
    }

    fn first_row(table: &str, rows: Vec<Value>) -> Result<Value> {
        rows.into_iter().next().ok_or_else(|| {
            AppError::Database(format!("Record store returned no row for {}", table))
        })
    }
}

/// 过滤值字面量；“或”条件内含保留字符的值需要加引号
fn literal(value: &Value, quoted: bool) -> String {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    };
    if quoted && raw.chars().any(|c| matches!(c, ',' | '(' | ')' | '.' | ':' | '"' | ' ')) {
        format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        raw
    }
}

fn operator(filter: &Filter) -> (&'static str, &Value) {
    match filter {
        Filter::Eq(_, Value::Null) => ("is", &Value::Null),
        Filter::Neq(_, Value::Null) => ("not.is", &Value::Null),
        Filter::Eq(_, v) => ("eq", v),
        Filter::Neq(_, v) => ("neq", v),
    }
}

/// 把查询转换为 PostgREST 查询参数
pub fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = Vec::new();

    for filter in &query.filters {
        let (op, value) = operator(filter);
        params.push((
            filter.column().to_string(),
            format!("{}.{}", op, literal(value, false)),
        ));
    }

    if !query.any_of.is_empty() {
        let groups: Vec<String> = query
            .any_of
            .iter()
            .map(|group| {
                let parts: Vec<String> = group
                    .iter()
                    .map(|f| {
                        let (op, value) = operator(f);
                        format!("{}.{}.{}", f.column(), op, literal(value, true))
                    })
                    .collect();
                format!("and({})", parts.join(","))
            })
            .collect();
        params.push(("or".to_string(), format!("({})", groups.join(","))));
    }

    if let Some((column, direction)) = &query.order {
        let dir = match direction {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        };
        params.push(("order".to_string(), format!("{}.{}", column, dir)));
    }

    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }

    params
}

/// 从 `Content-Range: 0-9/42` 中解析总数
fn parse_total(content_range: &str) -> Option<u64> {
    content_range
        .rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse().ok())
}

#[async_trait]
impl RecordStore for PostgrestStore {
    async fn select(&self, query: &Query) -> Result<Vec<Value>> {
        tracing::debug!("Selecting from {}: {:?}", query.table, query);

        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(query_params(query));

        let response = self
            .request(Method::GET, &query.table)
            .query(&params)
            .send()
            .await?;
        Self::rows(&query.table, response).await
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value> {
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        Self::first_row(table, Self::rows(table, response).await?)
    }

    async fn update(&self, query: &Query, patch: Value) -> Result<Vec<Value>> {
        let response = self
            .request(Method::PATCH, &query.table)
            .header("Prefer", "return=representation")
            .query(&query_params(query))
            .json(&patch)
            .send()
            .await?;
        Self::rows(&query.table, response).await
    }

    async fn upsert(&self, table: &str, row: Value, on_conflict: &[&str]) -> Result<Value> {
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .query(&[("on_conflict", on_conflict.join(","))])
            .json(&row)
            .send()
            .await?;
        Self::first_row(table, Self::rows(table, response).await?)
    }

    async fn count(&self, query: &Query) -> Result<u64> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(query_params(&query.clone().limit(1)));

        let response = self
            .request(Method::GET, &query.table)
            .header("Prefer", "count=exact")
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Database(format!(
                "Record store count on {} failed ({}): {}",
                query.table, status, error_text
            )));
        }

        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_total)
            .ok_or_else(|| {
                AppError::Database(format!("Missing row count for {}", query.table))
            })
    }

    fn store_type(&self) -> &'static str {
        "postgrest"
    }
}
