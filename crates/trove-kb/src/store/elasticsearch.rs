//! Elasticsearch backend over its REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::{json, Map, Value};

use super::{DocumentStore, Hit, SearchRequest};
use crate::attribute::QueryFragment;
use crate::error::KbError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Store client holding one pooled HTTP connection set for the process.
pub struct ElasticsearchStore {
    client: Client,
    base: Url,
    username: String,
    password: String,
}

impl ElasticsearchStore {
    /// Create a client for the cluster at `endpoint` using basic auth.
    ///
    /// `request_timeout` bounds every request, including reading the body.
    pub fn new(
        endpoint: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, KbError> {
        let base = Url::parse(endpoint)
            .map_err(|e| KbError::StoreUnavailable(format!("invalid endpoint {}: {}", endpoint, e)))?;
        if base.cannot_be_a_base() {
            return Err(KbError::StoreUnavailable(format!(
                "invalid endpoint {}: not a base URL",
                endpoint
            )));
        }

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| KbError::StoreUnavailable(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            client,
            base,
            username: username.into(),
            password: password.into(),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, KbError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| KbError::StoreUnavailable(format!("invalid endpoint {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl DocumentStore for ElasticsearchStore {
    async fn search(&self, index: &str, request: &SearchRequest) -> Result<Vec<Hit>, KbError> {
        let url = self.url(&[index, "_search"])?;
        let resp = self
            .client
            .post(url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&encode_search(request))
            .send()
            .await
            .map_err(|e| KbError::StoreUnavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let reason = resp.text().await.unwrap_or_default();
            return Err(KbError::QueryFailed {
                index: index.to_string(),
                status: status.as_u16(),
                reason,
            });
        }

        let payload: Value = resp
            .json()
            .await
            .map_err(|e| KbError::MalformedResponse(e.to_string()))?;
        parse_search_response(&payload)
    }

    async fn get(&self, index: &str, id: &str) -> Result<Option<Hit>, KbError> {
        let url = self.url(&[index, "_doc", id])?;
        let resp = self
            .client
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| KbError::StoreUnavailable(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let reason = resp.text().await.unwrap_or_default();
            return Err(KbError::QueryFailed {
                index: index.to_string(),
                status: status.as_u16(),
                reason,
            });
        }

        let payload: Value = resp
            .json()
            .await
            .map_err(|e| KbError::MalformedResponse(e.to_string()))?;
        parse_get_response(&payload)
    }
}

// =============================================================================
// Wire encoding
// =============================================================================

/// Encode a fragment in the Elasticsearch query DSL.
pub fn encode_fragment(fragment: &QueryFragment) -> Value {
    match fragment {
        QueryFragment::Match { field, value } => json!({"match": {field: {"query": value}}}),
        QueryFragment::MatchPhrase { field, value } => {
            json!({"match_phrase": {field: {"query": value}}})
        }
        QueryFragment::Range { field, op, value } => json!({"range": {field: {op: value}}}),
    }
}

/// Encode a search request body.
pub fn encode_search(request: &SearchRequest) -> Value {
    let must: Vec<Value> = request.must.iter().map(encode_fragment).collect();
    json!({
        "size": request.size,
        "query": {
            "bool": {
                "must": must
            }
        }
    })
}

fn parse_hit(hit: &Value) -> Result<Hit, KbError> {
    let id = match &hit["_id"] {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return Err(KbError::MalformedResponse("hit without _id".to_string())),
    };
    let source = hit["_source"].as_object().cloned().unwrap_or_else(Map::new);
    Ok(Hit { id, source })
}

fn parse_search_response(payload: &Value) -> Result<Vec<Hit>, KbError> {
    let hits = payload["hits"]["hits"]
        .as_array()
        .ok_or_else(|| KbError::MalformedResponse("search response without hits".to_string()))?;
    hits.iter().map(parse_hit).collect()
}

fn parse_get_response(payload: &Value) -> Result<Option<Hit>, KbError> {
    if payload["found"] == Value::Bool(false) {
        return Ok(None);
    }
    parse_hit(payload).map(Some)
}
