//! Web search via the Serper API.

use super::SearchHit;
use crate::types::RemoteCallError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

/// [`super::SearchClient`] backed by Serper's JSON search endpoint.
pub struct SerperSearch {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl SerperSearch {
    /// Default public endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://google.serper.dev/search";

    pub fn new(api_key: String, endpoint: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            endpoint,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperOrganic>,
}

#[derive(Debug, Deserialize)]
struct SerperOrganic {
    link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

#[async_trait]
impl super::SearchClient for SerperSearch {
    async fn search(
        &self,
        query_text: &str,
        result_count: usize,
    ) -> std::result::Result<Vec<SearchHit>, RemoteCallError> {
        let payload = serde_json::json!({
            "q": query_text,
            "num": result_count,
            "gl": "us",
            "hl": "en",
        });

        let response = self
            .http
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RemoteCallError::Unavailable(format!("search request failed: {e}")))?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(RemoteCallError::RateLimited(
                    "search quota exhausted".to_string(),
                ));
            }
            status if !status.is_success() => {
                return Err(RemoteCallError::Unavailable(format!(
                    "search returned {status}"
                )));
            }
            _ => {}
        }

        let body: SerperResponse = response
            .json()
            .await
            .map_err(|e| RemoteCallError::InvalidResponse(format!("search body: {e}")))?;

        Ok(body
            .organic
            .into_iter()
            .take(result_count)
            .map(|item| SearchHit {
                url: item.link,
                title: item.title,
                snippet: item.snippet,
            })
            .collect())
    }
}
