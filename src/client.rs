use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::api::models::{AnswerRequest, AnswerResponse, SearchRequest, SearchResponse};
use crate::data_models::SearchResultItem;

#[derive(Debug, Error)]
pub enum ChatError {
    /// The proxy answered 404 with something that is not JSON.
    #[error("API endpoint {0} not found (404)")]
    EndpointNotFound(String),

    #[error("{0}")]
    Server(String),

    #[error("invalid response from server: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Network(#[from] reqwest::Error),
}

/// What the chat layer needs from a successful search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchReply {
    pub results: Vec<SearchResultItem>,
    pub summary: Option<String>,
    pub query_id: Option<String>,
    pub session_id: Option<String>,
}

impl From<SearchResponse> for SearchReply {
    fn from(response: SearchResponse) -> Self {
        SearchReply {
            results: response
                .results
                .iter()
                .map(SearchResultItem::from_value)
                .collect(),
            summary: response.summary,
            query_id: response.session_info.query_id,
            session_id: response.session_info.session_id,
        }
    }
}

/// HTTP client for the proxy endpoints, as used by the chat front end.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    http: reqwest::Client,
    base_url: String,
}

impl ProxyClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn search(&self, query: &str) -> Result<SearchReply, ChatError> {
        let response: SearchResponse = self.post("/api/search", &SearchRequest::new(query)).await?;
        Ok(response.into())
    }

    pub async fn generate_answer(
        &self,
        query_id: &str,
        session_id: &str,
    ) -> Result<AnswerResponse, ChatError> {
        let request = AnswerRequest {
            query_id: Some(query_id.to_string()),
            session_id: Some(session_id.to_string()),
        };
        self.post("/api/generate-answer", &request).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ChatError>
    where
        B: serde::Serialize,
        T: DeserializeOwned,
    {
        let res = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await?;
        decode_reply(path, status, &text)
    }
}

/// Interpret a proxy reply. Failures carry the server's `error` field when
/// there is one, otherwise the status.
fn decode_reply<T: DeserializeOwned>(
    path: &str,
    status: StatusCode,
    text: &str,
) -> Result<T, ChatError> {
    let data: Value = match serde_json::from_str(text) {
        Ok(data) => data,
        Err(e) => {
            log::error!("raw response text: {text}");
            if status == StatusCode::NOT_FOUND {
                return Err(ChatError::EndpointNotFound(path.to_string()));
            }
            return Err(ChatError::InvalidResponse(e.to_string()));
        }
    };

    let server_error = data.get("error").filter(|e| !e.is_null());
    if !status.is_success() || server_error.is_some() {
        let message = server_error
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Server error: {}", status.as_u16()));
        return Err(ChatError::Server(message));
    }

    serde_json::from_value(data).map_err(|e| ChatError::InvalidResponse(e.to_string()))
}
