//! Thin REST client for one Discovery Engine (Vertex AI Search) serving config.
//!
//! Only the `:search` and `:answer` methods are used. Result and answer
//! payloads are kept as raw JSON so they can be relayed to callers unchanged.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Session value asking the engine to open a new session.
pub const NEW_SESSION: &str = "-";

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("request to upstream failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchBody<'a> {
    pub query: &'a str,
    pub page_size: u32,
    pub query_expansion_spec: QueryExpansionSpec,
    pub spell_correction_spec: SpellCorrectionSpec,
    pub language_code: &'static str,
    pub content_search_spec: ContentSearchSpec,
    pub session: &'a str,
}

impl<'a> SearchBody<'a> {
    /// The fixed request shape used for every proxied search.
    pub fn new(query: &'a str, session: &'a str) -> Self {
        SearchBody {
            query,
            page_size: 10,
            query_expansion_spec: QueryExpansionSpec { condition: "AUTO" },
            spell_correction_spec: SpellCorrectionSpec { mode: "AUTO" },
            language_code: "en-US",
            content_search_spec: ContentSearchSpec {
                extractive_content_spec: ExtractiveContentSpec {
                    max_extractive_answer_count: 1,
                    max_extractive_segment_count: 1,
                },
            },
            session,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QueryExpansionSpec {
    pub condition: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SpellCorrectionSpec {
    pub mode: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSearchSpec {
    pub extractive_content_spec: ExtractiveContentSpec,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractiveContentSpec {
    pub max_extractive_answer_count: u32,
    pub max_extractive_segment_count: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerBody<'a> {
    pub query: AnswerQuery<'a>,
    pub session: &'a str,
    pub related_questions_spec: RelatedQuestionsSpec,
    pub answer_generation_spec: AnswerGenerationSpec,
}

impl<'a> AnswerBody<'a> {
    /// Answer request for a prior search, referenced by its query id.
    pub fn new(query_id: &'a str, session: &'a str) -> Self {
        AnswerBody {
            query: AnswerQuery { text: "", query_id },
            session,
            related_questions_spec: RelatedQuestionsSpec { enable: true },
            answer_generation_spec: AnswerGenerationSpec {
                ignore_adversarial_query: true,
                ignore_non_answer_seeking_query: false,
                ignore_low_relevance: false,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerQuery<'a> {
    pub text: &'a str,
    pub query_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RelatedQuestionsSpec {
    pub enable: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerGenerationSpec {
    pub ignore_adversarial_query: bool,
    pub ignore_non_answer_seeking_query: bool,
    pub ignore_low_relevance: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPayload {
    #[serde(default)]
    pub results: Option<Vec<Value>>,
    #[serde(default)]
    pub query_id: Option<String>,
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub summary: Option<SummaryPayload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryPayload {
    #[serde(default)]
    pub summary_text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPayload {
    #[serde(default)]
    pub answer: Option<Value>,
    #[serde(default)]
    pub related_questions: Option<Vec<Value>>,
}

pub struct DiscoveryEngineClient {
    http: reqwest::Client,
    serving_config_url: String,
}

impl DiscoveryEngineClient {
    pub fn new(endpoint: &str, serving_config: &str) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint, serving_config)
    }

    pub fn with_client(http: reqwest::Client, endpoint: &str, serving_config: &str) -> Self {
        let serving_config_url = format!(
            "{}/{}",
            endpoint.trim_end_matches('/'),
            serving_config.trim_start_matches('/')
        );
        Self {
            http,
            serving_config_url,
        }
    }

    pub fn serving_config_url(&self) -> &str {
        &self.serving_config_url
    }

    pub async fn search(
        &self,
        access_token: &str,
        body: &SearchBody<'_>,
    ) -> Result<SearchPayload, UpstreamError> {
        self.call("search", access_token, body).await
    }

    pub async fn answer(
        &self,
        access_token: &str,
        body: &AnswerBody<'_>,
    ) -> Result<AnswerPayload, UpstreamError> {
        self.call("answer", access_token, body).await
    }

    async fn call<B, T>(
        &self,
        method: &str,
        access_token: &str,
        body: &B,
    ) -> Result<T, UpstreamError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}:{method}", self.serving_config_url);
        log::debug!("POST {url}");

        let res = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = match res.text().await {
                Ok(body) => body,
                Err(e) => {
                    log::warn!("could not read {status} error body from {url}: {e}");
                    String::new()
                }
            };
            return Err(UpstreamError::Status { status, body });
        }

        Ok(res.json::<T>().await?)
    }
}
