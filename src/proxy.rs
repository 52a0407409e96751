use std::sync::Arc;

use crate::api::models::{
    AnswerRequest, AnswerResponse, SearchRequest, SearchResponse, SessionInfo,
};
use crate::auth::TokenProvider;
use crate::discovery::{AnswerBody, DiscoveryEngineClient, NEW_SESSION, SearchBody, SearchPayload};
use crate::error::{ApiError, Operation};

/// Stateless relay between the HTTP handlers and Discovery Engine.
///
/// A fresh access token is requested for every incoming request; nothing is
/// shared between requests except whatever the token provider itself keeps.
pub struct SearchProxy {
    tokens: Arc<dyn TokenProvider>,
    engine: DiscoveryEngineClient,
}

/// Query text with surrounding whitespace ignored, or `None` when blank.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl SearchProxy {
    pub fn new(tokens: Arc<dyn TokenProvider>, engine: DiscoveryEngineClient) -> Self {
        Self { tokens, engine }
    }

    pub fn engine(&self) -> &DiscoveryEngineClient {
        &self.engine
    }

    async fn token(&self, op: Operation) -> Result<String, ApiError> {
        self.tokens
            .access_token()
            .await
            .map_err(|e| ApiError::token(op, e))
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, ApiError> {
        let query = non_blank(request.query.as_deref())
            .ok_or_else(|| ApiError::bad_request("Query is required"))?;
        let session = if request.new_session {
            NEW_SESSION
        } else {
            non_blank(request.session_id.as_deref()).ok_or_else(|| {
                ApiError::bad_request("SessionId is required when newSession is false")
            })?
        };

        let token = self.token(Operation::Search).await?;
        self.search_with_token(&token, query, session).await
    }

    async fn search_with_token(
        &self,
        token: &str,
        query: &str,
        session: &str,
    ) -> Result<SearchResponse, ApiError> {
        log::info!("searching for {query:?} (session {session})");
        let payload = self
            .engine
            .search(token, &SearchBody::new(query, session))
            .await
            .map_err(|e| ApiError::upstream(Operation::Search, e))?;

        Ok(Self::reshape_search(payload))
    }

    fn reshape_search(payload: SearchPayload) -> SearchResponse {
        SearchResponse {
            results: payload.results.unwrap_or_default(),
            session_info: SessionInfo {
                query_id: payload.query_id,
                session_id: payload.session,
            },
            summary: payload.summary.and_then(|s| s.summary_text),
        }
    }

    pub async fn generate_answer(&self, request: &AnswerRequest) -> Result<AnswerResponse, ApiError> {
        let (Some(query_id), Some(session_id)) = (
            non_blank(request.query_id.as_deref()),
            non_blank(request.session_id.as_deref()),
        ) else {
            return Err(ApiError::bad_request("QueryId and SessionId are required"));
        };

        let token = self.token(Operation::Answer).await?;
        self.answer_with_token(&token, query_id, session_id).await
    }

    async fn answer_with_token(
        &self,
        token: &str,
        query_id: &str,
        session_id: &str,
    ) -> Result<AnswerResponse, ApiError> {
        log::info!("generating answer for query {query_id} (session {session_id})");
        let payload = self
            .engine
            .answer(token, &AnswerBody::new(query_id, session_id))
            .await
            .map_err(|e| ApiError::upstream(Operation::Answer, e))?;

        Ok(AnswerResponse {
            answer: payload.answer,
            related_questions: payload.related_questions.unwrap_or_default(),
        })
    }

    /// New-session search followed by an answer for the query it returned,
    /// both under one access token. The answer leg is skipped when the search
    /// came back without a query id or session.
    pub async fn search_and_answer(
        &self,
        query: Option<&str>,
    ) -> Result<(SearchResponse, AnswerResponse), ApiError> {
        let query = non_blank(query).ok_or_else(|| ApiError::bad_request("Query is required"))?;

        let token = self.token(Operation::Search).await?;
        let search = self.search_with_token(&token, query, NEW_SESSION).await?;

        let answer = match (
            search.session_info.query_id.as_deref(),
            search.session_info.session_id.as_deref(),
        ) {
            (Some(query_id), Some(session_id)) => {
                self.answer_with_token(&token, query_id, session_id).await?
            }
            _ => {
                log::warn!("search for {query:?} returned no session; skipping answer");
                AnswerResponse {
                    answer: None,
                    related_questions: Vec::new(),
                }
            }
        };

        Ok((search, answer))
    }
}
