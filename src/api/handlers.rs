use axum::extract::rejection::JsonRejection;
use axum::{Json, extract::State};
use std::sync::Arc;
use std::time::Instant;

use crate::error::ApiError;
use crate::proxy::SearchProxy;

use super::models::{
    AnswerRequest, AnswerResponse, SearchAndAnswerRequest, SearchAndAnswerResponse,
    SearchRequest, SearchResponse,
};

fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| ApiError::BadRequest {
        message: "Invalid request body, expected JSON".to_string(),
        details: Some(rejection.body_text()),
    })
}

pub async fn search_handler(
    State(proxy): State<Arc<SearchProxy>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = Instant::now();
    let request = parse_body(payload)?;

    let response = proxy.search(&request).await?;

    log::info!(
        "search returned {} results in {}ms",
        response.results.len(),
        start.elapsed().as_millis()
    );
    Ok(Json(response))
}

pub async fn generate_answer_handler(
    State(proxy): State<Arc<SearchProxy>>,
    payload: Result<Json<AnswerRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let start = Instant::now();
    let request = parse_body(payload)?;

    let response = proxy.generate_answer(&request).await?;

    log::info!(
        "answer generated with {} related questions in {}ms",
        response.related_questions.len(),
        start.elapsed().as_millis()
    );
    Ok(Json(response))
}

pub async fn search_and_answer_handler(
    State(proxy): State<Arc<SearchProxy>>,
    payload: Result<Json<SearchAndAnswerRequest>, JsonRejection>,
) -> Result<Json<SearchAndAnswerResponse>, ApiError> {
    let request = parse_body(payload)?;

    let (search, answer) = proxy.search_and_answer(request.query.as_deref()).await?;

    Ok(Json(SearchAndAnswerResponse { search, answer }))
}
