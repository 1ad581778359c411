use std::time::Instant;

use axum::{extract::State, Json};

use crate::{
    types::{AppError, AskRequest, AskResponse, ErrorResponse, Question, Result},
    AppState,
};

/// Answer a medical question from the indexed corpus.
///
/// Blank questions are rejected before any embedding, vector index or
/// language model call is made.
#[utoipa::path(
    post,
    path = "/api/ask",
    request_body = AskRequest,
    responses(
        (status = 200, description = "Answer generated", body = AskResponse),
        (status = 400, description = "Question is empty", body = ErrorResponse),
        (status = 500, description = "Retrieval or generation failed", body = ErrorResponse)
    ),
    tag = "ask"
)]
pub async fn ask(
    State(state): State<AppState>,
    Json(payload): Json<AskRequest>,
) -> Result<Json<AskResponse>> {
    let question = Question::parse(payload.question)?;
    let start = Instant::now();

    let answer = state
        .pipeline
        .answer_question(&question)
        .await
        .map_err(|e| {
            tracing::error!(
                error = %e,
                duration_ms = start.elapsed().as_millis() as u64,
                "Question answering failed"
            );
            AppError::from(e)
        })?;

    tracing::info!(
        question_chars = question.as_str().len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Question answered"
    );

    Ok(Json(AskResponse {
        answer: answer.into_inner(),
    }))
}
