use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use canvas::{decode_png, grade_drawing};
use serde::Deserialize;
use serde_json::json;
use tokio::task::spawn_blocking;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{AuthUser, Staff},
    error::AppError,
    models::{ExerciseType, ProgressRecord},
    routes::users::load_student,
    state::AppState,
    utils::{PathParam, Payload, QueryParams, Validator},
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(record_progress_handler).get(list_progress_handler))
        .route("/student/{id}", get(student_progress_handler))
        .route("/drawing", post(drawing_handler))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProgress {
    exercise_type: ExerciseType,
    score: f64,
    #[serde(default)]
    time_spent: u32,
    accuracy: Option<f64>,
    #[serde(default)]
    details: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingQuery {
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    time_spent: u32,
}

fn newest_first(mut records: Vec<ProgressRecord>) -> Vec<ProgressRecord> {
    records.reverse();
    records
}

async fn record_progress_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(mut account): AuthUser,
    Payload(request): Payload<NewProgress>,
) -> Result<impl IntoResponse, AppError> {
    let mut validator = Validator::default();
    validator.percentage("score", request.score);
    if let Some(accuracy) = request.accuracy {
        validator.percentage("accuracy", accuracy);
    }
    validator.finish()?;

    let record = ProgressRecord::new(
        account.user.id,
        request.exercise_type,
        request.score,
        request.time_spent,
        request.accuracy,
        request.details,
    );
    state.database.record_progress(&mut account, &record).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Progress recorded",
            "progress": record,
        })),
    ))
}

async fn list_progress_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(account): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let records = state.database.progress(&account.user.id).await?;

    Ok(Json(json!({
        "status": "success",
        "progress": newest_first(records),
    })))
}

async fn student_progress_handler(
    State(state): State<Arc<AppState>>,
    _staff: Staff,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let student = load_student(&state, &id).await?;
    let records = state.database.progress(&student.user.id).await?;

    Ok(Json(json!({
        "status": "success",
        "student": student.user,
        "progress": newest_first(records),
    })))
}

/// Body is the PNG exported from the drawing canvas.
async fn drawing_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(mut account): AuthUser,
    QueryParams(query): QueryParams<DrawingQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let mut validator = Validator::default();
    let prompt = validator.required("prompt", &query.prompt, "Prompt is required");
    validator.check(!body.is_empty(), "drawing", "Drawing is required");
    validator.finish()?;

    let graded_prompt = prompt.clone();
    let accuracy = spawn_blocking(move || {
        let drawing = decode_png(&body)?;
        grade_drawing(&graded_prompt, drawing)
    })
    .await??;

    let feedback = accuracy.feedback().label();
    let record = ProgressRecord::new(
        account.user.id,
        ExerciseType::Drawing,
        accuracy.score as f64,
        query.time_spent,
        Some((accuracy.coverage * 100.0).round()),
        json!({
            "prompt": prompt,
            "coverage": accuracy.coverage,
            "iou": accuracy.iou,
            "feedback": feedback,
            "referenceInk": accuracy.reference_ink,
            "candidateInk": accuracy.candidate_ink,
        }),
    );
    state.database.record_progress(&mut account, &record).await?;

    info!(
        "Drawing by {} scored {} ({})",
        account.user.id, accuracy.score, feedback
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "score": accuracy.score,
            "coverage": accuracy.coverage,
            "iou": accuracy.iou,
            "feedback": feedback,
            "progress": record,
        })),
    ))
}
