//! Quiz rounds.
//!
//! Players receive challenges without answer keys. Results are not trusted from
//! the client: the submitted answers are replayed through the game reducer with
//! the server's copy of each challenge.
use std::{collections::HashSet, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use bank::{
    AgeGroup, Challenge,
    game::{Accessibility, Action, GameResult, GameState, Phase},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    auth::AuthUser,
    error::AppError,
    models::{ExerciseType, ProgressRecord},
    state::AppState,
    utils::{Payload, QueryParams, non_empty},
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/challenges", get(challenges_handler))
        .route("/results", post(results_handler))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeQuery {
    #[serde(default)]
    age_group: AgeGroup,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    challenge_id: u32,
    choice: Option<usize>,
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsRequest {
    #[serde(default)]
    age_group: AgeGroup,
    player_name: Option<String>,
    #[serde(default)]
    time_spent: u32,
    #[serde(default)]
    accessibility: Accessibility,
    #[serde(default)]
    answers: Vec<SubmittedAnswer>,
}

async fn challenges_handler(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<ChallengeQuery>,
) -> impl IntoResponse {
    let challenges: Vec<Challenge> = state
        .bank
        .shuffled(query.age_group, &mut rand::thread_rng())
        .iter()
        .map(Challenge::without_answer)
        .collect();

    Json(json!({
        "status": "success",
        "ageGroup": query.age_group,
        "label": query.age_group.label(),
        "hasPassages": query.age_group.has_passages(),
        "challenges": challenges,
    }))
}

/// Pairs every answer with the bank's challenge and turns it into a reducer action.
/// A round is only scored when every challenge of the age group is answered.
fn resolve_answers(
    state: &AppState,
    age_group: AgeGroup,
    answers: &[SubmittedAnswer],
) -> Result<(Vec<Challenge>, Vec<Action>), AppError> {
    if answers.is_empty() {
        return Err(AppError::BadRequest("No answers submitted".to_string()));
    }

    let mut seen = HashSet::new();
    let mut challenges = Vec::with_capacity(answers.len());
    let mut actions = Vec::with_capacity(answers.len());

    for answer in answers {
        let id = answer.challenge_id;

        let Some(challenge) = state.bank.find(age_group, id) else {
            return Err(AppError::BadRequest(format!("Unknown challenge {id}")));
        };

        if !seen.insert(id) {
            return Err(AppError::BadRequest(format!("Challenge {id} answered twice")));
        }

        let action = match (&answer.choice, &answer.text) {
            (Some(choice), None) if *choice < challenge.option_count() => Action::Answer(*choice),
            (None, Some(text)) if challenge.is_open_ended() && !text.trim().is_empty() => {
                Action::SubmitCreative(text.clone())
            }
            _ => {
                return Err(AppError::BadRequest(format!(
                    "Invalid answer for challenge {id}"
                )));
            }
        };

        challenges.push(challenge.clone());
        actions.push(action);
    }

    let expected = state.bank.challenges(age_group).len();
    if challenges.len() != expected {
        return Err(AppError::BadRequest(format!("All {expected} challenges must be answered")));
    }

    Ok((challenges, actions))
}

fn replay(
    age_group: AgeGroup,
    accessibility: Accessibility,
    player_name: String,
    challenges: Vec<Challenge>,
    actions: Vec<Action>,
) -> Result<GameResult, AppError> {
    let mut game = GameState::new(age_group, accessibility).reduce(Action::Start {
        player_name,
        challenges,
    });

    if game.phase == Phase::Passages {
        game = game.reduce(Action::BeginQuiz);
    }

    for action in actions {
        game = game.reduce(action).reduce(Action::Next);
    }

    game.result(Utc::now())
        .ok_or_else(|| AppError::BadRequest("Answers do not complete the round".to_string()))
}

async fn results_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(mut account): AuthUser,
    Payload(request): Payload<ResultsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (challenges, actions) = resolve_answers(&state, request.age_group, &request.answers)?;

    let player_name = non_empty(request.player_name).unwrap_or_else(|| account.user.full_name());
    let result = replay(
        request.age_group,
        request.accessibility,
        player_name,
        challenges,
        actions,
    )?;

    let record = ProgressRecord::new(
        account.user.id,
        ExerciseType::Quiz,
        result.percentage as f64,
        request.time_spent,
        Some(result.percentage as f64),
        serde_json::to_value(&result)?,
    );
    state.database.record_progress(&mut account, &record).await?;

    info!(
        "Quiz by {} scored {}% with {} flagged areas",
        account.user.id,
        result.percentage,
        result.disorders.len()
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "result": result,
            "progress": record,
        })),
    ))
}
