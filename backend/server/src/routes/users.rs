use std::{collections::HashMap, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    analytics::build_analytics,
    auth::{AuthUser, Staff, hash_password},
    error::AppError,
    models::{
        Accommodation, Account, AssignedTest, DyslexiaType, LearningProfile, Role, Severity,
        TestStatus, TestType, User,
    },
    state::AppState,
    utils::{PathParam, Payload, QueryParams, Validator, non_empty},
};

const DEFAULT_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 100;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profile", get(get_profile_handler).put(update_profile_handler))
        .route("/learning-profile", put(update_learning_profile_handler))
        .route("/progress-summary", get(progress_summary_handler))
        .route("/account", delete(deactivate_account_handler))
        .route("/students", get(list_students_handler).post(create_student_handler))
        .route(
            "/students/{id}",
            get(get_student_handler)
                .put(update_student_handler)
                .delete(deactivate_student_handler),
        )
        .route("/students/{id}/assign-test", post(assign_test_handler))
        .route("/analytics", get(analytics_handler))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    first_name: Option<String>,
    last_name: Option<String>,
    grade: Option<String>,
    department: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLearningProfileRequest {
    dyslexia_type: Option<DyslexiaType>,
    severity: Option<Severity>,
    accommodations: Option<Vec<Accommodation>>,
}

#[derive(Deserialize)]
pub struct StudentQuery {
    page: Option<usize>,
    limit: Option<usize>,
    search: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    student_id: String,
    password: Option<String>,
    grade: Option<String>,
    dyslexia_type: Option<DyslexiaType>,
    severity: Option<Severity>,
    parent_name: Option<String>,
    parent_phone: Option<String>,
    parent_address: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudentRequest {
    first_name: Option<String>,
    last_name: Option<String>,
    grade: Option<String>,
    dyslexia_type: Option<DyslexiaType>,
    severity: Option<Severity>,
    accommodations: Option<Vec<Accommodation>>,
    parent_name: Option<String>,
    parent_phone: Option<String>,
    parent_address: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTestRequest {
    test_type: TestType,
}

/// A student account by id, active or not.
pub async fn load_student(state: &AppState, id: &Uuid) -> Result<Account, AppError> {
    state
        .database
        .account(id)
        .await?
        .filter(|account| account.user.role == Role::Student)
        .ok_or(AppError::NotFound("Student not found"))
}

async fn active_students(state: &AppState) -> Result<Vec<User>, AppError> {
    Ok(state
        .database
        .accounts()
        .await?
        .into_iter()
        .map(|account| account.user)
        .filter(|user| user.role == Role::Student && user.is_active)
        .collect())
}

async fn get_profile_handler(AuthUser(account): AuthUser) -> impl IntoResponse {
    Json(json!({ "status": "success", "user": account.user }))
}

async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(mut account): AuthUser,
    Payload(request): Payload<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut validator = Validator::default();
    let first_name =
        validator.optional_name("firstName", "First name", request.first_name.as_deref());
    let last_name =
        validator.optional_name("lastName", "Last name", request.last_name.as_deref());
    validator.finish()?;

    let user = &mut account.user;
    if let Some(first_name) = first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = last_name {
        user.last_name = last_name;
    }
    if let Some(grade) = non_empty(request.grade) {
        user.grade = Some(grade);
    }
    if let Some(department) = non_empty(request.department) {
        user.department = Some(department);
    }

    state.database.save_account(&mut account).await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Profile updated successfully",
        "user": account.user,
    })))
}

async fn update_learning_profile_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(mut account): AuthUser,
    Payload(request): Payload<UpdateLearningProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    apply_learning_profile(
        &mut account.user.learning_profile,
        request.dyslexia_type,
        request.severity,
        request.accommodations,
    );

    state.database.save_account(&mut account).await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Learning profile updated successfully",
        "user": account.user,
    })))
}

fn apply_learning_profile(
    profile: &mut LearningProfile,
    dyslexia_type: Option<DyslexiaType>,
    severity: Option<Severity>,
    accommodations: Option<Vec<Accommodation>>,
) {
    if let Some(dyslexia_type) = dyslexia_type {
        profile.dyslexia_type = dyslexia_type;
    }
    if let Some(severity) = severity {
        profile.severity = severity;
    }
    if let Some(accommodations) = accommodations {
        profile.accommodations = accommodations;
    }
}

async fn progress_summary_handler(AuthUser(account): AuthUser) -> impl IntoResponse {
    Json(json!({ "status": "success", "progress": account.user.progress }))
}

async fn deactivate_account_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(mut account): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    account.user.is_active = false;
    state.database.save_account(&mut account).await?;

    info!("Deactivated account {}", account.user.id);

    Ok(Json(json!({
        "status": "success",
        "message": "Account deactivated successfully",
    })))
}

async fn list_students_handler(
    State(state): State<Arc<AppState>>,
    _staff: Staff,
    QueryParams(query): QueryParams<StudentQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let search = non_empty(query.search);

    let mut students: Vec<User> = active_students(&state)
        .await?
        .into_iter()
        .filter(|student| {
            search
                .as_deref()
                .is_none_or(|needle| student.matches_search(needle))
        })
        .collect();
    students.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let total = students.len();
    let students: Vec<User> = students
        .into_iter()
        .skip((page - 1).saturating_mul(limit))
        .take(limit)
        .collect();

    Ok(Json(json!({
        "status": "success",
        "students": students,
        "pagination": {
            "current": page,
            "pages": total.div_ceil(limit),
            "total": total,
        },
    })))
}

async fn create_student_handler(
    State(state): State<Arc<AppState>>,
    Staff(staff): Staff,
    Payload(request): Payload<CreateStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut validator = Validator::default();
    let first_name = validator.name("firstName", "First name", &request.first_name);
    let last_name = validator.name("lastName", "Last name", &request.last_name);
    let email = validator.email(&request.email);
    let student_id = validator.required("studentId", &request.student_id, "Student ID is required");
    if let Some(password) = &request.password {
        validator.password(
            "password",
            password,
            "Password must be at least 8 characters",
        );
    }
    validator.finish()?;

    if state.database.account_by_email(&email).await?.is_some() {
        return Err(AppError::BadRequest("Email already in use".to_string()));
    }
    if state
        .database
        .account_by_student_id(&student_id)
        .await?
        .is_some()
    {
        return Err(AppError::BadRequest("Student ID already in use".to_string()));
    }

    let mut user = User::new(first_name, last_name, email, Role::Student);
    user.student_id = Some(student_id);
    user.grade = non_empty(request.grade);
    user.parent_name = non_empty(request.parent_name);
    user.parent_phone = non_empty(request.parent_phone);
    user.parent_address = non_empty(request.parent_address);
    user.created_by = Some(staff.user.id);
    user.learning_profile = LearningProfile {
        dyslexia_type: request.dyslexia_type.unwrap_or_default(),
        severity: request.severity.unwrap_or_default(),
        accommodations: Vec::new(),
    };

    let password = request
        .password
        .unwrap_or_else(|| state.config.default_student_password.clone());
    let password_hash = hash_password(password, state.config.bcrypt_cost).await?;

    let account = Account {
        password_hash,
        user,
    };
    state.database.insert_account(&account).await?;

    info!("{} created student {}", staff.user.id, account.user.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Student created successfully",
            "student": account.user,
        })),
    ))
}

async fn get_student_handler(
    State(state): State<Arc<AppState>>,
    _staff: Staff,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let student = load_student(&state, &id).await?;

    Ok(Json(json!({ "status": "success", "student": student.user })))
}

async fn update_student_handler(
    State(state): State<Arc<AppState>>,
    _staff: Staff,
    PathParam(id): PathParam<Uuid>,
    Payload(request): Payload<UpdateStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut validator = Validator::default();
    let first_name =
        validator.optional_name("firstName", "First name", request.first_name.as_deref());
    let last_name =
        validator.optional_name("lastName", "Last name", request.last_name.as_deref());
    validator.finish()?;

    let mut student = load_student(&state, &id).await?;
    let user = &mut student.user;

    if let Some(first_name) = first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = last_name {
        user.last_name = last_name;
    }

    // given-but-blank clears these
    if let Some(grade) = request.grade {
        user.grade = non_empty(Some(grade));
    }
    if let Some(parent_name) = request.parent_name {
        user.parent_name = non_empty(Some(parent_name));
    }
    if let Some(parent_phone) = request.parent_phone {
        user.parent_phone = non_empty(Some(parent_phone));
    }
    if let Some(parent_address) = request.parent_address {
        user.parent_address = non_empty(Some(parent_address));
    }

    apply_learning_profile(
        &mut user.learning_profile,
        request.dyslexia_type,
        request.severity,
        request.accommodations,
    );

    state.database.save_account(&mut student).await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Student updated successfully",
        "student": student.user,
    })))
}

async fn assign_test_handler(
    State(state): State<Arc<AppState>>,
    Staff(staff): Staff,
    PathParam(id): PathParam<Uuid>,
    Payload(request): Payload<AssignTestRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut student = load_student(&state, &id).await?;

    student.user.assigned_tests.push(AssignedTest {
        test_type: request.test_type,
        assigned_by: staff.user.id,
        assigned_at: Utc::now(),
        status: TestStatus::Pending,
    });
    state.database.save_account(&mut student).await?;

    Ok(Json(json!({
        "status": "success",
        "message": format!("{} test assigned to student", request.test_type.as_str()),
        "student": student.user,
    })))
}

async fn deactivate_student_handler(
    State(state): State<Arc<AppState>>,
    Staff(staff): Staff,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut student = load_student(&state, &id).await?;

    student.user.is_active = false;
    state.database.save_account(&mut student).await?;

    info!("{} deactivated student {}", staff.user.id, id);

    Ok(Json(json!({
        "status": "success",
        "message": "Student deactivated successfully",
    })))
}

async fn analytics_handler(
    State(state): State<Arc<AppState>>,
    _staff: Staff,
) -> Result<impl IntoResponse, AppError> {
    let students = active_students(&state).await?;

    let mut progress = HashMap::new();
    for student in &students {
        progress.insert(student.id, state.database.progress(&student.id).await?);
    }

    let analytics = build_analytics(students, &progress, Utc::now());

    Ok(Json(json!({ "status": "success", "analytics": analytics })))
}
