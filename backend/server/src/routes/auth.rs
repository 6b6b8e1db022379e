use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    auth::{AuthUser, hash_password, issue_token, verify_password},
    database::Database,
    error::AppError,
    models::{Account, Role, User},
    state::AppState,
    utils::{Payload, Validator, non_empty},
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/me", get(me_handler))
        .route("/logout", post(logout_handler))
        .route("/change-password", post(change_password_handler))
        .route("/student-login", post(student_login_handler))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    role: Option<Role>,
    student_id: Option<String>,
    department: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    current_password: String,
    #[serde(default)]
    new_password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentLoginRequest {
    #[serde(default)]
    student_id: String,
    #[serde(default)]
    consultant_id: String,
}

/// `CNS` followed by six digits, not yet taken by another teacher.
async fn generate_consultant_id(database: &Database) -> Result<String, AppError> {
    loop {
        let consultant_id = format!("CNS{}", rand::thread_rng().gen_range(100_000..1_000_000));

        if !database.consultant_id_taken(&consultant_id).await? {
            return Ok(consultant_id);
        }
    }
}

async fn register_handler(
    State(state): State<Arc<AppState>>,
    Payload(request): Payload<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut validator = Validator::default();
    let first_name = validator.name("firstName", "First name", &request.first_name);
    let last_name = validator.name("lastName", "Last name", &request.last_name);
    let email = validator.email(&request.email);
    validator.password(
        "password",
        &request.password,
        "Password must be at least 8 characters",
    );

    let role = request.role.unwrap_or_default();
    validator.check(role != Role::Admin, "role", "Role must be student or teacher");
    validator.finish()?;

    if state.database.account_by_email(&email).await?.is_some() {
        return Err(AppError::BadRequest(
            "User with this email already exists".to_string(),
        ));
    }

    let mut user = User::new(first_name, last_name, email, role);

    match role {
        Role::Student => {
            let Some(student_id) = non_empty(request.student_id) else {
                return Err(AppError::BadRequest(
                    "Student ID is required for student registration".to_string(),
                ));
            };
            user.student_id = Some(student_id);
        }
        Role::Teacher => {
            let Some(department) = non_empty(request.department) else {
                return Err(AppError::BadRequest(
                    "Department is required for teacher registration".to_string(),
                ));
            };
            user.department = Some(department);
            user.consultant_id = Some(generate_consultant_id(&state.database).await?);
        }
        Role::Admin => {}
    }

    let password_hash = hash_password(request.password, state.config.bcrypt_cost).await?;
    let account = Account {
        password_hash,
        user,
    };

    state.database.insert_account(&account).await?;
    info!("Registered {:?} {}", account.user.role, account.user.id);

    let token = issue_token(account.user.id, &state.config)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "User registered successfully",
            "token": token,
            "user": account.user,
        })),
    ))
}

async fn login_handler(
    State(state): State<Arc<AppState>>,
    Payload(request): Payload<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut validator = Validator::default();
    let email = validator.email(&request.email);
    validator.check(!request.password.is_empty(), "password", "Password is required");
    validator.finish()?;

    let Some(mut account) = state.database.account_by_email(&email).await? else {
        return Err(AppError::Unauthorized("Invalid email or password"));
    };

    if !account.user.is_active {
        return Err(AppError::Unauthorized(
            "Account is deactivated. Please contact support.",
        ));
    }

    if !verify_password(request.password, account.password_hash.clone()).await? {
        return Err(AppError::Unauthorized("Invalid email or password"));
    }

    account.user.progress.last_active = Utc::now();
    state.database.save_account(&mut account).await?;

    let token = issue_token(account.user.id, &state.config)?;

    Ok(Json(json!({
        "status": "success",
        "message": "Login successful",
        "token": token,
        "user": account.user,
    })))
}

async fn me_handler(AuthUser(account): AuthUser) -> impl IntoResponse {
    Json(json!({ "status": "success", "user": account.user }))
}

async fn logout_handler(_user: AuthUser) -> impl IntoResponse {
    Json(json!({ "status": "success", "message": "Logout successful" }))
}

async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(mut account): AuthUser,
    Payload(request): Payload<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut validator = Validator::default();
    validator.check(
        !request.current_password.is_empty(),
        "currentPassword",
        "Current password is required",
    );
    validator.password(
        "newPassword",
        &request.new_password,
        "New password must be at least 8 characters",
    );
    validator.finish()?;

    if !verify_password(request.current_password, account.password_hash.clone()).await? {
        return Err(AppError::BadRequest(
            "Current password is incorrect".to_string(),
        ));
    }

    account.password_hash = hash_password(request.new_password, state.config.bcrypt_cost).await?;
    state.database.save_account(&mut account).await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Password changed successfully",
    })))
}

async fn student_login_handler(
    State(state): State<Arc<AppState>>,
    Payload(request): Payload<StudentLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut validator = Validator::default();
    let student_id = validator.required("studentId", &request.student_id, "Student ID is required");
    let consultant_id = validator.required(
        "consultantId",
        &request.consultant_id,
        "Consultant ID is required",
    );
    validator.finish()?;

    let Some(mut student) = state
        .database
        .account_by_student_id(&student_id)
        .await?
        .filter(|account| account.user.role == Role::Student)
    else {
        return Err(AppError::Unauthorized("Invalid Student ID"));
    };

    if state.database.consultant(&consultant_id).await?.is_none() {
        return Err(AppError::Unauthorized("Invalid Consultant ID"));
    }

    if !student.user.is_active {
        return Err(AppError::Unauthorized("Student account is deactivated"));
    }

    student.user.progress.last_active = Utc::now();
    state.database.save_account(&mut student).await?;

    let token = issue_token(student.user.id, &state.config)?;
    let user = &student.user;

    Ok(Json(json!({
        "status": "success",
        "message": "Student login successful",
        "token": token,
        "student": {
            "id": user.id,
            "name": user.full_name(),
            "studentId": user.student_id,
            "grade": user.grade,
            "email": user.email,
        },
    })))
}
