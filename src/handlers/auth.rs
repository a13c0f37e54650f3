use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{Json, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use model::entities::user;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

use crate::auth::{clear_session, establish_session, hash_password, verify_password, Identity};
use crate::schemas::{ApiError, ApiResponse, AppState};

/// Form payload for registration
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct RegisterForm {
    pub username: Option<String>,
    pub password: Option<String>,
    pub confirmation: Option<String>,
    pub avatar_url: Option<String>,
}

/// Form payload for login
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// The session identity handed back after registration or login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IdentityResponse {
    pub user_id: i32,
    pub username: String,
    pub avatar_url: Option<String>,
}

impl From<&Identity> for IdentityResponse {
    fn from(identity: &Identity) -> Self {
        Self {
            user_id: identity.user_id,
            username: identity.username.clone(),
            avatar_url: identity.avatar_url.clone(),
        }
    }
}

fn missing(code_field: &str) -> ApiError {
    ApiError::message(
        StatusCode::BAD_REQUEST,
        "MISSING_FIELD",
        format!("{} is required", code_field),
    )
}

/// Register a new user and establish a session
#[utoipa::path(
    post,
    path = "/register",
    tag = "auth",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "User created and session established", body = ApiResponse<IdentityResponse>),
        (status = 400, description = "Missing field or mismatched confirmation", body = crate::schemas::ErrorResponse),
        (status = 409, description = "Username already taken", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, jar, form))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<(StatusCode, CookieJar, Json<ApiResponse<IdentityResponse>>), ApiError> {
    let username = form.username.unwrap_or_default();
    let password = form.password.unwrap_or_default();
    let confirmation = form.confirmation.unwrap_or_default();

    // All three absent is reported as one condition; partial absence is
    // reported per field.
    if username.is_empty() && password.is_empty() && confirmation.is_empty() {
        return Err(ApiError::message(
            StatusCode::BAD_REQUEST,
            "MISSING_FIELD",
            "username, password and confirmation are required",
        ));
    }
    if username.is_empty() {
        return Err(missing("username"));
    }
    if password.is_empty() {
        return Err(missing("password"));
    }
    if confirmation.is_empty() {
        return Err(missing("confirmation"));
    }
    if password != confirmation {
        return Err(ApiError::message(
            StatusCode::BAD_REQUEST,
            "PASSWORD_MISMATCH",
            "password and confirmation do not match",
        ));
    }

    // Case-sensitive exact-match collision check; the unique constraint
    // backstops races.
    let taken = user::Entity::find()
        .filter(user::Column::Username.eq(&username))
        .one(&state.db)
        .await
        .map_err(|db_error| {
            error!("Failed to check username '{}': {}", username, db_error);
            ApiError::message(
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "internal server error while registering",
            )
        })?;
    if taken.is_some() {
        warn!("Registration rejected, username '{}' already taken", username);
        return Err(ApiError::message(
            StatusCode::CONFLICT,
            "USERNAME_TAKEN",
            format!("username '{}' is already taken", username),
        ));
    }

    let password_hash = hash_password(&password).map_err(|e| {
        error!("Failed to hash password: {}", e);
        ApiError::message(
            StatusCode::INTERNAL_SERVER_ERROR,
            "HASHING_ERROR",
            "internal server error while registering",
        )
    })?;

    let new_user = user::ActiveModel {
        username: Set(username.clone()),
        password_hash: Set(password_hash),
        avatar_url: Set(form.avatar_url.filter(|url| !url.is_empty())),
        debt: Set(Decimal::ZERO),
        ..Default::default()
    };

    let user_model = match new_user.insert(&state.db).await {
        Ok(user_model) => user_model,
        Err(db_error) => {
            error!("Failed to create user '{}': {}", username, db_error);
            let error = match &db_error {
                DbErr::Exec(exec_err)
                    if exec_err.to_string().to_lowercase().contains("unique") =>
                {
                    ApiError::message(
                        StatusCode::CONFLICT,
                        "USERNAME_TAKEN",
                        format!("username '{}' is already taken", username),
                    )
                }
                _ => ApiError::message(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "internal server error while registering",
                ),
            };
            return Err(error);
        }
    };

    info!(
        "User registered with ID: {}, username: {}",
        user_model.id, user_model.username
    );

    let identity = Identity {
        user_id: user_model.id,
        username: user_model.username,
        avatar_url: user_model.avatar_url,
    };
    let response = ApiResponse {
        data: IdentityResponse::from(&identity),
        message: "User registered successfully".to_string(),
        success: true,
    };
    let jar = establish_session(&state.sessions, jar, identity).await;

    Ok((StatusCode::CREATED, jar, Json(response)))
}

/// Authenticate a user and establish a session
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Session established", body = ApiResponse<IdentityResponse>),
        (status = 400, description = "Missing credentials", body = crate::schemas::ErrorResponse),
        (status = 403, description = "Wrong password", body = crate::schemas::ErrorResponse),
        (status = 404, description = "Unknown username", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, jar, form))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(StatusCode, CookieJar, Json<ApiResponse<IdentityResponse>>), ApiError> {
    let username = form.username.unwrap_or_default();
    let password = form.password.unwrap_or_default();
    if username.is_empty() {
        return Err(missing("username"));
    }
    if password.is_empty() {
        return Err(missing("password"));
    }

    let user_model = user::Entity::find()
        .filter(user::Column::Username.eq(&username))
        .one(&state.db)
        .await
        .map_err(|db_error| {
            error!("Failed to look up user '{}': {}", username, db_error);
            ApiError::message(
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "internal server error while logging in",
            )
        })?
        .ok_or_else(|| {
            warn!("Login rejected, unknown username '{}'", username);
            ApiError::message(
                StatusCode::NOT_FOUND,
                "UNKNOWN_USERNAME",
                format!("no user named '{}'", username),
            )
        })?;

    let verified = verify_password(&password, &user_model.password_hash).map_err(|e| {
        error!("Password verification failed for '{}': {}", username, e);
        ApiError::message(
            StatusCode::INTERNAL_SERVER_ERROR,
            "HASHING_ERROR",
            "internal server error while logging in",
        )
    })?;
    if !verified {
        warn!("Login rejected, wrong password for '{}'", username);
        return Err(ApiError::message(
            StatusCode::FORBIDDEN,
            "WRONG_PASSWORD",
            "wrong password",
        ));
    }

    info!("User {} logged in", user_model.id);

    let identity = Identity {
        user_id: user_model.id,
        username: user_model.username,
        avatar_url: user_model.avatar_url,
    };
    let response = ApiResponse {
        data: IdentityResponse::from(&identity),
        message: "Logged in successfully".to_string(),
        success: true,
    };
    let jar = establish_session(&state.sessions, jar, identity).await;

    Ok((StatusCode::OK, jar, Json(response)))
}

/// Clear the caller's session
#[utoipa::path(
    get,
    path = "/logout",
    tag = "auth",
    responses(
        (status = 303, description = "Session cleared, redirect to login")
    )
)]
#[instrument(skip(state, jar))]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let jar = clear_session(&state.sessions, jar).await;
    (jar, Redirect::to("/login"))
}
