use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use super::{discard_upload, UploadedImage};
use crate::{
    auth::{self, AuthUser},
    errors::{internal_error, AppError, AuthError},
    models::{AuthResponse, Credentials, User, UserProfile},
    AppState,
};

const MIN_PASSWORD_CHARS: usize = 8;

fn validate_username(username: &str) -> Result<(), AppError> {
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err(AppError::InvalidInput("Username must be 3 to 32 characters".to_string()));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
        return Err(AppError::InvalidInput(
            "Username may only contain letters, digits, '_' and '.'".to_string(),
        ));
    }
    Ok(())
}

fn issue_response(state: &AppState, user: &User) -> Result<AuthResponse, AppError> {
    Ok(AuthResponse {
        token: state.jwt.issue(user.id)?,
        user: UserProfile::from(user),
    })
}

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(credentials) = payload?;
    let username = credentials.username.trim().to_string();
    validate_username(&username)?;
    if credentials.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::InvalidInput(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_CHARS
        )));
    }

    // Argon2 is CPU-bound; keep it off the async workers.
    let password = credentials.password;
    let password_hash = tokio::task::spawn_blocking(move || auth::hash_password(&password))
        .await
        .map_err(|e| internal_error!(e))??;

    let user = User {
        id: Uuid::new_v4(),
        username,
        password_hash,
        avatar_url: None,
        created_at: Utc::now(),
    };
    state.users.create(&user).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");
    Ok((StatusCode::CREATED, Json(issue_response(&state, &user)?)))
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(credentials) = payload?;
    let user = state
        .users
        .get_by_username(credentials.username.trim())
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let hash = user.password_hash.clone();
    let password = credentials.password;
    let valid = tokio::task::spawn_blocking(move || auth::verify_password(&password, &hash))
        .await
        .map_err(|e| internal_error!(e))??;
    if !valid {
        tracing::debug!(username = %user.username, "Login rejected");
        return Err(AuthError::InvalidCredentials.into());
    }

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(issue_response(&state, &user)?))
}

/// GET /users/me
pub async fn me(State(state): State<Arc<AppState>>, auth: AuthUser) -> Result<Json<UserProfile>, AppError> {
    let user = state
        .users
        .get_by_id(auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;
    Ok(Json(UserProfile::from(&user)))
}

/// PUT /users/avatar: multipart `avatar` file.
pub async fn update_avatar(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<UserProfile>, AppError> {
    let mut avatar: Option<UploadedImage> = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("avatar") {
            avatar = Some(UploadedImage::read(field).await?);
        } else {
            tracing::debug!("Ignoring unknown multipart field: {:?}", field.name());
        }
    }

    let avatar = avatar.ok_or_else(|| AppError::MissingFormField("avatar".to_string()))?;
    let prefix = format!("avatars/{}", auth.user_id);
    let (key, content_type) = avatar.storage_target(&prefix, Uuid::new_v4())?;

    let previous = state.users.get_by_id(auth.user_id).await?.and_then(|user| user.avatar_url);

    state.file_storage.upload(&key, avatar.data, Some(content_type)).await?;
    let user = match state.users.set_avatar(auth.user_id, &state.media_url(&key)).await {
        Ok(user) => user,
        Err(e) => {
            discard_upload(&state, &key).await;
            return Err(e.into());
        }
    };

    if let Some(old_key) = previous.as_deref().and_then(|url| state.media_key(url)) {
        discard_upload(&state, old_key).await;
    }

    tracing::info!(user_id = %user.id, avatar_key = %key, "Avatar updated");
    Ok(Json(UserProfile::from(&user)))
}
