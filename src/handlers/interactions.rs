use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use super::AuthorCache;
use crate::{
    auth::AuthUser,
    errors::AppError,
    models::{AuthorSummary, Comment, CommentView, LikeToggle, NewComment},
    AppState,
};

pub const MAX_COMMENT_CHARS: usize = 2000;

/// POST /posts/{post_id}/like: adds the caller's like, or removes it if present.
pub async fn toggle_like(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id_str): Path<String>,
) -> Result<Json<LikeToggle>, AppError> {
    let post_id = Uuid::parse_str(&id_str)?;
    // A missing post surfaces as RepoError::NotFound from the write itself.
    let liked = state.likes.toggle(post_id, auth.user_id).await?;
    let like_count = state.likes.list_for_post(post_id).await?.len();

    tracing::info!(%post_id, user_id = %auth.user_id, liked, like_count, "Like toggled");
    Ok(Json(LikeToggle { liked, like_count }))
}

/// POST /posts/{post_id}/comments: JSON `{ "content": ... }`.
pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id_str): Path<String>,
    payload: Result<Json<NewComment>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let post_id = Uuid::parse_str(&id_str)?;
    let Json(payload) = payload?;

    let content = payload.content.trim();
    if content.is_empty() {
        return Err(AppError::InvalidInput("Comment content cannot be empty".to_string()));
    }
    if content.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::InvalidInput(format!(
            "Comment content cannot exceed {} characters",
            MAX_COMMENT_CHARS
        )));
    }

    let comment = Comment {
        id: Uuid::new_v4(),
        post_id,
        author_id: auth.user_id,
        content: content.to_string(),
        created_at: Utc::now(),
    };
    state.comments.create(&comment).await?;

    let author = match state.users.get_by_id(auth.user_id).await? {
        Some(user) => AuthorSummary::from(&user),
        None => AuthorSummary::unknown(auth.user_id),
    };

    tracing::info!(%post_id, comment_id = %comment.id, "Comment created");
    Ok((StatusCode::CREATED, Json(CommentView::new(comment, author))))
}

/// GET /posts/{post_id}/comments: oldest first; unknown posts have no comments.
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<Json<Vec<CommentView>>, AppError> {
    let post_id = Uuid::parse_str(&id_str)?;
    let comments = state.comments.list_for_post(post_id).await?;

    let mut authors = AuthorCache::new(&state);
    let mut views = Vec::with_capacity(comments.len());
    for comment in comments {
        let author = authors.get(comment.author_id).await?;
        views.push(CommentView::new(comment, author));
    }
    Ok(Json(views))
}
