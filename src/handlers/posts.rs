use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use super::{discard_upload, AuthorCache, UploadedImage};
use crate::{
    auth::AuthUser,
    errors::AppError,
    models::{Post, PostView},
    AppState,
};

/// GET /posts: every post, newest first, with author, likes and comment count.
pub async fn list_posts(State(state): State<Arc<AppState>>) -> Result<Json<Vec<PostView>>, AppError> {
    let posts = state.posts.list_all().await?;
    let mut authors = AuthorCache::new(&state);
    let mut views = Vec::with_capacity(posts.len());

    for post in posts {
        let author = authors.get(post.author_id).await?;
        let likes = state.likes.list_for_post(post.id).await?;
        let comment_count = state.comments.count_for_post(post.id).await?;
        views.push(PostView::new(post, author, likes, comment_count));
    }

    tracing::debug!("Listing {} posts", views.len());
    Ok(Json(views))
}

/// POST /posts: multipart `image` (required) and `description` (optional).
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let post_id = Uuid::new_v4();
    let mut description: Option<String> = None;
    let mut image: Option<UploadedImage> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        match field_name.as_str() {
            "description" => {
                description = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::InvalidInput(format!("Failed to read description: {}", e)))?,
                )
            }
            "image" => image = Some(UploadedImage::read(field).await?),
            _ => tracing::debug!("Ignoring unknown multipart field: {}", field_name),
        }
    }

    let image = image.ok_or_else(|| AppError::InvalidInput("Image is required".to_string()))?;
    let (image_key, content_type) = image.storage_target("posts", post_id)?;

    state
        .file_storage
        .upload(&image_key, image.data, Some(content_type))
        .await?;

    let post = Post {
        id: post_id,
        author_id: auth.user_id,
        image_url: state.media_url(&image_key),
        image_key,
        description: description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
        created_at: Utc::now(),
    };
    if let Err(e) = state.posts.create(&post).await {
        discard_upload(&state, &post.image_key).await;
        return Err(e.into());
    }

    tracing::info!(post_id = %post.id, author_id = %post.author_id, "Post created");
    Ok((StatusCode::CREATED, Json(post)))
}

/// DELETE /posts/{post_id}: author only. Removes comments, then likes, then the post.
///
/// Likes and comments are only written while their post row exists, so a second
/// sweep after the row is gone catches anything that landed during the cascade.
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let post_id = Uuid::parse_str(&id_str)?;
    tracing::debug!(%post_id, user_id = %auth.user_id, "Delete requested");

    let post = state
        .posts
        .get_by_id(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post".to_string()))?;
    if post.author_id != auth.user_id {
        tracing::warn!(%post_id, user_id = %auth.user_id, "Refusing to delete another user's post");
        return Err(AppError::Forbidden("Not allowed".to_string()));
    }

    let mut comments_removed = state.comments.delete_for_post(post_id).await?;
    let mut likes_removed = state.likes.delete_for_post(post_id).await?;
    state.posts.delete(post_id).await?;
    comments_removed += state.comments.delete_for_post(post_id).await?;
    likes_removed += state.likes.delete_for_post(post_id).await?;

    // The row is gone; a stray image object is only wasted space.
    discard_upload(&state, &post.image_key).await;

    tracing::info!(%post_id, comments_removed, likes_removed, "Post deleted");
    Ok(Json(json!({ "success": true })))
}
