use crate::{
    handlers::{self, images, interactions, posts, users},
    AppState,
};
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Upload cap for images and avatars.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Creates the Axum router and associates routes with handlers.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/posts/{post_id}", delete(posts::delete_post))
        .route("/posts/{post_id}/like", post(interactions::toggle_like))
        .route(
            "/posts/{post_id}/comments",
            get(interactions::list_comments).post(interactions::create_comment),
        )
        .route("/auth/register", post(users::register))
        .route("/auth/login", post(users::login))
        .route("/users/me", get(users::me))
        .route("/users/avatar", put(users::update_avatar))
        .route("/images/{*key}", get(images::get_image))
        // Middleware Layers
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
