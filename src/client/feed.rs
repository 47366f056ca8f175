use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use super::api::{ApiClient, ClientError};
use crate::models::{CommentView, LikeRef, LikeToggle, PostView, UserProfile};

pub const LOAD_FAILED_ALERT: &str = "Could not fetch posts.";
pub const LIKE_FAILED_ALERT: &str = "Could not update like.";
pub const DELETE_FAILED_ALERT: &str = "Could not delete post.";
pub const COMMENTS_LOAD_FAILED_ALERT: &str = "Could not load comments.";
pub const COMMENT_FAILED_ALERT: &str = "Could not post comment.";
pub const AVATAR_FAILED_ALERT: &str = "Could not update avatar.";

/// The calls the feed needs from the server.
#[async_trait]
pub trait FeedApi: Send + Sync {
    async fn list_posts(&self) -> Result<Vec<PostView>, ClientError>;
    async fn toggle_like(&self, post_id: Uuid) -> Result<LikeToggle, ClientError>;
    async fn delete_post(&self, post_id: Uuid) -> Result<(), ClientError>;
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentView>, ClientError>;
    async fn create_comment(&self, post_id: Uuid, content: &str) -> Result<CommentView, ClientError>;
    async fn update_avatar(&self, image: Vec<u8>, file_name: &str, content_type: &str) -> Result<UserProfile, ClientError>;
}

#[async_trait]
impl FeedApi for ApiClient {
    async fn list_posts(&self) -> Result<Vec<PostView>, ClientError> {
        ApiClient::list_posts(self).await
    }

    async fn toggle_like(&self, post_id: Uuid) -> Result<LikeToggle, ClientError> {
        ApiClient::toggle_like(self, post_id).await
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<(), ClientError> {
        ApiClient::delete_post(self, post_id).await
    }

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentView>, ClientError> {
        ApiClient::list_comments(self, post_id).await
    }

    async fn create_comment(&self, post_id: Uuid, content: &str) -> Result<CommentView, ClientError> {
        ApiClient::create_comment(self, post_id, content).await
    }

    async fn update_avatar(&self, image: Vec<u8>, file_name: &str, content_type: &str) -> Result<UserProfile, ClientError> {
        ApiClient::update_avatar(self, image, file_name, content_type).await
    }
}

/// Comment section of one post card.
#[derive(Debug, Default)]
struct CommentPanel {
    open: bool,
    comments: Vec<CommentView>,
    // submitted here since the last refresh, so not in the post's server count yet
    added: usize,
}

/// Screen-level copy of the feed.
///
/// Likes are applied locally before the server answers. When the server call
/// fails the whole list is fetched again, which discards the speculative change.
/// Failures are surfaced as a generic alert rather than returned.
pub struct FeedState<A> {
    api: A,
    viewer_id: Option<Uuid>,
    posts: Vec<PostView>,
    panels: HashMap<Uuid, CommentPanel>,
    alert: Option<String>,
}

impl<A: FeedApi> FeedState<A> {
    pub fn new(api: A, viewer_id: Option<Uuid>) -> Self {
        Self { api, viewer_id, posts: Vec::new(), panels: HashMap::new(), alert: None }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn posts(&self) -> &[PostView] {
        &self.posts
    }

    /// Profile view: posts of one author, filtered locally.
    pub fn posts_by(&self, author_id: Uuid) -> Vec<&PostView> {
        self.posts.iter().filter(|p| p.author.id == author_id).collect()
    }

    /// Avatar shown on a profile, taken from the author's newest post.
    pub fn profile_avatar(&self, author_id: Uuid) -> Option<&str> {
        self.posts_by(author_id).first().and_then(|p| p.author.avatar_url.as_deref())
    }

    pub fn is_liked(&self, post_id: Uuid) -> bool {
        match (self.viewer_id, self.find(post_id)) {
            (Some(viewer), Some(post)) => post.is_liked_by(viewer),
            _ => false,
        }
    }

    pub fn like_count(&self, post_id: Uuid) -> usize {
        self.find(post_id).map(|p| p.likes.len()).unwrap_or(0)
    }

    /// Server count plus comments submitted from this screen since the last refresh.
    pub fn comment_count(&self, post_id: Uuid) -> usize {
        let server = self.find(post_id).map(|p| p.count.comments).unwrap_or(0);
        server + self.panels.get(&post_id).map(|p| p.added).unwrap_or(0)
    }

    pub fn comments_open(&self, post_id: Uuid) -> bool {
        self.panels.get(&post_id).is_some_and(|p| p.open)
    }

    pub fn comments(&self, post_id: Uuid) -> &[CommentView] {
        self.panels.get(&post_id).map(|p| p.comments.as_slice()).unwrap_or(&[])
    }

    pub fn can_delete(&self, post_id: Uuid) -> bool {
        matches!((self.viewer_id, self.find(post_id)), (Some(viewer), Some(post)) if post.author.id == viewer)
    }

    /// Takes the pending alert, if any.
    pub fn take_alert(&mut self) -> Option<String> {
        self.alert.take()
    }

    /// Replaces local state with the server's list. Keeps the old list on failure.
    pub async fn refresh(&mut self) {
        match self.api.list_posts().await {
            Ok(posts) => {
                self.posts = posts;
                for panel in self.panels.values_mut() {
                    panel.added = 0;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Feed refresh failed");
                self.alert = Some(LOAD_FAILED_ALERT.to_string());
            }
        }
    }

    /// Optimistic like: flip locally, then ask the server; resync from the server on error.
    pub async fn like(&mut self, post_id: Uuid) {
        let Some(viewer) = self.viewer_id else {
            self.alert = Some(LIKE_FAILED_ALERT.to_string());
            return;
        };
        if let Some(post) = self.posts.iter_mut().find(|p| p.id == post_id) {
            if post.is_liked_by(viewer) {
                post.likes.retain(|l| l.user_id != viewer);
            } else {
                post.likes.push(LikeRef { user_id: viewer });
            }
        }

        if let Err(e) = self.api.toggle_like(post_id).await {
            tracing::warn!(%post_id, error = %e, "Like failed, discarding local change");
            self.alert = Some(LIKE_FAILED_ALERT.to_string());
            self.refresh().await;
        }
    }

    /// Deletes on the server, then reloads the feed.
    pub async fn delete(&mut self, post_id: Uuid) {
        if let Err(e) = self.api.delete_post(post_id).await {
            tracing::warn!(%post_id, error = %e, "Delete failed");
            self.alert = Some(DELETE_FAILED_ALERT.to_string());
            return;
        }
        self.panels.remove(&post_id);
        self.refresh().await;
    }

    /// Opens or closes a post's comments. Comments are fetched when the panel
    /// opens with nothing loaded yet.
    pub async fn toggle_comments(&mut self, post_id: Uuid) {
        let panel = self.panels.entry(post_id).or_default();
        panel.open = !panel.open;
        if !panel.open || !panel.comments.is_empty() {
            return;
        }

        match self.api.list_comments(post_id).await {
            Ok(comments) => self.panels.entry(post_id).or_default().comments = comments,
            Err(e) => {
                tracing::warn!(%post_id, error = %e, "Loading comments failed");
                self.alert = Some(COMMENTS_LOAD_FAILED_ALERT.to_string());
            }
        }
    }

    /// Posts a comment and appends it locally. Blank text is ignored.
    /// Returns whether the comment was stored, so the caller can clear its input.
    pub async fn submit_comment(&mut self, post_id: Uuid, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        match self.api.create_comment(post_id, text).await {
            Ok(comment) => {
                let panel = self.panels.entry(post_id).or_default();
                panel.comments.push(comment);
                panel.added += 1;
                true
            }
            Err(e) => {
                tracing::warn!(%post_id, error = %e, "Comment failed");
                self.alert = Some(COMMENT_FAILED_ALERT.to_string());
                false
            }
        }
    }

    /// Uploads a new avatar, then reloads the feed so every card shows it.
    pub async fn update_avatar(&mut self, image: Vec<u8>, file_name: &str, content_type: &str) -> Option<UserProfile> {
        match self.api.update_avatar(image, file_name, content_type).await {
            Ok(profile) => {
                self.refresh().await;
                Some(profile)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Avatar update failed");
                self.alert = Some(AVATAR_FAILED_ALERT.to_string());
                None
            }
        }
    }

    fn find(&self, post_id: Uuid) -> Option<&PostView> {
        self.posts.iter().find(|p| p.id == post_id)
    }
}
