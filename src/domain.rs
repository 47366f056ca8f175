use crate::errors::{RepoError, StorageError};
use crate::models::{Comment, Like, Post, User};
use async_trait::async_trait;
use uuid::Uuid;

/// Account storage.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static { // Send+Sync+'static required for Arc<dyn>
    /// Persists a new user. Usernames are unique ignoring ASCII case;
    /// a taken name yields `RepoError::Conflict`.
    async fn create(&self, user: &User) -> Result<(), RepoError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError>;

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    /// Replaces the avatar URL and returns the updated user.
    async fn set_avatar(&self, id: Uuid, avatar_url: &str) -> Result<User, RepoError>;
}

/// Post rows. The author of a post never changes once created.
#[async_trait]
pub trait PostRepository: Send + Sync + 'static {
    async fn create(&self, post: &Post) -> Result<(), RepoError>;

    /// Returns Ok(None) if the post is not found.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError>;

    /// Lists every post, newest first. Unbounded.
    async fn list_all(&self) -> Result<Vec<Post>, RepoError>;

    /// Removes the post row only; dependents are removed by their own repositories.
    async fn delete(&self, id: Uuid) -> Result<(), RepoError>;
}

/// Like membership. A (post, user) pair exists at most once.
#[async_trait]
pub trait LikeRepository: Send + Sync + 'static {
    /// Atomically flips membership of `user_id` in the post's likes.
    /// Returns `true` if the user likes the post afterwards.
    /// The post must exist at the moment of the write, else `RepoError::NotFound`.
    async fn toggle(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, RepoError>;

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Like>, RepoError>;

    /// Removes every like of the post, returning how many were removed.
    async fn delete_for_post(&self, post_id: Uuid) -> Result<usize, RepoError>;
}

/// Comments. Append-only apart from removal together with their post.
#[async_trait]
pub trait CommentRepository: Send + Sync + 'static {
    /// Fails with `RepoError::NotFound` unless the post exists at the moment of the write.
    async fn create(&self, comment: &Comment) -> Result<(), RepoError>;

    /// Comments of a post in creation order. Unknown posts have none.
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError>;

    async fn count_for_post(&self, post_id: Uuid) -> Result<usize, RepoError>;

    /// Removes every comment of the post, returning how many were removed.
    async fn delete_for_post(&self, post_id: Uuid) -> Result<usize, RepoError>;
}

/// A stored media object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

/// Trait defining operations for storing and retrieving file data (post images, avatars).
#[async_trait]
pub trait FileStorage: Send + Sync + 'static {
    /// Uploads file data to the storage backend.
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: Option<String>) -> Result<(), StorageError>;

    /// Downloads an object; a missing key yields `StorageError::NotFound`.
    async fn download(&self, key: &str) -> Result<StoredObject, StorageError>;

    /// Deletes an object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}
