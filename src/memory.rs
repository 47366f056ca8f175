//! Process-local backends, used for `DATA_BACKEND=memory` and in tests.
//! Data is lost on restart.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    domain::{CommentRepository, FileStorage, LikeRepository, PostRepository, StoredObject, UserRepository},
    errors::{RepoError, StorageError},
    models::{sort_newest_first, Comment, Like, Post, User},
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    // lowercased username -> user id
    usernames: HashMap<String, Uuid>,
    posts: HashMap<Uuid, Post>,
    likes: HashMap<Uuid, BTreeSet<Uuid>>,
    // kept in insertion order per post
    comments: HashMap<Uuid, Vec<Comment>>,
}

/// All four tables behind one async RwLock.
#[derive(Default)]
pub struct InMemoryDatabase {
    tables: RwLock<Tables>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

fn require_post(tables: &Tables, post_id: Uuid) -> Result<(), RepoError> {
    if tables.posts.contains_key(&post_id) {
        Ok(())
    } else {
        Err(RepoError::NotFound("Post".to_string()))
    }
}

#[async_trait]
impl UserRepository for InMemoryDatabase {
    async fn create(&self, user: &User) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        let name_key = user.username.to_ascii_lowercase();
        if tables.usernames.contains_key(&name_key) {
            return Err(RepoError::Conflict(format!("Username '{}' is already taken", user.username)));
        }
        tables.usernames.insert(name_key, user.id);
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .usernames
            .get(&username.to_ascii_lowercase())
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn set_avatar(&self, id: Uuid, avatar_url: &str) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| RepoError::NotFound("User".to_string()))?;
        user.avatar_url = Some(avatar_url.to_string());
        Ok(user.clone())
    }
}

#[async_trait]
impl PostRepository for InMemoryDatabase {
    async fn create(&self, post: &Post) -> Result<(), RepoError> {
        self.tables.write().await.posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Post>, RepoError> {
        let mut posts: Vec<Post> = self.tables.read().await.posts.values().cloned().collect();
        sort_newest_first(&mut posts);
        Ok(posts)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.tables.write().await.posts.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl LikeRepository for InMemoryDatabase {
    async fn toggle(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        require_post(&tables, post_id)?;
        let likers = tables.likes.entry(post_id).or_default();
        if likers.remove(&user_id) {
            if likers.is_empty() {
                tables.likes.remove(&post_id);
            }
            Ok(false)
        } else {
            likers.insert(user_id);
            Ok(true)
        }
    }

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Like>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .likes
            .get(&post_id)
            .map(|likers| likers.iter().map(|&user_id| Like { post_id, user_id }).collect())
            .unwrap_or_default())
    }

    async fn delete_for_post(&self, post_id: Uuid) -> Result<usize, RepoError> {
        let mut tables = self.tables.write().await;
        Ok(tables.likes.remove(&post_id).map(|l| l.len()).unwrap_or(0))
    }
}

#[async_trait]
impl CommentRepository for InMemoryDatabase {
    async fn create(&self, comment: &Comment) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        require_post(&tables, comment.post_id)?;
        tables.comments.entry(comment.post_id).or_default().push(comment.clone());
        Ok(())
    }

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        Ok(self.tables.read().await.comments.get(&post_id).cloned().unwrap_or_default())
    }

    async fn count_for_post(&self, post_id: Uuid) -> Result<usize, RepoError> {
        Ok(self.tables.read().await.comments.get(&post_id).map(Vec::len).unwrap_or(0))
    }

    async fn delete_for_post(&self, post_id: Uuid) -> Result<usize, RepoError> {
        let mut tables = self.tables.write().await;
        Ok(tables.comments.remove(&post_id).map(|c| c.len()).unwrap_or(0))
    }
}

/// Object store kept in a HashMap.
#[derive(Default)]
pub struct InMemoryFileStorage {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl InMemoryFileStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileStorage for InMemoryFileStorage {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: Option<String>) -> Result<(), StorageError> {
        tracing::debug!(key = %key, bytes = data.len(), "Memory: storing object");
        self.objects
            .write()
            .await
            .insert(key.to_string(), StoredObject { data, content_type });
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<StoredObject, StorageError> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.objects.write().await.remove(key);
        Ok(())
    }
}
