use crate::{
    domain::{CommentRepository, LikeRepository, PostRepository, UserRepository},
    errors::RepoError,
    models::{sort_newest_first, timestamp_key, Comment, Like, Post, User},
};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_dynamodb::{
    error::{ProvideErrorMetadata, SdkError},
    operation::transact_write_items::TransactWriteItemsError,
    types::{
        AttributeValue, CancellationReason, ConditionCheck, Delete, DeleteRequest, Put, ReturnValue, Select,
        TransactWriteItem, WriteRequest,
    },
    Client as DynamoDbClient,
};
use chrono::{DateTime, Utc};
use std::{collections::HashMap, time::Duration};
use tracing::info;
use uuid::Uuid;

type Item = HashMap<String, AttributeValue>;

// BatchWriteItem accepts at most 25 requests per call.
const BATCH_WRITE_LIMIT: usize = 25;
const MAX_UNPROCESSED_RETRIES: u32 = 5;
const MAX_TOGGLE_ATTEMPTS: usize = 4;

/// Physical table names, all sharing one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub users: String,
    pub posts: String,
    pub likes: String,
    pub comments: String,
}

impl TableNames {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            users: format!("{}users", prefix),
            posts: format!("{}posts", prefix),
            likes: format!("{}likes", prefix),
            comments: format!("{}comments", prefix),
        }
    }
}

// --- Users ---

#[derive(Debug, Clone)]
pub struct DynamoDbUserRepository {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoDbUserRepository {
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        info!(%table_name, "Initializing DynamoDbUserRepository");
        Self { client, table_name }
    }

    async fn release_username(&self, username: &str) {
        let result = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key("user_id", s(username_key(username)))
            .send()
            .await;
        if let Err(e) = result {
            tracing::warn!(%username, error = %e, "DynamoDB: Failed to release username reservation");
        }
    }
}

#[async_trait]
impl UserRepository for DynamoDbUserRepository {
    /// Reserves the username with a conditional put, then writes the user item.
    async fn create(&self, user: &User) -> Result<(), RepoError> {
        let reservation = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .item("user_id", s(username_key(&user.username)))
            .item("owner_id", s(user.id.to_string()))
            .condition_expression("attribute_not_exists(user_id)")
            .send()
            .await;
        match reservation {
            Ok(_) => {}
            Err(e) if is_conditional_check_failed(&e) => {
                return Err(RepoError::Conflict(format!("Username '{}' is already taken", user.username)));
            }
            Err(e) => {
                return Err(RepoError::BackendError(anyhow::Error::new(e).context(format!(
                    "DynamoDB (table: {}): Failed to reserve username '{}'",
                    self.table_name, user.username
                ))));
            }
        }

        let written = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(user_to_item(user)))
            .condition_expression("attribute_not_exists(user_id)")
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to put user (id: {})", self.table_name, user.id));

        if let Err(e) = written {
            self.release_username(&user.username).await;
            return Err(RepoError::BackendError(e));
        }
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let resp = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("user_id", s(id.to_string()))
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to get user (id: {})", self.table_name, id))?;

        match resp.item {
            Some(item) => item_to_user(&item).map(Some).ok_or_else(|| {
                tracing::error!(user_id = %id, table_name = %self.table_name, "DynamoDB: Retrieved item but failed to parse into User");
                RepoError::DataCorruption(format!("user {} in table '{}'", id, self.table_name))
            }),
            None => Ok(None),
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let resp = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("user_id", s(username_key(username)))
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to look up username '{}'", self.table_name, username))?;

        let Some(item) = resp.item else {
            return Ok(None);
        };
        let owner_id = get_uuid(&item, "owner_id").ok_or_else(|| {
            RepoError::DataCorruption(format!("username reservation '{}' has no owner", username))
        })?;
        self.get_by_id(owner_id).await
    }

    async fn set_avatar(&self, id: Uuid, avatar_url: &str) -> Result<User, RepoError> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("user_id", s(id.to_string()))
            .update_expression("SET avatar_url = :avatar")
            .condition_expression("attribute_exists(user_id)")
            .expression_attribute_values(":avatar", s(avatar_url))
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) if is_conditional_check_failed(&e) => return Err(RepoError::NotFound("User".to_string())),
            Err(e) => {
                return Err(RepoError::BackendError(anyhow::Error::new(e).context(format!(
                    "DynamoDB (table: {}): Failed to update avatar (id: {})",
                    self.table_name, id
                ))));
            }
        };

        resp.attributes
            .as_ref()
            .and_then(item_to_user)
            .ok_or_else(|| RepoError::DataCorruption(format!("updated user {} could not be parsed", id)))
    }
}

// --- Posts ---

#[derive(Debug, Clone)]
pub struct DynamoDbPostRepository {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoDbPostRepository {
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        info!(%table_name, "Initializing DynamoDbPostRepository");
        Self { client, table_name }
    }
}

#[async_trait]
impl PostRepository for DynamoDbPostRepository {
    async fn create(&self, post: &Post) -> Result<(), RepoError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(post_to_item(post)))
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to put post (id: {})", self.table_name, post.id))?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let resp = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("post_id", s(id.to_string()))
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to get post (id: {})", self.table_name, id))?;

        match resp.item {
            Some(item) => item_to_post(&item).map(Some).ok_or_else(|| {
                tracing::error!(post_id = %id, table_name = %self.table_name, "DynamoDB: Retrieved item but failed to parse into Post");
                RepoError::DataCorruption(format!("post {} in table '{}'", id, self.table_name))
            }),
            None => Ok(None),
        }
    }

    /// Scans the whole table, following LastEvaluatedKey, then orders newest first.
    async fn list_all(&self) -> Result<Vec<Post>, RepoError> {
        tracing::debug!("DynamoDB: Scanning table '{}' for all posts", self.table_name);
        let mut posts: Vec<Post> = Vec::new();
        let mut last_evaluated_key: Option<Item> = None;

        loop {
            let resp = self
                .client
                .scan()
                .table_name(&self.table_name)
                .set_exclusive_start_key(last_evaluated_key.take())
                .send()
                .await
                .context(format!("DynamoDB: Failed to scan table '{}'", self.table_name))?;

            for item in resp.items.unwrap_or_default() {
                match item_to_post(&item) {
                    Some(post) => posts.push(post),
                    None => {
                        let item_id = item.get("post_id").and_then(|v| v.as_s().ok());
                        tracing::error!(item.id = ?item_id, table_name = %self.table_name, "DynamoDB: Failed to parse item from scan into Post");
                        return Err(RepoError::DataCorruption(format!(
                            "item {:?} during scan of table '{}'",
                            item_id, self.table_name
                        )));
                    }
                }
            }

            last_evaluated_key = resp.last_evaluated_key;
            if last_evaluated_key.is_none() {
                break;
            }
            tracing::debug!("DynamoDB Scan (table: {}): Continuing with LastEvaluatedKey...", self.table_name);
        }

        sort_newest_first(&mut posts);
        tracing::debug!("DynamoDB (table: {}): Listed {} posts", self.table_name, posts.len());
        Ok(posts)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("post_id", s(id.to_string()))
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to delete post (id: {})", self.table_name, id))?;
        Ok(())
    }
}

// --- Likes ---

#[derive(Debug, Clone)]
pub struct DynamoDbLikeRepository {
    client: DynamoDbClient,
    table_name: String,
    posts_table: String,
}

impl DynamoDbLikeRepository {
    pub fn new(client: DynamoDbClient, table_name: String, posts_table: String) -> Self {
        info!(%table_name, %posts_table, "Initializing DynamoDbLikeRepository");
        Self { client, table_name, posts_table }
    }

    fn like_key(&self, post_id: Uuid, user_id: Uuid) -> Item {
        HashMap::from([
            ("post_id".to_string(), s(post_id.to_string())),
            ("user_id".to_string(), s(user_id.to_string())),
        ])
    }
}

/// The two conditional writes a like toggle is made of.
#[async_trait]
trait LikeWrites: Send + Sync {
    /// Deletes the like only if it exists.
    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> Result<GuardedWrite, RepoError>;
    /// Inserts the like only if it does not exist.
    async fn add_like(&self, post_id: Uuid, user_id: Uuid) -> Result<GuardedWrite, RepoError>;
}

#[async_trait]
impl LikeWrites for DynamoDbLikeRepository {
    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> Result<GuardedWrite, RepoError> {
        let delete = Delete::builder()
            .table_name(&self.table_name)
            .set_key(Some(self.like_key(post_id, user_id)))
            .condition_expression("attribute_exists(post_id)")
            .build()
            .context("Failed to build like Delete")?;
        let write = TransactWriteItem::builder().delete(delete).build();
        Ok(write_if_post_exists(&self.client, &self.posts_table, post_id, write).await?)
    }

    async fn add_like(&self, post_id: Uuid, user_id: Uuid) -> Result<GuardedWrite, RepoError> {
        let put = Put::builder()
            .table_name(&self.table_name)
            .set_item(Some(self.like_key(post_id, user_id)))
            .condition_expression("attribute_not_exists(post_id)")
            .build()
            .context("Failed to build like Put")?;
        let write = TransactWriteItem::builder().put(put).build();
        Ok(write_if_post_exists(&self.client, &self.posts_table, post_id, write).await?)
    }
}

/// Delete-if-present, otherwise put-if-absent. A concurrent toggle that wins
/// in between makes the next attempt start over.
async fn toggle_membership<W>(writes: &W, post_id: Uuid, user_id: Uuid) -> Result<bool, RepoError>
where
    W: LikeWrites + ?Sized,
{
    for attempt in 1..=MAX_TOGGLE_ATTEMPTS {
        match writes.remove_like(post_id, user_id).await? {
            GuardedWrite::Applied => return Ok(false),
            GuardedWrite::PostMissing => return Err(RepoError::NotFound("Post".to_string())),
            GuardedWrite::ConditionFailed => {}
        }
        match writes.add_like(post_id, user_id).await? {
            GuardedWrite::Applied => return Ok(true),
            GuardedWrite::PostMissing => return Err(RepoError::NotFound("Post".to_string())),
            GuardedWrite::ConditionFailed => {
                tracing::debug!(%post_id, %user_id, attempt, "DynamoDB: Like toggle raced, retrying");
            }
        }
    }

    Err(RepoError::Conflict("Like was toggled concurrently, try again".to_string()))
}

#[async_trait]
impl LikeRepository for DynamoDbLikeRepository {
    async fn toggle(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, RepoError> {
        toggle_membership(self, post_id, user_id).await
    }

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Like>, RepoError> {
        let items = query_partition(&self.client, &self.table_name, post_id, None).await?;
        items
            .iter()
            .map(|item| {
                get_uuid(item, "user_id")
                    .map(|user_id| Like { post_id, user_id })
                    .ok_or_else(|| RepoError::DataCorruption(format!("like of post {} has no user_id", post_id)))
            })
            .collect()
    }

    async fn delete_for_post(&self, post_id: Uuid) -> Result<usize, RepoError> {
        let keys = query_partition(&self.client, &self.table_name, post_id, Some("post_id, user_id")).await?;
        Ok(batch_delete(&self.client, &self.table_name, keys).await?)
    }
}

// --- Comments ---

#[derive(Debug, Clone)]
pub struct DynamoDbCommentRepository {
    client: DynamoDbClient,
    table_name: String,
    posts_table: String,
}

impl DynamoDbCommentRepository {
    pub fn new(client: DynamoDbClient, table_name: String, posts_table: String) -> Self {
        info!(%table_name, %posts_table, "Initializing DynamoDbCommentRepository");
        Self { client, table_name, posts_table }
    }
}

#[async_trait]
impl CommentRepository for DynamoDbCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<(), RepoError> {
        let put = Put::builder()
            .table_name(&self.table_name)
            .set_item(Some(comment_to_item(comment)))
            .build()
            .context("Failed to build comment Put")?;
        let write = TransactWriteItem::builder().put(put).build();

        match write_if_post_exists(&self.client, &self.posts_table, comment.post_id, write).await? {
            GuardedWrite::Applied => Ok(()),
            GuardedWrite::PostMissing => Err(RepoError::NotFound("Post".to_string())),
            GuardedWrite::ConditionFailed => {
                Err(RepoError::Conflict("Comment collided with another write, try again".to_string()))
            }
        }
    }

    /// Range key order (`created_at#id`) is creation order.
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let items = query_partition(&self.client, &self.table_name, post_id, None).await?;
        items
            .iter()
            .map(|item| {
                item_to_comment(item)
                    .ok_or_else(|| RepoError::DataCorruption(format!("comment of post {} could not be parsed", post_id)))
            })
            .collect()
    }

    async fn count_for_post(&self, post_id: Uuid) -> Result<usize, RepoError> {
        let mut total = 0usize;
        let mut last_evaluated_key: Option<Item> = None;
        loop {
            let resp = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("post_id = :pid")
                .expression_attribute_values(":pid", s(post_id.to_string()))
                .select(Select::Count)
                .set_exclusive_start_key(last_evaluated_key.take())
                .send()
                .await
                .context(format!("DynamoDB (table: {}): Failed to count comments of post {}", self.table_name, post_id))?;

            total += usize::try_from(resp.count()).unwrap_or(0);
            last_evaluated_key = resp.last_evaluated_key;
            if last_evaluated_key.is_none() {
                return Ok(total);
            }
        }
    }

    async fn delete_for_post(&self, post_id: Uuid) -> Result<usize, RepoError> {
        let keys = query_partition(&self.client, &self.table_name, post_id, Some("post_id, sort_key")).await?;
        Ok(batch_delete(&self.client, &self.table_name, keys).await?)
    }
}

// --- Shared helpers ---

fn is_conditional_check_failed<E, R>(err: &SdkError<E, R>) -> bool
where
    E: ProvideErrorMetadata,
{
    err.as_service_error().and_then(|e| e.code()) == Some("ConditionalCheckFailedException")
}

/// Result of a write paired with a post existence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GuardedWrite {
    Applied,
    PostMissing,
    /// The write's own condition failed, or another transaction touched the same item.
    ConditionFailed,
}

const CONDITIONAL_CHECK_FAILED: &str = "ConditionalCheckFailed";
const TRANSACTION_CONFLICT: &str = "TransactionConflict";

/// Reads the per-item reasons of a cancelled `[post check, write]` transaction.
/// `None` means the cancellation was not caused by either condition.
fn classify_cancellation(codes: &[Option<&str>]) -> Option<GuardedWrite> {
    match codes {
        [Some(CONDITIONAL_CHECK_FAILED), ..] => Some(GuardedWrite::PostMissing),
        [_, Some(CONDITIONAL_CHECK_FAILED | TRANSACTION_CONFLICT)] => Some(GuardedWrite::ConditionFailed),
        [Some(TRANSACTION_CONFLICT), _] => Some(GuardedWrite::ConditionFailed),
        _ => None,
    }
}

/// Commits `write` together with a check that the post row exists, so a
/// dependent row can never land after its post is gone.
async fn write_if_post_exists(
    client: &DynamoDbClient,
    posts_table: &str,
    post_id: Uuid,
    write: TransactWriteItem,
) -> anyhow::Result<GuardedWrite> {
    let post_check = ConditionCheck::builder()
        .table_name(posts_table)
        .key("post_id", s(post_id.to_string()))
        .condition_expression("attribute_exists(post_id)")
        .build()
        .context("Failed to build post ConditionCheck")?;

    let result = client
        .transact_write_items()
        .transact_items(TransactWriteItem::builder().condition_check(post_check).build())
        .transact_items(write)
        .send()
        .await;

    let err = match result {
        Ok(_) => return Ok(GuardedWrite::Applied),
        Err(err) => err,
    };
    let codes: Vec<Option<&str>> = match err.as_service_error() {
        Some(TransactWriteItemsError::TransactionCanceledException(cancelled)) => {
            cancelled.cancellation_reasons().iter().map(CancellationReason::code).collect()
        }
        _ => Vec::new(),
    };
    match classify_cancellation(&codes) {
        Some(outcome) => Ok(outcome),
        None => Err(anyhow::Error::new(err).context(format!("DynamoDB: Transaction on post {} failed", post_id))),
    }
}

/// Reads every item under one `post_id` partition, following pagination.
async fn query_partition(
    client: &DynamoDbClient,
    table_name: &str,
    post_id: Uuid,
    projection: Option<&str>,
) -> anyhow::Result<Vec<Item>> {
    let mut items = Vec::new();
    let mut last_evaluated_key: Option<Item> = None;
    loop {
        let mut request = client
            .query()
            .table_name(table_name)
            .key_condition_expression("post_id = :pid")
            .expression_attribute_values(":pid", s(post_id.to_string()))
            .set_exclusive_start_key(last_evaluated_key.take());
        if let Some(projection) = projection {
            request = request.projection_expression(projection);
        }

        let resp = request
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to query post {}", table_name, post_id))?;
        items.extend(resp.items.unwrap_or_default());

        last_evaluated_key = resp.last_evaluated_key;
        if last_evaluated_key.is_none() {
            return Ok(items);
        }
    }
}

/// One BatchWriteItem call against a single table. Returns the requests left unprocessed.
#[async_trait]
trait BatchWriter: Send + Sync {
    async fn write_batch(&self, table_name: &str, requests: Vec<WriteRequest>) -> anyhow::Result<Vec<WriteRequest>>;
}

#[async_trait]
impl BatchWriter for DynamoDbClient {
    async fn write_batch(&self, table_name: &str, requests: Vec<WriteRequest>) -> anyhow::Result<Vec<WriteRequest>> {
        let resp = self
            .batch_write_item()
            .request_items(table_name, requests)
            .send()
            .await
            .context(format!("DynamoDB (table: {}): BatchWriteItem failed", table_name))?;

        Ok(resp
            .unprocessed_items
            .and_then(|mut unprocessed| unprocessed.remove(table_name))
            .unwrap_or_default())
    }
}

fn delete_requests(keys: &[Item]) -> anyhow::Result<Vec<WriteRequest>> {
    keys.iter()
        .map(|key| -> anyhow::Result<WriteRequest> {
            let delete = DeleteRequest::builder()
                .set_key(Some(key.clone()))
                .build()
                .context("Failed to build DeleteRequest")?;
            Ok(WriteRequest::builder().delete_request(delete).build())
        })
        .collect()
}

/// Deletes the given primary keys in batches, resubmitting unprocessed requests.
async fn batch_delete<W>(writer: &W, table_name: &str, keys: Vec<Item>) -> anyhow::Result<usize>
where
    W: BatchWriter + ?Sized,
{
    let total = keys.len();
    for chunk in keys.chunks(BATCH_WRITE_LIMIT) {
        let mut requests = delete_requests(chunk)?;

        let mut retries = 0;
        while !requests.is_empty() {
            requests = writer.write_batch(table_name, requests).await?;

            if !requests.is_empty() {
                retries += 1;
                if retries > MAX_UNPROCESSED_RETRIES {
                    anyhow::bail!(
                        "DynamoDB (table: {}): {} deletes still unprocessed after {} retries",
                        table_name,
                        requests.len(),
                        MAX_UNPROCESSED_RETRIES
                    );
                }
                tracing::debug!(table_name, pending = requests.len(), retries, "DynamoDB: Resubmitting unprocessed deletes");
                tokio::time::sleep(Duration::from_millis(25 << retries)).await;
            }
        }
    }
    tracing::debug!(table_name, deleted = total, "DynamoDB: Batch delete complete");
    Ok(total)
}

fn s(value: impl Into<String>) -> AttributeValue {
    AttributeValue::S(value.into())
}

fn username_key(username: &str) -> String {
    format!("username#{}", username.to_ascii_lowercase())
}

fn get_str<'a>(item: &'a Item, key: &str) -> Option<&'a str> {
    item.get(key)?.as_s().ok().map(String::as_str)
}

fn get_uuid(item: &Item, key: &str) -> Option<Uuid> {
    get_str(item, key).and_then(|v| Uuid::parse_str(v).ok())
}

fn get_time(item: &Item, key: &str) -> Option<DateTime<Utc>> {
    get_str(item, key)
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|t| t.with_timezone(&Utc))
}

fn user_to_item(user: &User) -> Item {
    let mut item = HashMap::from([
        ("user_id".to_string(), s(user.id.to_string())),
        ("username".to_string(), s(&user.username)),
        ("password_hash".to_string(), s(&user.password_hash)),
        ("created_at".to_string(), s(timestamp_key(&user.created_at))),
    ]);
    if let Some(avatar_url) = &user.avatar_url {
        item.insert("avatar_url".to_string(), s(avatar_url));
    }
    item
}

fn item_to_user(item: &Item) -> Option<User> {
    Some(User {
        id: get_uuid(item, "user_id")?,
        username: get_str(item, "username")?.to_string(),
        password_hash: get_str(item, "password_hash")?.to_string(),
        avatar_url: get_str(item, "avatar_url").map(str::to_string),
        created_at: get_time(item, "created_at")?,
    })
}

fn post_to_item(post: &Post) -> Item {
    let mut item = HashMap::from([
        ("post_id".to_string(), s(post.id.to_string())),
        ("author_id".to_string(), s(post.author_id.to_string())),
        ("image_url".to_string(), s(&post.image_url)),
        ("image_key".to_string(), s(&post.image_key)),
        ("created_at".to_string(), s(timestamp_key(&post.created_at))),
    ]);
    if let Some(description) = &post.description {
        item.insert("description".to_string(), s(description));
    }
    item
}

fn item_to_post(item: &Item) -> Option<Post> {
    Some(Post {
        id: get_uuid(item, "post_id")?,
        author_id: get_uuid(item, "author_id")?,
        image_url: get_str(item, "image_url")?.to_string(),
        image_key: get_str(item, "image_key")?.to_string(),
        description: get_str(item, "description").map(str::to_string),
        created_at: get_time(item, "created_at")?,
    })
}

fn comment_to_item(comment: &Comment) -> Item {
    let created_at = timestamp_key(&comment.created_at);
    HashMap::from([
        ("post_id".to_string(), s(comment.post_id.to_string())),
        ("sort_key".to_string(), s(format!("{}#{}", created_at, comment.id))),
        ("comment_id".to_string(), s(comment.id.to_string())),
        ("author_id".to_string(), s(comment.author_id.to_string())),
        ("content".to_string(), s(&comment.content)),
        ("created_at".to_string(), s(created_at)),
    ])
}

fn item_to_comment(item: &Item) -> Option<Comment> {
    Some(Comment {
        id: get_uuid(item, "comment_id")?,
        post_id: get_uuid(item, "post_id")?,
        author_id: get_uuid(item, "author_id")?,
        content: get_str(item, "content")?.to_string(),
        created_at: get_time(item, "created_at")?,
    })
}
