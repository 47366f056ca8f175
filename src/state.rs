use std::{sync::Arc, time::Duration};

use crate::{
    auth::JwtService,
    aws_clients::AwsClients,
    config::{Config, DataBackend},
    domain::{CommentRepository, FileStorage, LikeRepository, PostRepository, UserRepository},
    errors::AppError,
    memory::{InMemoryDatabase, InMemoryFileStorage},
    repositories::{
        DynamoDbCommentRepository, DynamoDbLikeRepository, DynamoDbPostRepository, DynamoDbUserRepository, TableNames,
    },
    startup,
    storage::S3FileStorage,
};

const RESOURCE_INIT_TIMEOUT: Duration = Duration::from_secs(60);

/// AppState holds shared resources for the web server.
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub likes: Arc<dyn LikeRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub file_storage: Arc<dyn FileStorage>,
    pub jwt: JwtService,
    /// Prefix for public image URLs, without a trailing slash.
    pub media_base_url: String,
}

impl AppState {
    /// Builds the state for the configured backend, creating AWS resources if needed.
    pub async fn from_config(config: &Config) -> Result<Arc<Self>, AppError> {
        let jwt = JwtService::new(config.jwt.clone());
        match config.backend {
            DataBackend::Memory => {
                tracing::warn!("Using in-memory backend; data will not survive a restart");
                Ok(Self::in_memory(jwt, &config.media_base_url))
            }
            DataBackend::DynamoDb => {
                let bucket_name = config
                    .media_bucket_name
                    .clone()
                    .ok_or_else(|| AppError::ConfigError("MEDIA_BUCKET_NAME is required for DynamoDB".to_string()))?;
                let clients = AwsClients::connect(config).await;
                let tables = TableNames::with_prefix(&config.table_prefix);

                startup::init_resources(
                    &clients.dynamodb,
                    &clients.s3,
                    &tables,
                    &bucket_name,
                    &config.aws_region,
                    RESOURCE_INIT_TIMEOUT,
                )
                .await?;

                Ok(Arc::new(Self {
                    users: Arc::new(DynamoDbUserRepository::new(clients.dynamodb.clone(), tables.users)),
                    likes: Arc::new(DynamoDbLikeRepository::new(
                        clients.dynamodb.clone(),
                        tables.likes,
                        tables.posts.clone(),
                    )),
                    comments: Arc::new(DynamoDbCommentRepository::new(
                        clients.dynamodb.clone(),
                        tables.comments,
                        tables.posts.clone(),
                    )),
                    posts: Arc::new(DynamoDbPostRepository::new(clients.dynamodb, tables.posts)),
                    file_storage: Arc::new(S3FileStorage::new(clients.s3, bucket_name)),
                    jwt,
                    media_base_url: config.media_base_url.trim_end_matches('/').to_string(),
                }))
            }
        }
    }

    /// State backed entirely by process memory.
    pub fn in_memory(jwt: JwtService, media_base_url: &str) -> Arc<Self> {
        Self::with_storage(jwt, media_base_url, Arc::new(InMemoryFileStorage::new()))
    }

    /// In-memory repositories with a caller-supplied file storage.
    pub fn with_storage(jwt: JwtService, media_base_url: &str, file_storage: Arc<dyn FileStorage>) -> Arc<Self> {
        let db = Arc::new(InMemoryDatabase::new());
        Arc::new(Self {
            users: db.clone(),
            posts: db.clone(),
            likes: db.clone(),
            comments: db,
            file_storage,
            jwt,
            media_base_url: media_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Public URL under which `GET /images/{key}` serves a stored object.
    pub fn media_url(&self, key: &str) -> String {
        format!("{}/images/{}", self.media_base_url, key)
    }

    /// Inverse of [`AppState::media_url`]. `None` for URLs this server did not hand out.
    pub fn media_key<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.media_base_url.as_str())?
            .strip_prefix("/images/")
            .filter(|key| !key.is_empty())
    }
}
