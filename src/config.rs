use std::{env, net::SocketAddr, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid environment variable format for {0}: {1}")]
    InvalidVar(String, String),
}

/// Which implementation backs the repositories and file storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataBackend {
    /// DynamoDB tables plus an S3 bucket.
    DynamoDb,
    /// Process-local maps. Nothing survives a restart.
    Memory,
}

impl FromStr for DataBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dynamodb" | "aws" => Ok(DataBackend::DynamoDb),
            "memory" | "in-memory" => Ok(DataBackend::Memory),
            other => Err(format!("unknown backend '{}', expected 'dynamodb' or 'memory'", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
    pub issuer: String,
}

pub const DEFAULT_JWT_SECRET: &str = "change-me-in-production";

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_JWT_SECRET.to_string(),
            expiration_hours: 24,
            issuer: "photo-feed".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub backend: DataBackend,
    // Only required for the DynamoDb backend
    pub media_bucket_name: Option<String>,
    pub table_prefix: String,
    pub aws_region: String,
    // Optional endpoint for LocalStack
    pub localstack_endpoint: Option<String>,
    /// Public prefix used to build image URLs handed to clients.
    pub media_base_url: String,
    pub jwt: JwtConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignores errors, relies on env vars otherwise)
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_address_str = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = SocketAddr::from_str(&bind_address_str)
            .map_err(|e| ConfigError::InvalidVar("BIND_ADDRESS".into(), e.to_string()))?;

        let backend = match lookup("DATA_BACKEND") {
            Some(raw) => raw
                .parse::<DataBackend>()
                .map_err(|e| ConfigError::InvalidVar("DATA_BACKEND".into(), e))?,
            None => DataBackend::DynamoDb,
        };

        let media_bucket_name = lookup("MEDIA_BUCKET_NAME").filter(|s| !s.trim().is_empty());
        if backend == DataBackend::DynamoDb && media_bucket_name.is_none() {
            return Err(ConfigError::MissingVar("MEDIA_BUCKET_NAME".into()));
        }

        let table_prefix = lookup("TABLE_PREFIX").unwrap_or_else(|| "photo_feed_".to_string());

        let aws_region = lookup("AWS_DEFAULT_REGION").unwrap_or_else(|| "ca-central-1".to_string());

        let localstack_endpoint = lookup("AWS_ENDPOINT_URL");

        let media_base_url = lookup("MEDIA_BASE_URL")
            .unwrap_or_else(|| format!("http://{}", bind_address))
            .trim_end_matches('/')
            .to_string();

        let defaults = JwtConfig::default();
        let expiration_hours = match lookup("JWT_EXPIRATION_HOURS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|h| *h > 0)
                .ok_or_else(|| ConfigError::InvalidVar("JWT_EXPIRATION_HOURS".into(), raw.clone()))?,
            None => defaults.expiration_hours,
        };
        let jwt = JwtConfig {
            secret: lookup("JWT_SECRET").unwrap_or(defaults.secret),
            expiration_hours,
            issuer: lookup("JWT_ISSUER").unwrap_or(defaults.issuer),
        };

        Ok(Config {
            bind_address,
            backend,
            media_bucket_name,
            table_prefix,
            aws_region,
            localstack_endpoint,
            media_base_url,
            jwt,
        })
    }
}
