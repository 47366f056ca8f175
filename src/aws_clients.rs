use crate::config::Config;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_s3::Client as S3Client;

/// SDK clients shared by the DynamoDB repositories and S3 storage.
#[derive(Clone, Debug)]
pub struct AwsClients {
    pub dynamodb: DynamoDbClient,
    pub s3: S3Client,
}

impl AwsClients {
    pub async fn connect(config: &Config) -> Self {
        let sdk_config = load_sdk_config(config).await;
        Self {
            dynamodb: DynamoDbClient::new(&sdk_config),
            s3: create_s3_client(&sdk_config, config.localstack_endpoint.is_some()),
        }
    }
}

// Region and optional endpoint come from `Config`; credentials from the
// default provider chain (env vars, profiles, instance metadata).
async fn load_sdk_config(config: &Config) -> SdkConfig {
    tracing::info!(sdk_region = %config.aws_region, "Setting SDK region");

    let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.aws_region.clone()));

    if let Some(endpoint_url) = &config.localstack_endpoint {
        tracing::info!("Using localstack endpoint override: {}", endpoint_url);
        loader = loader.endpoint_url(endpoint_url);
    } else {
        tracing::info!("Using default AWS endpoints and credential resolution.");
    }

    loader.load().await
}

// LocalStack serves buckets by path, not by virtual host.
fn create_s3_client(sdk_config: &SdkConfig, path_style: bool) -> S3Client {
    let s3_config = aws_sdk_s3::config::Builder::from(sdk_config)
        .force_path_style(path_style)
        .build();
    S3Client::from_conf(s3_config)
}
