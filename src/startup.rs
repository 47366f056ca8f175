use crate::{errors::AppError, repositories::TableNames};
use aws_sdk_dynamodb::{
    error::SdkError as DynamoSdkError,
    types::{AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType},
    Client as DynamoDbClient,
};
use aws_sdk_s3::{
    error::SdkError as S3SdkError,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
    Client as S3Client,
};
use backoff::ExponentialBackoff;
use std::time::Duration;

/// Key schema of one table: a string hash key and an optional string range key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    pub hash_key: &'static str,
    pub range_key: Option<&'static str>,
}

pub fn table_specs(tables: &TableNames) -> Vec<TableSpec> {
    vec![
        TableSpec { name: tables.users.clone(), hash_key: "user_id", range_key: None },
        TableSpec { name: tables.posts.clone(), hash_key: "post_id", range_key: None },
        TableSpec { name: tables.likes.clone(), hash_key: "post_id", range_key: Some("user_id") },
        TableSpec { name: tables.comments.clone(), hash_key: "post_id", range_key: Some("sort_key") },
    ]
}

fn key_element(name: &str, key_type: KeyType) -> Result<(AttributeDefinition, KeySchemaElement), AppError> {
    let definition = AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(ScalarAttributeType::S)
        .build()
        .map_err(|e| AppError::InitError(format!("Failed to build attribute definition: {}", e)))?;
    let schema = KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()
        .map_err(|e| AppError::InitError(format!("Failed to build key schema: {}", e)))?;
    Ok((definition, schema))
}

/// Creates the DynamoDB table if it doesn't exist.
async fn create_dynamodb_table_if_not_exists(client: &DynamoDbClient, spec: &TableSpec) -> Result<(), AppError> {
    let (hash_def, hash_schema) = key_element(spec.hash_key, KeyType::Hash)?;
    let mut request = client
        .create_table()
        .table_name(&spec.name)
        .attribute_definitions(hash_def)
        .key_schema(hash_schema)
        .billing_mode(BillingMode::PayPerRequest);
    if let Some(range_key) = spec.range_key {
        let (range_def, range_schema) = key_element(range_key, KeyType::Range)?;
        request = request.attribute_definitions(range_def).key_schema(range_schema);
    }

    match request.send().await {
        Ok(_) => {
            tracing::info!("Startup: Table '{}' created successfully or setup initiated.", spec.name);
            Ok(())
        }
        Err(e) => {
            if let DynamoSdkError::ServiceError(service_err) = &e {
                if service_err.err().is_resource_in_use_exception() {
                    tracing::info!("Startup: Table '{}' already exists, no action needed.", spec.name);
                    return Ok(());
                }
            }
            let context = format!("Startup: Error creating DynamoDB table '{}'", spec.name);
            tracing::warn!("{}: {}", context, e);
            Err(AppError::InitError(format!("{}: {}", context, e)))
        }
    }
}

/// Ensures the S3 bucket exists, creating it with the correct location constraint if needed.
async fn ensure_s3_bucket_exists(client: &S3Client, bucket_name: &str, region_str: &str) -> Result<(), AppError> {
    let mut request = client.create_bucket().bucket(bucket_name);
    if region_str != "us-east-1" {
        request = request.create_bucket_configuration(
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region_str))
                .build(),
        );
    }

    match request.send().await {
        Ok(_) => {
            tracing::info!("Startup: S3 bucket '{}' created.", bucket_name);
            Ok(())
        }
        Err(sdk_err) => {
            if let S3SdkError::ServiceError(service_err) = &sdk_err {
                let err = service_err.err();
                if err.is_bucket_already_owned_by_you() || err.is_bucket_already_exists() {
                    tracing::info!("Startup: S3 bucket '{}' already exists.", bucket_name);
                    return Ok(());
                }
            }
            let context = format!("Startup: Error creating S3 bucket '{}'", bucket_name);
            tracing::warn!("{}: {}", context, sdk_err);
            Err(AppError::InitError(format!("{}: {}", context, sdk_err)))
        }
    }
}

async fn init_resources_once(
    db_client: &DynamoDbClient,
    s3_client: &S3Client,
    tables: &[TableSpec],
    bucket_name: &str,
    region_str: &str,
) -> Result<(), AppError> {
    for spec in tables {
        create_dynamodb_table_if_not_exists(db_client, spec).await?;
    }
    ensure_s3_bucket_exists(s3_client, bucket_name, region_str).await
}

/// Initializes required AWS resources (DynamoDB tables, S3 bucket), retrying with
/// exponential backoff for up to `max_elapsed` while the endpoint comes up.
pub async fn init_resources(
    db_client: &DynamoDbClient,
    s3_client: &S3Client,
    tables: &TableNames,
    bucket_name: &str,
    region_str: &str,
    max_elapsed: Duration,
) -> Result<(), AppError> {
    tracing::info!("Startup: Initializing AWS resources...");
    let specs = table_specs(tables);
    let specs = specs.as_slice();
    let policy = ExponentialBackoff {
        max_elapsed_time: Some(max_elapsed),
        ..ExponentialBackoff::default()
    };

    backoff::future::retry(policy, || async move {
        init_resources_once(db_client, s3_client, specs, bucket_name, region_str)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Startup: AWS resource initialization failed, will retry");
                backoff::Error::transient(e)
            })
    })
    .await?;

    tracing::info!("Startup: AWS resource initialization complete.");
    Ok(())
}
