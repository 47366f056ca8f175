use crate::{
    domain::{FileStorage, StoredObject},
    errors::StorageError,
};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3::{
    error::{ProvideErrorMetadata, SdkError},
    primitives::ByteStream,
    Client as S3Client,
};

#[derive(Debug, Clone)]
pub struct S3FileStorage {
    client: S3Client,
    bucket_name: String,
}

impl S3FileStorage {
    pub fn new(client: S3Client, bucket_name: String) -> Self {
        tracing::info!(bucket = %bucket_name, "Initializing S3FileStorage");
        Self { client, bucket_name }
    }
}

#[async_trait]
impl FileStorage for S3FileStorage {
    /// Uploads data to S3 using PutObject. Sets Content-Type.
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: Option<String>) -> Result<(), StorageError> {
        let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, %content_type, bytes = data.len(), "S3: Uploading file");

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .context(format!("S3: Failed to upload object with key '{}'", key))
            .map_err(|e| StorageError::UploadFailed(format!("{:#}", e)))?;

        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, "S3: Upload successful");
        Ok(())
    }

    /// Downloads file data and its content type from S3 using GetObject.
    async fn download(&self, key: &str) -> Result<StoredObject, StorageError> {
        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, "S3: Downloading file");

        let output = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|sdk_err| {
                if let SdkError::ServiceError(service_err) = &sdk_err {
                    if service_err.err().is_no_such_key() || service_err.err().code() == Some("NoSuchKey") {
                        tracing::warn!(s3_key = %key, bucket = %self.bucket_name, "S3: NoSuchKey error downloading file");
                        return StorageError::NotFound(key.to_string());
                    }
                }
                tracing::error!(s3_key = %key, bucket = %self.bucket_name, error = %sdk_err, "S3: Error downloading file");
                StorageError::BackendError(
                    anyhow::Error::new(sdk_err).context(format!("S3: Failed to download object with key '{}'", key)),
                )
            })?;

        let content_type = output.content_type().map(|s| s.to_string());
        let data = output
            .body
            .collect()
            .await
            .context(format!("S3: Failed to read body of object '{}'", key))?
            .into_bytes()
            .to_vec();

        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, ?content_type, bytes = data.len(), "S3: Download successful");
        Ok(StoredObject { data, content_type })
    }

    /// Deletes an object from S3 using DeleteObject.
    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, "S3: Deleting object");

        // DeleteObject succeeds even if the object doesn't exist.
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|sdk_err| {
                tracing::error!(s3_key = %key, bucket = %self.bucket_name, error = %sdk_err, "S3: Error deleting object");
                StorageError::BackendError(
                    anyhow::Error::new(sdk_err).context(format!("S3: Failed to delete object with key '{}'", key)),
                )
            })?;

        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, "S3: Delete request successful");
        Ok(())
    }
}
