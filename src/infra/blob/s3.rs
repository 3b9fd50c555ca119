//! S3-compatible blob store using the AWS SDK.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::error::SdkError;
use tracing::instrument;

use crate::config::StorageSettings;

use super::{BlobError, BlobObject, BlobStore};

pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl std::fmt::Debug for S3BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3BlobStore")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl S3BlobStore {
    /// Builds a client from storage settings. Explicit keys take precedence over
    /// the ambient AWS credential chain.
    pub async fn new(settings: &StorageSettings) -> Result<Self, BlobError> {
        let has_key_id = settings.access_key_id.is_some();
        let has_secret = settings.secret_access_key.is_some();
        if has_key_id ^ has_secret {
            return Err(BlobError::Config(
                "storage requires both access_key_id and secret_access_key when either is set"
                    .to_string(),
            ));
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()));
        if let (Some(key_id), Some(secret)) = (
            settings.access_key_id.clone(),
            settings.secret_access_key.clone(),
        ) {
            let credentials =
                aws_sdk_s3::config::Credentials::new(key_id, secret, None, None, "narnia-config");
            loader = loader.credentials_provider(credentials);
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = settings.endpoint.as_deref() {
            builder = builder.endpoint_url(normalize_endpoint(endpoint));
        }
        if settings.force_path_style {
            builder = builder.force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: settings.bucket.clone(),
        })
    }

    fn map_sdk_error<E>(err: SdkError<E>, key: &str) -> BlobError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        if let SdkError::ServiceError(ref service_err) = err
            && service_err.raw().status().as_u16() == 404
        {
            return BlobError::NotFound(key.to_string());
        }
        BlobError::Backend(Box::new(err))
    }
}

/// Bare `host:port` endpoints get an `https://` scheme.
fn normalize_endpoint(endpoint: &str) -> String {
    let lower = endpoint.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    #[instrument(skip(self), fields(backend = "s3"))]
    async fn get(&self, key: &str) -> Result<BlobObject, BlobError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| Self::map_sdk_error(err, key))?;

        let content_type = output.content_type().map(str::to_string);
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|err| BlobError::Backend(Box::new(err)))?
            .into_bytes();

        Ok(BlobObject {
            bytes,
            content_type,
        })
    }
}
