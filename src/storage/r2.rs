use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::Region;

use crate::config::R2Config;
use crate::error::{AppError, AppResult};

use super::{trim_base_url, StorageBackend};

pub struct R2Backend {
    bucket: Box<Bucket>,
    bucket_name: String,
    public_base_url: String,
}

impl R2Backend {
    /// Without `public_base_url` the account endpoint is used, which only
    /// serves objects when the bucket allows public reads.
    pub fn new(config: &R2Config, public_base_url: Option<String>) -> AppResult<Self> {
        let endpoint = format!("https://{}.r2.cloudflarestorage.com", config.account_id);
        let region = Region::Custom {
            region: "auto".to_string(),
            endpoint: endpoint.clone(),
        };

        let credentials = Credentials::new(
            Some(&config.access_key_id),
            Some(&config.secret_access_key),
            None, // security token
            None, // session token
            None, // profile
        )
        .map_err(|e| AppError::Storage(format!("R2 credentials error: {}", e)))?;

        let bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| AppError::Storage(format!("R2 bucket error: {}", e)))?;

        let public_base_url = trim_base_url(
            public_base_url.unwrap_or_else(|| format!("{}/{}", endpoint, config.bucket)),
        );

        Ok(Self {
            bucket,
            bucket_name: config.bucket.clone(),
            public_base_url,
        })
    }
}

#[tonic::async_trait]
impl StorageBackend for R2Backend {
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<String> {
        self.bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(|e| AppError::Storage(format!("R2 upload failed: {}", e)))?;

        tracing::info!(
            "R2 upload: bucket={}, key={}, size={}",
            self.bucket_name,
            key,
            data.len()
        );
        Ok(self.public_url(key))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.bucket
            .delete_object(key)
            .await
            .map_err(|e| AppError::Storage(format!("R2 delete failed: {}", e)))?;

        tracing::info!("R2 delete: bucket={}, key={}", self.bucket_name, key);
        Ok(())
    }

    fn public_base_url(&self) -> &str {
        &self.public_base_url
    }
}
