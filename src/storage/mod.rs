// Object storage for item photos (GCS or Cloudflare R2)

pub mod gcs;
pub mod r2;

pub use gcs::GcsBackend;
pub use r2::R2Backend;

use std::sync::Arc;

use crate::config::Config;
use crate::error::AppResult;

/// Storage backend abstraction shared by GCS and R2.
#[tonic::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Uploads an object and returns its public URL.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<String>;

    async fn delete(&self, key: &str) -> AppResult<()>;

    /// URL prefix under which uploaded objects are served, without a trailing slash.
    fn public_base_url(&self) -> &str;

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url(), key)
    }

    /// Object key for a URL this backend handed out, `None` for foreign URLs.
    fn key_for_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(self.public_base_url())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|key| !key.is_empty())
            .map(|key| key.to_string())
    }
}

pub(crate) fn trim_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

/// GCS when `GCS_BUCKET` is set, otherwise R2 when its credentials are,
/// otherwise no photo storage at all.
pub async fn backend_from_config(config: &Config) -> Option<Arc<dyn StorageBackend>> {
    if let Some(bucket) = &config.gcs_bucket {
        match GcsBackend::new(bucket.clone(), config.image_public_base_url.clone()).await {
            Ok(backend) => {
                tracing::info!("Photo storage: GCS bucket={}", bucket);
                return Some(Arc::new(backend));
            }
            Err(e) => tracing::error!("Failed to create GCS client: {}", e),
        }
    }

    if let Some(r2) = &config.r2 {
        match R2Backend::new(r2, config.image_public_base_url.clone()) {
            Ok(backend) => {
                tracing::info!("Photo storage: R2 bucket={}", r2.bucket);
                return Some(Arc::new(backend));
            }
            Err(e) => tracing::error!("Failed to create R2 client: {}", e),
        }
    }

    tracing::warn!("Photo storage disabled, reports with photos will be rejected");
    None
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::error::AppError;

    /// Records uploads in memory.
    #[derive(Default)]
    pub struct RecordingBackend {
        pub objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
        pub fail_uploads: bool,
    }

    impl RecordingBackend {
        pub fn failing() -> Self {
            Self {
                fail_uploads: true,
                ..Default::default()
            }
        }

        pub fn keys(&self) -> Vec<String> {
            let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
            keys.sort();
            keys
        }
    }

    #[tonic::async_trait]
    impl StorageBackend for RecordingBackend {
        async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<String> {
            if self.fail_uploads {
                return Err(AppError::Storage("bucket unavailable".into()));
            }
            self.objects
                .lock()
                .unwrap()
                .insert(key.to_string(), (data.to_vec(), content_type.to_string()));
            Ok(self.public_url(key))
        }

        async fn delete(&self, key: &str) -> AppResult<()> {
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }

        fn public_base_url(&self) -> &str {
            "https://photos.test/bucket"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingBackend;
    use super::*;

    #[test]
    fn test_key_for_url_only_accepts_own_urls() {
        let backend = RecordingBackend::default();
        assert_eq!(
            backend.key_for_url("https://photos.test/bucket/items/abc.png").as_deref(),
            Some("items/abc.png")
        );
        assert_eq!(backend.key_for_url("https://elsewhere.test/items/abc.png"), None);
        assert_eq!(backend.key_for_url("data:image/png;base64,AAAA"), None);
        assert_eq!(backend.key_for_url("https://photos.test/bucket/"), None);
    }

    #[test]
    fn test_trim_base_url() {
        assert_eq!(trim_base_url("https://cdn.test/".into()), "https://cdn.test");
    }
}
