use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::storage::StorageBackend;

/// Upload limits for item photos.
#[derive(Clone, Copy, Debug)]
pub struct PhotoPolicy {
    pub max_bytes: usize,
}

impl PhotoPolicy {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

/// A photo attached to a report or edit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhotoUpload {
    pub data: Vec<u8>,
    pub content_type: String,
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

impl PhotoUpload {
    /// Checks size and type, returning the file extension to store under.
    pub fn validate(&self, policy: &PhotoPolicy) -> AppResult<&'static str> {
        if self.data.is_empty() {
            return Err(AppError::InvalidInput("photo is empty".into()));
        }
        if self.data.len() > policy.max_bytes {
            return Err(AppError::InvalidInput(format!(
                "photo exceeds the {} byte limit",
                policy.max_bytes
            )));
        }
        extension_for(&self.content_type.to_lowercase()).ok_or_else(|| {
            AppError::InvalidInput(format!("unsupported photo type '{}'", self.content_type))
        })
    }

    /// `items/<upload id>/<sha256>.<ext>`. Every upload gets its own prefix
    /// so two items never share an object, even for identical bytes.
    pub fn object_key(&self, extension: &str) -> String {
        format!(
            "items/{}/{:x}.{}",
            Uuid::new_v4().simple(),
            Sha256::digest(&self.data),
            extension
        )
    }

    /// Decodes a legacy inline `data:<type>;base64,<payload>` image.
    pub fn from_data_uri(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix("data:")?;
        let (meta, payload) = rest.split_once(',')?;
        let content_type = meta.strip_suffix(";base64")?;
        let data = STANDARD.decode(payload.trim()).ok()?;
        Some(Self {
            data,
            content_type: content_type.to_string(),
        })
    }
}

/// Validates and uploads a photo, returning the reference URL to store.
pub async fn store_photo(
    storage: Option<&dyn StorageBackend>,
    upload: &PhotoUpload,
    policy: &PhotoPolicy,
) -> AppResult<String> {
    let extension = upload.validate(policy)?;
    let storage = storage.ok_or_else(|| {
        AppError::FailedPrecondition("photo uploads are not configured".into())
    })?;
    let key = upload.object_key(extension);
    storage.upload(&key, &upload.data, &upload.content_type).await
}

/// Removes a stored photo if it lives in our bucket. Failures are logged
/// and otherwise ignored; the record change has already happened.
pub async fn discard_photo(storage: Option<&dyn StorageBackend>, image_url: Option<&str>) {
    let (Some(storage), Some(url)) = (storage, image_url) else {
        return;
    };
    let Some(key) = storage.key_for_url(url) else {
        return;
    };
    if let Err(e) = storage.delete(&key).await {
        tracing::warn!("Failed to delete photo: key={}, error={}", key, e);
    }
}
