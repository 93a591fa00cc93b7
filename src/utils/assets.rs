// src/utils/assets.rs

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;

use crate::{config::AssetConfig, error::AppError};

/// Largest accepted profile photo.
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

/// External image host. `upload` returns the public URL of the stored file.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<String, AppError>;
}

/// Forwards the file as multipart (`file`, optional `upload_preset`) to an
/// HTTP upload endpoint and reads the URL from its JSON answer.
pub struct HttpAssetStore {
    client: reqwest::Client,
    config: AssetConfig,
}

impl HttpAssetStore {
    pub fn new(config: AssetConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
}

#[async_trait]
impl AssetStore for HttpAssetStore {
    async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<String, AppError> {
        let part = reqwest::multipart::Part::stream(body)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| AppError::BadRequest(format!("Invalid content type: {}", e)))?;

        let mut form = reqwest::multipart::Form::new().part("file", part);
        if let Some(preset) = &self.config.upload_preset {
            form = form.text("upload_preset", preset.clone());
        }

        let response = self
            .client
            .post(&self.config.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::InternalServerError(format!("Asset host unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::InternalServerError(format!(
                "Asset host answered {}",
                response.status()
            )));
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        parsed
            .secure_url
            .or(parsed.url)
            .ok_or_else(|| AppError::InternalServerError("Asset host returned no URL".to_string()))
    }
}

/// Used when `ASSET_UPLOAD_URL` is not set.
pub struct DisabledAssetStore;

#[async_trait]
impl AssetStore for DisabledAssetStore {
    async fn upload(&self, _: &str, _: &str, _: Bytes) -> Result<String, AppError> {
        Err(AppError::BadRequest("Photo uploads are not configured".to_string()))
    }
}

/// Only image content types are proxied.
pub fn is_image(content_type: &str) -> bool {
    matches!(
        content_type,
        "image/jpeg" | "image/jpg" | "image/png" | "image/webp" | "image/gif"
    )
}
