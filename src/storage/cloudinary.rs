use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::Thumbnail;

use super::MediaStore;

/// Eager transformation requested at upload time: a 150x150 thumbnail crop.
const EAGER_THUMB: &str = "c_thumb,g_custom,h_150,w_150";

#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

pub struct CloudinaryStore {
    config: CloudinaryConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct EagerResult {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    url: String,
    eager: Option<Vec<EagerResult>>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ApiErrorMessage {
    message: String,
}

impl CloudinaryStore {
    /// The timeout applies per request; expiry surfaces as the media error of
    /// the failed operation rather than hanging the request.
    pub fn new(config: CloudinaryConfig, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build media client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/{}",
            self.config.cloud_name, action
        )
    }

    /// Request signature: SHA-1 hex over the sorted `key=value` pairs joined
    /// with `&`, with the API secret appended.
    fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
        let mut sorted: Vec<(&str, &str)> = params.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let to_sign: String = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let digest = ring::digest::digest(
            &ring::digest::SHA1_FOR_LEGACY_USE_ONLY,
            format!("{}{}", to_sign, api_secret).as_bytes(),
        );
        hex_encode(digest.as_ref())
    }

    fn timestamp() -> String {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
            .to_string()
    }

    /// Prefer the eager thumbnail URL when the host produced one, falling
    /// back to the full-size asset URL.
    fn pick_url(response: &UploadResponse) -> String {
        response
            .eager
            .as_ref()
            .and_then(|eager| eager.first())
            .and_then(|e| e.url.clone())
            .unwrap_or_else(|| response.url.clone())
    }

    async fn error_message(response: reqwest::Response) -> String {
        let status = response.status();
        match response.json::<ApiErrorBody>().await {
            Ok(body) => body.error.message,
            Err(_) => format!("media host returned status {}", status),
        }
    }
}

#[async_trait::async_trait]
impl MediaStore for CloudinaryStore {
    async fn upload(&self, data: &[u8], content_type: &str) -> AppResult<Thumbnail> {
        let timestamp = Self::timestamp();
        let signature = Self::sign(
            &[("eager", EAGER_THUMB), ("timestamp", &timestamp)],
            &self.config.api_secret,
        );

        let file_part = reqwest::multipart::Part::bytes(data.to_vec())
            .file_name("upload")
            .mime_str(content_type)
            .map_err(|e| AppError::MediaUpload(format!("invalid content type: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("eager", EAGER_THUMB)
            .text("signature", signature);

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::MediaUpload(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::MediaUpload(Self::error_message(response).await));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::MediaUpload(format!("unreadable upload response: {}", e)))?;

        tracing::info!("Media upload: public_id={}", body.public_id);
        Ok(Thumbnail {
            url: Self::pick_url(&body),
            public_id: body.public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> AppResult<()> {
        let timestamp = Self::timestamp();
        let signature = Self::sign(
            &[("public_id", public_id), ("timestamp", &timestamp)],
            &self.config.api_secret,
        );

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&[
                ("public_id", public_id),
                ("api_key", &self.config.api_key),
                ("timestamp", &timestamp),
                ("signature", &signature),
            ])
            .send()
            .await
            .map_err(|e| AppError::MediaDelete(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::MediaDelete(Self::error_message(response).await));
        }

        let body: DestroyResponse = response
            .json()
            .await
            .map_err(|e| AppError::MediaDelete(format!("unreadable destroy response: {}", e)))?;

        // "not found" means the asset is already gone; treat as success.
        match body.result.as_str() {
            "ok" | "not found" => {
                tracing::info!("Media delete: public_id={}, result={}", public_id, body.result);
                Ok(())
            }
            other => Err(AppError::MediaDelete(format!(
                "media host refused delete: {}",
                other
            ))),
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}
