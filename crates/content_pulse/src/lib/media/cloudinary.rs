use reqwest::{multipart, Client};
use serde::Deserialize;
use sha1::{Digest, Sha1};

use crate::media::{GeneratedImage, HostedImage, MediaHost};

/// Signed uploads to Cloudinary
#[derive(Debug, Clone)]
pub struct CloudinaryClient {
    client: Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    base_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CloudinaryError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Upload response did not contain a url")]
    MissingUrl,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
    public_id: Option<String>,
}

/// `sha1(k1=v1&k2=v2...<secret>)` over the params sorted by key, hex encoded
pub fn signature(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

impl CloudinaryClient {
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            base_url: "https://api.cloudinary.com/v1_1".into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

impl MediaHost for CloudinaryClient {
    type Error = CloudinaryError;

    #[tracing::instrument(skip(self, image), fields(size = image.bytes.len()))]
    async fn upload(
        &self,
        image: &GeneratedImage,
        public_id: &str,
    ) -> Result<HostedImage, Self::Error> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signed = signature(
            &[
                ("public_id", public_id.to_string()),
                ("timestamp", timestamp.clone()),
            ],
            &self.api_secret,
        );

        let file = multipart::Part::bytes(image.bytes.clone())
            .file_name(format!("infographic.{}", image.extension()))
            .mime_str(&image.mime)?;

        let form = multipart::Form::new()
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("public_id", public_id.to_string())
            .text("signature", signed)
            .part("file", file);

        let resp = self
            .client
            .post(format!("{}/{}/image/upload", self.base_url, self.cloud_name))
            .multipart(form)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(CloudinaryError::Api { status, message });
        }

        let uploaded = resp.json::<UploadResponse>().await?;
        let url = uploaded
            .secure_url
            .or(uploaded.url)
            .ok_or(CloudinaryError::MissingUrl)?;
        tracing::info!(%url, "Uploaded image");

        Ok(HostedImage {
            url,
            public_id: Some(uploaded.public_id.unwrap_or_else(|| public_id.to_string())),
        })
    }
}
