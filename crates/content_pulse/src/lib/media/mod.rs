pub mod cloudinary;
pub mod fetch;
pub mod kie;

use std::{fmt::Debug, future::Future};

use serde::Serialize;

use crate::parser::slugify;

/// Folder the infographics are uploaded to
pub const PUBLIC_ID_PREFIX: &str = "yt_to_linkedin";

#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub task_id: String,
    /// Where the generator published the image, may be a `data:` url
    pub source_url: String,
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl GeneratedImage {
    pub fn extension(&self) -> &'static str {
        match self.mime.split(';').next().unwrap_or_default().trim() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "png",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostedImage {
    pub url: String,
    pub public_id: Option<String>,
}

pub fn public_id_for(video_id: &str, timestamp: i64) -> String {
    format!("{PUBLIC_ID_PREFIX}/{}_{timestamp}", slugify(video_id, 80))
}

/// Whether the url can be fetched by a third party, unlike `data:` urls
pub fn is_remote_url(url: &str) -> bool {
    let url = url.trim();
    url.starts_with("https://") || url.starts_with("http://")
}

/// Turns an infographic brief into an image
pub trait ImageGenerator {
    type Error: Debug + Send;

    /// Renders an infographic from a brief.
    ///
    /// # Parameters
    /// * `brief`: Layout and copy for the image.
    ///
    /// # Returns
    /// * `Ok(GeneratedImage)` with the downloaded bytes and where they came from.
    /// * `Err(Self::Error)` if the task fails, times out or yields no image.
    fn generate_image(
        &self,
        brief: &str,
    ) -> impl Future<Output = Result<GeneratedImage, Self::Error>> + Send;
}

/// Publishes a generated image under a stable url
pub trait MediaHost {
    type Error: Debug + Send;

    /// Uploads an image under `public_id`.
    ///
    /// # Parameters
    /// * `image`: The generated image, uploaded from its bytes.
    /// * `public_id`: Stable name of the asset, see [`public_id_for`].
    ///
    /// # Returns
    /// * `Ok(HostedImage)` with the public url.
    /// * `Err(Self::Error)` if the upload is rejected.
    fn upload(
        &self,
        image: &GeneratedImage,
        public_id: &str,
    ) -> impl Future<Output = Result<HostedImage, Self::Error>> + Send;
}

/// Without a host the generator's own url is used as is
impl<M: MediaHost + Send + Sync> MediaHost for Option<M> {
    type Error = M::Error;

    async fn upload(
        &self,
        image: &GeneratedImage,
        public_id: &str,
    ) -> Result<HostedImage, Self::Error> {
        match self {
            Some(host) => host.upload(image, public_id).await,
            None => {
                tracing::debug!("No media host configured, keeping source url");
                if !is_remote_url(&image.source_url) {
                    tracing::warn!("Image is only available inline and cannot be attached to posts");
                }
                Ok(HostedImage {
                    url: image.source_url.clone(),
                    public_id: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(mime: &str) -> GeneratedImage {
        GeneratedImage {
            task_id: "task-1".into(),
            source_url: "https://tempfile.kie.ai/task-1.png".into(),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
            mime: mime.into(),
        }
    }

    #[test]
    fn test_extension_from_mime() {
        assert_eq!(image("image/png").extension(), "png");
        assert_eq!(image("image/jpeg").extension(), "jpg");
        assert_eq!(image("image/webp; charset=binary").extension(), "webp");
        assert_eq!(image("application/octet-stream").extension(), "png");
    }

    #[test]
    fn test_public_id_layout() {
        assert_eq!(
            public_id_for("snF5eGKoiJI", 1_700_000_000),
            "yt_to_linkedin/snf5egkoiji_1700000000"
        );
    }

    #[tokio::test]
    async fn test_missing_host_keeps_source_url() {
        let host: Option<cloudinary::CloudinaryClient> = None;
        let hosted = host.upload(&image("image/png"), "ignored").await.unwrap();

        assert_eq!(hosted.url, "https://tempfile.kie.ai/task-1.png");
        assert_eq!(hosted.public_id, None);
    }

    #[test]
    fn test_remote_urls() {
        assert!(is_remote_url("https://tempfile.kie.ai/task-1.png"));
        assert!(is_remote_url(" http://localhost:8080/a.png"));
        assert!(!is_remote_url("data:image/png;base64,iVBORw0KGgo="));
        assert!(!is_remote_url("/tmp/infographic.png"));
    }
}
