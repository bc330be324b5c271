use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use content_queue::VideoRef;
use serde::Serialize;
use serde_json::json;

pub const SUMMARY_FILE: &str = "summary.txt";
pub const BRIEF_FILE: &str = "infographic_brief.txt";
pub const POST_FILE: &str = "linkedin_post.txt";
pub const NEWSLETTER_FILE: &str = "newsletter.txt";
pub const IMAGE_FILE_STEM: &str = "infographic";
pub const RESULT_FILE: &str = "result.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageArtifact {
    pub task_id: String,
    pub source_url: String,
    pub hosted_url: String,
    pub public_id: Option<String>,
    pub file: PathBuf,
}

/// Everything produced for one video
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactSet {
    pub video: VideoRef,
    pub summary: String,
    pub infographic_brief: String,
    pub image: ImageArtifact,
    pub linkedin_post: String,
    pub newsletter: String,
    pub output_dir: PathBuf,
    pub generated_at: DateTime<Utc>,
}

impl ArtifactSet {
    /// Document written to `result.json`
    pub fn result_document(&self) -> serde_json::Value {
        json!({
            "input": {
                "youtube_url": self.video.url,
                "video_id": self.video.video_id,
                "title": self.video.title,
            },
            "outputs": {
                "cloudinary_infographic_url": self.image.hosted_url,
                "video_summary": self.summary,
                "infographic_brief": self.infographic_brief,
                "linkedin_post": self.linkedin_post,
                "newsletter_article": self.newsletter,
            },
            "debug": {
                "kie_task_id": self.image.task_id,
                "kie_result_image_url": self.image.source_url,
                "cloudinary_public_id": self.image.public_id,
                "generated_at": self.generated_at,
            }
        })
    }
}

/// Per video output directory, `<root>/<video_id>/`
#[derive(Debug, Clone)]
pub struct OutputDir {
    path: PathBuf,
}

impl OutputDir {
    pub async fn create(root: &Path, video_id: &str) -> anyhow::Result<Self> {
        let path = root.join(video_id);
        tokio::fs::create_dir_all(&path)
            .await
            .with_context(|| format!("Failed to create output directory {}", path.display()))?;

        Ok(OutputDir { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write(&self, name: &str, contents: impl AsRef<[u8]>) -> anyhow::Result<PathBuf> {
        let file = self.path.join(name);
        tokio::fs::write(&file, contents)
            .await
            .with_context(|| format!("Failed to write {}", file.display()))?;
        tracing::debug!(file = %file.display(), "Wrote output");

        Ok(file)
    }

    pub async fn write_result(&self, artifacts: &ArtifactSet) -> anyhow::Result<PathBuf> {
        let document = serde_json::to_string_pretty(&artifacts.result_document())?;
        self.write(RESULT_FILE, document).await
    }
}
