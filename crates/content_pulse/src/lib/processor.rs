pub mod builder;

use std::{future::Future, path::PathBuf};

use chrono::Utc;
use content_queue::VideoRef;

use crate::{
    llm::tokens::truncate_to_tokens,
    media::{public_id_for, ImageGenerator, MediaHost},
    output::{
        ArtifactSet, ImageArtifact, OutputDir, BRIEF_FILE, IMAGE_FILE_STEM, NEWSLETTER_FILE,
        POST_FILE, SUMMARY_FILE,
    },
    yt::TranscriptSource,
    Copywriter, Summarizer,
};

/// Produces the artifacts for a single video
pub trait ArtifactGenerator {
    fn generate(&self, video: &VideoRef)
        -> impl Future<Output = anyhow::Result<ArtifactSet>> + Send;
}

impl<G: ArtifactGenerator + Send + Sync> ArtifactGenerator for &G {
    async fn generate(&self, video: &VideoRef) -> anyhow::Result<ArtifactSet> {
        (**self).generate(video).await
    }
}

// Transcript to LinkedIn content, one vendor call per stage
#[derive(Debug)]
pub struct ContentPipeline<T, S, C, I, M>
where
    T: TranscriptSource + Send + Sync + 'static,
    S: Summarizer + Send + Sync + 'static,
    C: Copywriter + Send + Sync + 'static,
    I: ImageGenerator + Send + Sync + 'static,
    M: MediaHost + Send + Sync + 'static,
{
    output_dir: PathBuf,
    transcripts: T,
    summarizer: S,
    copywriter: C,
    image_generator: I,
    media_host: M,
}

impl<T, S, C, I, M> ContentPipeline<T, S, C, I, M>
where
    T: TranscriptSource + Send + Sync + 'static,
    S: Summarizer + Send + Sync + 'static,
    C: Copywriter + Send + Sync + 'static,
    I: ImageGenerator + Send + Sync + 'static,
    M: MediaHost + Send + Sync + 'static,
{
    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }

    /// Runs every stage in order. The first failure aborts the run, files
    /// written by earlier stages are left in place.
    #[tracing::instrument(skip(self, video), fields(video_id = %video.video_id))]
    pub async fn run(&self, video: &VideoRef) -> anyhow::Result<ArtifactSet> {
        let out = OutputDir::create(&self.output_dir, &video.video_id).await?;

        tracing::info!(source = T::SOURCE_NAME, "Fetching transcript");
        let transcript = self
            .transcripts
            .fetch_transcript(&video.video_id)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to fetch transcript: {e:?}"))?;
        if transcript.trim().is_empty() {
            anyhow::bail!("Transcript for {} was empty", video.video_id);
        }

        tracing::info!(chars = transcript.len(), "Summarizing transcript");
        let summary = self
            .summarizer
            .summarize(&truncate_to_tokens(&transcript, S::CONTEXT_WINDOW_LIMIT))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to summarize transcript: {e:?}"))?;
        out.write(SUMMARY_FILE, &summary).await?;

        tracing::info!("Creating infographic brief");
        let brief = self
            .summarizer
            .infographic_brief(&summary)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create infographic brief: {e:?}"))?;
        out.write(BRIEF_FILE, &brief).await?;

        tracing::info!("Generating infographic");
        let image = self
            .image_generator
            .generate_image(&brief)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to generate image: {e:?}"))?;
        let image_file = out
            .write(&format!("{IMAGE_FILE_STEM}.{}", image.extension()), &image.bytes)
            .await?;

        let public_id = public_id_for(&video.video_id, Utc::now().timestamp());
        let hosted = self
            .media_host
            .upload(&image, &public_id)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to upload image: {e:?}"))?;

        let copy_input = truncate_to_tokens(&transcript, C::CONTEXT_WINDOW_LIMIT);

        tracing::info!("Drafting LinkedIn post");
        let linkedin_post = self
            .copywriter
            .linkedin_post(&copy_input)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to draft LinkedIn post: {e:?}"))?;
        out.write(POST_FILE, &linkedin_post).await?;

        tracing::info!("Drafting newsletter");
        let newsletter = self
            .copywriter
            .newsletter(&copy_input)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to draft newsletter: {e:?}"))?;
        out.write(NEWSLETTER_FILE, &newsletter).await?;

        let artifacts = ArtifactSet {
            video: video.clone(),
            summary,
            infographic_brief: brief,
            image: ImageArtifact {
                task_id: image.task_id,
                source_url: image.source_url,
                hosted_url: hosted.url,
                public_id: hosted.public_id,
                file: image_file,
            },
            linkedin_post,
            newsletter,
            output_dir: out.path().to_path_buf(),
            generated_at: Utc::now(),
        };
        out.write_result(&artifacts).await?;
        tracing::info!(dir = %out.path().display(), "Pipeline finished");

        Ok(artifacts)
    }
}

impl<T, S, C, I, M> ArtifactGenerator for ContentPipeline<T, S, C, I, M>
where
    T: TranscriptSource + Send + Sync + 'static,
    S: Summarizer + Send + Sync + 'static,
    C: Copywriter + Send + Sync + 'static,
    I: ImageGenerator + Send + Sync + 'static,
    M: MediaHost + Send + Sync + 'static,
{
    async fn generate(&self, video: &VideoRef) -> anyhow::Result<ArtifactSet> {
        self.run(video).await
    }
}
