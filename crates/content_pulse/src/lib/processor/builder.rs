use std::path::PathBuf;

use crate::{
    media::{ImageGenerator, MediaHost},
    yt::TranscriptSource,
    ContentPipeline, Copywriter, Summarizer,
};

pub struct ContentPipelineBuilder<T = (), S = (), C = (), I = (), M = ()> {
    output_dir: PathBuf,
    transcripts: T,
    summarizer: S,
    copywriter: C,
    image_generator: I,
    media_host: M,
}

impl ContentPipelineBuilder {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            transcripts: (),
            summarizer: (),
            copywriter: (),
            image_generator: (),
            media_host: (),
        }
    }
}

impl<T, S, C, I, M> ContentPipelineBuilder<T, S, C, I, M> {
    pub fn transcripts<T2: TranscriptSource + Send + Sync + 'static>(
        self,
        transcripts: T2,
    ) -> ContentPipelineBuilder<T2, S, C, I, M> {
        ContentPipelineBuilder {
            output_dir: self.output_dir,
            transcripts,
            summarizer: self.summarizer,
            copywriter: self.copywriter,
            image_generator: self.image_generator,
            media_host: self.media_host,
        }
    }

    pub fn summarizer<S2: Summarizer + Send + Sync + 'static>(
        self,
        summarizer: S2,
    ) -> ContentPipelineBuilder<T, S2, C, I, M> {
        ContentPipelineBuilder {
            output_dir: self.output_dir,
            transcripts: self.transcripts,
            summarizer,
            copywriter: self.copywriter,
            image_generator: self.image_generator,
            media_host: self.media_host,
        }
    }

    pub fn copywriter<C2: Copywriter + Send + Sync + 'static>(
        self,
        copywriter: C2,
    ) -> ContentPipelineBuilder<T, S, C2, I, M> {
        ContentPipelineBuilder {
            output_dir: self.output_dir,
            transcripts: self.transcripts,
            summarizer: self.summarizer,
            copywriter,
            image_generator: self.image_generator,
            media_host: self.media_host,
        }
    }

    pub fn image_generator<I2: ImageGenerator + Send + Sync + 'static>(
        self,
        image_generator: I2,
    ) -> ContentPipelineBuilder<T, S, C, I2, M> {
        ContentPipelineBuilder {
            output_dir: self.output_dir,
            transcripts: self.transcripts,
            summarizer: self.summarizer,
            copywriter: self.copywriter,
            image_generator,
            media_host: self.media_host,
        }
    }

    /// Pass `None::<SomeHost>` to keep the generator's own image url
    pub fn media_host<M2: MediaHost + Send + Sync + 'static>(
        self,
        media_host: M2,
    ) -> ContentPipelineBuilder<T, S, C, I, M2> {
        ContentPipelineBuilder {
            output_dir: self.output_dir,
            transcripts: self.transcripts,
            summarizer: self.summarizer,
            copywriter: self.copywriter,
            image_generator: self.image_generator,
            media_host,
        }
    }

    pub fn output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }
}

impl<T, S, C, I, M> ContentPipelineBuilder<T, S, C, I, M>
where
    T: TranscriptSource + Send + Sync + 'static,
    S: Summarizer + Send + Sync + 'static,
    C: Copywriter + Send + Sync + 'static,
    I: ImageGenerator + Send + Sync + 'static,
    M: MediaHost + Send + Sync + 'static,
{
    pub fn build(self) -> ContentPipeline<T, S, C, I, M> {
        ContentPipeline {
            output_dir: self.output_dir,
            transcripts: self.transcripts,
            summarizer: self.summarizer,
            copywriter: self.copywriter,
            image_generator: self.image_generator,
            media_host: self.media_host,
        }
    }
}
