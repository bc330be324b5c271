use std::{fmt::Debug, future::Future};

/// Produces the structured summary and the infographic brief
pub trait Summarizer {
    /// Token budget for the transcript, leaving room for the prompt and output
    const CONTEXT_WINDOW_LIMIT: usize = 128_000 - 18_000;

    type Error: Debug + Send;

    /// Summarizes a transcript into a titled list of key takeaways.
    ///
    /// # Parameters
    /// * `transcript`: Plain transcript text, already truncated to [`Self::CONTEXT_WINDOW_LIMIT`].
    ///
    /// # Returns
    /// * `Ok(String)` with the trimmed summary.
    /// * `Err(Self::Error)` if the request fails or the model returns no text.
    fn summarize(&self, transcript: &str)
        -> impl Future<Output = Result<String, Self::Error>> + Send;

    /// Turns a summary into a layout brief for the image generator.
    ///
    /// # Parameters
    /// * `summary`: The output of [`Summarizer::summarize`].
    ///
    /// # Returns
    /// * `Ok(String)` with the brief.
    /// * `Err(Self::Error)` if the request fails or the model returns no text.
    fn infographic_brief(
        &self,
        summary: &str,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;
}
