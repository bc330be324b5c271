pub mod data_api;
pub mod transcript;

use std::{fmt::Debug, future::Future};

use content_queue::VideoRef;

/// Lists videos of a channel, a playlist or a search query
pub trait VideoLister {
    type Error: Debug + Send;

    /// Lists the latest uploads of a channel.
    ///
    /// # Parameters
    /// * `channel_id`: The `UC...` id of the channel.
    /// * `max_results`: Upper bound on the number of videos returned.
    ///
    /// # Returns
    /// * `Ok(Vec<VideoRef>)` with at most `max_results` videos, empty when the channel has none.
    /// * `Err(Self::Error)` if the channel is unknown or the API refuses the request.
    fn channel_videos(
        &self,
        channel_id: &str,
        max_results: usize,
    ) -> impl Future<Output = Result<Vec<VideoRef>, Self::Error>> + Send;

    /// Same as [`VideoLister::channel_videos`] for a playlist id.
    fn playlist_videos(
        &self,
        playlist_id: &str,
        max_results: usize,
    ) -> impl Future<Output = Result<Vec<VideoRef>, Self::Error>> + Send;

    /// Searches videos matching `query`, newest first. A query without hits
    /// yields an empty list.
    fn search_videos(
        &self,
        query: &str,
        max_results: usize,
    ) -> impl Future<Output = Result<Vec<VideoRef>, Self::Error>> + Send;
}

/// Fetches the plain text transcript of a video
pub trait TranscriptSource {
    const SOURCE_NAME: &'static str;

    type Error: Debug + Send;

    /// Fetches the English transcript of a video.
    ///
    /// # Parameters
    /// * `video_id`: The 11 character YouTube video id.
    ///
    /// # Returns
    /// * `Ok(String)` with whitespace collapsed transcript text, never empty.
    /// * `Err(Self::Error)` if no English captions exist or the source cannot be reached.
    fn fetch_transcript(
        &self,
        video_id: &str,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;
}
