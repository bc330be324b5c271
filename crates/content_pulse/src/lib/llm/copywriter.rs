use std::{fmt::Debug, future::Future, sync::LazyLock};

use regex::Regex;

static HASHTAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#\w+").unwrap());

/// Drafts the LinkedIn post and newsletter article from a transcript
pub trait Copywriter {
    const CONTEXT_WINDOW_LIMIT: usize = 200_000 - 8_000;

    type Error: Debug + Send;

    /// Drafts a LinkedIn post, without hashtags.
    ///
    /// # Parameters
    /// * `transcript`: Plain transcript text of the video.
    ///
    /// # Returns
    /// * `Ok(String)` with the post text.
    /// * `Err(Self::Error)` if the request fails or the model returns no text.
    fn linkedin_post(
        &self,
        transcript: &str,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;

    /// Drafts a long form newsletter article as plain text.
    fn newsletter(&self, transcript: &str)
        -> impl Future<Output = Result<String, Self::Error>> + Send;
}

/// Removes hashtags the model adds despite being told not to
pub fn strip_hashtags(post: &str) -> String {
    let without = HASHTAG_RE.replace_all(post, "");
    without
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_hashtags() {
        let post = "Big news today.\n\nShip faster with agents #AI #productivity\n#automation";
        assert_eq!(strip_hashtags(post), "Big news today.\n\nShip faster with agents");
    }

    #[test]
    fn test_strip_hashtags_keeps_plain_text() {
        assert_eq!(strip_hashtags("  Nothing to strip  "), "Nothing to strip");
    }
}
