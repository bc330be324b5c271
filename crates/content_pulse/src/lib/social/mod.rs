pub mod blotato;
pub mod schedule;

use std::{fmt::Debug, future::Future};

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRequest {
    pub text: String,
    pub media_urls: Vec<String>,
    /// Client tag used to pick the account to post from
    pub client: String,
    /// Publish immediately when `None`
    pub scheduled_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostReceipt {
    pub id: Option<String>,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub raw: serde_json::Value,
}

pub trait SocialPublisher {
    type Error: Debug + Send;

    fn publish(
        &self,
        post: &PostRequest,
    ) -> impl Future<Output = Result<PostReceipt, Self::Error>> + Send;
}

/// Publishing is refused when no gateway is configured
impl<P: SocialPublisher + Send + Sync> SocialPublisher for Option<P> {
    type Error = anyhow::Error;

    async fn publish(&self, post: &PostRequest) -> Result<PostReceipt, Self::Error> {
        match self {
            Some(publisher) => publisher
                .publish(post)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to publish post: {e:?}")),
            None => anyhow::bail!("No social publisher configured, set BLOTATO_API_KEY"),
        }
    }
}
