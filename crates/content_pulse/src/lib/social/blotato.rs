use std::collections::HashMap;

use reqwest::Client;
use serde_json::{json, Value};

use crate::social::{PostReceipt, PostRequest, SocialPublisher};

/// Blotato posting gateway, LinkedIn only
#[derive(Debug, Clone)]
pub struct BlotatoClient {
    client: Client,
    api_key: String,
    base_url: String,
    default_account: Option<String>,
    accounts: HashMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum BlotatoError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("No Blotato account configured for client '{0}'")]
    NoAccount(String),
}

/// Parses `client=account,client2=account2`, skipping malformed pairs
pub fn parse_accounts(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (client, account) = pair.split_once('=')?;
            let (client, account) = (client.trim(), account.trim());
            (!client.is_empty() && !account.is_empty())
                .then(|| (client.to_string(), account.to_string()))
        })
        .collect()
}

impl BlotatoClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into().trim().to_string(),
            base_url: "https://backend.blotato.com/v2".into(),
            default_account: None,
            accounts: HashMap::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_default_account(mut self, account_id: impl Into<String>) -> Self {
        let account_id = account_id.into().trim().to_string();
        self.default_account = (!account_id.is_empty()).then_some(account_id);
        self
    }

    pub fn with_accounts(mut self, accounts: HashMap<String, String>) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn account_for(&self, client: &str) -> Result<&str, BlotatoError> {
        self.accounts
            .get(client)
            .or(self.default_account.as_ref())
            .map(String::as_str)
            .ok_or_else(|| BlotatoError::NoAccount(client.to_string()))
    }
}

fn build_payload(account_id: &str, post: &PostRequest) -> Value {
    let mut payload = json!({
        "post": {
            "accountId": account_id,
            "content": {
                "text": post.text,
                "mediaUrls": post.media_urls,
                "platform": "linkedin"
            },
            "target": {
                "targetType": "linkedin"
            }
        }
    });

    if let Some(at) = post.scheduled_time {
        payload["scheduledTime"] = json!(at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true));
    }

    payload
}

impl SocialPublisher for BlotatoClient {
    type Error = BlotatoError;

    #[tracing::instrument(skip(self, post), fields(client = %post.client, scheduled = ?post.scheduled_time))]
    async fn publish(&self, post: &PostRequest) -> Result<PostReceipt, Self::Error> {
        let account_id = self.account_for(&post.client)?;
        let payload = build_payload(account_id, post);

        let resp = self
            .client
            .post(format!("{}/posts", self.base_url))
            .header("blotato-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            tracing::error!(status, %message, "Blotato rejected the post");
            return Err(BlotatoError::Api { status, message });
        }

        let raw = resp.json::<Value>().await?;
        let id = ["postSubmissionId", "id"]
            .iter()
            .find_map(|key| raw.get(key).and_then(Value::as_str))
            .map(String::from);
        tracing::info!(?id, "Post submitted");

        Ok(PostReceipt {
            id,
            scheduled_time: post.scheduled_time,
            raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn post(client: &str) -> PostRequest {
        PostRequest {
            text: "Stop shipping slow.".into(),
            media_urls: vec!["https://res.cloudinary.com/demo/a.png".into()],
            client: client.into(),
            scheduled_time: None,
        }
    }

    #[test]
    fn test_parse_accounts() {
        let accounts = parse_accounts(" acme = 123 ,globex=456,broken,=789,empty=");
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts["acme"], "123");
        assert_eq!(accounts["globex"], "456");
    }

    #[test]
    fn test_account_resolution_falls_back_to_default() {
        let client = BlotatoClient::new("key")
            .with_accounts(parse_accounts("acme=123"))
            .with_default_account("999");

        assert_eq!(client.account_for("acme").unwrap(), "123");
        assert_eq!(client.account_for("globex").unwrap(), "999");

        let no_default = BlotatoClient::new("key").with_default_account("  ");
        assert!(matches!(
            no_default.account_for("acme"),
            Err(BlotatoError::NoAccount(c)) if c == "acme"
        ));
    }

    #[test]
    fn test_payload_for_immediate_post() {
        let payload = build_payload("123", &post("acme"));

        assert_eq!(payload["post"]["accountId"], "123");
        assert_eq!(payload["post"]["content"]["platform"], "linkedin");
        assert_eq!(
            payload["post"]["content"]["mediaUrls"][0],
            "https://res.cloudinary.com/demo/a.png"
        );
        assert!(payload.get("scheduledTime").is_none());
    }

    #[test]
    fn test_payload_for_scheduled_post() {
        let mut request = post("acme");
        request.scheduled_time = Some(chrono::Utc.with_ymd_and_hms(2026, 1, 20, 16, 0, 0).unwrap());

        let payload = build_payload("123", &request);
        assert_eq!(payload["scheduledTime"], "2026-01-20T16:00:00Z");
    }
}
