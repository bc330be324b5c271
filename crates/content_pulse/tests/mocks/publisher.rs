use std::sync::{Arc, Mutex};

use content_pulse::social::{PostReceipt, PostRequest, SocialPublisher};

#[derive(Clone)]
pub struct MockPublisher {
    pub calls: Arc<Mutex<Vec<PostRequest>>>,
    pub fail_with: Option<String>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: Some(msg.to_string()),
        }
    }
}

impl SocialPublisher for MockPublisher {
    type Error = anyhow::Error;

    async fn publish(&self, post: &PostRequest) -> Result<PostReceipt, Self::Error> {
        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(post.clone());
            calls.len()
        };
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(PostReceipt {
            id: Some(format!("post-{count}")),
            scheduled_time: post.scheduled_time,
            raw: serde_json::json!({ "postSubmissionId": format!("post-{count}") }),
        })
    }
}
