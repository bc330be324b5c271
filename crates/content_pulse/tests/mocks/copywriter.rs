use std::sync::{Arc, Mutex};

use content_pulse::Copywriter;

#[derive(Clone)]
pub struct MockCopywriter {
    pub post: String,
    pub newsletter: String,
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail_with: Option<String>,
}

impl MockCopywriter {
    pub fn new(post: &str, newsletter: &str) -> Self {
        Self {
            post: post.to_string(),
            newsletter: newsletter.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            post: String::new(),
            newsletter: String::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: Some(msg.to_string()),
        }
    }
}

impl Copywriter for MockCopywriter {
    type Error = anyhow::Error;

    async fn linkedin_post(&self, transcript: &str) -> Result<String, Self::Error> {
        self.calls.lock().unwrap().push(transcript.to_string());
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(self.post.clone())
    }

    async fn newsletter(&self, transcript: &str) -> Result<String, Self::Error> {
        self.calls.lock().unwrap().push(transcript.to_string());
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(self.newsletter.clone())
    }
}
