use std::sync::{Arc, Mutex};

use content_pulse::Summarizer;

#[derive(Clone)]
pub struct MockSummarizer {
    pub summary: String,
    pub brief: String,
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail_with: Option<String>,
}

impl MockSummarizer {
    pub fn new(summary: &str, brief: &str) -> Self {
        Self {
            summary: summary.to_string(),
            brief: brief.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            summary: String::new(),
            brief: String::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: Some(msg.to_string()),
        }
    }
}

impl Summarizer for MockSummarizer {
    const CONTEXT_WINDOW_LIMIT: usize = 128_000;
    type Error = anyhow::Error;

    async fn summarize(&self, transcript: &str) -> Result<String, Self::Error> {
        self.calls.lock().unwrap().push(transcript.to_string());
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(self.summary.clone())
    }

    async fn infographic_brief(&self, summary: &str) -> Result<String, Self::Error> {
        self.calls.lock().unwrap().push(summary.to_string());
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(self.brief.clone())
    }
}
