use std::sync::{Arc, Mutex};

use content_pulse::yt::TranscriptSource;

#[derive(Clone)]
pub struct MockTranscriptSource {
    pub transcript: String,
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail_with: Option<String>,
}

impl MockTranscriptSource {
    pub fn new(transcript: &str) -> Self {
        Self {
            transcript: transcript.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            transcript: String::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: Some(msg.to_string()),
        }
    }
}

impl TranscriptSource for MockTranscriptSource {
    const SOURCE_NAME: &'static str = "mock";
    type Error = anyhow::Error;

    async fn fetch_transcript(&self, video_id: &str) -> Result<String, Self::Error> {
        self.calls.lock().unwrap().push(video_id.to_string());
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(self.transcript.clone())
    }
}
