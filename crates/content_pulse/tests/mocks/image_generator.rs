use std::sync::{Arc, Mutex};

use content_pulse::media::{GeneratedImage, ImageGenerator};

pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nmock";

#[derive(Clone)]
pub struct MockImageGenerator {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail_with: Option<String>,
    pub source_url: String,
}

impl MockImageGenerator {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
            source_url: "https://tempfile.example/infographic.png".into(),
        }
    }

    /// Returns the image as a `data:` url, as some generators do
    pub fn inline() -> Self {
        Self {
            source_url: "data:image/png;base64,iVBORw0KGgptb2Nr".into(),
            ..Self::new()
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: Some(msg.to_string()),
            ..Self::new()
        }
    }
}

impl ImageGenerator for MockImageGenerator {
    type Error = anyhow::Error;

    async fn generate_image(&self, brief: &str) -> Result<GeneratedImage, Self::Error> {
        self.calls.lock().unwrap().push(brief.to_string());
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(GeneratedImage {
            task_id: "task-123".into(),
            source_url: self.source_url.clone(),
            bytes: PNG_BYTES.to_vec(),
            mime: "image/png".into(),
        })
    }
}
