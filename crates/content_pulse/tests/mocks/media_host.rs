use std::sync::{Arc, Mutex};

use content_pulse::media::{GeneratedImage, HostedImage, MediaHost};

#[derive(Clone)]
pub struct MockMediaHost {
    /// Public ids that were uploaded
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail_with: Option<String>,
}

impl MockMediaHost {
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

impl MediaHost for MockMediaHost {
    type Error = anyhow::Error;

    async fn upload(
        &self,
        image: &GeneratedImage,
        public_id: &str,
    ) -> Result<HostedImage, Self::Error> {
        self.calls.lock().unwrap().push(public_id.to_string());
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(HostedImage {
            url: format!(
                "https://res.cloudinary.example/{public_id}.{}",
                image.extension()
            ),
            public_id: Some(public_id.to_string()),
        })
    }
}
