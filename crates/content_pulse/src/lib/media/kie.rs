use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::time::Instant;

use crate::media::{
    fetch::{fetch_bytes, FetchError},
    GeneratedImage, ImageGenerator,
};

/// Kie.ai jobs API: create a task, poll it, download the first result
#[derive(Debug, Clone)]
pub struct KieClient {
    client: Client,
    api_key: String,
    base_url: String,
    poll_interval: Duration,
    timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum KieError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Kie task {task_id} failed: {message}")]
    TaskFailed { task_id: String, message: String },
    #[error("Kie task {task_id} timed out after {seconds}s")]
    Timeout { task_id: String, seconds: u64 },
    #[error("Kie task {0} finished without a result url")]
    NoResultUrl(String),
    #[error("Failed to download image: {0}")]
    Download(#[from] FetchError),
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTaskData {
    task_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordInfoData {
    #[serde(default)]
    state: String,
    result_json: Option<serde_json::Value>,
    fail_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskResult {
    #[serde(default, alias = "result_urls", rename = "resultUrls")]
    result_urls: Vec<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum TaskState {
    Pending,
    Success(String),
    Failed(String),
}

impl KieClient {
    const MODEL: &str = "nano-banana-pro";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.kie.ai/api/v1".into(),
            poll_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(240),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.timeout = timeout;
        self
    }

    async fn read_envelope<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, KieError> {
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        if !(200..300).contains(&status) {
            return Err(KieError::Api {
                status,
                message: body,
            });
        }

        let envelope = serde_json::from_str::<Envelope<T>>(&body)?;
        // errors come back as HTTP 200 with a non-200 code
        if envelope.code != 200 {
            return Err(KieError::Api {
                status: envelope.code,
                message: envelope.msg,
            });
        }

        envelope.data.ok_or_else(|| KieError::Api {
            status,
            message: format!("Response without data: {body}"),
        })
    }

    #[tracing::instrument(skip_all)]
    pub async fn create_task(&self, prompt: &str) -> Result<String, KieError> {
        let body = json!({
            "model": Self::MODEL,
            "input": {
                "prompt": prompt,
                "aspect_ratio": "16:9",
                "resolution": "2K",
                "output_format": "png"
            }
        });

        let resp = self
            .client
            .post(format!("{}/jobs/createTask", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        let data = Self::read_envelope::<CreateTaskData>(resp).await?;
        tracing::info!(task_id = %data.task_id, "Kie task created");
        Ok(data.task_id)
    }

    async fn task_state(&self, task_id: &str) -> Result<TaskState, KieError> {
        let resp = self
            .client
            .get(format!("{}/jobs/recordInfo", self.base_url))
            .bearer_auth(&self.api_key)
            .query(&[("taskId", task_id)])
            .send()
            .await?;

        let data = Self::read_envelope::<RecordInfoData>(resp).await?;
        task_state_from(task_id, data)
    }

    /// Polls until the task succeeds, fails or the timeout elapses
    #[tracing::instrument(skip(self))]
    pub async fn wait_for_result(&self, task_id: &str) -> Result<String, KieError> {
        let started = Instant::now();

        loop {
            match self.task_state(task_id).await? {
                TaskState::Success(url) => return Ok(url),
                TaskState::Failed(message) => {
                    return Err(KieError::TaskFailed {
                        task_id: task_id.to_string(),
                        message,
                    })
                }
                TaskState::Pending => {}
            }

            if started.elapsed() + self.poll_interval > self.timeout {
                return Err(KieError::Timeout {
                    task_id: task_id.to_string(),
                    seconds: self.timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

fn task_state_from(task_id: &str, data: RecordInfoData) -> Result<TaskState, KieError> {
    match data.state.as_str() {
        "success" => {
            let result = match data.result_json {
                Some(serde_json::Value::String(raw)) => serde_json::from_str::<TaskResult>(&raw)?,
                Some(value) => serde_json::from_value::<TaskResult>(value)?,
                None => return Err(KieError::NoResultUrl(task_id.to_string())),
            };

            result
                .result_urls
                .into_iter()
                .next()
                .map(TaskState::Success)
                .ok_or_else(|| KieError::NoResultUrl(task_id.to_string()))
        }
        "fail" => Ok(TaskState::Failed(
            data.fail_msg.unwrap_or_else(|| "Unknown failure".into()),
        )),
        _ => Ok(TaskState::Pending),
    }
}

impl ImageGenerator for KieClient {
    type Error = KieError;

    async fn generate_image(&self, brief: &str) -> Result<GeneratedImage, Self::Error> {
        let task_id = self.create_task(brief).await?;
        let source_url = self
            .wait_for_result(&task_id)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Image generation failed"))?;

        let (bytes, mime) = fetch_bytes(&self.client, &source_url).await?;
        tracing::info!(%task_id, size = bytes.len(), %mime, "Downloaded generated image");

        Ok(GeneratedImage {
            task_id,
            source_url,
            bytes,
            mime,
        })
    }
}
