use base64::{engine::general_purpose::STANDARD, Engine};

const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Download failed with status {0}")]
    Status(u16),
    #[error("Invalid data url: {0}")]
    InvalidDataUrl(String),
}

/// Downloads `url`, or decodes it in place when it is a `data:` url.
/// Returns the bytes and their mime type.
pub async fn fetch_bytes(
    http: &reqwest::Client,
    url: &str,
) -> Result<(Vec<u8>, String), FetchError> {
    if url.starts_with("data:") {
        return decode_data_url(url);
    }

    let resp = http.get(url).send().await?;
    if !resp.status().is_success() {
        return Err(FetchError::Status(resp.status().as_u16()));
    }

    let mime = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(FALLBACK_MIME)
        .to_string();
    let bytes = resp.bytes().await?.to_vec();

    Ok((bytes, mime))
}

pub fn decode_data_url(url: &str) -> Result<(Vec<u8>, String), FetchError> {
    let (header, payload) = url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or_else(|| FetchError::InvalidDataUrl("missing ',' separator".into()))?;

    let mut params = header.split(';');
    let mime = params
        .next()
        .filter(|m| !m.is_empty())
        .unwrap_or(FALLBACK_MIME)
        .to_string();

    let bytes = if params.any(|p| p == "base64") {
        STANDARD
            .decode(payload.trim())
            .map_err(|e| FetchError::InvalidDataUrl(e.to_string()))?
    } else {
        payload.as_bytes().to_vec()
    };

    Ok((bytes, mime))
}
