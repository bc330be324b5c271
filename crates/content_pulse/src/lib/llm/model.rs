//! Model name selection with a one-shot fallback when the configured model is
//! rejected by the vendor.

use std::{
    fmt::Debug,
    future::Future,
    sync::{Arc, RwLock},
};

/// Candidates tried after the configured model is rejected
pub const MAX_FALLBACK_CANDIDATES: usize = 3;

/// The model currently used by a client. Shared between clones so a model
/// found by falling back is kept for the rest of the process.
#[derive(Debug, Clone)]
pub struct ModelSlot {
    family: &'static str,
    defaults: &'static [&'static str],
    current: Arc<RwLock<String>>,
}

impl ModelSlot {
    pub fn new(
        family: &'static str,
        configured: impl Into<String>,
        defaults: &'static [&'static str],
    ) -> Self {
        ModelSlot {
            family,
            defaults,
            current: Arc::new(RwLock::new(configured.into())),
        }
    }

    pub fn current(&self) -> String {
        self.current
            .read()
            .map(|m| m.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    fn remember(&self, model: &str) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = model.to_string();
    }

    /// Models of the same family worth trying instead of `rejected`. Falls
    /// back to the static defaults when the listing failed or had no match.
    pub fn candidates(&self, rejected: &str, listed: Option<Vec<String>>) -> Vec<String> {
        let same_family = listed
            .unwrap_or_default()
            .into_iter()
            .filter(|m| m.to_lowercase().contains(self.family) && m != rejected)
            .collect::<Vec<_>>();

        let pool = if same_family.is_empty() {
            self.defaults
                .iter()
                .filter(|m| **m != rejected)
                .map(|m| m.to_string())
                .collect()
        } else {
            same_family
        };

        pool.into_iter().take(MAX_FALLBACK_CANDIDATES).collect()
    }
}

/// 404, or a 400 that names the requested model
pub fn is_model_rejection(status: u16, message: &str, model: &str) -> bool {
    match status {
        404 => true,
        400 => !model.is_empty() && message.to_lowercase().contains(&model.to_lowercase()),
        _ => false,
    }
}

/// Runs `call` with the current model. If the vendor rejects that model the
/// vendor listing is consulted and up to [`MAX_FALLBACK_CANDIDATES`] others are
/// tried; the first that works replaces the current model.
pub async fn call_with_model_fallback<T, E, C, CFut, L, LFut>(
    slot: &ModelSlot,
    rejected: impl Fn(&E, &str) -> bool,
    list_models: L,
    call: C,
) -> Result<T, E>
where
    E: Debug,
    C: Fn(String) -> CFut,
    CFut: Future<Output = Result<T, E>>,
    L: FnOnce() -> LFut,
    LFut: Future<Output = Result<Vec<String>, E>>,
{
    let model = slot.current();
    let err = match call(model.clone()).await {
        Ok(value) => return Ok(value),
        Err(e) if rejected(&e, &model) => e,
        Err(e) => return Err(e),
    };
    tracing::warn!(error = ?err, %model, "Model rejected, trying alternatives");

    let listed = list_models()
        .await
        .inspect_err(|e| tracing::warn!(error = ?e, "Failed to list models, using defaults"))
        .ok();

    let mut last_err = err;
    for candidate in slot.candidates(&model, listed) {
        match call(candidate.clone()).await {
            Ok(value) => {
                tracing::info!(from = %model, to = %candidate, "Switched model");
                slot.remember(&candidate);
                return Ok(value);
            }
            Err(e) => {
                tracing::warn!(error = ?e, %candidate, "Candidate model failed");
                last_err = e;
            }
        }
    }

    Err(last_err)
}
