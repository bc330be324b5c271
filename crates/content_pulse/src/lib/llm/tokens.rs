use std::{borrow::Cow, sync::LazyLock};

use another_tiktoken_rs::CoreBPE;

static CL100K: LazyLock<Option<CoreBPE>> = LazyLock::new(|| {
    another_tiktoken_rs::cl100k_base()
        .inspect_err(|e| tracing::error!(error = ?e, "Failed to load cl100k tokenizer"))
        .ok()
});

/// Rough chars-per-token ratio used when the tokenizer is unavailable
const CHARS_PER_TOKEN: usize = 4;

/// Cuts `text` down to at most `limit` cl100k tokens
pub fn truncate_to_tokens(text: &str, limit: usize) -> Cow<'_, str> {
    let Some(bpe) = CL100K.as_ref() else {
        let max_chars = limit.saturating_mul(CHARS_PER_TOKEN);
        return match text.char_indices().nth(max_chars) {
            Some((idx, _)) => Cow::Owned(text[..idx].to_string()),
            None => Cow::Borrowed(text),
        };
    };

    let tokens = bpe.encode_with_special_tokens(text);
    if tokens.len() <= limit {
        return Cow::Borrowed(text);
    }
    tracing::info!(tokens = tokens.len(), limit, "Truncating text to token budget");

    // a cut can land inside a multi-byte character, back off until it decodes
    (0..4)
        .filter_map(|back| bpe.decode(tokens[..limit.saturating_sub(back)].to_vec()).ok())
        .next()
        .map(Cow::Owned)
        .unwrap_or(Cow::Borrowed(text))
}
