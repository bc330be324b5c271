//! # Caption Parser
//!
//! Extracts caption track listings from a YouTube watch page and turns the
//! caption payloads (timed-text XML or WebVTT) into plain transcript text.

use std::{borrow::Cow, ops::Deref, sync::LazyLock};

use regex::Regex;

use crate::{error::Error, types::CaptionTrack};

static TIMEDTEXT_CUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<(text|p)\b[^>]*>(.*?)</(?:text|p)>").unwrap());

static MARKUP_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

static HTML_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").unwrap());

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const CAPTION_TRACKS_KEY: &str = "\"captionTracks\":";

pub struct YtHtmlDocument(String);

impl Deref for YtHtmlDocument {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl YtHtmlDocument {
    pub fn new(doc: String) -> Self {
        YtHtmlDocument(doc)
    }

    /// Reads the `captionTracks` array out of the player response embedded in
    /// the watch page
    pub fn caption_tracks(&self) -> Result<Vec<CaptionTrack>, Error> {
        let start = self
            .find(CAPTION_TRACKS_KEY)
            .map(|idx| idx + CAPTION_TRACKS_KEY.len())
            .ok_or(Error::ParseError(
                "No captionTracks found in the watch page, captions may be disabled",
            ))?;

        let raw = balanced_json_array(&self[start..]).ok_or(Error::ParseError(
            "Failed to find the end of the captionTracks array",
        ))?;

        Ok(serde_json::from_str::<Vec<CaptionTrack>>(raw)?)
    }
}

impl From<String> for YtHtmlDocument {
    fn from(value: String) -> Self {
        YtHtmlDocument(value)
    }
}

/// Returns the leading `[...]` of `input` (after optional whitespace), matching
/// brackets outside of string literals
fn balanced_json_array(input: &str) -> Option<&str> {
    let offset = input.len() - input.trim_start().len();
    let input = &input[offset..];
    if !input.starts_with('[') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in input.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&input[..=idx]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Picks the preferred English track: manual `en` first, then any `en-*`,
/// with auto-generated (`asr`) tracks last
pub fn pick_english_track(tracks: &[CaptionTrack]) -> Option<&CaptionTrack> {
    tracks
        .iter()
        .filter(|t| t.language_code.to_lowercase().starts_with("en"))
        .min_by_key(|t| {
            let exact = t.language_code.eq_ignore_ascii_case("en");
            let generated = t.kind.as_deref() == Some("asr");
            (generated, !exact)
        })
}

/// Converts a timed-text XML document (`<text>` or srv3 `<p>` cues) into
/// plain text
pub fn parse_timedtext_xml(xml: &str) -> String {
    let text = TIMEDTEXT_CUE_RE
        .captures_iter(xml)
        .filter_map(|cap| cap.get(2))
        .map(|m| unescape_html(&MARKUP_TAG_RE.replace_all(m.as_str(), " ")).into_owned())
        .collect::<Vec<_>>()
        .join(" ");

    // entities are double encoded in timed-text payloads
    collapse_whitespace(&unescape_html(&text))
}

/// Converts a WebVTT (or SRT) caption file into plain text, skipping headers,
/// cue numbers and timing lines
pub fn parse_vtt(vtt: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let raw = vtt.lines().map(str::trim).collect::<Vec<_>>();

    for (idx, line) in raw.iter().copied().enumerate() {
        // a number is a cue identifier only when a timing line follows it
        let cue_id = line.chars().all(|c| c.is_ascii_digit())
            && raw.get(idx + 1).is_some_and(|next| next.contains("-->"));

        if line.is_empty()
            || cue_id
            || line.contains("-->")
            || line.starts_with("WEBVTT")
            || line.starts_with("NOTE")
            || line.starts_with("Kind:")
            || line.starts_with("Language:")
        {
            continue;
        }

        let cleaned = unescape_html(&MARKUP_TAG_RE.replace_all(line, "")).trim().to_string();
        // rolling auto-captions repeat the previous cue line
        if cleaned.is_empty() || lines.last() == Some(&cleaned) {
            continue;
        }
        lines.push(cleaned);
    }

    collapse_whitespace(&lines.join(" "))
}

pub fn unescape_html(input: &str) -> Cow<'_, str> {
    HTML_ENTITY_RE.replace_all(input, |cap: &regex::Captures| {
        let entity = &cap[1];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            _ if entity.starts_with("#x") || entity.starts_with("#X") => {
                u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32)
            }
            _ if entity.starts_with('#') => entity[1..].parse::<u32>().ok().and_then(char::from_u32),
            _ => None,
        };

        decoded
            .map(String::from)
            .unwrap_or_else(|| cap[0].to_string())
    })
}

pub fn collapse_whitespace(input: &str) -> String {
    WHITESPACE_RE.replace_all(input, " ").trim().to_string()
}

/// Lowercase, dash separated, at most `max_len` characters
pub fn slugify(input: &str, max_len: usize) -> String {
    let slug = input
        .trim()
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    slug.chars().take(max_len).collect()
}
