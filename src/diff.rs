//! Word-level highlighting of a corrected text against its original.
//!
//! Comparison is positional: token `i` of the corrected text is compared with
//! token `i` of the original. It is linear and good enough for near-identical
//! inputs such as raw OCR vs. AI-corrected text, but a single inserted or
//! reordered word marks every following token as changed.

use serde::Serialize;

use crate::text::{is_whitespace, trim, trim_end};

pub const DEFAULT_DIVERGENCE_RATIO: f64 = 0.5;

pub const NO_ORIGINAL_MESSAGE: &str = "no original text to compare";
pub const NO_CORRECTED_MESSAGE: &str = "no corrected result";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffToken {
    pub text: String,
    pub changed: bool,
    /// Token at the same position in the original, only present for changed tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DiffOutcome {
    MissingOriginal,
    MissingCorrected,
    /// Token counts diverge too much for positional alignment; the corrected text verbatim.
    Unaligned(String),
    Aligned(Vec<DiffToken>),
}

impl DiffOutcome {
    pub fn message(&self) -> Option<&'static str> {
        match self {
            DiffOutcome::MissingOriginal => Some(NO_ORIGINAL_MESSAGE),
            DiffOutcome::MissingCorrected => Some(NO_CORRECTED_MESSAGE),
            _ => None,
        }
    }

    pub fn changed_count(&self) -> usize {
        match self {
            DiffOutcome::Aligned(tokens) => tokens.iter().filter(|token| token.changed).count(),
            _ => 0,
        }
    }
}

pub fn compare(original: &str, corrected: &str) -> DiffOutcome {
    compare_with_ratio(original, corrected, DEFAULT_DIVERGENCE_RATIO)
}

pub fn compare_with_ratio(original: &str, corrected: &str, divergence_ratio: f64) -> DiffOutcome {
    if original.is_empty() {
        return DiffOutcome::MissingOriginal;
    }
    if corrected.is_empty() {
        return DiffOutcome::MissingCorrected;
    }

    let original_tokens = tokenize(original);
    let corrected_tokens = tokenize(corrected);
    let longest = original_tokens.len().max(corrected_tokens.len());
    let gap = original_tokens.len().abs_diff(corrected_tokens.len());
    if gap as f64 > longest as f64 * divergence_ratio {
        tracing::debug!(
            original = original_tokens.len(),
            corrected = corrected_tokens.len(),
            "token counts diverge; skipping positional diff"
        );
        return DiffOutcome::Unaligned(corrected.to_string());
    }

    let tokens = corrected_tokens
        .iter()
        .enumerate()
        .map(|(idx, token)| {
            let before = original_tokens.get(idx).copied().unwrap_or("");
            let trimmed = trim(token);
            let changed = !trimmed.is_empty() && trimmed != trim(before);
            DiffToken {
                text: token.to_string(),
                changed,
                original: changed.then(|| before.to_string()),
            }
        })
        .collect();
    DiffOutcome::Aligned(tokens)
}

/// Splits on whitespace runs and keeps the runs as tokens, so joining the
/// tokens reproduces the input. Words and whitespace alternate, starting with
/// a (possibly empty) word.
pub fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut word_start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        if !is_whitespace(ch) {
            continue;
        }
        let mut end = idx + ch.len_utf8();
        while let Some(&(next_idx, next)) = chars.peek() {
            if !is_whitespace(next) {
                break;
            }
            end = next_idx + next.len_utf8();
            chars.next();
        }
        tokens.push(&text[word_start..idx]);
        tokens.push(&text[idx..end]);
        word_start = end;
    }
    tokens.push(&text[word_start..]);
    tokens
}

/// Marker line aligned under the corrected text: `-` under changed tokens.
/// Whitespace tokens are copied so tabs and newlines keep the alignment.
pub fn render_markers(tokens: &[DiffToken]) -> String {
    let mut markers = String::new();
    for token in tokens {
        if token.changed {
            markers.extend(std::iter::repeat_n('-', token.text.chars().count()));
        } else if trim(&token.text).is_empty() {
            markers.push_str(&token.text);
        } else {
            markers.extend(std::iter::repeat_n(' ', token.text.chars().count()));
        }
    }
    trim_end(&markers).to_string()
}

/// Inline annotation: changed tokens become `[new|was: old]`.
pub fn render_annotated(outcome: &DiffOutcome) -> String {
    match outcome {
        DiffOutcome::MissingOriginal | DiffOutcome::MissingCorrected => {
            outcome.message().unwrap_or_default().to_string()
        }
        DiffOutcome::Unaligned(text) => text.clone(),
        DiffOutcome::Aligned(tokens) => {
            let mut output = String::new();
            for token in tokens {
                match token.original.as_deref() {
                    Some(before) if token.changed => {
                        output.push('[');
                        output.push_str(&token.text);
                        output.push_str("|was: ");
                        output.push_str(before);
                        output.push(']');
                    }
                    _ => output.push_str(&token.text),
                }
            }
            output
        }
    }
}
