use serde::Serialize;

use crate::AnnotateError;
use crate::locator::LocatedSpan;

/// Result of a successful edit: the rewritten text plus the span's new
/// identity. The replacement becomes the span's ground-truth phrase, so a
/// later edit pass treats it as original text.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditReceipt {
    pub text: String,
    pub span: LocatedSpan,
    pub original: String,
    pub replacement: String,
}

/// Replaces exactly the substring at `[span.start, span.end)` with
/// `suggestion`, leaving every other byte untouched.
///
/// The live text must still carry the span's recorded phrase at those
/// offsets; if a prior edit shifted things, the operation is rejected with
/// [`AnnotateError::StaleEdit`] instead of corrupting unrelated text. The
/// caller then re-renders and retries against fresh spans.
pub fn apply_edit(
    text: &str,
    span: &LocatedSpan,
    suggestion: &str,
) -> Result<EditReceipt, AnnotateError> {
    let stale = || AnnotateError::StaleEdit {
        expected: span.phrase.clone(),
        start: span.start,
        end: span.end,
    };

    if span.start >= span.end
        || span.end > text.len()
        || !text.is_char_boundary(span.start)
        || !text.is_char_boundary(span.end)
    {
        return Err(stale());
    }
    if &text[span.start..span.end] != span.phrase {
        return Err(stale());
    }

    let mut rewritten = String::with_capacity(text.len() - span.len() + suggestion.len());
    rewritten.push_str(&text[..span.start]);
    rewritten.push_str(suggestion);
    rewritten.push_str(&text[span.end..]);

    Ok(EditReceipt {
        text: rewritten,
        span: LocatedSpan {
            start: span.start,
            end: span.start + suggestion.len(),
            phrase: suggestion.to_string(),
            suggestion: span.suggestion.clone(),
            hierarchy_key: span.hierarchy_key.clone(),
        },
        original: span.phrase.clone(),
        replacement: suggestion.to_string(),
    })
}
