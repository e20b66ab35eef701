//! Context snippets around a field's matched text.
//!
//! Span offsets and lengths count characters, not bytes.

use super::payload::TextSpan;

/// Characters of surrounding text kept on each side of the match.
pub const CONTEXT_RADIUS: usize = 30;

pub const MATCH_OPEN: char = '【';
pub const MATCH_CLOSE: char = '】';

/// Snippet around the first span: `...before【match】after...`.
///
/// Returns `None` without spans, without a document, or when the span lies
/// entirely past the end of the document. Windows are clamped at the
/// document bounds.
pub fn extract_context(spans: &[TextSpan], document: Option<&str>) -> Option<String> {
    let span = spans.first()?;
    let document = document.filter(|d| !d.is_empty())?;

    let chars: Vec<char> = document.chars().collect();
    let len = chars.len();
    if span.offset >= len {
        tracing::debug!(offset = span.offset, len, "Span lies outside document");
        return None;
    }

    let match_end = span.offset.saturating_add(span.length).min(len);
    let window_start = span.offset.saturating_sub(CONTEXT_RADIUS);
    let window_end = match_end.saturating_add(CONTEXT_RADIUS).min(len);

    let before: String = chars[window_start..span.offset].iter().collect();
    let matched: String = chars[span.offset..match_end].iter().collect();
    let after: String = chars[match_end..window_end].iter().collect();

    Some(format!("...{before}{MATCH_OPEN}{matched}{MATCH_CLOSE}{after}..."))
}
