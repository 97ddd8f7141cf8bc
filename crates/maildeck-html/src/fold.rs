//! Quoted-reply folding.
//!
//! Reply chains accumulate the full history of a conversation at the
//! bottom of every message. Folding wraps that trailing content in a
//! collapsible `<details>` element so the visible body stays short
//! while the history remains recoverable.

use crate::text::{find_ci, html_to_text};

/// Class attached to the `<details>` wrapper produced by [`fold_quoted`].
pub const QUOTE_CLASS: &str = "maildeck-quote";

/// Summary label shown on the collapsed block.
const FOLD_SUMMARY: &str = "Show quoted text";

/// Markers that introduce trailing quoted or forwarded content.
///
/// Covers plain `<blockquote>` reply chains, Gmail quote containers,
/// and the Gmail/Outlook forwarded-message separators.
const QUOTE_MARKERS: &[&str] = &[
    "<blockquote",
    "<div class=\"gmail_quote\"",
    "<div class='gmail_quote'",
    "---------- forwarded message",
    "-----original message-----",
];

/// Wraps trailing quoted or forwarded content in a collapsible block.
///
/// The earliest quote marker and everything after it move inside a
/// `<details class="maildeck-quote">` element. The body comes back
/// unchanged when it has no marker, when it is quoted content from
/// the first visible character, or when it already carries the marker
/// class, which makes folding idempotent.
#[must_use]
pub fn fold_quoted(html: &str) -> String {
    if html.contains(QUOTE_CLASS) {
        return html.to_string();
    }
    let Some(pos) = QUOTE_MARKERS
        .iter()
        .filter_map(|marker| find_ci(html, marker))
        .min()
    else {
        return html.to_string();
    };

    let head = &html[..pos];
    if html_to_text(head).is_empty() {
        // The quote is the whole message, keep it visible
        return html.to_string();
    }

    let tail = &html[pos..];
    format!(
        "{head}<details class=\"{QUOTE_CLASS}\"><summary>{FOLD_SUMMARY}</summary>{tail}</details>"
    )
}
