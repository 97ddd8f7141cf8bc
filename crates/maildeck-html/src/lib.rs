//! # maildeck-html
//!
//! HTML body processing for email clients.
//!
//! Email bodies arrive as HTML of wildly varying quality. This crate
//! derives the text-shaped views an inbox needs from them:
//!
//! - **Plain text**: strip markup, elide `<script>`/`<style>`, decode
//!   common entities, and normalize whitespace so bodies can be
//!   searched and previewed as text
//! - **Snippets**: short single-line previews for list rows
//! - **Quote folding**: wrap trailing quoted replies and forwarded
//!   blocks in a collapsible `<details>` element so the visible body
//!   stays short
//!
//! All functions are pure and tolerant: malformed markup degrades to
//! best-effort text instead of failing.
//!
//! ## Quick Start
//!
//! ```ignore
//! use maildeck_html::{fold_quoted, html_to_text, snippet};
//!
//! let html = "<p>Thanks!</p><blockquote>On Tue, Alice wrote: ...</blockquote>";
//!
//! let text = html_to_text(html);
//! assert_eq!(text, "Thanks!\nOn Tue, Alice wrote: ...");
//!
//! let preview = snippet(&text, 120);
//!
//! let folded = fold_quoted(html);
//! assert!(folded.contains("<details class=\"maildeck-quote\">"));
//! assert_eq!(fold_quoted(&folded), folded); // idempotent
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod fold;
mod text;

pub use fold::{QUOTE_CLASS, fold_quoted};
pub use text::{html_to_text, snippet};
