//! HTML to plain-text conversion.
//!
//! Strips markup, elides non-content elements, decodes common HTML
//! entities, and normalizes whitespace. The output is meant for
//! search indexing and list previews, not for faithful rendering.

/// Elements whose entire content is elided.
const ELIDED_TAGS: &[&str] = &["script", "style", "head", "title"];

/// Elements that end the current line when they open or close.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "table", "tr", "h1", "h2", "h3", "h4", "h5", "h6",
    "blockquote", "pre", "hr", "section", "article", "header", "footer", "details", "summary",
];

/// Elements that separate inline content with a space.
const CELL_TAGS: &[&str] = &["td", "th"];

/// Longest entity name that is worth scanning for.
const ENTITY_MAX_LEN: usize = 10;

/// Converts an HTML fragment to plain text.
///
/// Tags are stripped, block-level boundaries become single newlines,
/// `<script>`/`<style>` content is dropped, and common named and
/// numeric entities are decoded. Runs of whitespace collapse to one
/// space. Malformed markup degrades to best-effort text; a `<` that
/// does not open a tag stays literal.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let mut sink = TextSink::new(html.len() / 2);
    let mut rest = html;

    while let Some(idx) = rest.find(['<', '&']) {
        sink.push_text(&rest[..idx]);
        rest = &rest[idx..];

        if rest.starts_with('<') {
            if let Some(tag) = scan_tag(rest) {
                rest = &rest[tag.len..];
                if !tag.closing && !tag.self_closing && ELIDED_TAGS.contains(&tag.name.as_str()) {
                    rest = skip_elided(rest, &tag.name);
                } else if BLOCK_TAGS.contains(&tag.name.as_str()) {
                    sink.break_line();
                } else if CELL_TAGS.contains(&tag.name.as_str()) {
                    sink.break_space();
                }
            } else {
                sink.push_text("<");
                rest = &rest[1..];
            }
        } else {
            let (decoded, consumed) = decode_entity(rest);
            sink.push_text(&decoded);
            rest = &rest[consumed..];
        }
    }

    sink.push_text(rest);
    sink.finish()
}

/// Builds a single-line preview of at most `max_chars` characters.
///
/// Newlines and runs of whitespace collapse to single spaces; text
/// that does not fit is cut and terminated with `...`.
#[must_use]
pub fn snippet(text: &str, max_chars: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    if max_chars <= 3 {
        return flat.chars().take(max_chars).collect();
    }
    let cut: String = flat.chars().take(max_chars - 3).collect();
    format!("{cut}...")
}

/// Case-insensitive substring search for an ASCII needle.
///
/// The returned offset is always a char boundary because the needle
/// only matches ASCII bytes.
pub(crate) fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() {
        return Some(0);
    }
    if h.len() < n.len() {
        return None;
    }
    (0..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

/// Pending separator between emitted text runs.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Gap {
    None,
    Space,
    Line,
}

/// Accumulates output text, merging whitespace into single separators.
struct TextSink {
    out: String,
    gap: Gap,
}

impl TextSink {
    fn new(capacity: usize) -> Self {
        Self {
            out: String::with_capacity(capacity),
            gap: Gap::None,
        }
    }

    fn push_text(&mut self, text: &str) {
        for c in text.chars() {
            if c.is_whitespace() {
                self.gap = self.gap.max(Gap::Space);
            } else {
                self.flush_gap();
                self.out.push(c);
            }
        }
    }

    fn break_line(&mut self) {
        self.gap = Gap::Line;
    }

    fn break_space(&mut self) {
        self.gap = self.gap.max(Gap::Space);
    }

    /// Separators are only emitted between text runs, so output never
    /// starts or ends with whitespace.
    fn flush_gap(&mut self) {
        if !self.out.is_empty() {
            match self.gap {
                Gap::Line => self.out.push('\n'),
                Gap::Space => self.out.push(' '),
                Gap::None => {}
            }
        }
        self.gap = Gap::None;
    }

    fn finish(self) -> String {
        self.out
    }
}

/// A scanned tag and the bytes it occupies.
struct Tag {
    /// Lowercase element name, empty for comments.
    name: String,
    closing: bool,
    self_closing: bool,
    len: usize,
}

/// Scans the tag at the start of `rest` (which begins with `<`).
///
/// Returns `None` when the `<` does not open markup and should stay
/// literal. An unterminated tag consumes the remainder of the input.
fn scan_tag(rest: &str) -> Option<Tag> {
    let after = &rest[1..];

    if let Some(comment) = after.strip_prefix("!--") {
        let len = comment.find("-->").map_or(rest.len(), |p| 4 + p + 3);
        return Some(Tag {
            name: String::new(),
            closing: false,
            self_closing: true,
            len,
        });
    }

    let (closing, body) = match after.strip_prefix('/') {
        Some(stripped) => (true, stripped),
        None => (false, after),
    };
    let body = body.strip_prefix('!').unwrap_or(body);
    if !body.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let name: String = body
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();

    match tag_end(after) {
        Some(end) => {
            let self_closing = after[..end].trim_end().ends_with('/');
            Some(Tag {
                name,
                closing,
                self_closing,
                len: 1 + end + 1,
            })
        }
        None => Some(Tag {
            name,
            closing,
            self_closing: false,
            len: rest.len(),
        }),
    }
}

/// Finds the closing `>` of a tag, skipping quoted attribute values.
fn tag_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '>' => return Some(i),
                _ => {}
            },
        }
    }
    None
}

/// Skips past the closing tag of an elided element.
fn skip_elided<'a>(rest: &'a str, name: &str) -> &'a str {
    let close = format!("</{name}");
    match find_ci(rest, &close) {
        Some(pos) => {
            let after = &rest[pos..];
            after.find('>').map_or("", |e| &after[e + 1..])
        }
        None => "",
    }
}

/// Decodes the entity at the start of `rest` (which begins with `&`).
///
/// Returns the replacement text and the number of bytes consumed.
/// Unknown but well-formed entities are kept verbatim; a bare `&`
/// stays literal.
fn decode_entity(rest: &str) -> (String, usize) {
    let body = &rest[1..];
    let mut semi = None;
    for (i, b) in body.bytes().take(ENTITY_MAX_LEN + 1).enumerate() {
        if b == b';' {
            semi = Some(i);
            break;
        }
        if !(b.is_ascii_alphanumeric() || b == b'#') {
            break;
        }
    }
    let Some(semi) = semi else {
        return ("&".to_string(), 1);
    };

    let name = &body[..semi];
    let consumed = 1 + semi + 1;
    let decoded = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => " ",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "hellip" => "\u{2026}",
        "ldquo" => "\u{201C}",
        "rdquo" => "\u{201D}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "copy" => "\u{00A9}",
        "reg" => "\u{00AE}",
        "trade" => "\u{2122}",
        _ => {
            if let Some(ch) = numeric_entity(name) {
                return (ch.to_string(), consumed);
            }
            // Unknown entity, keep the original text
            return (rest[..consumed].to_string(), consumed);
        }
    };
    (decoded.to_string(), consumed)
}

/// Parses `#NNN` and `#xHH` numeric entity names.
fn numeric_entity(name: &str) -> Option<char> {
    let digits = name.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u32>().ok()?,
    };
    char::from_u32(code)
}
