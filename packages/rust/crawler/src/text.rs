//! Visible-text extraction from HTML.

use scraper::{Html, Node};

/// Elements whose text never belongs to page content.
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "nav", "header", "footer", "head",
];

/// Upper bound on extracted text, in characters.
pub const MAX_TEXT_CHARS: usize = 30_000;

/// Visible text of a document, one text block per line.
///
/// Script/style and navigation chrome are dropped, runs of whitespace inside
/// a block collapse to one space, empty blocks are skipped.
pub fn visible_text(html: &str) -> String {
    visible_text_excluding(html, &[])
}

/// Like [`visible_text`], additionally dropping the `extra` elements.
pub fn visible_text_excluding(html: &str, extra: &[&str]) -> String {
    let doc = Html::parse_document(html);
    document_text(&doc, extra)
}

fn document_text(doc: &Html, extra: &[&str]) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut total = 0;

    for node in doc.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| SKIPPED_ELEMENTS.contains(&e.name()) || extra.contains(&e.name()))
        });
        if hidden {
            continue;
        }
        let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            continue;
        }
        total += line.chars().count() + 1;
        lines.push(line);
        if total >= MAX_TEXT_CHARS {
            break;
        }
    }

    let joined = lines.join("\n");
    truncate_chars(&joined, MAX_TEXT_CHARS).to_string()
}

/// Cut `text` to at most `max` characters on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
