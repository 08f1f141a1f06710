//! Cleanup of provider text before it is cached and drawn.
//!
//! Provider text carries markup: Strong's numbers in `<S>..</S>`, footnote
//! markers in `<sup>..</sup>`, italics, line breaks and HTML entities. The bitmap
//! fonts only carry Latin-1, so typographic punctuation is folded to ASCII.

use scraper::{ElementRef, Html};

/// Elements dropped together with their content
const DROPPED_ELEMENTS: [&str; 2] = ["s", "sup"];

/// Elements that separate words when they are removed
const BREAKING_ELEMENTS: [&str; 3] = ["br", "p", "div"];

/// Strip markup, decode entities, fold punctuation and collapse whitespace
pub fn sanitize(raw: &str) -> String {
    let fragment = Html::parse_fragment(raw);
    let mut text = String::with_capacity(raw.len());
    collect_text(fragment.root_element(), &mut text);
    let folded = fold_punctuation(&text);
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            let name = child.value().name();
            if DROPPED_ELEMENTS.contains(&name) {
                continue;
            }
            if BREAKING_ELEMENTS.contains(&name) {
                out.push(' ');
            }
            collect_text(child, out);
        }
    }
}

fn fold_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => out.push('"'),
            '\u{2013}' | '\u{2012}' | '\u{2010}' | '\u{2011}' => out.push('-'),
            '\u{2014}' | '\u{2015}' => out.push_str("--"),
            '\u{2026}' => out.push_str("..."),
            '\u{00A0}' | '\u{2009}' | '\u{200A}' | '\u{202F}' => out.push(' '),
            '\u{200B}' | '\u{FEFF}' => {}
            _ => out.push(c),
        }
    }
    out
}
