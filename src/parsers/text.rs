use scraper::{ElementRef, Node};

use crate::domain::Suit;

/// Text of a table cell plus what the row logic needs to know about it.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub text: String,
    pub classes: Vec<String>,
    pub has_image: bool,
}

impl Cell {
    pub fn from_element(element: ElementRef<'_>) -> Self {
        let classes = element.value().classes().map(str::to_string).collect();
        let has_image = element
            .descendants()
            .any(|n| matches!(n.value(), Node::Element(e) if e.name() == "img"));
        Self {
            text: rendered_text(element),
            classes,
            has_image,
        }
    }

    pub fn has_class(&self, wanted: &[&str]) -> bool {
        self.classes
            .iter()
            .any(|c| wanted.iter().any(|w| c.eq_ignore_ascii_case(w)))
    }

    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

/// Cell text with suit icons replaced by their letter and whitespace collapsed.
pub fn rendered_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(e) if e.name() == "img" => {
                if let Some(suit) = e.attr("alt").and_then(Suit::from_icon_alt) {
                    out.push(suit.letter());
                }
            }
            Node::Element(e) if e.name() == "br" => out.push(' '),
            _ => {}
        }
    }
    collapse_whitespace(&out)
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Integer score, tolerating `+` signs and thousands separators.
pub fn parse_score(text: &str) -> Option<i32> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, '+' | '.' | ' '))
        .collect();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse().ok()
}

/// Decimal with either `.` or `,` as separator; `%` is ignored.
pub fn parse_decimal(text: &str) -> Option<f64> {
    let cleaned = text.trim().trim_end_matches('%').replace(',', ".");
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Lower-case and fold Turkish letters to ASCII so `Şubat`, `ŞUBAT` and
/// `subat` compare equal.
pub fn fold_turkish(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| *c != '\u{307}')
        .map(|c| match c {
            'ş' => 's',
            'ı' => 'i',
            'ğ' => 'g',
            'ü' => 'u',
            'ö' => 'o',
            'ç' => 'c',
            other => other,
        })
        .collect()
}
