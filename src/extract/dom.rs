use std::collections::HashSet;

use scraper::{ElementRef, Html, Node};

use super::text::squash;
use super::Segmenter;
use crate::watch::WatchItem;

const SKIP_PARENTS: &[&str] = &["script", "style", "noscript", "head", "title"];
const TOO_WIDE: &[&str] = &["html", "body"];

/// Text of the row around each text node: the enclosing `<tr>` when there is
/// one, otherwise the text node's grandparent element.
pub struct DomLocator;

impl Segmenter for DomLocator {
    type Doc = Vec<String>;

    fn parse(&self, content: &str) -> Vec<String> {
        let doc = Html::parse_document(content);
        let mut seen = HashSet::new();
        let mut rows = Vec::new();

        for node in doc.root_element().descendants() {
            let Node::Text(text) = node.value() else {
                continue;
            };
            if text.trim().is_empty() {
                continue;
            }
            let Some(parent) = node.parent().and_then(ElementRef::wrap) else {
                continue;
            };
            if SKIP_PARENTS.contains(&parent.value().name()) {
                continue;
            }
            let Some(row) = row_of(parent) else {
                continue;
            };
            if !seen.insert(row.id()) {
                continue;
            }
            let text = squash(&row.text().collect::<Vec<_>>().join(" "));
            if !text.is_empty() {
                rows.push(text);
            }
        }

        rows
    }

    fn segments(&self, doc: &Vec<String>, _target: &WatchItem) -> Vec<String> {
        doc.clone()
    }
}

fn row_of(cell: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let tr = cell
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "tr");
    if tr.is_some() {
        return tr;
    }
    if cell.value().name() == "tr" {
        return Some(cell);
    }

    let wide = |el: &ElementRef| TOO_WIDE.contains(&el.value().name());
    match cell.parent().and_then(ElementRef::wrap) {
        Some(grand) if !wide(&grand) => Some(grand),
        _ if !wide(&cell) => Some(cell),
        _ => None,
    }
}
