use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use tracing::warn;

use super::text::{floor_boundary, strip_tags};
use super::Segmenter;
use crate::watch::WatchItem;

static ROW_END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</tr").unwrap());

/// Raw markup search: every occurrence of the product name opens a window that
/// runs to the end of the table row or `window` bytes, whichever comes first.
pub struct SubstringSearch {
    pub window: usize,
}

impl Segmenter for SubstringSearch {
    type Doc = String;

    fn parse(&self, content: &str) -> String {
        content.to_string()
    }

    fn segments(&self, raw: &String, target: &WatchItem) -> Vec<String> {
        if target.product.is_empty() {
            return Vec::new();
        }
        let needle = match RegexBuilder::new(&regex::escape(&target.product))
            .case_insensitive(true)
            .build()
        {
            Ok(re) => re,
            Err(e) => {
                warn!("Cannot search for '{}': {}", target.product, e);
                return Vec::new();
            }
        };

        needle
            .find_iter(raw)
            .map(|m| {
                let start = m.start();
                let limit = floor_boundary(raw, start + self.window.max(m.len()));
                let end = ROW_END_RE
                    .find(&raw[start..limit])
                    .map(|row_end| start + row_end.start())
                    .unwrap_or(limit);
                strip_tags(&raw[start..end])
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(product: &str) -> WatchItem {
        WatchItem { key: "C1".into(), product: product.into() }
    }

    #[test]
    fn window_stops_at_row_end() {
        let s = SubstringSearch { window: 300 };
        let doc = s.parse("<tr><td>Kiwi</td><td>LOW</td></TR><tr><td>Mango</td><td>OUT OF STOCK</td></tr>");
        assert_eq!(s.segments(&doc, &target("kiwi")), vec!["Kiwi LOW"]);
    }

    #[test]
    fn window_is_bounded() {
        let s = SubstringSearch { window: 8 };
        let doc = s.parse("Kiwi is AVAILABLE");
        assert_eq!(s.segments(&doc, &target("Kiwi")), vec!["Kiwi is"]);
    }

    #[test]
    fn every_occurrence_in_order() {
        let s = SubstringSearch { window: 100 };
        let doc = s.parse("<p>KIWI OUT</p></tr><p>kiwi LOW</p>");
        assert_eq!(s.segments(&doc, &target("Kiwi")), vec!["KIWI OUT", "kiwi LOW"]);
    }

    #[test]
    fn multibyte_window_edge() {
        let s = SubstringSearch { window: 6 };
        let doc = s.parse("Kiwi ééé");
        assert_eq!(s.segments(&doc, &target("Kiwi")), vec!["Kiwi"]);
    }

    #[test]
    fn accented_product_any_case() {
        let s = SubstringSearch { window: 300 };
        let doc = s.parse("<tr><td>THÉ VERT</td><td>LOW</td></tr>");
        assert_eq!(s.segments(&doc, &target("Thé Vert")), vec!["THÉ VERT LOW"]);
    }

    #[test]
    fn product_is_literal() {
        let s = SubstringSearch { window: 300 };
        let doc = s.parse("<tr><td>Tea (50g)</td><td>OUT</td></tr><tr><td>Tea 50g</td><td>LOW</td></tr>");
        assert_eq!(s.segments(&doc, &target("tea (50G)")), vec!["Tea (50g) OUT"]);
    }
}
