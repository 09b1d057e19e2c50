use scraper::{ElementRef, Html};

use super::text::squash;
use super::Segmenter;
use crate::watch::WatchItem;

pub const DEFAULT_ATTRIBUTES: &[&str] = &["aria-label", "title", "data-value", "alt"];

/// One segment per element carrying any of `attributes`: the attribute values
/// followed by the element's own text. Text inside child elements belongs to
/// those children, so a labelled container never swallows the rows it wraps.
pub struct HtmlAttribute {
    pub attributes: Vec<String>,
}

impl Segmenter for HtmlAttribute {
    type Doc = Vec<String>;

    fn parse(&self, content: &str) -> Vec<String> {
        let doc = Html::parse_document(content);
        doc.root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter_map(|el| {
                let values: Vec<&str> = self
                    .attributes
                    .iter()
                    .filter_map(|name| el.value().attr(name))
                    .filter(|v| !v.trim().is_empty())
                    .collect();
                if values.is_empty() {
                    return None;
                }
                Some(squash(&format!("{} {}", values.join(" "), own_text(el))))
            })
            .collect()
    }

    fn segments(&self, doc: &Vec<String>, _target: &WatchItem) -> Vec<String> {
        doc.clone()
    }
}

/// Direct text children only.
fn own_text(el: ElementRef<'_>) -> String {
    el.children()
        .filter_map(|child| child.value().as_text())
        .map(|text| &**text)
        .collect::<Vec<&str>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(html: &str) -> Vec<String> {
        HtmlAttribute {
            attributes: DEFAULT_ATTRIBUTES.iter().map(|a| a.to_string()).collect(),
        }
        .parse(html)
    }

    #[test]
    fn attribute_values_and_text() {
        let html = r#"<div aria-label="Strawberry Kiwi: AVAILABLE"></div><img alt="Mango" src="m.png"><span>plain</span>"#;
        assert_eq!(
            segments(html),
            vec!["Strawberry Kiwi: AVAILABLE", "Mango"]
        );
    }

    #[test]
    fn element_text_included() {
        let html = r#"<td data-value="Watermelon">OUT OF STOCK</td>"#;
        let segs = segments(&format!("<table><tr>{}</tr></table>", html));
        assert_eq!(segs, vec!["Watermelon OUT OF STOCK"]);
    }

    #[test]
    fn labelled_container_keeps_only_its_own_text() {
        let html = r#"<div title="Stock sheet"><table><tr><td>Kiwi</td><td>LOW</td></tr><tr><td>Mango</td><td>OUT OF STOCK</td></tr></table></div>"#;
        assert_eq!(segments(html), vec!["Stock sheet"]);
    }

    #[test]
    fn nested_labels_stay_separate() {
        let html = r#"<div title="Tea Stock"><span aria-label="Kiwi">LOW</span> <span aria-label="Mango">OUT</span></div>"#;
        assert_eq!(segments(html), vec!["Tea Stock", "Kiwi LOW", "Mango OUT"]);
    }

    #[test]
    fn custom_attribute_list() {
        let s = HtmlAttribute { attributes: vec!["data-status".into()] };
        let segs = s.parse(r#"<p title="ignored" data-status="LOW">Kiwi</p>"#);
        assert_eq!(segs, vec!["LOW Kiwi"]);
    }
}
