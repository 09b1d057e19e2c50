use regex::Regex;
use tracing::warn;

use super::text::html_to_lines;
use super::Segmenter;
use crate::watch::WatchItem;

/// Upper bound on the characters captured after the product name.
pub const MAX_SPAN: usize = 1000;

/// Page flattened to text lines; segments are `<product>` plus up to `span`
/// characters on the same line.
pub struct RegexText {
    pub span: usize,
}

impl Segmenter for RegexText {
    type Doc = String;

    fn parse(&self, content: &str) -> String {
        html_to_lines(content).join("\n")
    }

    fn segments(&self, doc: &String, target: &WatchItem) -> Vec<String> {
        let pattern = format!(r"(?i){}[^\n]{{0,{}}}", regex::escape(target.product.trim()), self.span);
        match Regex::new(&pattern) {
            Ok(re) => re.find_iter(doc).map(|m| m.as_str().to_string()).collect(),
            Err(e) => {
                warn!("Cannot build pattern for '{}': {}", target.product, e);
                Vec::new()
            }
        }
    }
}
