use super::text::squash;
use super::Segmenter;
use crate::watch::WatchItem;

/// OCR output, one segment per non-blank line. Table rulings that OCR engines
/// read as `|` are treated as spaces.
pub struct OcrLines;

impl Segmenter for OcrLines {
    type Doc = Vec<String>;

    fn parse(&self, content: &str) -> Vec<String> {
        content
            .lines()
            .map(|l| squash(&l.replace('|', " ")))
            .filter(|l| !l.is_empty())
            .collect()
    }

    fn segments(&self, doc: &Vec<String>, _target: &WatchItem) -> Vec<String> {
        doc.clone()
    }
}
