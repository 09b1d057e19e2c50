use tracing::warn;

use super::Segmenter;
use crate::watch::{CellRef, WatchItem};

/// CSV export of the sheet. Rows are segments; when the location-key is a cell
/// reference, the addressed row is tried before the rest.
pub struct TabularOffset;

impl Segmenter for TabularOffset {
    type Doc = Vec<String>;

    fn parse(&self, content: &str) -> Vec<String> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_bytes());

        // The reader drops blank lines; they are put back as empty rows so
        // that row N of the sheet stays at index N - 1.
        let mut rows = Vec::new();
        let mut record = csv::StringRecord::new();
        let mut offset = 0;
        loop {
            match reader.read_record(&mut record) {
                Ok(true) => {
                    rows.extend(std::iter::repeat(String::new()).take(blank_lines_at(content, offset)));
                    rows.push(join_cells(&record));
                }
                Ok(false) => break,
                Err(e) => {
                    warn!("Skipping malformed CSV record: {}", e);
                    if reader.position().byte() as usize == offset {
                        break;
                    }
                    rows.push(String::new());
                }
            }
            offset = reader.position().byte() as usize;
        }
        rows
    }

    fn segments(&self, doc: &Vec<String>, target: &WatchItem) -> Vec<String> {
        let addressed = CellRef::parse(&target.key)
            .map(|cell| cell.row)
            .filter(|&row| row < doc.len());

        let mut out = Vec::with_capacity(doc.len());
        if let Some(row) = addressed {
            out.push(doc[row].clone());
        }
        out.extend(
            doc.iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != addressed)
                .map(|(_, r)| r.clone()),
        );
        out.retain(|r| !r.is_empty());
        out
    }
}

fn join_cells(record: &csv::StringRecord) -> String {
    record
        .iter()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Blank lines between the end of the previous record (`offset`) and the next one.
fn blank_lines_at(content: &str, offset: usize) -> usize {
    let bytes = content.as_bytes();
    let Some(rest) = bytes.get(offset..) else {
        return 0;
    };
    let run = rest.iter().take_while(|b| matches!(b, b'\r' | b'\n')).count();
    let newlines = rest[..run].iter().filter(|&&b| b == b'\n').count();
    // the `\n` of a CRLF terminator the reader stopped short of
    let crlf_tail = offset > 0 && bytes[offset - 1] == b'\r' && rest.first() == Some(&b'\n');
    newlines - usize::from(crlf_tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(key: &str, product: &str) -> WatchItem {
        WatchItem { key: key.into(), product: product.into() }
    }

    #[test]
    fn rows_joined() {
        let doc = TabularOffset.parse("Product,Status\nKiwi, LOW ,\n,,\n");
        assert_eq!(doc, vec!["Product | Status", "Kiwi | LOW", ""]);
    }

    #[test]
    fn blank_lines_keep_row_numbers() {
        let doc = TabularOffset.parse("a,b\n\nKiwi,LOW\n");
        assert_eq!(doc, vec!["a | b", "", "Kiwi | LOW"]);

        let doc = TabularOffset.parse("\r\na,b\r\n\r\n\r\nKiwi,LOW\r\n");
        assert_eq!(doc, vec!["", "a | b", "", "", "Kiwi | LOW"]);
    }

    #[test]
    fn addressed_row_after_blank_line() {
        let doc = TabularOffset.parse("Kiwi,OUT\n\nKiwi,AVAILABLE\n");
        let segs = TabularOffset.segments(&doc, &target("B3", "Kiwi"));
        assert_eq!(segs[0], "Kiwi | AVAILABLE");
    }

    #[test]
    fn addressed_row_first() {
        let doc = TabularOffset.parse("Kiwi,OUT\nx\nKiwi,AVAILABLE\n");
        let segs = TabularOffset.segments(&doc, &target("A3", "Kiwi"));
        assert_eq!(segs, vec!["Kiwi | AVAILABLE", "Kiwi | OUT", "x"]);
    }

    #[test]
    fn non_cell_key_keeps_document_order() {
        let doc = TabularOffset.parse("Kiwi,OUT\nKiwi,AVAILABLE\n");
        let segs = TabularOffset.segments(&doc, &target("kiwi-row", "Kiwi"));
        assert_eq!(segs, vec!["Kiwi | OUT", "Kiwi | AVAILABLE"]);
    }

    #[test]
    fn offset_past_end_ignored() {
        let doc = TabularOffset.parse("Kiwi,LOW\n");
        let segs = TabularOffset.segments(&doc, &target("C57", "Kiwi"));
        assert_eq!(segs, vec!["Kiwi | LOW"]);
    }

    #[test]
    fn quoted_cells() {
        let doc = TabularOffset.parse("\"Tie Guan Yin, 50g\",\"OUT OF STOCK\"\n");
        assert_eq!(doc, vec!["Tie Guan Yin, 50g | OUT OF STOCK"]);
    }
}
