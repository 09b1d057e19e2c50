pub mod attribute;
pub mod dom;
pub mod ocr;
pub mod regex_text;
pub mod substring;
pub mod tabular;
pub mod text;

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use tracing::debug;

use crate::vocab::StatusVocabulary;
use crate::watch::{WatchItem, WatchList};

/// Location-key -> detected status token (None = not found).
pub type Detected = BTreeMap<String, Option<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Row text around the DOM node holding the product name
    DomLocator,
    /// Window of raw markup after each occurrence of the product name
    SubstringSearch,
    /// Lines of OCR output for a screenshot of the sheet
    OcrText,
    /// Rows of the CSV export, addressed row first
    TabularOffset,
    /// Attribute values (aria-label, title, ...) of each element
    HtmlAttribute,
    /// Regex window over the page flattened to text
    RegexText,
}

/// What a strategy needs fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Page,
    Csv,
    Image,
}

impl Strategy {
    pub fn source(self) -> SourceKind {
        match self {
            Strategy::TabularOffset => SourceKind::Csv,
            Strategy::OcrText => SourceKind::Image,
            _ => SourceKind::Page,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::DomLocator => "dom-locator",
            Strategy::SubstringSearch => "substring-search",
            Strategy::OcrText => "ocr-text",
            Strategy::TabularOffset => "tabular-offset",
            Strategy::HtmlAttribute => "html-attribute",
            Strategy::RegexText => "regex-text",
        };
        f.write_str(name)
    }
}

/// Strategy knobs coming from configuration.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub window: usize,
    pub span: usize,
    pub attributes: Vec<String>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            window: 300,
            span: 120,
            attributes: attribute::DEFAULT_ATTRIBUTES.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Reduces one kind of content to ordered, line-like segments.
pub trait Segmenter {
    type Doc;

    fn parse(&self, content: &str) -> Self::Doc;

    /// Segments to search for `target`, in the order they should be tried.
    fn segments(&self, doc: &Self::Doc, target: &WatchItem) -> Vec<String>;
}

/// Run `strategy` over `content` for every watched product.
pub fn extract(
    content: &str,
    watch: &WatchList,
    strategy: Strategy,
    opts: &ExtractOptions,
    vocab: &StatusVocabulary,
) -> Detected {
    match strategy {
        Strategy::DomLocator => run(&dom::DomLocator, content, watch, vocab),
        Strategy::SubstringSearch => run(
            &substring::SubstringSearch { window: opts.window },
            content,
            watch,
            vocab,
        ),
        Strategy::OcrText => run(&ocr::OcrLines, content, watch, vocab),
        Strategy::TabularOffset => run(&tabular::TabularOffset, content, watch, vocab),
        Strategy::HtmlAttribute => run(
            &attribute::HtmlAttribute {
                attributes: opts.attributes.clone(),
            },
            content,
            watch,
            vocab,
        ),
        Strategy::RegexText => run(
            &regex_text::RegexText {
                span: opts.span.min(regex_text::MAX_SPAN),
            },
            content,
            watch,
            vocab,
        ),
    }
}

/// Every key unresolved; used when the content source could not be fetched.
pub fn all_null(watch: &WatchList) -> Detected {
    watch.keys().map(|k| (k.to_string(), None)).collect()
}

fn run<S: Segmenter>(
    segmenter: &S,
    content: &str,
    watch: &WatchList,
    vocab: &StatusVocabulary,
) -> Detected {
    let doc = segmenter.parse(content);
    watch
        .iter()
        .map(|item| {
            let segments = segmenter.segments(&doc, item);
            debug!("{}: {} candidate segments", item.key, segments.len());
            let status = resolve(&segments, &item.product, vocab);
            (item.key.clone(), status)
        })
        .collect()
}

/// First segment naming `product` decides; the vocabulary is only searched in that one.
pub fn resolve<S: AsRef<str>>(
    segments: &[S],
    product: &str,
    vocab: &StatusVocabulary,
) -> Option<String> {
    let segment = segments
        .iter()
        .map(AsRef::as_ref)
        .find(|s| text::contains_ci(s, product))?;
    debug!("'{}' matched segment: {}", product, segment);
    vocab.match_segment(segment).map(str::to_string)
}
