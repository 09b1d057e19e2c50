use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::{Result, WatchError};

static CELL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([A-Za-z]{1,3})([1-9][0-9]*)$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WatchItem {
    pub key: String,
    pub product: String,
}

/// Watched products in configuration order. Keys are unique.
#[derive(Debug, Clone)]
pub struct WatchList {
    items: Vec<WatchItem>,
}

impl WatchList {
    pub fn new(items: Vec<WatchItem>) -> Result<Self> {
        let mut seen = HashSet::new();
        for item in &items {
            if item.key.trim().is_empty() || item.product.trim().is_empty() {
                return Err(WatchError::Config(format!(
                    "watch entry {:?} -> {:?} has an empty key or product",
                    item.key, item.product
                )));
            }
            if !seen.insert(item.key.as_str()) {
                return Err(WatchError::Config(format!("duplicate watch key {}", item.key)));
            }
        }
        Ok(Self { items })
    }

    pub fn iter(&self) -> impl Iterator<Item = &WatchItem> {
        self.items.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|i| i.key.as_str())
    }

    pub fn product(&self, key: &str) -> Option<&str> {
        self.items.iter().find(|i| i.key == key).map(|i| i.product.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub fn default_items() -> Vec<WatchItem> {
    [
        ("C57", "Strawberry Kiwi"),
        ("C59", "Tie Guan Yin"),
        ("C60", "Watermelon"),
    ]
    .iter()
    .map(|(key, product)| WatchItem {
        key: key.to_string(),
        product: product.to_string(),
    })
    .collect()
}

/// A spreadsheet cell reference such as `C57`. Both indices are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub column: usize,
    pub row: usize,
}

impl CellRef {
    pub fn parse(key: &str) -> Option<Self> {
        let caps = CELL_RE.captures(key.trim())?;
        let column = caps[1]
            .to_ascii_uppercase()
            .bytes()
            .fold(0usize, |acc, b| acc * 26 + (b - b'A' + 1) as usize);
        let row: usize = caps[2].parse().ok()?;
        Some(Self {
            column: column - 1,
            row: row - 1,
        })
    }
}
