use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{Result, WatchError};
use crate::extract::{ExtractOptions, Strategy};
use crate::fetch::{DEFAULT_OCR_COMMAND, DEFAULT_USER_AGENT};
use crate::vocab::{self, StatusToken, StatusVocabulary};
use crate::watch::{self, WatchItem, WatchList};

pub const DEFAULT_CONFIG_FILE: &str = "sheet_watch.toml";
const ENV_PREFIX: &str = "SHEET_WATCH";

/// Everything a run needs. Layered: defaults, TOML file, `SHEET_WATCH_*`
/// variables, then the bare `TELEGRAM_*` / `SHEET_VIEW_URL` variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub url: Option<String>,
    pub csv_url: Option<String>,
    pub strategy: Strategy,
    pub state_path: PathBuf,
    pub timeout_secs: u64,
    pub snapshot_path: Option<PathBuf>,
    pub user_agent: String,
    pub window: usize,
    pub span: usize,
    pub attributes: Vec<String>,
    pub ocr_command: String,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub hold_on_fetch_failure: bool,
    pub watch: Vec<WatchItem>,
    pub vocabulary: Vec<StatusToken>,
}

impl Default for Settings {
    fn default() -> Self {
        let opts = ExtractOptions::default();
        Self {
            url: None,
            csv_url: None,
            strategy: Strategy::DomLocator,
            state_path: PathBuf::from("status.json"),
            timeout_secs: 60,
            snapshot_path: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            window: opts.window,
            span: opts.span,
            attributes: opts.attributes,
            ocr_command: DEFAULT_OCR_COMMAND.to_string(),
            telegram_bot_token: None,
            telegram_chat_id: None,
            hold_on_fetch_failure: false,
            watch: watch::default_items(),
            vocabulary: vocab::default_tokens(),
        }
    }
}

impl Settings {
    /// `file` must exist when given explicitly; the default file is optional.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let (path, required) = match file {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        let built = Config::builder()
            .add_source(File::from(path).required(required))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .set_override_option("telegram_bot_token", std::env::var("TELEGRAM_BOT_TOKEN").ok())
            .and_then(|b| b.set_override_option("telegram_chat_id", std::env::var("TELEGRAM_CHAT_ID").ok()))
            .and_then(|b| b.set_override_option("url", std::env::var("SHEET_VIEW_URL").ok()))
            .and_then(|b| b.build())
            .map_err(|e| WatchError::Config(e.to_string()))?;

        built
            .try_deserialize()
            .map_err(|e| WatchError::Config(e.to_string()))
    }

    pub fn watch_list(&self) -> Result<WatchList> {
        let list = WatchList::new(self.watch.clone())?;
        if list.is_empty() {
            return Err(WatchError::Config("watch list is empty".to_string()));
        }
        Ok(list)
    }

    pub fn vocabulary(&self) -> Result<StatusVocabulary> {
        let vocab = StatusVocabulary::new(self.vocabulary.clone());
        if vocab.is_empty() {
            return Err(WatchError::Config("status vocabulary is empty".to_string()));
        }
        Ok(vocab)
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            window: self.window,
            span: self.span,
            attributes: self.attributes.clone(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn require_url(&self) -> Result<&str> {
        self.url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                WatchError::Config("no sheet URL; set SHEET_VIEW_URL or `url` in the config file".to_string())
            })
    }

    /// Bot token and chat id, when both are configured.
    pub fn telegram(&self) -> Option<(&str, &str)> {
        let token = self.telegram_bot_token.as_deref().filter(|t| !t.is_empty())?;
        let chat = self.telegram_chat_id.as_deref().filter(|c| !c.is_empty())?;
        Some((token, chat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let s = Settings::default();
        assert_eq!(s.watch_list().unwrap().len(), 3);
        assert_eq!(s.vocabulary().unwrap().tokens().len(), 4);
        assert_eq!(s.strategy, Strategy::DomLocator);
        assert!(s.require_url().is_err());
        assert!(s.telegram().is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watch.toml");
        std::fs::write(
            &path,
            r#"
url = "https://docs.google.com/spreadsheets/d/abc/htmlview"
strategy = "tabular-offset"
state_path = "data/state.json"
timeout_secs = 15
hold_on_fetch_failure = true

[[watch]]
key = "B4"
product = "Jasmine Pearl"

[[vocabulary]]
token = "IN STOCK"
symbol = "✅"

[[vocabulary]]
token = "SOLD OUT"
symbol = "⛔"
"#,
        )
        .unwrap();

        let s = Settings::load(Some(&path)).unwrap();
        assert_eq!(s.strategy, Strategy::TabularOffset);
        assert_eq!(s.state_path, PathBuf::from("data/state.json"));
        assert_eq!(s.timeout(), Duration::from_secs(15));
        assert!(s.hold_on_fetch_failure);
        let list = s.watch_list().unwrap();
        assert_eq!(list.product("B4"), Some("Jasmine Pearl"));
        assert_eq!(s.vocabulary().unwrap().match_segment("Jasmine Pearl sold out"), Some("SOLD OUT"));
        // untouched keys keep their defaults
        assert_eq!(s.window, 300);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn empty_vocabulary_rejected() {
        let s = Settings { vocabulary: Vec::new(), ..Settings::default() };
        assert!(s.vocabulary().is_err());
    }

    #[test]
    fn empty_watch_rejected() {
        let s = Settings { watch: Vec::new(), ..Settings::default() };
        assert!(s.watch_list().is_err());
    }
}
