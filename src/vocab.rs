use serde::Deserialize;

/// Symbol shown for a status the vocabulary does not know (including null).
pub const UNKNOWN_SYMBOL: &str = "❔";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusToken {
    pub token: String,
    pub symbol: String,
}

/// Recognised status tokens, kept in matching order: longest text first, ties
/// in configuration order. "OUT OF STOCK" is therefore always tried before "OUT".
#[derive(Debug, Clone)]
pub struct StatusVocabulary {
    tokens: Vec<StatusToken>,
}

impl StatusVocabulary {
    pub fn new(tokens: Vec<StatusToken>) -> Self {
        let mut tokens: Vec<StatusToken> = tokens
            .into_iter()
            .map(|t| StatusToken {
                token: t.token.trim().to_uppercase(),
                symbol: t.symbol,
            })
            .filter(|t| !t.token.is_empty())
            .collect();
        // stable sort keeps configuration order among equal lengths
        tokens.sort_by(|a, b| b.token.chars().count().cmp(&a.token.chars().count()));
        Self { tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[StatusToken] {
        &self.tokens
    }

    /// First token (in specificity order) contained in `segment`, case-insensitively.
    pub fn match_segment(&self, segment: &str) -> Option<&str> {
        let upper = segment.to_uppercase();
        self.tokens
            .iter()
            .find(|t| upper.contains(&t.token))
            .map(|t| t.token.as_str())
    }

    pub fn symbol(&self, status: Option<&str>) -> &str {
        status
            .and_then(|s| self.tokens.iter().find(|t| t.token == s))
            .map(|t| t.symbol.as_str())
            .unwrap_or(UNKNOWN_SYMBOL)
    }
}

impl Default for StatusVocabulary {
    fn default() -> Self {
        Self::new(default_tokens())
    }
}

pub fn default_tokens() -> Vec<StatusToken> {
    [
        ("AVAILABLE", "🟢"),
        ("LOW", "🟡"),
        ("OUT", "🔴"),
        ("OUT OF STOCK", "🔴"),
    ]
    .iter()
    .map(|(token, symbol)| StatusToken {
        token: token.to_string(),
        symbol: symbol.to_string(),
    })
    .collect()
}
