use std::sync::LazyLock;

use regex::{Captures, Regex};

static BLOCK_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</(tr|table|p|li|h[1-6])\s*>|<br\s*/?>").unwrap());
static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(script|style)\b.*?</(script|style)\s*>").unwrap());
// A `<` only opens a tag when a name, `/` or `!` follows; "< 5 left" is text.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[a-zA-Z/!][^<>]*>").unwrap());
// Windows cut through markup may end inside a tag.
static CUT_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[a-zA-Z/!][^<>]*(>|$)").unwrap());
static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").unwrap());
static SPACES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\x{a0}]+").unwrap());

/// Case-insensitive containment.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Collapse runs of horizontal whitespace and trim.
pub fn squash(s: &str) -> String {
    SPACES_RE.replace_all(s.trim(), " ").to_string()
}

/// Decode numeric references and the common named entities in one pass.
/// Unknown names are left as written.
pub fn decode_entities(s: &str) -> String {
    ENTITY_RE
        .replace_all(s, |caps: &Captures| {
            let body = &caps[1];
            let decoded = match body.strip_prefix('#') {
                Some(num) => match num.strip_prefix(['x', 'X']) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => num.parse::<u32>().ok(),
                }
                .and_then(char::from_u32),
                None => named_entity(body),
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "nbsp" => ' ',
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "ndash" => '–',
        "mdash" => '—',
        "hellip" => '…',
        _ => return None,
    };
    Some(c)
}

/// Whether `content` carries any markup at all.
pub fn looks_like_markup(content: &str) -> bool {
    TAG_RE.is_match(content)
}

/// Strip every tag from a fragment, leaving one line.
pub fn strip_tags(fragment: &str) -> String {
    let text = CUT_TAG_RE.replace_all(fragment, " ");
    squash(&decode_entities(&text))
}

/// Flatten markup to text where each table row or paragraph becomes a line.
/// `div`s are left inline since sheet cells wrap their text in them.
/// Plain text passes through unchanged apart from whitespace squashing.
pub fn html_to_lines(content: &str) -> Vec<String> {
    let text = if looks_like_markup(content) {
        let no_scripts = SCRIPT_RE.replace_all(content, " ");
        let broken = BLOCK_END_RE.replace_all(&no_scripts, "\n");
        decode_entities(&TAG_RE.replace_all(&broken, " "))
    } else {
        content.to_string()
    };
    text.lines()
        .map(squash)
        .filter(|l| !l.is_empty())
        .collect()
}

/// Largest char boundary in `s` that is `<= idx`.
pub fn floor_boundary(s: &str, idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    let mut i = idx;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}
