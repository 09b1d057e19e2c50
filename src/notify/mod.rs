pub mod console;
pub mod telegram;

use async_trait::async_trait;

use crate::error::Result;
use crate::extract::Detected;
use crate::state::ObservedState;
use crate::vocab::StatusVocabulary;
use crate::watch::WatchList;

pub use console::ConsoleNotifier;
pub use telegram::TelegramNotifier;

const NONE_PLACEHOLDER: &str = "none";
const UNKNOWN_STATUS: &str = "UNKNOWN";

/// One watched product whose status differs from the last run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub key: String,
    pub product: String,
    pub previous: Option<String>,
    pub current: Option<String>,
}

/// How the channel renders emphasis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markup {
    /// Telegram legacy Markdown: `*bold*` and `` `code` ``
    Markdown,
    Plain,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    fn markup(&self) -> Markup;

    async fn send(&self, text: &str) -> Result<()>;
}

/// Diff `detected` against `previous` in watch order. The returned state has an
/// entry for every watched key; unwatched keys carried in `previous` are kept.
pub fn detect_changes(
    watch: &WatchList,
    previous: &ObservedState,
    detected: &Detected,
) -> (Vec<ChangeEvent>, ObservedState) {
    let mut next = previous.clone();
    let mut events = Vec::new();

    for item in watch.iter() {
        let before = previous.get(&item.key);
        let now = detected.get(&item.key).cloned().flatten();
        if before != now.as_deref() {
            events.push(ChangeEvent {
                key: item.key.clone(),
                product: item.product.clone(),
                previous: before.map(str::to_string),
                current: now.clone(),
            });
        }
        next.set(&item.key, now);
    }

    (events, next)
}

/// Three-line block for one change.
pub fn render(event: &ChangeEvent, vocab: &StatusVocabulary, markup: Markup) -> String {
    let symbol = vocab.symbol(event.current.as_deref());
    let previous = event.previous.as_deref().unwrap_or(NONE_PLACEHOLDER);
    let current = event.current.as_deref().unwrap_or(UNKNOWN_STATUS);

    match markup {
        Markup::Markdown => format!(
            "🔔 *Status change for {}*\nPrevious: `{}`\nNow: {} *{}*",
            in_bold(&event.product),
            previous.replace('`', "'"),
            symbol,
            in_bold(current),
        ),
        Markup::Plain => format!(
            "🔔 Status change for {}\nPrevious: {}\nNow: {} {}",
            event.product, previous, symbol, current
        ),
    }
}

/// All blocks separated by a blank line; `None` when nothing changed.
pub fn compose(events: &[ChangeEvent], vocab: &StatusVocabulary, markup: Markup) -> Option<String> {
    if events.is_empty() {
        return None;
    }
    Some(
        events
            .iter()
            .map(|e| render(e, vocab, markup))
            .collect::<Vec<_>>()
            .join("\n\n"),
    )
}

/// Text placed inside a legacy Markdown `*bold*` span. Backslash escapes are
/// not honoured inside an entity, so the only character that needs handling
/// is the closing `*` itself.
fn in_bold(s: &str) -> String {
    s.replace('*', "\u{2217}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::WatchItem;

    fn watch(items: &[(&str, &str)]) -> WatchList {
        WatchList::new(
            items
                .iter()
                .map(|(k, p)| WatchItem { key: k.to_string(), product: p.to_string() })
                .collect(),
        )
        .unwrap()
    }

    fn state(pairs: &[(&str, Option<&str>)]) -> ObservedState {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    fn detected(pairs: &[(&str, Option<&str>)]) -> Detected {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    #[test]
    fn null_to_available_is_a_change() {
        let list = watch(&[("C57", "Kiwi")]);
        let (events, next) = detect_changes(
            &list,
            &state(&[("C57", None)]),
            &detected(&[("C57", Some("AVAILABLE"))]),
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].previous, None);
        assert_eq!(events[0].current.as_deref(), Some("AVAILABLE"));
        assert_eq!(next.get("C57"), Some("AVAILABLE"));
    }

    #[test]
    fn same_status_is_not_a_change() {
        let list = watch(&[("C57", "Kiwi")]);
        let (events, _) = detect_changes(
            &list,
            &state(&[("C57", Some("AVAILABLE"))]),
            &detected(&[("C57", Some("AVAILABLE"))]),
        );
        assert!(events.is_empty());
    }

    #[test]
    fn low_to_out_of_stock() {
        let list = watch(&[("C57", "Kiwi")]);
        let (events, _) = detect_changes(
            &list,
            &state(&[("C57", Some("LOW"))]),
            &detected(&[("C57", Some("OUT OF STOCK"))]),
        );
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn null_to_null_is_quiet_and_absent_counts_as_null() {
        let list = watch(&[("C57", "Kiwi"), ("C60", "Watermelon")]);
        let (events, next) = detect_changes(
            &list,
            &state(&[("C60", None)]),
            &detected(&[("C57", None), ("C60", None)]),
        );
        assert!(events.is_empty());
        assert!(next.contains("C57"));
        assert!(next.contains("C60"));
    }

    #[test]
    fn second_pass_is_idempotent() {
        let list = watch(&[("C57", "Kiwi"), ("C59", "Tie Guan Yin")]);
        let now = detected(&[("C57", Some("LOW")), ("C59", None)]);
        let (first, next) = detect_changes(&list, &ObservedState::default(), &now);
        assert_eq!(first.len(), 1);
        let (second, again) = detect_changes(&list, &next, &now);
        assert!(second.is_empty());
        assert_eq!(again, next);
    }

    #[test]
    fn unwatched_keys_survive() {
        let list = watch(&[("C57", "Kiwi")]);
        let (_, next) = detect_changes(
            &list,
            &state(&[("B2", Some("LOW"))]),
            &detected(&[("C57", Some("OUT"))]),
        );
        assert_eq!(next.get("B2"), Some("LOW"));
        assert_eq!(next.len(), 2);
    }

    #[test]
    fn events_follow_watch_order() {
        let list = watch(&[("C60", "Watermelon"), ("C57", "Kiwi")]);
        let (events, _) = detect_changes(
            &list,
            &ObservedState::default(),
            &detected(&[("C57", Some("LOW")), ("C60", Some("OUT"))]),
        );
        let keys: Vec<&str> = events.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["C60", "C57"]);
    }

    #[test]
    fn markdown_block() {
        let vocab = StatusVocabulary::default();
        let event = ChangeEvent {
            key: "C57".into(),
            product: "Strawberry Kiwi".into(),
            previous: None,
            current: Some("AVAILABLE".into()),
        };
        assert_eq!(
            render(&event, &vocab, Markup::Markdown),
            "🔔 *Status change for Strawberry Kiwi*\nPrevious: `none`\nNow: 🟢 *AVAILABLE*"
        );
    }

    #[test]
    fn lost_status_renders_unknown() {
        let vocab = StatusVocabulary::default();
        let event = ChangeEvent {
            key: "C57".into(),
            product: "Kiwi".into(),
            previous: Some("AVAILABLE".into()),
            current: None,
        };
        assert_eq!(
            render(&event, &vocab, Markup::Plain),
            "🔔 Status change for Kiwi\nPrevious: AVAILABLE\nNow: ❔ UNKNOWN"
        );
    }

    #[test]
    fn underscores_inside_bold_are_literal() {
        let vocab = StatusVocabulary::default();
        let event = ChangeEvent {
            key: "C1".into(),
            product: "Da_Hong_Pao".into(),
            previous: Some("LOW".into()),
            current: Some("OUT".into()),
        };
        let text = render(&event, &vocab, Markup::Markdown);
        assert!(text.starts_with("🔔 *Status change for Da_Hong_Pao*"));
        assert!(!text.contains('\\'));
        assert!(text.ends_with("Now: 🔴 *OUT*"));
    }

    #[test]
    fn asterisk_cannot_close_bold_early() {
        let vocab = StatusVocabulary::default();
        let event = ChangeEvent {
            key: "C1".into(),
            product: "Kiwi *new*".into(),
            previous: Some("a`b".into()),
            current: None,
        };
        let text = render(&event, &vocab, Markup::Markdown);
        assert_eq!(
            text,
            "🔔 *Status change for Kiwi \u{2217}new\u{2217}*\nPrevious: `a'b`\nNow: ❔ *UNKNOWN*"
        );
        assert_eq!(text.matches('*').count(), 4);
    }

    #[test]
    fn compose_joins_with_blank_line() {
        let vocab = StatusVocabulary::default();
        assert_eq!(compose(&[], &vocab, Markup::Plain), None);

        let events = vec![
            ChangeEvent { key: "A1".into(), product: "Kiwi".into(), previous: None, current: Some("LOW".into()) },
            ChangeEvent { key: "A2".into(), product: "Mango".into(), previous: None, current: None },
        ];
        let text = compose(&events, &vocab, Markup::Plain).unwrap();
        assert_eq!(text.matches("\n\n").count(), 1);
        assert!(text.contains("Now: 🟡 LOW\n\n🔔 Status change for Mango"));
    }
}
