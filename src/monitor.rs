use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::extract::{self, ExtractOptions, Strategy};
use crate::fetch::ContentSource;
use crate::notify::{self, Notifier};
use crate::state::ObservedState;
use crate::vocab::StatusVocabulary;
use crate::watch::WatchList;

/// Validated inputs for one run.
pub struct RunPlan {
    pub watch: WatchList,
    pub vocab: StatusVocabulary,
    pub strategy: Strategy,
    pub options: ExtractOptions,
    pub state_path: PathBuf,
    /// Keep the previous state untouched when the source can't be fetched.
    pub hold_on_fetch_failure: bool,
}

/// Outcome counters; a run never fails as a whole.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub keys: usize,
    pub detected: usize,
    pub changes: usize,
    pub fetch_failed: bool,
    pub notified: bool,
    pub persisted: bool,
}

impl RunReport {
    pub fn print(&self) {
        println!(
            "Checked {} products: {} detected, {} changed, notification {}, state {}.",
            self.keys,
            self.detected,
            self.changes,
            if self.notified {
                "sent"
            } else if self.changes == 0 {
                "not needed"
            } else {
                "FAILED"
            },
            if self.persisted { "saved" } else { "NOT saved" },
        );
    }
}

/// Load state, fetch once, extract, diff, notify, persist.
pub async fn run_once(
    plan: &RunPlan,
    source: &dyn ContentSource,
    notifier: &dyn Notifier,
) -> RunReport {
    let mut report = RunReport {
        keys: plan.watch.len(),
        ..RunReport::default()
    };

    let mut previous = ObservedState::load(&plan.state_path);
    previous.ensure_keys(&plan.watch);

    let detected = match source.fetch(plan.strategy.source()).await {
        Ok(content) => extract::extract(&content, &plan.watch, plan.strategy, &plan.options, &plan.vocab),
        Err(e) => {
            error!("Failed to load sheet: {}", e);
            report.fetch_failed = true;
            extract::all_null(&plan.watch)
        }
    };

    for item in plan.watch.iter() {
        match detected.get(&item.key).cloned().flatten() {
            Some(status) => {
                report.detected += 1;
                info!("{} ({}): {}", item.key, item.product, status);
            }
            None => info!("{} ({}): not found", item.key, item.product),
        }
    }

    let next = if report.fetch_failed && plan.hold_on_fetch_failure {
        warn!("Holding previous statuses until the sheet can be fetched again");
        previous
    } else {
        let (events, next) = notify::detect_changes(&plan.watch, &previous, &detected);
        report.changes = events.len();

        if let Some(message) = notify::compose(&events, &plan.vocab, notifier.markup()) {
            match notifier.send(&message).await {
                Ok(()) => {
                    info!("Sent {} change(s) via {}", events.len(), notifier.name());
                    report.notified = true;
                }
                Err(e) => error!("Could not notify via {}: {}", notifier.name(), e),
            }
        } else {
            info!("No status changes");
        }
        next
    };

    match next.save(&plan.state_path) {
        Ok(()) => report.persisted = true,
        Err(e) => error!("Could not persist state: {}", e),
    }

    report
}
