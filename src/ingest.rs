//! The ingestion pipeline: extract, normalize, wait for the owner, merge,
//! commit, clean the address bar.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::debug_log;
use crate::merge;
use crate::normalize::{self, NormalizedParam};
use crate::page::PageHost;
use crate::readiness::{self, OwnerWait, PollClock, WaiterSettings};
use crate::sanitize;
use crate::sources;
use crate::types::{BotRecord, IngestReport, ParamBag, ParamOrigin, RawParam};
use crate::utils::warn_once;
use crate::widget::{self, OwnerProvider};

/// Drives one or more ingestion passes against a page and a widget owner.
///
/// Everything external comes in through seams: the page, the owner provider
/// and the poll clock. Failures inside a pass are warned about and absorbed;
/// a pass never returns an error to its host.
pub struct ParamIngestor {
    page: Arc<dyn PageHost>,
    provider: Arc<dyn OwnerProvider>,
    clock: Arc<dyn PollClock>,
    waiter: WaiterSettings,
    stored: RwLock<ParamBag>,
}

impl ParamIngestor {
    pub fn new(
        page: Arc<dyn PageHost>,
        provider: Arc<dyn OwnerProvider>,
        clock: Arc<dyn PollClock>,
        waiter: WaiterSettings,
    ) -> Self {
        Self {
            page,
            provider,
            clock,
            waiter,
            stored: RwLock::new(ParamBag::new()),
        }
    }

    /// Raw slot → value bag from extraction, kept across passes so a pass
    /// abandoned on a timed-out owner can be retried and diagnosed.
    pub fn stored_params(&self) -> ParamBag {
        self.stored.read().clone()
    }

    /// Run one full ingestion pass and report what it did.
    ///
    /// Ordering inside the pass is load-bearing: both sources are extracted
    /// and the bag stored before any normalization; the owner wait happens
    /// before any registry mutation; the address bar is only touched after
    /// the merge has been committed.
    pub async fn load_bots_from_url_params(&self) -> IngestReport {
        self.page.wait_content_loaded().await;

        let url = self.page.current_url();
        let cookies = self.page.raw_cookies();
        let raw = sources::extract(&url, cookies.as_deref());
        if debug_log::is_enabled() {
            debug_log::log("extract", &format!("{} candidate(s) from {url}", raw.len()));
        }

        if raw.is_empty() {
            return IngestReport::default();
        }

        self.store_bag(&raw);

        let (normalized, skipped) = normalize::normalize_batch(raw);
        if debug_log::is_enabled() {
            debug_log::log(
                "normalize",
                &format!("{} record(s), {skipped} skipped", normalized.len()),
            );
        }

        let mut report = IngestReport {
            skipped,
            ..IngestReport::default()
        };
        if normalized.is_empty() {
            return report;
        }

        let owner = match readiness::wait_for_owner(
            self.provider.as_ref(),
            self.waiter,
            self.clock.as_ref(),
        )
        .await
        {
            OwnerWait::Ready(owner) => owner,
            OwnerWait::TimedOut { attempts } => {
                warn_once(&format!(
                    "Widget owner not ready after {attempts} attempt(s); keeping {} stored parameter(s) for a later pass",
                    self.stored.read().len()
                ));
                if debug_log::is_enabled() {
                    debug_log::log("wait", &format!("timed out after {attempts} attempt(s)"));
                }
                return report;
            }
        };
        debug_log::log("wait", "owner ready");

        let consumed = consumed_query_slots(&normalized);
        let incoming: Vec<BotRecord> = normalized.into_iter().map(|param| param.record).collect();

        let outcome = merge::merge(owner.bots(), &incoming);
        if debug_log::is_enabled() {
            debug_log::log(
                "merge",
                &format!(
                    "{} added, {} replaced, registry size {}",
                    outcome.added,
                    outcome.replaced,
                    outcome.bots.len()
                ),
            );
        }

        owner.replace_bots(outcome.bots);
        widget::commit(owner.as_ref()).await;
        debug_log::log("commit", "saved and re-rendered");

        let cleaned = sanitize::clean_url(&url, &consumed);
        if let Some(clean) = &cleaned {
            self.page.replace_url(clean);
            if debug_log::is_enabled() {
                debug_log::log("sanitize", &format!("address bar now {clean}"));
            }
        }

        let mut consumed_slots: Vec<String> = consumed.into_iter().collect();
        consumed_slots.sort();

        report.merged = outcome.applied;
        report.added = outcome.added;
        report.replaced = outcome.replaced;
        report.consumed_slots = consumed_slots;
        report.cleaned_url = cleaned.map(|url| url.to_string());
        report
    }

    fn store_bag(&self, raw: &[RawParam]) {
        let mut stored = self.stored.write();
        for param in raw {
            stored.insert(param.slot.clone(), param.raw_value.clone());
        }
    }
}

/// Only slots that made it through normalization count as consumed; a
/// query key the pass skipped stays in the address bar.
fn consumed_query_slots(normalized: &[NormalizedParam]) -> HashSet<String> {
    normalized
        .iter()
        .filter(|param| param.origin == ParamOrigin::Query)
        .map(|param| param.slot.clone())
        .collect()
}
