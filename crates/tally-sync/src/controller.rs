//! # Sync Controller
//!
//! Keeps one open document's derived numbers in step with its inputs.
//!
//! ## Line States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │               edit quantity / rate / discount / tax                     │
//! │     ┌────────┐ ─────────────────────────────────────► ┌───────┐        │
//! │     │ STABLE │                                         │ STALE │        │
//! │     └────────┘ ◄───────────────────────────────────── └───────┘        │
//! │                 recompute + write-back (if moved ≥ tolerance)           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Recompute Pass
//! ```text
//!  FieldChange ──► coerce value ──► mark line Stale ──┬─ Immediate ──► pass
//!                                                     └─ Debounced ──► wait
//!                                                                       │
//!  pass: every Stale line ──► sync_amount(tolerance) ──► Stable         │
//!        totals = compute_totals(document)              ◄───────────────┘
//!        notify TotalsChanged (only if totals moved)
//! ```
//!
//! The fired pass always reads the current document, so edits that land
//! while a timer is pending are never lost. A write-back that stays within
//! the tolerance is skipped, which is what keeps a write from feeding its
//! own change back in.
//!
//! ## Publication Order
//! Each pass is numbered under the document lock. Events go through an
//! outbox with a single active publisher, and a pass older than one already
//! delivered is dropped, so the last `TotalsChanged` a subscriber sees
//! always matches the stored document. An edit made from inside a callback
//! is delivered once that callback returns.
//!
//! Debounced mode needs a tokio runtime. An edit made on a thread without
//! one is recomputed on the spot.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tally_core::coerce::{parse_percentage_label, to_number};
use tally_core::normalize::{rounding_mode_from_value, tax_treatment_from_value};
use tally_core::{Document, DocumentSnapshot, DocumentTotals, LineItem, DEFAULT_QUANTITY};
use tracing::{debug, info, trace, warn};

use crate::config::{SyncConfig, SyncMode};
use crate::debounce::Debouncer;
use crate::events::{FieldChange, HeaderChange, LineField, TotalsChanged};
use crate::observer::{Observable, SubscriptionId};

// =============================================================================
// Controller Configuration
// =============================================================================

/// Runtime settings for one controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub mode: SyncMode,
    /// Quiet window (only used in Debounced mode).
    pub debounce: Duration,
    pub tolerance: Decimal,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for ControllerConfig {
    fn from(config: &SyncConfig) -> Self {
        ControllerConfig {
            mode: config.mode(),
            debounce: config.debounce_delay(),
            tolerance: config.tolerance(),
        }
    }
}

impl ControllerConfig {
    /// Recompute on every edit.
    pub fn immediate() -> Self {
        ControllerConfig {
            mode: SyncMode::Immediate,
            debounce: Duration::ZERO,
            ..ControllerConfig::default()
        }
    }

    /// Recompute once edits have been quiet for `window_ms`.
    pub fn debounced(window_ms: u64) -> Self {
        ControllerConfig {
            mode: SyncMode::Debounced,
            debounce: Duration::from_millis(window_ms),
            ..ControllerConfig::default()
        }
    }
}

// =============================================================================
// Line State and Stats
// =============================================================================

/// Whether a line's cached amount reflects its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineState {
    Stable,
    Stale,
}

/// Counters since the controller was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    /// Line and header edits received.
    pub notifications: u64,
    /// Recompute passes run.
    pub recomputations: u64,
    /// Line amounts written back.
    pub writes: u64,
    /// Stale lines whose fresh amount was within tolerance.
    pub skipped_writes: u64,
}

// =============================================================================
// Sync Controller
// =============================================================================

#[derive(Debug)]
struct State {
    document: Document,
    stale: HashSet<String>,
    last_totals: Option<DocumentTotals>,
    stats: SyncStats,
}

/// Events waiting for delivery, keyed by pass number.
#[derive(Debug, Default)]
struct Outbox {
    pending: Option<(u64, TotalsChanged)>,
    delivered: u64,
    delivering: bool,
}

#[derive(Debug)]
struct Inner {
    config: ControllerConfig,
    state: Mutex<State>,
    outbox: Mutex<Outbox>,
    debouncer: Debouncer,
    totals_changed: Observable<TotalsChanged>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn outbox(&self) -> MutexGuard<'_, Outbox> {
        self.outbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delivers `event` unless a later pass is already delivered or queued.
    ///
    /// Only one thread delivers at a time. A publish that arrives while
    /// another is delivering leaves its event in the outbox for that thread.
    fn publish(&self, pass: u64, event: TotalsChanged) {
        let mut outbox = self.outbox();
        let superseded = pass <= outbox.delivered
            || outbox.pending.as_ref().is_some_and(|(queued, _)| *queued > pass);
        if superseded {
            debug!(pass, "Totals superseded by a later pass, dropping");
            return;
        }

        outbox.pending = Some((pass, event));
        if outbox.delivering {
            return;
        }

        outbox.delivering = true;
        while let Some((pass, event)) = outbox.pending.take() {
            outbox.delivered = pass;
            drop(outbox);
            // Outside both locks: subscribers may read or edit the controller.
            self.totals_changed.notify(&event);
            outbox = self.outbox();
        }
        outbox.delivering = false;
    }

    /// One recompute pass: stale lines, then totals, then notify.
    fn recompute(&self) {
        let event = {
            let mut state = self.lock();
            let State {
                document,
                stale,
                last_totals,
                stats,
            } = &mut *state;

            let mut writes = 0usize;
            for id in stale.drain() {
                let Some(line) = document.line_mut(&id) else {
                    continue;
                };
                if line.sync_amount(self.config.tolerance) {
                    writes += 1;
                    stats.writes += 1;
                } else {
                    debug!(line_id = %id, "Amount within tolerance, skipping write");
                    stats.skipped_writes += 1;
                }
            }

            let totals = document.totals();
            stats.recomputations += 1;
            debug!(
                writes,
                grand_total = %totals.grand_total,
                pass = stats.recomputations,
                "Recomputed document"
            );

            if last_totals.as_ref() == Some(&totals) && writes == 0 {
                None
            } else {
                *last_totals = Some(totals);
                Some((stats.recomputations, TotalsChanged { totals, writes }))
            }
        };

        if let Some((pass, event)) = event {
            self.publish(pass, event);
        }
    }
}

/// Recompute-on-change controller for one open document.
///
/// Cheap to clone; clones share the same document.
///
/// ## Example
/// ```rust
/// use tally_core::{Document, DocumentKind};
/// use tally_sync::{ControllerConfig, FieldChange, LineField, SyncController};
///
/// let controller = SyncController::new(
///     Document::new(DocumentKind::Invoice),
///     ControllerConfig::immediate(),
/// );
/// let id = controller.add_line();
/// controller.apply(FieldChange::new(&id, LineField::Quantity, "2"));
/// controller.apply(FieldChange::new(&id, LineField::Rate, 100));
/// controller.apply(FieldChange::new(&id, LineField::DiscountPercent, "10"));
/// controller.apply(FieldChange::new(&id, LineField::TaxLabel, "GST 18%"));
///
/// assert_eq!(controller.totals().subtotal.to_string(), "212.40");
/// ```
#[derive(Debug, Clone)]
pub struct SyncController {
    inner: Arc<Inner>,
}

impl SyncController {
    /// Takes ownership of `document`. Lines whose cached amount is already
    /// off start out Stale.
    pub fn new(document: Document, config: ControllerConfig) -> Self {
        let stale = document
            .lines()
            .iter()
            .filter(|l| l.is_stale(config.tolerance))
            .map(|l| l.id.clone())
            .collect();

        info!(
            kind = %document.kind,
            lines = document.lines().len(),
            mode = %config.mode,
            "Sync controller started"
        );

        SyncController {
            inner: Arc::new(Inner {
                debouncer: Debouncer::new(config.debounce),
                config,
                state: Mutex::new(State {
                    document,
                    stale,
                    last_totals: None,
                    stats: SyncStats::default(),
                }),
                outbox: Mutex::new(Outbox::default()),
                totals_changed: Observable::new(),
            }),
        }
    }

    /// Subscribes this controller to a form's edit stream.
    pub fn attach(&self, edits: &Observable<FieldChange>) -> SubscriptionId {
        let controller = self.clone();
        edits.subscribe(move |change| controller.apply(change.clone()))
    }

    /// Stream of recompute results for display.
    pub fn totals_changed(&self) -> &Observable<TotalsChanged> {
        &self.inner.totals_changed
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    // =========================================================================
    // Edits
    // =========================================================================

    /// Applies one line edit. Unknown line ids are logged and ignored.
    pub fn apply(&self, change: FieldChange) {
        {
            let mut state = self.inner.lock();
            state.stats.notifications += 1;
            trace!(line_id = %change.line_id, field = %change.field, value = %change.value, "Field changed");

            let Some(line) = state.document.line_mut(&change.line_id) else {
                warn!(line_id = %change.line_id, "Edit for unknown line, ignoring");
                return;
            };
            set_field(line, change.field, &change.value);
            state.stale.insert(change.line_id);
        }
        self.trigger();
    }

    /// Applies one document-level edit. Totals only; no line goes Stale.
    pub fn apply_header(&self, change: HeaderChange) {
        {
            let mut state = self.inner.lock();
            state.stats.notifications += 1;
            trace!(?change, "Header changed");

            let header = &mut state.document.header;
            match &change {
                HeaderChange::DiscountPercent(v) => {
                    header.discount_percent = to_number(v, Decimal::ZERO)
                }
                HeaderChange::TaxTreatment(v) => header.tax_treatment = tax_treatment_from_value(v),
                HeaderChange::TaxRate(v) => header.tax_rate_percent = parse_percentage_label(v),
                HeaderChange::Adjustment(v) => header.adjustment = to_number(v, Decimal::ZERO),
                HeaderChange::RoundingMode(v) => header.rounding_mode = rounding_mode_from_value(v),
            }
        }
        self.trigger();
    }

    /// Appends a blank row (quantity 1, amount 0) and returns its id.
    pub fn add_line(&self) -> String {
        self.inner.lock().document.add_line()
    }

    /// Appends a pre-filled row. It starts Stale if its cached amount is off.
    pub fn add_line_item(&self, item: LineItem) -> String {
        let stale = item.is_stale(self.inner.config.tolerance);
        let id = {
            let mut state = self.inner.lock();
            let id = state.document.add_line_item(item);
            if stale {
                state.stale.insert(id.clone());
            }
            id
        };
        self.trigger();
        id
    }

    /// Removes a row. Returns false if no row had that id.
    pub fn remove_line(&self, id: &str) -> bool {
        let removed = {
            let mut state = self.inner.lock();
            state.stale.remove(id);
            state.document.remove_line(id)
        };
        if removed {
            self.trigger();
        } else {
            warn!(line_id = %id, "Remove for unknown line, ignoring");
        }
        removed
    }

    /// Runs any pending recomputation now.
    pub fn flush(&self) {
        self.inner.debouncer.cancel();
        self.inner.recompute();
    }

    fn trigger(&self) {
        match self.inner.config.mode {
            SyncMode::Immediate => self.inner.recompute(),
            SyncMode::Debounced => {
                let weak: Weak<Inner> = Arc::downgrade(&self.inner);
                let scheduled = self.inner.debouncer.schedule(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.recompute();
                    }
                });
                if !scheduled {
                    warn!("No tokio runtime for debounced sync, recomputing now");
                    self.inner.recompute();
                }
            }
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// `None` if no row has that id.
    pub fn line_state(&self, id: &str) -> Option<LineState> {
        let state = self.inner.lock();
        state.document.line(id)?;
        Some(if state.stale.contains(id) {
            LineState::Stale
        } else {
            LineState::Stable
        })
    }

    /// True while a debounced recomputation is waiting to fire.
    pub fn is_pending(&self) -> bool {
        self.inner.debouncer.is_pending()
    }

    /// Copy of the current document.
    pub fn document(&self) -> Document {
        self.inner.lock().document.clone()
    }

    /// Totals for the current inputs, whether or not a pass has run.
    pub fn totals(&self) -> DocumentTotals {
        self.inner.lock().document.totals()
    }

    /// Flushes, then freezes the document for submission.
    pub fn snapshot(&self) -> DocumentSnapshot {
        self.flush();
        self.inner.lock().document.snapshot()
    }

    pub fn stats(&self) -> SyncStats {
        self.inner.lock().stats
    }
}

/// Coerces a raw form value into the edited field.
fn set_field(line: &mut LineItem, field: LineField, value: &Value) {
    match field {
        LineField::Quantity => line.quantity = to_number(value, DEFAULT_QUANTITY),
        LineField::Rate => line.rate = to_number(value, Decimal::ZERO),
        LineField::DiscountPercent => line.discount_percent = to_number(value, Decimal::ZERO),
        LineField::TaxPercent => line.tax_percent = parse_percentage_label(value),
        LineField::TaxLabel => {
            line.tax_percent = parse_percentage_label(value);
            line.tax_label = match value {
                Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
                _ => None,
            };
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tally_core::{DocumentKind, RoundingMode, TaxTreatment, WRITE_BACK_TOLERANCE};
    use tokio::time::sleep;

    fn immediate() -> SyncController {
        SyncController::new(Document::new(DocumentKind::Invoice), ControllerConfig::immediate())
    }

    fn fill_reference_line(controller: &SyncController, id: &str) {
        controller.apply(FieldChange::new(id, LineField::Quantity, 2));
        controller.apply(FieldChange::new(id, LineField::Rate, "100"));
        controller.apply(FieldChange::new(id, LineField::DiscountPercent, 10));
        controller.apply(FieldChange::new(id, LineField::TaxLabel, "GST 18%"));
    }

    #[test]
    fn test_immediate_reference_scenario() {
        let controller = immediate();
        let id = controller.add_line();
        fill_reference_line(&controller, &id);

        controller.apply_header(HeaderChange::TaxTreatment(json!("TDS")));
        controller.apply_header(HeaderChange::TaxRate(json!(5)));
        controller.apply_header(HeaderChange::RoundingMode(json!("nearest")));

        let doc = controller.document();
        assert_eq!(doc.line(&id).unwrap().amount, dec!(212.40));
        assert_eq!(doc.line(&id).unwrap().tax_label.as_deref(), Some("GST 18%"));

        let totals = controller.totals();
        assert_eq!(totals.tax_amount, dec!(-10.62));
        assert_eq!(totals.round_off, dec!(0.22));
        assert_eq!(totals.grand_total, dec!(202.00));

        let stats = controller.stats();
        assert_eq!(stats.notifications, 7);
        assert_eq!(stats.recomputations, 7);
        assert_eq!(controller.line_state(&id), Some(LineState::Stable));
    }

    #[test]
    fn test_repeat_edit_is_not_written_again() {
        let controller = immediate();
        let id = controller.add_line();
        controller.apply(FieldChange::new(&id, LineField::Rate, 50));
        controller.apply(FieldChange::new(&id, LineField::Rate, 50));

        let stats = controller.stats();
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.skipped_writes, 1);
    }

    #[test]
    fn test_malformed_values_are_coerced() {
        let controller = immediate();
        let id = controller.add_line();
        controller.apply(FieldChange::new(&id, LineField::Rate, "12"));
        controller.apply(FieldChange::new(&id, LineField::Quantity, ""));
        controller.apply(FieldChange::new(&id, LineField::DiscountPercent, "abc"));
        controller.apply(FieldChange::new(&id, LineField::TaxPercent, Value::Null));

        let line = controller.document().line(&id).cloned().unwrap();
        assert_eq!(line.quantity, dec!(1));
        assert_eq!(line.discount_percent, dec!(0));
        assert_eq!(line.tax_percent, dec!(0));
        assert_eq!(line.amount, dec!(12));
    }

    #[test]
    fn test_unknown_line_is_ignored() {
        let controller = immediate();
        controller.apply(FieldChange::new("missing", LineField::Rate, 10));
        assert!(!controller.remove_line("missing"));

        let stats = controller.stats();
        assert_eq!(stats.notifications, 1);
        assert_eq!(stats.recomputations, 0);
        assert_eq!(controller.line_state("missing"), None);
    }

    #[test]
    fn test_remove_line_updates_totals() {
        let controller = immediate();
        let a = controller.add_line();
        let b = controller.add_line();
        controller.apply(FieldChange::new(&a, LineField::Rate, 10));
        controller.apply(FieldChange::new(&b, LineField::Rate, 5));
        assert_eq!(controller.totals().subtotal, dec!(15));

        assert!(controller.remove_line(&a));
        assert_eq!(controller.totals().subtotal, dec!(5));
    }

    #[test]
    fn test_header_discount_for_bill() {
        let controller = SyncController::new(Document::new(DocumentKind::Bill), ControllerConfig::immediate());
        let id = controller.add_line();
        controller.apply(FieldChange::new(&id, LineField::Rate, 200));
        controller.apply_header(HeaderChange::DiscountPercent(json!("10")));
        controller.apply_header(HeaderChange::TaxTreatment(json!("TCS")));
        controller.apply_header(HeaderChange::TaxRate(json!("TCS 1%")));
        controller.apply_header(HeaderChange::Adjustment(json!(-0.2)));
        controller.apply_header(HeaderChange::RoundingMode(json!("floor")));

        let totals = controller.totals();
        assert_eq!(totals.discount_amount, dec!(20));
        assert_eq!(totals.taxable_amount, dec!(180));
        assert_eq!(totals.tax_amount, dec!(1.80));
        assert_eq!(totals.round_off, dec!(-0.60));
        assert_eq!(totals.grand_total, dec!(181));
        assert_eq!(controller.document().header.tax_treatment, Some(TaxTreatment::Tcs));
        assert_eq!(controller.document().header.rounding_mode, RoundingMode::Floor);
    }

    #[test]
    fn test_totals_changed_only_when_totals_move() {
        let controller = immediate();
        let events = Arc::new(AtomicUsize::new(0));
        {
            let events = Arc::clone(&events);
            controller.totals_changed().subscribe(move |_| {
                events.fetch_add(1, Ordering::SeqCst);
            });
        }

        let id = controller.add_line();
        controller.apply(FieldChange::new(&id, LineField::Rate, 10));
        controller.apply(FieldChange::new(&id, LineField::Rate, 10));
        controller.apply_header(HeaderChange::Adjustment(json!(0)));
        assert_eq!(events.load(Ordering::SeqCst), 1);

        controller.apply_header(HeaderChange::Adjustment(json!(1)));
        assert_eq!(events.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_subscriber_can_read_controller() {
        let controller = immediate();
        let seen = Arc::new(Mutex::new(None));
        {
            let seen = Arc::clone(&seen);
            let reader = controller.clone();
            controller.totals_changed().subscribe(move |event| {
                assert_eq!(reader.totals(), event.totals);
                *seen.lock().unwrap() = Some(event.totals.grand_total);
            });
        }

        let id = controller.add_line();
        controller.apply(FieldChange::new(&id, LineField::Rate, 7));
        assert_eq!(*seen.lock().unwrap(), Some(dec!(7)));
    }

    #[test]
    fn test_attach_to_edit_stream() {
        let edits = Observable::<FieldChange>::new();
        let controller = immediate();
        let id = controller.add_line();
        let sub = controller.attach(&edits);

        edits.notify(&FieldChange::new(&id, LineField::Rate, 9));
        assert_eq!(controller.totals().grand_total, dec!(9));

        assert!(edits.unsubscribe(sub));
        edits.notify(&FieldChange::new(&id, LineField::Rate, 1));
        assert_eq!(controller.totals().grand_total, dec!(9));
    }

    #[test]
    fn test_preloaded_stale_lines_are_fixed_on_flush() {
        let mut doc = Document::new(DocumentKind::Invoice);
        let mut item = LineItem::with_values(dec!(2), dec!(100), dec!(10), dec!(18));
        item.amount = dec!(200);
        let id = doc.add_line_item(item);

        let controller = SyncController::new(doc, ControllerConfig::immediate());
        assert_eq!(controller.line_state(&id), Some(LineState::Stale));

        controller.flush();
        assert_eq!(controller.line_state(&id), Some(LineState::Stable));
        assert_eq!(controller.document().line(&id).unwrap().amount, dec!(212.40));
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounced_burst_recomputes_once() {
        let controller =
            SyncController::new(Document::new(DocumentKind::Invoice), ControllerConfig::debounced(120));
        let id = controller.add_line();
        controller.apply(FieldChange::new(&id, LineField::Rate, 100));

        for qty in ["1", "12", "125", "12", "1", "2"] {
            controller.apply(FieldChange::new(&id, LineField::Quantity, qty));
            sleep(Duration::from_millis(30)).await;
        }
        assert_eq!(controller.stats().recomputations, 0);
        assert_eq!(controller.line_state(&id), Some(LineState::Stale));
        assert!(controller.is_pending());

        sleep(Duration::from_millis(200)).await;

        let stats = controller.stats();
        assert_eq!(stats.notifications, 7);
        assert_eq!(stats.recomputations, 1);
        assert_eq!(stats.writes, 1);
        assert_eq!(controller.document().line(&id).unwrap().amount, dec!(200));
        assert_eq!(controller.line_state(&id), Some(LineState::Stable));
        assert!(!controller.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounced_separate_bursts() {
        let controller =
            SyncController::new(Document::new(DocumentKind::Quote), ControllerConfig::debounced(120));
        let id = controller.add_line();

        controller.apply(FieldChange::new(&id, LineField::Rate, 10));
        sleep(Duration::from_millis(300)).await;
        controller.apply(FieldChange::new(&id, LineField::Rate, 20));
        sleep(Duration::from_millis(300)).await;

        assert_eq!(controller.stats().recomputations, 2);
        assert_eq!(controller.totals().grand_total, dec!(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_cancels_pending_timer() {
        let controller =
            SyncController::new(Document::new(DocumentKind::Invoice), ControllerConfig::debounced(120));
        let id = controller.add_line();
        controller.apply(FieldChange::new(&id, LineField::Rate, 42));

        controller.flush();
        assert_eq!(controller.stats().recomputations, 1);
        assert_eq!(controller.document().line(&id).unwrap().amount, dec!(42));

        sleep(Duration::from_millis(500)).await;
        assert_eq!(controller.stats().recomputations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_flushes_first() {
        let controller =
            SyncController::new(Document::new(DocumentKind::Invoice), ControllerConfig::debounced(120));
        let id = controller.add_line();
        controller.apply(FieldChange::new(&id, LineField::Rate, "99.99"));

        let snap = controller.snapshot();
        assert_eq!(snap.lines[0].amount, dec!(99.99));
        assert_eq!(snap.totals.grand_total, dec!(99.99));
        assert_eq!(controller.line_state(&id), Some(LineState::Stable));
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_prefilled_stale_line_debounced() {
        let controller =
            SyncController::new(Document::new(DocumentKind::Invoice), ControllerConfig::debounced(120));
        let mut item = LineItem::with_values(dec!(2), dec!(100), dec!(10), dec!(18));
        item.amount = dec!(200);

        let id = controller.add_line_item(item);
        assert_eq!(controller.line_state(&id), Some(LineState::Stale));
        assert!(controller.is_pending());

        sleep(Duration::from_millis(200)).await;

        assert_eq!(controller.document().line(&id).unwrap().amount, dec!(212.40));
        assert_eq!(controller.line_state(&id), Some(LineState::Stable));
        let stats = controller.stats();
        assert_eq!(stats.recomputations, 1);
        assert_eq!(stats.writes, 1);
    }

    #[test]
    fn test_add_converged_line_starts_stable() {
        let controller = immediate();
        let mut item = LineItem::with_values(dec!(2), dec!(100), dec!(10), dec!(18));
        item.sync_amount(WRITE_BACK_TOLERANCE);

        let id = controller.add_line_item(item);
        assert_eq!(controller.line_state(&id), Some(LineState::Stable));
        assert_eq!(controller.totals().subtotal, dec!(212.40));

        let stats = controller.stats();
        assert_eq!(stats.recomputations, 1);
        assert_eq!(stats.writes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_line_debounced() {
        let controller =
            SyncController::new(Document::new(DocumentKind::Invoice), ControllerConfig::debounced(120));
        let a = controller.add_line();
        let b = controller.add_line();
        controller.apply(FieldChange::new(&a, LineField::Rate, 10));
        controller.apply(FieldChange::new(&b, LineField::Rate, 5));
        sleep(Duration::from_millis(200)).await;
        assert_eq!(controller.totals().subtotal, dec!(15));

        controller.apply(FieldChange::new(&a, LineField::Rate, 30));
        assert!(controller.remove_line(&a));
        assert_eq!(controller.line_state(&a), None);
        assert!(controller.is_pending());

        sleep(Duration::from_millis(200)).await;

        let stats = controller.stats();
        assert_eq!(stats.recomputations, 2);
        assert_eq!(stats.writes, 2);
        assert_eq!(controller.totals().subtotal, dec!(5));
        assert!(!controller.is_pending());
    }

    #[test]
    fn test_default_config_without_runtime_recomputes_now() {
        let controller =
            SyncController::new(Document::new(DocumentKind::Invoice), ControllerConfig::default());
        assert_eq!(controller.config().mode, SyncMode::Debounced);

        let id = controller.add_line();
        controller.apply(FieldChange::new(&id, LineField::Rate, 10));
        controller.apply_header(HeaderChange::Adjustment(json!(1)));
        assert!(!controller.is_pending());
        assert_eq!(controller.document().line(&id).unwrap().amount, dec!(10));
        assert_eq!(controller.totals().grand_total, dec!(11));

        assert!(controller.remove_line(&id));
        let line = LineItem::with_values(dec!(1), dec!(4), dec!(0), dec!(0));
        controller.add_line_item(line);
        assert_eq!(controller.stats().recomputations, 4);
        assert_eq!(controller.totals().grand_total, dec!(5));
    }

    fn record_grand_totals(controller: &SyncController) -> Arc<Mutex<Vec<Decimal>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        controller.totals_changed().subscribe(move |event| {
            sink.lock().unwrap().push(event.totals.grand_total);
        });
        seen
    }

    fn totals_event(grand_total: Decimal) -> TotalsChanged {
        TotalsChanged {
            totals: DocumentTotals {
                grand_total,
                ..DocumentTotals::default()
            },
            writes: 0,
        }
    }

    #[test]
    fn test_older_pass_is_not_published_after_newer() {
        let controller = immediate();
        let seen = record_grand_totals(&controller);

        controller.inner.publish(2, totals_event(dec!(20)));
        controller.inner.publish(1, totals_event(dec!(10)));
        controller.inner.publish(2, totals_event(dec!(20)));
        controller.inner.publish(3, totals_event(dec!(30)));

        assert_eq!(*seen.lock().unwrap(), vec![dec!(20), dec!(30)]);
    }

    #[test]
    fn test_edit_from_subscriber_is_delivered_after_callback() {
        let controller = immediate();
        let id = controller.add_line();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            let editor = controller.clone();
            let id = id.clone();
            controller.totals_changed().subscribe(move |event| {
                seen.lock().unwrap().push(event.totals.grand_total);
                if event.totals.grand_total == dec!(10) {
                    editor.apply(FieldChange::new(&id, LineField::Rate, 20));
                }
            });
        }

        controller.apply(FieldChange::new(&id, LineField::Rate, 10));

        assert_eq!(*seen.lock().unwrap(), vec![dec!(10), dec!(20)]);
        assert_eq!(controller.totals().grand_total, dec!(20));
    }

    #[test]
    fn test_concurrent_passes_end_on_stored_totals() {
        let controller = immediate();
        let seen = record_grand_totals(&controller);
        let ids: Vec<String> = (0..4).map(|_| controller.add_line()).collect();

        let workers: Vec<_> = ids
            .into_iter()
            .map(|id| {
                let controller = controller.clone();
                std::thread::spawn(move || {
                    for rate in 1..=50 {
                        controller.apply(FieldChange::new(&id, LineField::Rate, rate));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let last = seen.lock().unwrap().last().copied();
        assert_eq!(last, Some(controller.totals().grand_total));
        assert_eq!(controller.totals().grand_total, dec!(200));
    }

    #[test]
    fn test_config_from_sync_config() {
        let mut config = SyncConfig::default();
        config.sync.debounce_ms = 250;
        let controller_config = ControllerConfig::from(&config);
        assert_eq!(controller_config.mode, SyncMode::Debounced);
        assert_eq!(controller_config.debounce, Duration::from_millis(250));
        assert_eq!(controller_config.tolerance, dec!(0.01));
    }
}
