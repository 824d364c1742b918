use std::collections::BTreeMap;

use crate::model::{ComponentKind, Fraction, SyncPolicy};

/// Float slack when comparing deltas against the policy.
const DELTA_EPSILON: f64 = 1e-9;

/// Progress of one component for the current learner.
///
/// `fraction` is the local, optimistic value; `last_synced` is the last value
/// the backend acknowledged. Neither ever decreases.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    kind: ComponentKind,
    fraction: Fraction,
    completed: bool,
    last_synced: Fraction,
    update_in_flight: bool,
}

impl ProgressRecord {
    fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            fraction: Fraction::ZERO,
            completed: false,
            last_synced: Fraction::ZERO,
            update_in_flight: false,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    #[must_use]
    pub fn fraction(&self) -> Fraction {
        self.fraction
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn last_synced(&self) -> Fraction {
        self.last_synced
    }

    #[must_use]
    pub fn update_in_flight(&self) -> bool {
        self.update_in_flight
    }
}

/// Why an update request did not turn into a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The component is already completed.
    Completed,
    /// Another write for the same component has not resolved yet.
    InFlight,
    /// The value does not exceed what the backend already holds.
    NotAdvanced,
    /// The advance is below the minimum delta and crosses no boundary.
    BelowDelta,
}

/// Outcome of [`ProgressStore::plan_update`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpdateDecision {
    /// Write this value; the record is now marked in flight.
    Write(Fraction),
    Skip(SkipReason),
}

/// Per-class progress state and the write-filtering rules applied to it.
///
/// The store performs no I/O. Callers ask it whether a write should happen,
/// perform the write, then report back with `confirm_*` or `abandon_update`.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    policy: SyncPolicy,
    records: BTreeMap<ComponentKind, ProgressRecord>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(policy: SyncPolicy) -> Self {
        Self {
            policy,
            records: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn policy(&self) -> &SyncPolicy {
        &self.policy
    }

    /// Apply a server-confirmed value, e.g. from the initial fetch.
    ///
    /// Returns `true` if this made the component completed.
    pub fn seed(&mut self, kind: ComponentKind, confirmed: Fraction) -> bool {
        let threshold = self.policy.completion_threshold(kind);
        let record = self
            .records
            .entry(kind)
            .or_insert_with(|| ProgressRecord::new(kind));
        record.fraction = record.fraction.max(confirmed);
        record.last_synced = record.last_synced.max(confirmed);
        mark_completed_if(record, confirmed.value() >= threshold)
    }

    #[must_use]
    pub fn record(&self, kind: ComponentKind) -> Option<&ProgressRecord> {
        self.records.get(&kind)
    }

    /// Local fraction, zero for components never touched.
    #[must_use]
    pub fn fraction(&self, kind: ComponentKind) -> Fraction {
        self.records
            .get(&kind)
            .map_or(Fraction::ZERO, ProgressRecord::fraction)
    }

    #[must_use]
    pub fn is_completed(&self, kind: ComponentKind) -> bool {
        self.records.get(&kind).is_some_and(ProgressRecord::completed)
    }

    /// Mean local fraction over `kinds`; zero for an empty slice.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn aggregate(&self, kinds: &[ComponentKind]) -> Fraction {
        if kinds.is_empty() {
            return Fraction::ZERO;
        }
        let total: f64 = kinds.iter().map(|k| self.fraction(*k).value()).sum();
        Fraction::clamped(total / kinds.len() as f64).unwrap_or_default()
    }

    /// Advance the local value and decide whether a backend write is due.
    ///
    /// A write happens only when nothing is in flight for the component, the
    /// component is not completed, and the value either advances at least
    /// `min_delta` past `last_synced` or crosses the sync boundary.
    pub fn plan_update(&mut self, kind: ComponentKind, requested: Fraction) -> UpdateDecision {
        let min_delta = self.policy.min_delta();
        let boundary = self.policy.sync_boundary();
        let record = self
            .records
            .entry(kind)
            .or_insert_with(|| ProgressRecord::new(kind));

        record.fraction = record.fraction.max(requested);

        if record.completed {
            return UpdateDecision::Skip(SkipReason::Completed);
        }
        if record.update_in_flight {
            return UpdateDecision::Skip(SkipReason::InFlight);
        }

        let last = record.last_synced.value();
        let next = requested.value();
        if next <= last {
            return UpdateDecision::Skip(SkipReason::NotAdvanced);
        }

        let crosses_boundary = last < boundary && next >= boundary;
        if next - last + DELTA_EPSILON >= min_delta || crosses_boundary {
            record.update_in_flight = true;
            UpdateDecision::Write(requested)
        } else {
            UpdateDecision::Skip(SkipReason::BelowDelta)
        }
    }

    /// Record a write the backend acknowledged.
    ///
    /// Returns `true` if the written value completed the component.
    pub fn confirm_update(&mut self, kind: ComponentKind, written: Fraction) -> bool {
        let threshold = self.policy.completion_threshold(kind);
        let Some(record) = self.records.get_mut(&kind) else {
            return false;
        };
        record.update_in_flight = false;
        record.last_synced = record.last_synced.max(written);
        mark_completed_if(record, written.value() >= threshold)
    }

    /// Release the in-flight guard after a failed write.
    ///
    /// `last_synced` is left untouched so the next qualifying delta retries.
    pub fn abandon_update(&mut self, kind: ComponentKind) {
        if let Some(record) = self.records.get_mut(&kind) {
            record.update_in_flight = false;
        }
    }

    /// Optimistically complete the component ahead of the backend write.
    ///
    /// Returns `true` only on the first completion of the component.
    pub fn begin_completion(&mut self, kind: ComponentKind) -> bool {
        let record = self
            .records
            .entry(kind)
            .or_insert_with(|| ProgressRecord::new(kind));
        record.fraction = Fraction::ONE;
        mark_completed_if(record, true)
    }

    pub fn confirm_completion(&mut self, kind: ComponentKind) {
        if let Some(record) = self.records.get_mut(&kind) {
            record.last_synced = Fraction::ONE;
        }
    }
}

fn mark_completed_if(record: &mut ProgressRecord, condition: bool) -> bool {
    if condition && !record.completed {
        record.completed = true;
        true
    } else {
        false
    }
}
