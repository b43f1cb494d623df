//! Rebuild a change's note history from its events.
//!
//! The pipeline runs in a fixed order:
//!
//! 1. [`link_post_submit`]: post-submit votes wait on the last submit.
//! 2. Sort the working set with [`EventSorter`].
//! 3. Append a `FinalUpdates` event after everything else.
//! 4. [`fill`]: create-change marker, inherited patch sets, clamped times.
//! 5. [`batch_events`]: group consecutive compatible events into updates.
//! 6. Apply each update to a [`ReplaySink`], in order.
//!
//! [`Rebuilder::plan`] stops after step 5 so callers can inspect the result
//! without writing anything.

mod batch;
mod fill;
mod link;

pub use batch::{UpdateBatch, batch_events};
pub use fill::{FillContext, FillReport, fill};
pub use link::link_post_submit;

use serde::Serialize;
use tracing::{info, instrument};

use crate::config::RebuildConfig;
use crate::error::ErrorCode;
use crate::event::{Event, EventId, EventKind, EventSet};
use crate::replay::{ReplayError, ReplaySink};
use crate::sort::{EventSorter, SortError, SortStats};

/// Errors from [`Rebuilder`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RebuildError {
    #[error("no patch set events in the working set")]
    NoPatchSets,

    #[error(transparent)]
    Sort(#[from] SortError),

    #[error("failed to apply update {index}: {source}")]
    Replay {
        index: usize,
        #[source]
        source: ReplayError,
    },
}

impl RebuildError {
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NoPatchSets => ErrorCode::NoPatchSets,
            Self::Sort(err) => err.error_code(),
            Self::Replay { source, .. } => source.error_code(),
        }
    }
}

/// Counters describing one rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RebuildSummary {
    /// Events in the final order, synthetic ones included.
    pub events: usize,
    /// Updates produced.
    pub updates: usize,
    pub post_submit_links: usize,
    pub synthesized_create: bool,
    pub patch_sets_filled: usize,
    pub clamped: usize,
    pub sort: SortStats,
}

/// A rebuild ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildPlan {
    /// Final event order, including synthetic events.
    pub order: Vec<EventId>,
    pub batches: Vec<UpdateBatch>,
    pub summary: RebuildSummary,
}

/// Runs the rebuild pipeline under one [`RebuildConfig`].
#[derive(Debug, Clone, Default)]
pub struct Rebuilder {
    config: RebuildConfig,
}

impl Rebuilder {
    #[must_use]
    pub const fn new(config: RebuildConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &RebuildConfig {
        &self.config
    }

    /// Order, fill and batch `working` without writing anything.
    ///
    /// Synthetic events are pushed into `set`; post-submit links are added to
    /// existing events.
    ///
    /// # Errors
    ///
    /// [`RebuildError::NoPatchSets`] when `working` has no patch set event,
    /// otherwise whatever the sorter rejects.
    pub fn plan(
        &self,
        set: &mut EventSet,
        working: &[EventId],
        owner: &str,
    ) -> Result<RebuildPlan, RebuildError> {
        let patch_sets: Vec<Option<u32>> = working
            .iter()
            .filter_map(|id| set.get(*id))
            .filter(|e| matches!(e.kind, EventKind::PatchSet))
            .map(|e| e.patch_set)
            .collect();
        if patch_sets.is_empty() {
            return Err(RebuildError::NoPatchSets);
        }
        let min_patch_set = patch_sets.into_iter().flatten().min();

        let mut summary = RebuildSummary::default();
        if self.config.link_post_submit {
            summary.post_submit_links = link_post_submit(set, working);
        }

        let (mut order, stats) = EventSorter::new(set).order_with_stats(working)?;
        summary.sort = stats;

        if self.config.final_updates {
            if let Some(last) = order.iter().filter_map(|id| set.get(*id)).map(Event::when).max() {
                let key = set[order[0]].key.clone();
                let id = set.push(Event::new(key, last, EventKind::FinalUpdates));
                order.push(id);
            }
        }

        let ctx = FillContext {
            owner,
            min_patch_set,
        };
        let filled = fill(set, &mut order, &ctx, self.config.clamp_timestamps);
        summary.synthesized_create = filled.synthesized_create;
        summary.patch_sets_filled = filled.patch_sets_filled;
        summary.clamped = filled.clamped;

        let batches = batch_events(set, &order, &self.config);
        summary.events = order.len();
        summary.updates = batches.len();

        Ok(RebuildPlan {
            order,
            batches,
            summary,
        })
    }

    /// Run the whole pipeline and write the updates to `sink`.
    ///
    /// Stops at the first update the sink rejects; earlier updates stay
    /// written.
    ///
    /// # Errors
    ///
    /// See [`Rebuilder::plan`]; sink failures come back as
    /// [`RebuildError::Replay`].
    #[instrument(skip_all, fields(events = working.len(), owner = %owner))]
    pub fn rebuild<S: ReplaySink>(
        &self,
        set: &mut EventSet,
        working: &[EventId],
        owner: &str,
        sink: &mut S,
    ) -> Result<RebuildSummary, RebuildError> {
        let plan = self.plan(set, working, owner)?;

        for (index, batch) in plan.batches.iter().enumerate() {
            if let Some(update) = batch.to_update(set) {
                sink.apply(&update)
                    .map_err(|source| RebuildError::Replay { index, source })?;
            }
        }

        let summary = plan.summary;
        info!(
            events = summary.events,
            updates = summary.updates,
            broken_edges = summary.sort.broken_edges,
            clamped = summary.clamped,
            "rebuilt note history"
        );
        Ok(summary)
    }
}
