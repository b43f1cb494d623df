use crate::config::RebuildConfig;
use crate::event::{Event, EventId, EventSet};
use crate::replay::NoteUpdate;

/// Consecutive events written together as one update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateBatch {
    events: Vec<EventId>,
}

impl UpdateBatch {
    #[must_use]
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    #[must_use]
    pub fn ids(&self) -> &[EventId] {
        &self.events
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Whether `id` may join this batch.
    ///
    /// A batch only holds events with the same author, patch set and tag,
    /// and at most one of each kind that is unique per update. Timestamps
    /// never go backwards inside a batch; each event is at most
    /// `max_delta_ms` after the previous one and at most `max_window_ms`
    /// after the first. Final updates always travel alone.
    #[must_use]
    pub fn can_add(&self, set: &EventSet, id: EventId, config: &RebuildConfig) -> bool {
        let (Some(&first), Some(&last)) = (self.events.first(), self.events.last()) else {
            return true;
        };
        let (Some(event), Some(first), Some(last)) = (set.get(id), set.get(first), set.get(last))
        else {
            return false;
        };

        if event.is_final_updates() || last.is_final_updates() {
            return false;
        }
        if event.author != last.author || event.patch_set != last.patch_set || event.tag != last.tag
        {
            return false;
        }
        if event.unique_per_update()
            && self
                .events
                .iter()
                .filter_map(|other| set.get(*other))
                .any(|other| other.kind == event.kind)
        {
            return false;
        }

        // Negative deltas fail the conversion and close the batch.
        let since_last = u64::try_from((event.when - last.when).num_milliseconds());
        let since_first = u64::try_from((event.when - first.when).num_milliseconds());
        match (since_last, since_first) {
            (Ok(gap), Ok(span)) => gap <= config.max_delta_ms && span <= config.max_window_ms,
            _ => false,
        }
    }

    pub fn push(&mut self, id: EventId) {
        self.events.push(id);
    }

    /// Borrow the batch as an update for a [`crate::replay::ReplaySink`].
    ///
    /// Returns `None` for an empty batch.
    #[must_use]
    pub fn to_update<'a>(&self, set: &'a EventSet) -> Option<NoteUpdate<'a>> {
        let events: Vec<&'a Event> = self.events.iter().filter_map(|id| set.get(*id)).collect();
        let head = *events.first()?;
        Some(NoteUpdate {
            author: head.author.as_deref(),
            when: head.when,
            patch_set: head.patch_set,
            tag: head.tag.as_deref(),
            events,
        })
    }
}

/// Group a sorted, filled order into updates.
#[must_use]
pub fn batch_events(set: &EventSet, order: &[EventId], config: &RebuildConfig) -> Vec<UpdateBatch> {
    let mut batches = Vec::new();
    let mut current = UpdateBatch::new();

    for &id in order {
        if !current.can_add(set, id, config) {
            batches.push(std::mem::take(&mut current));
        }
        current.push(id);
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}
