//! Event data model for history rebuilds.
//!
//! An [`Event`] is one historical action on a change: a patch set upload, a
//! vote, a comment, a status change. Events live in an [`EventSet`] arena and
//! refer to each other through [`EventId`] indices, so the dependency graph
//! may contain cycles without any ownership cycles.
//!
//! # Identity
//!
//! Two events are the same event iff their [`EventId`]s are equal. Field
//! equality means nothing for ordering purposes: two identical comments
//! posted in the same second are still two events.

pub mod kind;
pub mod record;

pub use kind::{EventKind, UnknownEventKind};
pub use record::{EventRecord, EventSetFile, LoadError, LoadedEventSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of an event inside its [`EventSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub usize);

impl EventId {
    /// Position of the event in its arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of the aggregate (change) an event belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateKey(pub String);

impl AggregateKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AggregateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One atomic, orderable unit of change history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Aggregate the event belongs to. Not consulted by the sorter.
    pub key: AggregateKey,
    /// When the action happened; the natural sort key.
    pub when: DateTime<Utc>,
    pub kind: EventKind,
    /// Account that performed the action. `None` means the server itself.
    pub author: Option<String>,
    /// Patch set the action applies to, if known.
    pub patch_set: Option<u32>,
    pub tag: Option<String>,
    pub message: Option<String>,
    /// Vote cast after the change was submitted.
    pub post_submit: bool,
    /// Set on the patch set event that doubles as the change creation.
    pub creates_change: bool,
    depends_on: Vec<EventId>,
}

impl Event {
    #[must_use]
    pub fn new(key: AggregateKey, when: DateTime<Utc>, kind: EventKind) -> Self {
        Self {
            key,
            when,
            kind,
            author: None,
            patch_set: None,
            tag: None,
            message: None,
            post_submit: false,
            creates_change: false,
            depends_on: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    #[must_use]
    pub const fn with_patch_set(mut self, patch_set: u32) -> Self {
        self.patch_set = Some(patch_set);
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub const fn post_submit(mut self) -> Self {
        self.post_submit = true;
        self
    }

    /// Builder form of [`Event::add_dep`].
    #[must_use]
    pub fn with_dep(mut self, other: EventId) -> Self {
        self.depends_on.push(other);
        self
    }

    /// Register `other` as an event that must precede this one.
    ///
    /// Any id is accepted, including ids that will not be part of the
    /// working set handed to the sorter; the sorter rejects those. Duplicate
    /// links are kept and collapsed at sort time.
    pub fn add_dep(&mut self, other: EventId) -> &mut Self {
        self.depends_on.push(other);
        self
    }

    /// Declared dependencies in the order they were added.
    #[must_use]
    pub fn depends_on(&self) -> &[EventId] {
        &self.depends_on
    }

    #[must_use]
    pub const fn when(&self) -> DateTime<Utc> {
        self.when
    }

    #[must_use]
    pub const fn unique_per_update(&self) -> bool {
        self.kind.unique_per_update()
    }

    #[must_use]
    pub const fn is_submit(&self) -> bool {
        matches!(self.kind, EventKind::Submit)
    }

    #[must_use]
    pub const fn is_post_submit_approval(&self) -> bool {
        self.post_submit && matches!(self.kind, EventKind::Approval)
    }

    #[must_use]
    pub const fn is_final_updates(&self) -> bool {
        matches!(self.kind, EventKind::FinalUpdates)
    }
}

/// Arena holding every event of one rebuild.
///
/// The arena only grows; ids handed out by [`EventSet::push`] stay valid for
/// the lifetime of the set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventSet {
    events: Vec<Event>,
}

impl EventSet {
    #[must_use]
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
        }
    }

    /// Add an event and return its id.
    pub fn push(&mut self, event: Event) -> EventId {
        let id = EventId(self.events.len());
        self.events.push(event);
        id
    }

    #[must_use]
    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.get(id.0)
    }

    pub fn get_mut(&mut self, id: EventId) -> Option<&mut Event> {
        self.events.get_mut(id.0)
    }

    #[must_use]
    pub fn contains(&self, id: EventId) -> bool {
        id.0 < self.events.len()
    }

    /// Make `id` depend on `dep`. Unknown `id`s are ignored.
    pub fn add_dep(&mut self, id: EventId, dep: EventId) {
        if let Some(event) = self.events.get_mut(id.0) {
            event.add_dep(dep);
        }
    }

    /// Every id in the arena, in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = EventId> + '_ {
        (0..self.events.len()).map(EventId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EventId, &Event)> + '_ {
        self.events
            .iter()
            .enumerate()
            .map(|(idx, event)| (EventId(idx), event))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl std::ops::Index<EventId> for EventSet {
    type Output = Event;

    fn index(&self, id: EventId) -> &Event {
        &self.events[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0)
            .single()
            .expect("valid timestamp")
    }

    fn key() -> AggregateKey {
        AggregateKey::new("I8473b95934b5732ac55d26311a706c9c2bde9940")
    }

    #[test]
    fn push_hands_out_sequential_ids() {
        let mut set = EventSet::new();
        let a = set.push(Event::new(key(), at(0), EventKind::PatchSet));
        let b = set.push(Event::new(key(), at(1), EventKind::Comment));
        assert_eq!(a, EventId(0));
        assert_eq!(b, EventId(1));
        assert_eq!(set.len(), 2);
        assert_eq!(set.ids().collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn add_dep_keeps_insertion_order_and_duplicates() {
        let mut event = Event::new(key(), at(0), EventKind::Comment);
        event.add_dep(EventId(3)).add_dep(EventId(1)).add_dep(EventId(3));
        assert_eq!(event.depends_on(), &[EventId(3), EventId(1), EventId(3)]);
    }

    #[test]
    fn add_dep_accepts_ids_outside_the_arena() {
        let mut set = EventSet::new();
        let a = set.push(Event::new(key(), at(0), EventKind::Comment));
        set.add_dep(a, EventId(42));
        assert_eq!(set[a].depends_on(), &[EventId(42)]);
        assert!(!set.contains(EventId(42)));
    }

    #[test]
    fn add_dep_on_unknown_event_is_ignored() {
        let mut set = EventSet::new();
        set.add_dep(EventId(7), EventId(0));
        assert!(set.is_empty());
    }

    #[test]
    fn builder_sets_fields() {
        let event = Event::new(key(), at(5), EventKind::Approval)
            .with_author("alice")
            .with_patch_set(2)
            .with_tag("autogenerated:ci")
            .post_submit()
            .with_dep(EventId(0));
        assert_eq!(event.author.as_deref(), Some("alice"));
        assert_eq!(event.patch_set, Some(2));
        assert_eq!(event.tag.as_deref(), Some("autogenerated:ci"));
        assert!(event.is_post_submit_approval());
        assert!(!event.unique_per_update());
        assert_eq!(event.when(), at(5));
        assert_eq!(event.depends_on(), &[EventId(0)]);
    }

    #[test]
    fn post_submit_flag_only_counts_for_approvals() {
        let event = Event::new(key(), at(0), EventKind::ChangeMessage).post_submit();
        assert!(!event.is_post_submit_approval());
    }

    #[test]
    fn event_id_display() {
        assert_eq!(EventId(12).to_string(), "#12");
    }
}
