//! JSON interchange form of an event set.
//!
//! Event-set files name events by a caller-chosen `label` and express
//! dependencies as label references:
//!
//! ```json
//! {"events": [
//!   {"label": "ps1", "key": "I12ab", "when": "2024-03-01T10:00:00Z",
//!    "kind": "patch_set", "author": "alice", "patch_set": 1},
//!   {"label": "c1", "key": "I12ab", "when": "2024-03-01T09:59:58Z",
//!    "kind": "comment", "author": "bob", "depends_on": ["ps1"]}
//! ]}
//! ```
//!
//! A record with `"working": false` is loaded into the arena but left out of
//! the working set, which is how a file expresses a dependency on an event
//! the sorter must not see.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AggregateKey, Event, EventId, EventKind, EventSet, UnknownEventKind};
use crate::error::ErrorCode;

/// Errors from turning an [`EventSetFile`] into an [`EventSet`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// The input was not a valid event-set document.
    #[error("invalid event set: {0}")]
    Parse(String),

    /// A record's `kind` is not a known [`EventKind`].
    #[error("invalid event set: {0}")]
    UnknownKind(String),

    /// Two records share a label.
    #[error("duplicate event label '{0}'")]
    DuplicateLabel(String),

    /// A `depends_on` entry names a label that no record carries.
    #[error("event '{event}' depends on unknown label '{dependency}'")]
    UnknownLabel { event: String, dependency: String },
}

impl LoadError {
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Parse(_) => ErrorCode::EventSetParseError,
            Self::UnknownKind(_) => ErrorCode::UnknownEventKind,
            Self::DuplicateLabel(_) => ErrorCode::DuplicateLabel,
            Self::UnknownLabel { .. } => ErrorCode::UnknownLabel,
        }
    }
}

/// One event as it appears in an event-set file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub label: String,
    pub key: AggregateKey,
    pub when: DateTime<Utc>,
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_set: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub post_submit: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default = "default_true")]
    pub working: bool,
}

/// Top-level event-set document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSetFile {
    pub events: Vec<EventRecord>,
}

/// An event set resolved from a file, with the label of every event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedEventSet {
    pub set: EventSet,
    /// Ids of records marked `working`, in file order.
    pub working: Vec<EventId>,
    labels: Vec<String>,
}

impl LoadedEventSet {
    /// Label of an event loaded from the file.
    ///
    /// Events pushed into the arena after loading have no label and are
    /// rendered as their kind.
    #[must_use]
    pub fn label(&self, id: EventId) -> String {
        self.labels.get(id.index()).cloned().unwrap_or_else(|| {
            self.set
                .get(id)
                .map_or_else(|| id.to_string(), |event| event.kind.to_string())
        })
    }

    /// Look up an event id by label.
    #[must_use]
    pub fn find(&self, label: &str) -> Option<EventId> {
        self.labels.iter().position(|l| l == label).map(EventId)
    }
}

impl EventSetFile {
    /// Parse an event-set document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::UnknownKind`] for a record with an unrecognised
    /// `kind`, and [`LoadError::Parse`] for any other invalid document.
    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        serde_json::from_str(text).map_err(|e| {
            let message = e.to_string();
            if e.is_data() && message.starts_with(UnknownEventKind::PREFIX) {
                LoadError::UnknownKind(message)
            } else {
                LoadError::Parse(message)
            }
        })
    }

    /// Resolve labels into an [`EventSet`] arena.
    ///
    /// Records are pushed in file order, so the id of the n-th record is
    /// `EventId(n)`. Dependencies keep the order they are listed in.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::DuplicateLabel`] when two records share a label
    /// and [`LoadError::UnknownLabel`] when a dependency names no record.
    pub fn into_event_set(self) -> Result<LoadedEventSet, LoadError> {
        let mut index: HashMap<String, EventId> = HashMap::with_capacity(self.events.len());
        for (idx, record) in self.events.iter().enumerate() {
            if index.insert(record.label.clone(), EventId(idx)).is_some() {
                return Err(LoadError::DuplicateLabel(record.label.clone()));
            }
        }

        let mut set = EventSet::with_capacity(self.events.len());
        let mut working = Vec::with_capacity(self.events.len());
        let mut labels = Vec::with_capacity(self.events.len());

        for record in self.events {
            let mut event = Event::new(record.key, record.when, record.kind);
            event.author = record.author;
            event.patch_set = record.patch_set;
            event.tag = record.tag;
            event.message = record.message;
            event.post_submit = record.post_submit;

            for dep in &record.depends_on {
                let Some(&dep_id) = index.get(dep) else {
                    return Err(LoadError::UnknownLabel {
                        event: record.label,
                        dependency: dep.clone(),
                    });
                };
                event.add_dep(dep_id);
            }

            let id = set.push(event);
            if record.working {
                working.push(id);
            }
            labels.push(record.label);
        }

        Ok(LoadedEventSet {
            set,
            working,
            labels,
        })
    }
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"events": [
        {"label": "ps1", "key": "I12ab", "when": "2024-03-01T10:00:00Z",
         "kind": "patch_set", "author": "alice", "patch_set": 1},
        {"label": "c1", "key": "I12ab", "when": "2024-03-01T09:59:58Z",
         "kind": "comment", "author": "bob", "depends_on": ["ps1"]},
        {"label": "old", "key": "I12ab", "when": "2024-03-01T09:00:00Z",
         "kind": "change_message", "working": false}
    ]}"#;

    #[test]
    fn loads_records_in_file_order() {
        let loaded = EventSetFile::from_json(SAMPLE)
            .and_then(EventSetFile::into_event_set)
            .expect("sample must load");

        assert_eq!(loaded.set.len(), 3);
        assert_eq!(loaded.working, vec![EventId(0), EventId(1)]);
        assert_eq!(loaded.label(EventId(1)), "c1");
        assert_eq!(loaded.find("old"), Some(EventId(2)));
        assert_eq!(loaded.set[EventId(1)].depends_on(), &[EventId(0)]);
        assert_eq!(loaded.set[EventId(0)].patch_set, Some(1));
        assert_eq!(loaded.set[EventId(1)].author.as_deref(), Some("bob"));
    }

    #[test]
    fn forward_references_resolve() {
        let text = r#"{"events": [
            {"label": "a", "key": "k", "when": "2024-01-01T00:00:00Z",
             "kind": "comment", "depends_on": ["b"]},
            {"label": "b", "key": "k", "when": "2024-01-01T00:00:01Z", "kind": "patch_set"}
        ]}"#;
        let loaded = EventSetFile::from_json(text)
            .and_then(EventSetFile::into_event_set)
            .expect("forward reference must load");
        assert_eq!(loaded.set[EventId(0)].depends_on(), &[EventId(1)]);
    }

    #[test]
    fn rejects_duplicate_labels() {
        let text = r#"{"events": [
            {"label": "a", "key": "k", "when": "2024-01-01T00:00:00Z", "kind": "comment"},
            {"label": "a", "key": "k", "when": "2024-01-01T00:00:01Z", "kind": "comment"}
        ]}"#;
        let err = EventSetFile::from_json(text)
            .and_then(EventSetFile::into_event_set)
            .unwrap_err();
        assert_eq!(err, LoadError::DuplicateLabel("a".into()));
        assert_eq!(err.error_code(), ErrorCode::DuplicateLabel);
    }

    #[test]
    fn rejects_unknown_dependency_label() {
        let text = r#"{"events": [
            {"label": "a", "key": "k", "when": "2024-01-01T00:00:00Z",
             "kind": "comment", "depends_on": ["ghost"]}
        ]}"#;
        let err = EventSetFile::from_json(text)
            .and_then(EventSetFile::into_event_set)
            .unwrap_err();
        assert!(matches!(err, LoadError::UnknownLabel { ref dependency, .. } if dependency == "ghost"));
    }

    #[test]
    fn rejects_unknown_kind() {
        let text = r#"{"events": [
            {"label": "a", "key": "k", "when": "2024-01-01T00:00:00Z", "kind": "merge"}
        ]}"#;
        let err = EventSetFile::from_json(text).unwrap_err();
        assert!(matches!(err, LoadError::UnknownKind(_)));
        assert!(err.to_string().contains("unknown event kind 'merge'"));
        assert_eq!(err.error_code(), ErrorCode::UnknownEventKind);
    }

    #[test]
    fn missing_field_is_a_plain_parse_error() {
        let err = EventSetFile::from_json(r#"{"events": [{"label": "a"}]}"#).unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
        assert_eq!(err.error_code(), ErrorCode::EventSetParseError);
    }

    #[test]
    fn unlabelled_events_render_as_kind() {
        let mut loaded = EventSetFile::from_json(SAMPLE)
            .and_then(EventSetFile::into_event_set)
            .expect("sample must load");
        let extra = loaded.set.push(Event::new(
            AggregateKey::new("I12ab"),
            Utc::now(),
            EventKind::FinalUpdates,
        ));
        assert_eq!(loaded.label(extra), "final_updates");
    }
}
