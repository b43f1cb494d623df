//! Replay boundary: sorted updates flow into an append-only note log.
//!
//! A [`ReplaySink`] receives [`NoteUpdate`]s strictly in the order the
//! rebuild produced them and must not reorder them. [`NoteLog`] is the
//! in-memory sink: every update becomes a [`NoteCommit`] whose id is a BLAKE3
//! hash over its parent id and content, so the log forms a hash chain that
//! [`NoteLog::verify`] can recheck.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::trace;

use crate::error::ErrorCode;
use crate::event::{Event, EventKind};

/// Errors raised while applying updates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    /// The update is older than the current tip of the log.
    #[error("update at {when} is older than the log tip at {tip}")]
    NonMonotonic {
        when: DateTime<Utc>,
        tip: DateTime<Utc>,
    },

    /// An update with no events carries nothing to write.
    #[error("refusing to apply an empty update")]
    EmptyUpdate,

    /// A stored commit no longer matches its recorded id or parent.
    #[error("note log is corrupt at commit {index}: {reason}")]
    CorruptChain { index: usize, reason: String },
}

impl ReplayError {
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NonMonotonic { .. } => ErrorCode::NonMonotonicUpdate,
            Self::EmptyUpdate => ErrorCode::InternalUnexpected,
            Self::CorruptChain { .. } => ErrorCode::CorruptNoteLog,
        }
    }
}

/// One update to write: consecutive events sharing author, patch set and tag.
#[derive(Debug, Clone)]
pub struct NoteUpdate<'a> {
    pub author: Option<&'a str>,
    /// Timestamp of the first event in the update.
    pub when: DateTime<Utc>,
    pub patch_set: Option<u32>,
    pub tag: Option<&'a str>,
    pub events: Vec<&'a Event>,
}

/// Destination of a rebuild.
pub trait ReplaySink {
    /// Apply one update. Updates arrive in final order.
    ///
    /// # Errors
    ///
    /// Implementations reject updates they cannot represent; the rebuild
    /// stops at the first error.
    fn apply(&mut self, update: &NoteUpdate<'_>) -> Result<(), ReplayError>;
}

/// A commit in the note log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteCommit {
    /// `blake3:<hex>` over the parent id and the content below.
    pub id: String,
    pub parent: Option<String>,
    pub author: Option<String>,
    pub when: DateTime<Utc>,
    pub patch_set: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub lines: Vec<String>,
}

/// In-memory append-only note log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NoteLog {
    commits: Vec<NoteCommit>,
}

impl NoteLog {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            commits: Vec::new(),
        }
    }

    #[must_use]
    pub fn commits(&self) -> &[NoteCommit] {
        &self.commits
    }

    #[must_use]
    pub fn tip(&self) -> Option<&NoteCommit> {
        self.commits.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Recompute the hash chain.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::CorruptChain`] at the first commit whose parent
    /// link or id does not match.
    pub fn verify(&self) -> Result<(), ReplayError> {
        let mut parent: Option<&str> = None;
        for (index, commit) in self.commits.iter().enumerate() {
            if commit.parent.as_deref() != parent {
                return Err(ReplayError::CorruptChain {
                    index,
                    reason: "parent link does not match previous commit".into(),
                });
            }
            let expected = commit_id(
                commit.parent.as_deref(),
                commit.author.as_deref(),
                commit.when,
                commit.patch_set,
                commit.tag.as_deref(),
                &commit.lines,
            );
            if expected != commit.id {
                return Err(ReplayError::CorruptChain {
                    index,
                    reason: format!("expected id {expected}, found {}", commit.id),
                });
            }
            parent = Some(commit.id.as_str());
        }
        Ok(())
    }
}

impl ReplaySink for NoteLog {
    fn apply(&mut self, update: &NoteUpdate<'_>) -> Result<(), ReplayError> {
        if update.events.is_empty() {
            return Err(ReplayError::EmptyUpdate);
        }
        if let Some(tip) = self.tip() {
            if update.when < tip.when {
                return Err(ReplayError::NonMonotonic {
                    when: update.when,
                    tip: tip.when,
                });
            }
        }

        let lines: Vec<String> = update.events.iter().map(|e| note_line(e)).collect();
        let parent = self.tip().map(|c| c.id.clone());
        let id = commit_id(
            parent.as_deref(),
            update.author,
            update.when,
            update.patch_set,
            update.tag,
            &lines,
        );
        trace!(%id, events = lines.len(), "appended note commit");

        self.commits.push(NoteCommit {
            id,
            parent,
            author: update.author.map(str::to_string),
            when: update.when,
            patch_set: update.patch_set,
            tag: update.tag.map(str::to_string),
            lines,
        });
        Ok(())
    }
}

/// Render one event as a note line.
#[must_use]
pub fn note_line(event: &Event) -> String {
    let detail = event.message.as_deref().unwrap_or_default();
    match event.kind {
        EventKind::PatchSet if event.creates_change => {
            format!("Create change; Patch-set: {}", event.patch_set.unwrap_or(1))
        }
        EventKind::PatchSet => format!("Patch-set: {}", event.patch_set.unwrap_or(1)),
        EventKind::CreateChange => "Create change".to_string(),
        EventKind::FinalUpdates => "Final updates".to_string(),
        EventKind::Submit if detail.is_empty() => "Submitted".to_string(),
        kind => {
            let label = match kind {
                EventKind::Comment => "Comment",
                EventKind::Approval => "Label",
                EventKind::Reviewer => "Reviewer",
                EventKind::StatusChange => "Status",
                EventKind::Hashtags => "Hashtags",
                EventKind::Submit => "Submitted",
                _ => "Message",
            };
            format!("{label}: {detail}")
        }
    }
}

fn commit_id(
    parent: Option<&str>,
    author: Option<&str>,
    when: DateTime<Utc>,
    patch_set: Option<u32>,
    tag: Option<&str>,
    lines: &[String],
) -> String {
    let mut hasher = blake3::Hasher::new();
    let header = format!(
        "{}\t{}\t{}\t{}\t{}\n",
        parent.unwrap_or("-"),
        author.unwrap_or("-"),
        when.timestamp_micros(),
        patch_set.map_or_else(|| "-".to_string(), |ps| ps.to_string()),
        tag.unwrap_or("-"),
    );
    hasher.update(header.as_bytes());
    for line in lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    format!("blake3:{}", hasher.finalize())
}
