//! Event kind enum covering every action a change history can contain.
//!
//! The string representation is `snake_case`, which is what event-set files
//! use in their `kind` field.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kinds of historical action replayed into a note log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A patch set was uploaded.
    PatchSet,
    /// A published inline comment.
    Comment,
    /// A label vote on a patch set.
    Approval,
    /// A reviewer was added, removed or moved to CC.
    Reviewer,
    /// A top-level change message.
    ChangeMessage,
    /// The change was abandoned, restored or otherwise changed status.
    StatusChange,
    /// The hashtag set changed.
    Hashtags,
    /// The change was submitted.
    Submit,
    /// Synthetic first update that creates the change.
    CreateChange,
    /// Synthetic last update that writes the final change state.
    FinalUpdates,
}

/// Error returned when parsing an unknown event kind string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventKind {
    /// The unrecognised input string.
    pub raw: String,
}

impl UnknownEventKind {
    /// Leading text of every rendered message.
    pub(crate) const PREFIX: &'static str = "unknown event kind";
}

impl fmt::Display for UnknownEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}': expected one of patch_set, comment, approval, \
             reviewer, change_message, status_change, hashtags, submit, \
             create_change, final_updates",
            Self::PREFIX,
            self.raw
        )
    }
}

impl std::error::Error for UnknownEventKind {}

impl EventKind {
    /// All known kinds in catalog order.
    pub const ALL: [Self; 10] = [
        Self::PatchSet,
        Self::Comment,
        Self::Approval,
        Self::Reviewer,
        Self::ChangeMessage,
        Self::StatusChange,
        Self::Hashtags,
        Self::Submit,
        Self::CreateChange,
        Self::FinalUpdates,
    ];

    /// Return the canonical `snake_case` string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PatchSet => "patch_set",
            Self::Comment => "comment",
            Self::Approval => "approval",
            Self::Reviewer => "reviewer",
            Self::ChangeMessage => "change_message",
            Self::StatusChange => "status_change",
            Self::Hashtags => "hashtags",
            Self::Submit => "submit",
            Self::CreateChange => "create_change",
            Self::FinalUpdates => "final_updates",
        }
    }

    /// Whether at most one event of this kind may be folded into a single
    /// downstream update.
    ///
    /// Comments, votes and reviewer changes accumulate; everything that sets
    /// a single-valued footer (subject, status, hashtags, patch set) does not.
    #[must_use]
    pub const fn unique_per_update(self) -> bool {
        !matches!(self, Self::Comment | Self::Approval | Self::Reviewer)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownEventKind { raw: s.to_string() })
    }
}

impl Serialize for EventKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fromstr_all_kinds() {
        for kind in EventKind::ALL {
            let parsed: EventKind = kind.as_str().parse().expect("should parse");
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn fromstr_rejects_unknown() {
        let err = "merge".parse::<EventKind>().unwrap_err();
        assert_eq!(err.raw, "merge");
        assert!(err.to_string().contains("expected one of"));
    }

    #[test]
    fn fromstr_is_case_sensitive() {
        assert!("PatchSet".parse::<EventKind>().is_err());
        assert!("".parse::<EventKind>().is_err());
    }

    #[test]
    fn accumulating_kinds_are_not_unique() {
        assert!(!EventKind::Comment.unique_per_update());
        assert!(!EventKind::Approval.unique_per_update());
        assert!(!EventKind::Reviewer.unique_per_update());
        assert!(EventKind::PatchSet.unique_per_update());
        assert!(EventKind::ChangeMessage.unique_per_update());
        assert!(EventKind::FinalUpdates.unique_per_update());
    }

    #[test]
    fn serde_uses_snake_case_string() {
        let json = serde_json::to_string(&EventKind::StatusChange).expect("serialize");
        assert_eq!(json, "\"status_change\"");
        let back: EventKind = serde_json::from_str("\"hashtags\"").expect("deserialize");
        assert_eq!(back, EventKind::Hashtags);
    }
}
