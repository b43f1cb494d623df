use std::fmt;

/// Machine-readable error codes for callers that branch on failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    EventSetParseError,
    DuplicateLabel,
    UnknownLabel,
    UnknownEventKind,
    DependencyOutsideWorkingSet,
    DuplicateEvent,
    UnknownEvent,
    NoPatchSets,
    NonMonotonicUpdate,
    CorruptNoteLog,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::EventSetParseError => "E1002",
            Self::DuplicateLabel => "E1003",
            Self::UnknownLabel => "E1004",
            Self::UnknownEventKind => "E1005",
            Self::DependencyOutsideWorkingSet => "E2001",
            Self::DuplicateEvent => "E2002",
            Self::UnknownEvent => "E2003",
            Self::NoPatchSets => "E2004",
            Self::NonMonotonicUpdate => "E3001",
            Self::CorruptNoteLog => "E3002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::EventSetParseError => "Event set file parse error",
            Self::DuplicateLabel => "Duplicate event label",
            Self::UnknownLabel => "Dependency names an unknown label",
            Self::UnknownEventKind => "Unknown event kind",
            Self::DependencyOutsideWorkingSet => "Dependency outside the working set",
            Self::DuplicateEvent => "Event listed twice in the working set",
            Self::UnknownEvent => "Event id not present in the event set",
            Self::NoPatchSets => "Change has no patch sets to rebuild",
            Self::NonMonotonicUpdate => "Update is older than the note log tip",
            Self::CorruptNoteLog => "Note log hash chain is broken",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .notelog/config.toml and retry."),
            Self::EventSetParseError => {
                Some("The input must be a JSON object with an `events` array.")
            }
            Self::DuplicateLabel => Some("Give every event record a unique `label`."),
            Self::UnknownLabel => Some("Every `depends_on` entry must name a record in the file."),
            Self::UnknownEventKind => Some("Use one of the documented event kinds (snake_case)."),
            Self::DependencyOutsideWorkingSet => {
                Some("Include the dependency in the working set or drop the link.")
            }
            Self::DuplicateEvent => Some("Pass each event to the sorter exactly once."),
            Self::UnknownEvent => None,
            Self::NoPatchSets => Some("A change needs at least one patch set event."),
            Self::NonMonotonicUpdate => {
                Some("Enable `clamp_timestamps` so replayed updates never go backwards.")
            }
            Self::CorruptNoteLog => Some("Discard the note log and rebuild it from events."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
