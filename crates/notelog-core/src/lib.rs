//! Dependency-ordered rebuild of change history.
//!
//! The heart of the crate is [`sort::EventSorter`]: it orders a working set
//! of timestamped [`event::Event`]s by time while making sure no event comes
//! before the events it depends on, breaking dependency cycles instead of
//! failing on them. Around it, [`rebuild`] turns a sorted working set into
//! batched note updates and [`replay`] writes them into a hash-chained
//! [`replay::NoteLog`].

pub mod config;
pub mod cycles;
pub mod error;
pub mod event;
pub mod rebuild;
pub mod replay;
pub mod sort;

pub use error::ErrorCode;
pub use event::{AggregateKey, Event, EventId, EventKind, EventSet};
pub use rebuild::{RebuildError, RebuildSummary, Rebuilder};
pub use replay::{NoteLog, ReplaySink};
pub use sort::{EventSorter, SortError, SortStats};
