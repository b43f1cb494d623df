//! Dependency-aware ordering of a working set of events.
//!
//! [`EventSorter`] produces one total order over a working set such that:
//!
//! 1. Without dependencies, events come out in natural order: ascending
//!    `when`, ties keeping their input order.
//! 2. An event never precedes one of its dependencies, even when the
//!    dependency has the later timestamp.
//! 3. The result is deterministic for a given input.
//!
//! # Algorithm
//!
//! - **Natural pass.** Walk the natural order. An event whose dependencies
//!   are all placed is appended to the output; an event that still waits on a
//!   dependency is skipped. Placing an event immediately flushes every
//!   dependent it was the last blocker of, depth-first and in natural order,
//!   so events that wait on the same dependency come out right behind it.
//! - **Chain resolution.** Whatever is still unplaced afterwards sits on, or
//!   behind, a dependency cycle. These events are walked in natural order
//!   with an explicit stack of `(event, dependency cursor)` frames, following
//!   dependencies in the order they were added. A dependency that is already
//!   on the stack closes a cycle; that edge is dropped and the walk goes on.
//!
//! Every event moves unvisited → in-progress → placed at most once, so both
//! passes together are O(V + E).
//!
//! # Failure
//!
//! A dependency on an event outside the working set is a caller bug and
//! fails the whole sort with [`SortError::DependencyNotInWorkingSet`]. Cycles
//! never fail.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, instrument, trace, warn};

use crate::error::ErrorCode;
use crate::event::{EventId, EventSet};

/// Errors from [`EventSorter`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SortError {
    /// An event depends on an event that is not part of the working set.
    #[error("event {event} depends on {dependency}, which is not in the working set")]
    DependencyNotInWorkingSet {
        event: EventId,
        dependency: EventId,
    },

    /// The same event appears more than once in the working set.
    #[error("event {event} appears more than once in the working set")]
    DuplicateEvent { event: EventId },

    /// A working-set id does not exist in the event set.
    #[error("event {event} is not part of the event set")]
    UnknownEvent { event: EventId },
}

impl SortError {
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::DependencyNotInWorkingSet { .. } => ErrorCode::DependencyOutsideWorkingSet,
            Self::DuplicateEvent { .. } => ErrorCode::DuplicateEvent,
            Self::UnknownEvent { .. } => ErrorCode::UnknownEvent,
        }
    }
}

/// Counters describing one sort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SortStats {
    /// Events in the working set.
    pub events: usize,
    /// Distinct dependency edges between working-set events.
    pub edges: usize,
    /// Events that had to wait for a dependency during the natural pass.
    pub deferred: usize,
    /// Edges dropped to break cycles, self-dependencies included.
    pub broken_edges: usize,
}

/// Orders working sets drawn from one [`EventSet`].
///
/// The sorter keeps no state between calls; all bookkeeping lives for the
/// duration of a single [`EventSorter::order`].
#[derive(Debug, Clone, Copy)]
pub struct EventSorter<'a> {
    set: &'a EventSet,
}

impl<'a> EventSorter<'a> {
    #[must_use]
    pub const fn new(set: &'a EventSet) -> Self {
        Self { set }
    }

    /// Return `working` in sorted order, leaving the input untouched.
    ///
    /// # Errors
    ///
    /// See [`SortError`].
    pub fn order(&self, working: &[EventId]) -> Result<Vec<EventId>, SortError> {
        self.order_with_stats(working).map(|(order, _)| order)
    }

    /// Like [`EventSorter::order`], also returning [`SortStats`].
    ///
    /// # Errors
    ///
    /// See [`SortError`].
    #[instrument(level = "debug", skip_all, fields(events = working.len()))]
    pub fn order_with_stats(
        &self,
        working: &[EventId],
    ) -> Result<(Vec<EventId>, SortStats), SortError> {
        let mut run = Run::build(self.set, working)?;
        run.natural_pass();
        if run.out.len() < run.natural.len() {
            run.resolve_chains();
        }

        debug!(
            events = run.stats.events,
            edges = run.stats.edges,
            deferred = run.stats.deferred,
            broken_edges = run.stats.broken_edges,
            "sorted working set"
        );

        let order = run.out.iter().map(|&pos| run.natural[pos]).collect();
        Ok((order, run.stats))
    }

    /// Reorder `events` in place.
    ///
    /// On error the vector is left as it was; callers should still treat the
    /// working set as unusable, since the failure means the event collection
    /// upstream is broken.
    ///
    /// # Errors
    ///
    /// See [`SortError`].
    pub fn sort(&self, events: &mut Vec<EventId>) -> Result<SortStats, SortError> {
        let (order, stats) = self.order_with_stats(events)?;
        events.clear();
        events.extend(order);
        Ok(stats)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Placed,
}

/// Bookkeeping for one sort. Events are addressed by their position in
/// natural order from here on.
struct Run {
    natural: Vec<EventId>,
    deps: Vec<Vec<usize>>,
    /// Ascending natural position, so flushes follow natural order.
    dependents: Vec<Vec<usize>>,
    /// Dependencies neither placed nor broken.
    pending: Vec<usize>,
    marks: Vec<Mark>,
    /// `(dependent, dependency)` edges dropped to break a cycle.
    broken: HashSet<(usize, usize)>,
    out: Vec<usize>,
    stats: SortStats,
}

impl Run {
    fn build(set: &EventSet, working: &[EventId]) -> Result<Self, SortError> {
        if let Some(&event) = working.iter().find(|id| !set.contains(**id)) {
            return Err(SortError::UnknownEvent { event });
        }

        let mut natural = working.to_vec();
        // Stable: equal timestamps keep their input order.
        natural.sort_by_key(|id| set[*id].when);

        let n = natural.len();
        let mut position: HashMap<EventId, usize> = HashMap::with_capacity(n);
        for (pos, &id) in natural.iter().enumerate() {
            if position.insert(id, pos).is_some() {
                return Err(SortError::DuplicateEvent { event: id });
            }
        }

        let mut stats = SortStats {
            events: n,
            ..SortStats::default()
        };
        let mut deps: Vec<Vec<usize>> = Vec::with_capacity(n);
        // seen[d] == pos + 1 once d is recorded as a dependency of pos.
        let mut seen = vec![0_usize; n];

        for (pos, &id) in natural.iter().enumerate() {
            let mut list = Vec::with_capacity(set[id].depends_on().len());
            for &dep in set[id].depends_on() {
                let Some(&dep_pos) = position.get(&dep) else {
                    return Err(SortError::DependencyNotInWorkingSet {
                        event: id,
                        dependency: dep,
                    });
                };
                if dep_pos == pos {
                    if seen[pos] != pos + 1 {
                        warn!(event = %id, "dropping self-dependency");
                        stats.broken_edges += 1;
                        seen[pos] = pos + 1;
                    }
                    continue;
                }
                if seen[dep_pos] != pos + 1 {
                    seen[dep_pos] = pos + 1;
                    list.push(dep_pos);
                }
            }
            stats.edges += list.len();
            deps.push(list);
        }

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (pos, list) in deps.iter().enumerate() {
            for &dep_pos in list {
                dependents[dep_pos].push(pos);
            }
        }
        let pending = deps.iter().map(Vec::len).collect();

        Ok(Self {
            natural,
            deps,
            dependents,
            pending,
            marks: vec![Mark::Unvisited; n],
            broken: HashSet::new(),
            out: Vec::with_capacity(n),
            stats,
        })
    }

    fn natural_pass(&mut self) {
        for pos in 0..self.natural.len() {
            if self.marks[pos] == Mark::Placed {
                continue;
            }
            if self.pending[pos] == 0 {
                self.place(pos);
            } else {
                trace!(event = %self.natural[pos], waiting_on = self.pending[pos], "deferred");
                self.stats.deferred += 1;
            }
        }
    }

    fn resolve_chains(&mut self) {
        debug!(
            unplaced = self.natural.len() - self.out.len(),
            "resolving dependency chains"
        );
        for root in 0..self.natural.len() {
            if self.marks[root] == Mark::Unvisited {
                self.resolve_chain(root);
            }
        }
    }

    /// Depth-first walk from `root` until it is placed.
    fn resolve_chain(&mut self, root: usize) {
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        self.marks[root] = Mark::InProgress;

        while let Some(&(pos, cursor)) = stack.last() {
            if self.marks[pos] == Mark::Placed {
                stack.pop();
                continue;
            }
            if self.pending[pos] == 0 || cursor >= self.deps[pos].len() {
                stack.pop();
                self.place(pos);
                continue;
            }

            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }
            let dep = self.deps[pos][cursor];
            match self.marks[dep] {
                Mark::Placed => {}
                Mark::InProgress => {
                    warn!(
                        event = %self.natural[pos],
                        dependency = %self.natural[dep],
                        "breaking dependency cycle"
                    );
                    self.broken.insert((pos, dep));
                    self.pending[pos] -= 1;
                    self.stats.broken_edges += 1;
                }
                Mark::Unvisited => {
                    self.marks[dep] = Mark::InProgress;
                    stack.push((dep, 0));
                }
            }
        }
    }

    /// Append `root`, then flush every dependent it unblocks.
    fn place(&mut self, root: usize) {
        let mut ready = vec![root];
        while let Some(pos) = ready.pop() {
            if self.marks[pos] == Mark::Placed {
                continue;
            }
            self.marks[pos] = Mark::Placed;
            self.out.push(pos);
            trace!(event = %self.natural[pos], "placed");

            // Reverse so the earliest dependent is popped first.
            for &waiter in self.dependents[pos].iter().rev() {
                if self.marks[waiter] == Mark::Placed || self.broken.contains(&(waiter, pos)) {
                    continue;
                }
                self.pending[waiter] -= 1;
                if self.pending[waiter] == 0 {
                    ready.push(waiter);
                }
            }
        }
    }
}
