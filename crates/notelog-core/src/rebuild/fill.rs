use tracing::{debug, trace};

use crate::event::{Event, EventId, EventKind, EventSet};

/// Change-level facts the fill step needs.
#[derive(Debug, Clone, Copy)]
pub struct FillContext<'a> {
    /// Account that owns the change.
    pub owner: &'a str,
    /// Lowest patch set number in the change, if known.
    pub min_patch_set: Option<u32>,
}

/// What [`fill`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillReport {
    /// A `CreateChange` event was pushed and prepended.
    pub synthesized_create: bool,
    /// Events that received an inherited patch set.
    pub patch_sets_filled: usize,
    /// Events whose timestamp was raised to their predecessor's.
    pub clamped: usize,
}

/// Complete a sorted order so it can be replayed.
///
/// 1. The first event must create the change. An owner-authored patch set is
///    marked as doing so; anything else gets a synthetic `CreateChange`
///    pushed in front of it.
/// 2. Events without a patch set inherit the latest one seen so far.
/// 3. With `clamp`, timestamps are made non-decreasing along `order`.
///
/// An empty order is left alone.
pub fn fill(
    set: &mut EventSet,
    order: &mut Vec<EventId>,
    ctx: &FillContext<'_>,
    clamp: bool,
) -> FillReport {
    let mut report = FillReport::default();
    let Some(&first) = order.first() else {
        return report;
    };
    let start = ctx.min_patch_set.unwrap_or(1);

    let owner_created = set.get(first).is_some_and(|e| {
        matches!(e.kind, EventKind::PatchSet) && e.author.as_deref() == Some(ctx.owner)
    });
    if owner_created {
        if let Some(event) = set.get_mut(first) {
            event.creates_change = true;
        }
    } else if let Some(head) = set.get(first) {
        let create = Event::new(head.key.clone(), head.when, EventKind::CreateChange)
            .with_author(ctx.owner)
            .with_patch_set(start);
        let id = set.push(create);
        order.insert(0, id);
        report.synthesized_create = true;
        debug!(%id, "synthesized create-change event");
    }

    let mut patch_set = start;
    let mut previous = None;
    for &id in order.iter() {
        let Some(event) = set.get_mut(id) else {
            continue;
        };

        match event.patch_set {
            Some(ps) => patch_set = patch_set.max(ps),
            None => {
                event.patch_set = Some(patch_set);
                report.patch_sets_filled += 1;
            }
        }

        if clamp {
            if let Some(prev) = previous {
                if event.when < prev {
                    trace!(%id, from = %event.when, to = %prev, "clamped timestamp");
                    event.when = prev;
                    report.clamped += 1;
                }
            }
        }
        previous = Some(event.when);
    }

    report
}
