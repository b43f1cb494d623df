use tracing::trace;

use crate::event::{Event, EventId, EventSet};

/// Make every post-submit vote in `working` depend on the last submit.
///
/// "Last" is by working-set order. Without a submit event nothing changes.
/// Returns the number of votes linked.
pub fn link_post_submit(set: &mut EventSet, working: &[EventId]) -> usize {
    let Some(&submit) = working
        .iter()
        .rev()
        .find(|id| set.get(**id).is_some_and(Event::is_submit))
    else {
        return 0;
    };

    let votes: Vec<EventId> = working
        .iter()
        .copied()
        .filter(|id| set.get(*id).is_some_and(Event::is_post_submit_approval))
        .collect();

    for &vote in &votes {
        trace!(%vote, %submit, "post-submit vote waits on submit");
        set.add_dep(vote, submit);
    }
    votes.len()
}
