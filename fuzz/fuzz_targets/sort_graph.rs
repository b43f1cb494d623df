#![no_main]

use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;
use notelog_core::{AggregateKey, Event, EventKind, EventSet, EventSorter};

// Byte 0 sizes the set; each following byte pair is a timestamp or an edge.
fuzz_target!(|data: &[u8]| {
    let Some((&count, rest)) = data.split_first() else {
        return;
    };
    let n = usize::from(count % 64) + 1;
    let (times, edges) = rest.split_at(rest.len().min(n));

    let mut set = EventSet::with_capacity(n);
    let ids: Vec<_> = (0..n)
        .map(|i| {
            let secs = times.get(i).copied().map_or(0, i64::from);
            let when = Utc
                .timestamp_opt(1_700_000_000 + secs, 0)
                .single()
                .expect("valid timestamp");
            set.push(Event::new(AggregateKey::new("fuzz"), when, EventKind::Comment))
        })
        .collect();
    for pair in edges.chunks_exact(2) {
        let a = ids[usize::from(pair[0]) % n];
        let b = ids[usize::from(pair[1]) % n];
        set.add_dep(a, b);
    }

    let (order, stats) = EventSorter::new(&set)
        .order_with_stats(&ids)
        .expect("every dependency is inside the working set");
    assert_eq!(order.len(), n);
    assert_eq!(stats.events, n);

    let mut seen = order.clone();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), n);

    if stats.broken_edges == 0 {
        let pos: Vec<usize> = {
            let mut pos = vec![0; n];
            for (at, id) in order.iter().enumerate() {
                pos[id.index()] = at;
            }
            pos
        };
        for id in &ids {
            for dep in set[*id].depends_on() {
                assert!(pos[dep.index()] < pos[id.index()]);
            }
        }
    }
});
