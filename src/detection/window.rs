//! Sliding window skeleton shared by the detectors
//!
//! Every detector groups events by a key, keeps the events that pass its
//! status filter, sorts each group chronologically and slides a two-pointer
//! window over it. The first window that satisfies the trigger is reported
//! and the rest of the group is skipped.

use std::collections::HashMap;

use chrono::Duration;

use crate::models::AuthEvent;

/// Events for one grouping key, sorted by timestamp
pub struct Group<'a> {
    pub key: &'a str,
    pub events: Vec<&'a AuthEvent>,
}

/// Group events by `key`, keeping only those accepted by `filter`
///
/// Events for which `key` returns `None` are dropped. Groups come back in
/// the order their key was first seen and each group is sorted (stably) by
/// timestamp.
pub fn group_sorted<'a, K, F>(events: &'a [AuthEvent], key: K, filter: F) -> Vec<Group<'a>>
where
    K: Fn(&'a AuthEvent) -> Option<&'a str>,
    F: Fn(&AuthEvent) -> bool,
{
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut groups: Vec<Group<'a>> = Vec::new();

    for event in events {
        let Some(k) = key(event) else {
            continue;
        };
        if !filter(event) {
            continue;
        }
        let slot = *index.entry(k).or_insert_with(|| {
            groups.push(Group { key: k, events: Vec::new() });
            groups.len() - 1
        });
        groups[slot].events.push(event);
    }

    for group in &mut groups {
        group.events.sort_by_key(|e| e.timestamp);
    }

    groups
}

/// Find the first run in `events` for which `trigger` holds
///
/// `events` must be sorted by timestamp. The window `[start, end]` never
/// spans more than `window` (the boundary is inclusive). Once the trigger
/// fires, the run is extended over the following events that still fall
/// within `window` of its first event, so a sustained burst is reported
/// whole.
pub fn first_triggering_window<'s, 'a, T>(
    events: &'s [&'a AuthEvent],
    window: Duration,
    mut trigger: T,
) -> Option<&'s [&'a AuthEvent]>
where
    T: FnMut(&[&'a AuthEvent]) -> bool,
{
    let mut start = 0;
    for end in 0..events.len() {
        while events[end].timestamp - events[start].timestamp > window {
            start += 1;
        }
        if trigger(&events[start..=end]) {
            return Some(extend_run(events, window, start, end));
        }
    }
    None
}

/// Like [`first_triggering_window`], for triggers on a distinct count
///
/// The values of `field` inside the window are kept as a multiset that is
/// updated as the edges move, so `trigger(len, distinct)` costs nothing per
/// step. Events where `field` is `None` count towards `len` only.
pub fn first_triggering_window_distinct<'s, 'a, F, T>(
    events: &'s [&'a AuthEvent],
    window: Duration,
    field: F,
    mut trigger: T,
) -> Option<&'s [&'a AuthEvent]>
where
    F: Fn(&'a AuthEvent) -> Option<&'a str>,
    T: FnMut(usize, usize) -> bool,
{
    let mut counts: HashMap<&'a str, usize> = HashMap::new();
    let mut start = 0;
    for end in 0..events.len() {
        if let Some(value) = field(events[end]) {
            *counts.entry(value).or_insert(0) += 1;
        }
        while events[end].timestamp - events[start].timestamp > window {
            if let Some(value) = field(events[start]) {
                if let Some(n) = counts.get_mut(value) {
                    *n -= 1;
                    if *n == 0 {
                        counts.remove(value);
                    }
                }
            }
            start += 1;
        }
        if trigger(end - start + 1, counts.len()) {
            return Some(extend_run(events, window, start, end));
        }
    }
    None
}

fn extend_run<'s, 'a>(
    events: &'s [&'a AuthEvent],
    window: Duration,
    start: usize,
    end: usize,
) -> &'s [&'a AuthEvent] {
    let mut last = end;
    while last + 1 < events.len() && events[last + 1].timestamp - events[start].timestamp <= window {
        last += 1;
    }
    &events[start..=last]
}

/// Raw lines of the first `cap` events
pub fn evidence(events: &[&AuthEvent], cap: usize) -> Vec<String> {
    events.iter().take(cap).map(|e| e.raw.clone()).collect()
}

/// Sorted, de-duplicated values of `field` across `events`
pub fn distinct_sorted<'a, F>(events: &[&'a AuthEvent], field: F) -> Vec<String>
where
    F: Fn(&'a AuthEvent) -> Option<&'a str>,
{
    let mut values: Vec<&str> = events.iter().filter_map(|e| field(*e)).collect();
    values.sort_unstable();
    values.dedup();
    values.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuthStatus;
    use chrono::{TimeZone, Utc};

    fn event(secs: i64, ip: Option<&str>, status: AuthStatus) -> AuthEvent {
        let ts = Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
        let mut ev = AuthEvent::new(ts, status, format!("line@{}", secs));
        ev.ip = ip.map(str::to_string);
        ev
    }

    #[test]
    fn test_grouping_skips_missing_keys_and_sorts() {
        let events = vec![
            event(30, Some("1.1.1.1"), AuthStatus::Fail),
            event(10, Some("2.2.2.2"), AuthStatus::Fail),
            event(20, None, AuthStatus::Fail),
            event(5, Some("1.1.1.1"), AuthStatus::Fail),
            event(7, Some("1.1.1.1"), AuthStatus::Success),
        ];

        let groups = group_sorted(&events, |e| e.ip(), |e| e.status.is_fail());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, "1.1.1.1");
        assert_eq!(groups[1].key, "2.2.2.2");

        let raws: Vec<&str> = groups[0].events.iter().map(|e| e.raw.as_str()).collect();
        assert_eq!(raws, vec!["line@5", "line@30"]);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let events = vec![
            event(0, Some("a"), AuthStatus::Fail),
            event(60, Some("a"), AuthStatus::Fail),
        ];
        let refs: Vec<&AuthEvent> = events.iter().collect();

        let hit = first_triggering_window(&refs, Duration::seconds(60), |w| w.len() >= 2);
        assert_eq!(hit.map(|w| w.len()), Some(2));

        let miss = first_triggering_window(&refs, Duration::seconds(59), |w| w.len() >= 2);
        assert!(miss.is_none());
    }

    #[test]
    fn test_window_slides_past_old_events() {
        let events: Vec<AuthEvent> = [0, 100, 400, 410, 420]
            .iter()
            .map(|&s| event(s, Some("a"), AuthStatus::Fail))
            .collect();
        let refs: Vec<&AuthEvent> = events.iter().collect();

        let hit = first_triggering_window(&refs, Duration::seconds(60), |w| w.len() >= 3).unwrap();
        let raws: Vec<&str> = hit.iter().map(|e| e.raw.as_str()).collect();
        assert_eq!(raws, vec!["line@400", "line@410", "line@420"]);
    }

    #[test]
    fn test_triggered_run_extends_to_window_edge() {
        let events: Vec<AuthEvent> = [0, 10, 20, 30, 60, 61]
            .iter()
            .map(|&s| event(s, Some("a"), AuthStatus::Fail))
            .collect();
        let refs: Vec<&AuthEvent> = events.iter().collect();

        let hit = first_triggering_window(&refs, Duration::seconds(60), |w| w.len() >= 2).unwrap();
        let raws: Vec<&str> = hit.iter().map(|e| e.raw.as_str()).collect();
        assert_eq!(raws, vec!["line@0", "line@10", "line@20", "line@30", "line@60"]);
    }

    #[test]
    fn test_distinct_count_tracks_sliding_edges() {
        let events = vec![
            event(0, Some("a"), AuthStatus::Fail),
            event(10, Some("b"), AuthStatus::Fail),
            event(100, Some("a"), AuthStatus::Fail),
            event(110, None, AuthStatus::Fail),
            event(120, Some("c"), AuthStatus::Fail),
            event(130, Some("d"), AuthStatus::Fail),
        ];
        let refs: Vec<&AuthEvent> = events.iter().collect();

        let mut seen = Vec::new();
        let hit = first_triggering_window_distinct(&refs, Duration::seconds(60), |e| e.ip(), |len, distinct| {
            seen.push((len, distinct));
            distinct >= 3
        })
        .unwrap();

        // "b" and the first "a" leave the window before "c" and "d" arrive
        assert_eq!(seen, vec![(1, 1), (2, 2), (1, 1), (2, 1), (3, 2), (4, 3)]);
        let raws: Vec<&str> = hit.iter().map(|e| e.raw.as_str()).collect();
        assert_eq!(raws, vec!["line@100", "line@110", "line@120", "line@130"]);
    }

    #[test]
    fn test_distinct_scan_on_single_key_flood_is_linear() {
        let events: Vec<AuthEvent> = (0..50_000)
            .map(|s| event(s, Some("a"), AuthStatus::Fail))
            .collect();
        let refs: Vec<&AuthEvent> = events.iter().collect();

        let mut calls = 0usize;
        let started = std::time::Instant::now();
        let hit = first_triggering_window_distinct(&refs, Duration::seconds(300), |e| e.ip(), |_, distinct| {
            calls += 1;
            distinct >= 2
        });

        assert!(hit.is_none());
        assert_eq!(calls, refs.len());
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn test_empty_input() {
        let refs: Vec<&AuthEvent> = Vec::new();
        assert!(first_triggering_window(&refs, Duration::seconds(60), |_| true).is_none());
        assert!(first_triggering_window_distinct(&refs, Duration::seconds(60), |e| e.ip(), |_, _| true).is_none());
        assert!(group_sorted(&[], |e| e.ip(), |_| true).is_empty());
    }

    #[test]
    fn test_evidence_is_capped() {
        let events: Vec<AuthEvent> = (0..10)
            .map(|s| event(s, Some("a"), AuthStatus::Fail))
            .collect();
        let refs: Vec<&AuthEvent> = events.iter().collect();
        let lines = evidence(&refs, 5);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "line@0");
        assert_eq!(lines[4], "line@4");
    }
}
