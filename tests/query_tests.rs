/// Query layer and polling tests.
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use emote_dash::query::{Poller, QueryCache, QueryKey};
use emote_dash::resolve::{DEFAULT_CLIP_LIMIT, resolve};
use emote_dash::state::parse_state;

fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..200 {
        if done() {
            return;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

#[test]
fn any_filter_change_changes_the_key() {
    let base = resolve(None, false, DEFAULT_CLIP_LIMIT);
    let state = parse_state(Some(r#"{"seriesParams":{"rollingAverage":5}}"#)).unwrap();
    let smoothed = resolve(state.as_ref(), false, DEFAULT_CLIP_LIMIT);

    assert_ne!(QueryKey::series(&base.series), QueryKey::series(&smoothed.series));
    assert_eq!(QueryKey::series(&base.series), QueryKey::series(&base.series.clone()));
}

#[test]
fn live_status_changes_series_key_through_defaults() {
    let live = resolve(None, true, DEFAULT_CLIP_LIMIT);
    let offline = resolve(None, false, DEFAULT_CLIP_LIMIT);
    assert_ne!(QueryKey::series(&live.series), QueryKey::series(&offline.series));
    assert_ne!(QueryKey::clips(&live.max_clips), QueryKey::clips(&offline.max_clips));
}

// ---------------------------------------------------------------------------
// Last request wins
// ---------------------------------------------------------------------------

#[test]
fn stale_results_are_discarded() {
    let cache: QueryCache<&str> = QueryCache::new();
    let key = QueryKey::live();

    let slow = cache.issue(key.clone());
    let fast = cache.issue(key.clone());

    assert!(cache.settle(&fast, "newest"));
    assert!(!cache.settle(&slow, "stale"));
    assert_eq!(cache.get(&key), Some("newest"));
}

#[test]
fn keys_settle_independently() {
    let cache: QueryCache<u32> = QueryCache::new();
    let view = resolve(None, false, DEFAULT_CLIP_LIMIT);

    let series = cache.issue(QueryKey::series(&view.series));
    let clips = cache.issue(QueryKey::clips(&view.max_clips));

    assert!(cache.settle(&clips, 2));
    assert!(cache.settle(&series, 1));
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get(&QueryKey::clips(&view.min_clips)), None);
}

#[test]
fn concurrent_issuers_keep_only_the_newest() {
    let cache: Arc<QueryCache<usize>> = Arc::new(QueryCache::new());
    let tickets: Vec<_> = (0..8).map(|_| cache.issue(QueryKey::live())).collect();

    let handles: Vec<_> = tickets
        .into_iter()
        .enumerate()
        .map(|(i, ticket)| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.settle(&ticket, i))
        })
        .collect();

    let accepted: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(accepted.iter().filter(|a| **a).count(), 1);
    assert!(accepted[7]);
    assert_eq!(cache.get(&QueryKey::live()), Some(7));
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

#[test]
fn poller_ticks_on_its_interval() {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    let poller = Poller::spawn("fast", Duration::from_millis(10), move || {
        seen.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

    wait_until(|| count.load(Ordering::SeqCst) >= 3);
    assert!(count.load(Ordering::SeqCst) >= 3);
    assert!(poller.is_running());
    assert_eq!(poller.name(), "fast");
}

#[test]
fn dropping_a_poller_stops_it() {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    let poller = Poller::spawn("dropped", Duration::from_millis(5), move || {
        seen.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

    wait_until(|| count.load(Ordering::SeqCst) >= 1);
    drop(poller);

    let after_drop = count.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(count.load(Ordering::SeqCst), after_drop);
}
