use jukebox::commands::music::utils::queue_manager::{QueueStore, TrackReference};
use pretty_assertions::assert_eq;
use test_case::test_case;

use crate::common::fixtures::{guild, other_guild};

fn queries(store: &QueueStore) -> Vec<String> {
    store
        .snapshot(guild())
        .iter()
        .map(|track| track.query().to_string())
        .collect()
}

#[test_case(&["a"] ; "single entry")]
#[test_case(&["a", "b", "c"] ; "several entries")]
#[test_case(&["https://example.com/x", "song", "https://example.com/y"] ; "mixed urls and searches")]
fn test_dequeue_returns_enqueue_order(entries: &[&str]) {
    let store = QueueStore::new();
    for entry in entries {
        store.enqueue(guild(), TrackReference::new(*entry));
    }

    let mut drained = Vec::new();
    while let Some(track) = store.dequeue_front(guild()) {
        drained.push(track.query().to_string());
    }

    assert_eq!(drained, entries.to_vec());
    assert!(store.is_empty(guild()));
}

#[test]
fn test_clear_then_enqueue_starts_fresh() {
    let store = QueueStore::new();
    store.enqueue(guild(), TrackReference::new("old1"));
    store.enqueue(guild(), TrackReference::new("old2"));

    store.clear(guild());
    let position = store.enqueue(guild(), TrackReference::new("new"));

    assert_eq!(position, 1);
    assert_eq!(queries(&store), vec!["new"]);
}

#[test]
fn test_guilds_share_nothing() {
    let store = QueueStore::new();
    store.enqueue(guild(), TrackReference::new("mine"));
    store.enqueue(other_guild(), TrackReference::new("theirs"));

    store.clear(other_guild());

    assert_eq!(queries(&store), vec!["mine"]);
    assert_eq!(store.len(other_guild()), 0);
    assert!(store.contains_guild(other_guild()));
}

#[test]
fn test_snapshot_does_not_consume() {
    let store = QueueStore::new();
    store.enqueue(guild(), TrackReference::new("a"));
    store.enqueue(guild(), TrackReference::new("b"));

    let first = store.snapshot(guild());
    let second = store.snapshot(guild());

    assert_eq!(first, second);
    assert_eq!(store.len(guild()), 2);
}
