//! Rating caches wired to an in-memory league store.

mod helpers;

use clubrank::config::CacheConfig;
use clubrank::ratings::RatingCaches;
use futures::future::join_all;
use helpers::{FakeStore, date, event, newest_first};
use std::time::Duration;
use tokio::time::advance;

fn caches() -> RatingCaches {
    RatingCaches::new(&CacheConfig::default())
}

#[tokio::test(start_paused = true)]
async fn lifetime_leaderboard_ranks_latest_rates() {
    let (fake, store) = FakeStore::new().shared();
    fake.set_start_season(Ok(Some(date(2026, 2, 1))));
    fake.set_history(Ok(newest_first(vec![
        event("x", 1500.0, 1),
        event("y", 1600.0, 2),
        event("x", 1550.0, 3),
        event("z", 1550.0, 4),
    ])));
    let caches = caches();

    let board = caches.leaderboard(&store).await.unwrap();

    assert_eq!(board.rating_start_date, date(2026, 2, 1));
    assert!(!board.degraded);
    let snapshot = &board.snapshot;
    assert_eq!(snapshot.total_players, 3);
    assert_eq!(snapshot.rank_by_player["y"], 1);
    assert_eq!(snapshot.rank_by_player["x"], 2);
    assert_eq!(snapshot.rank_by_player["z"], 2);
    assert_eq!(snapshot.latest_rate_by_player["x"], 1550.0);
    assert_eq!(snapshot.games("x"), 2);
    assert_eq!(*fake.history_since.lock().unwrap(), vec![date(2026, 2, 1)]);
}

#[tokio::test(start_paused = true)]
async fn history_failure_is_served_as_empty_snapshot() {
    let (fake, store) = FakeStore::new().shared();
    fake.set_history(Err("relation does not exist"));
    let caches = caches();

    let snapshot = caches
        .lifetime_rating_snapshot(&store, date(2026, 1, 1))
        .await
        .unwrap();

    assert!(snapshot.is_empty());
    assert_eq!(snapshot.total_players, 0);
}

#[tokio::test(start_paused = true)]
async fn empty_snapshot_replaces_leaderboard_after_expiry() {
    let (fake, store) = FakeStore::new().shared();
    fake.set_history(Ok(vec![event("x", 1500.0, 1)]));
    let caches = caches();
    let start = date(2026, 1, 1);

    let first = caches.lifetime_rating_snapshot(&store, start).await.unwrap();
    assert_eq!(first.total_players, 1);

    // Within the TTL the failure is not observed at all.
    fake.set_history(Err("connection reset"));
    advance(Duration::from_secs(10)).await;
    let cached = caches.lifetime_rating_snapshot(&store, start).await.unwrap();
    assert_eq!(cached.total_players, 1);
    assert_eq!(FakeStore::calls(&fake.history_calls), 1);

    advance(Duration::from_secs(5)).await;
    let reloaded = caches.lifetime_rating_snapshot(&store, start).await.unwrap();
    assert!(reloaded.is_empty());
    assert_eq!(FakeStore::calls(&fake.history_calls), 2);
}

#[tokio::test(start_paused = true)]
async fn snapshots_are_keyed_by_start_date() {
    let (fake, store) = FakeStore::new().shared();
    fake.set_history(Ok(vec![event("x", 1500.0, 1)]));
    let caches = caches();

    caches
        .lifetime_rating_snapshot(&store, date(2026, 1, 1))
        .await
        .unwrap();
    caches
        .lifetime_rating_snapshot(&store, date(2026, 3, 1))
        .await
        .unwrap();
    caches
        .lifetime_rating_snapshot(&store, date(2026, 1, 1))
        .await
        .unwrap();

    assert_eq!(FakeStore::calls(&fake.history_calls), 2);
    assert_eq!(
        *fake.history_since.lock().unwrap(),
        vec![date(2026, 1, 1), date(2026, 3, 1)]
    );
}

#[tokio::test(start_paused = true)]
async fn rating_start_falls_back_when_no_season_matches() {
    let (fake, store) = FakeStore::new().shared();
    fake.set_start_season(Ok(None));
    let caches = caches();

    let start = caches.rating_start_date(&store).await.unwrap();

    assert_eq!(start, caches.fallback_start_date());
    assert_eq!(start, date(2026, 1, 1));
}

#[tokio::test(start_paused = true)]
async fn rating_start_lookup_error_propagates() {
    let (fake, store) = FakeStore::new().shared();
    fake.set_start_season(Err("timeout"));
    let caches = caches();

    assert!(caches.rating_start_date(&store).await.is_err());

    // Nothing cached; the next call queries again.
    fake.set_start_season(Ok(Some(date(2026, 2, 15))));
    assert_eq!(caches.rating_start_date(&store).await.unwrap(), date(2026, 2, 15));
    assert_eq!(FakeStore::calls(&fake.start_calls), 2);
}

#[tokio::test(start_paused = true)]
async fn leaderboard_degrades_to_fallback_start() {
    let (fake, store) = FakeStore::new().shared();
    fake.set_start_season(Err("timeout"));
    fake.set_history(Ok(vec![event("x", 1500.0, 1)]));
    let caches = caches();

    let board = caches.leaderboard(&store).await.unwrap();

    assert!(board.degraded);
    assert_eq!(board.rating_start_date, caches.fallback_start_date());
    assert_eq!(board.snapshot.total_players, 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_active_season_lookups_share_one_query() {
    let (fake, store) = FakeStore::new()
        .with_latency(Duration::from_millis(50))
        .shared();
    fake.set_active_season(Ok(Some("season-7")));
    let caches = caches();

    let results = join_all((0..10).map(|_| caches.active_season_id(&store))).await;

    assert_eq!(FakeStore::calls(&fake.active_calls), 1);
    for result in results {
        assert_eq!(result.unwrap().as_deref(), Some("season-7"));
    }
}

#[tokio::test(start_paused = true)]
async fn no_active_season_is_cached_too() {
    let (fake, store) = FakeStore::new().shared();
    fake.set_active_season(Ok(None));
    let caches = caches();

    assert_eq!(caches.active_season_id(&store).await.unwrap(), None);
    assert_eq!(caches.active_season_id(&store).await.unwrap(), None);
    assert_eq!(FakeStore::calls(&fake.active_calls), 1);
}

#[tokio::test(start_paused = true)]
async fn active_season_error_is_not_cached() {
    let (fake, store) = FakeStore::new().shared();
    fake.set_active_season(Err("db down"));
    let caches = caches();

    assert!(caches.active_season_id(&store).await.is_err());
    assert_eq!(caches.stats()[0].entries, 0);

    fake.set_active_season(Ok(Some("season-8")));
    let season = caches.active_season_id(&store).await.unwrap();
    assert_eq!(season.as_deref(), Some("season-8"));
}

#[tokio::test(start_paused = true)]
async fn tied_leaders_share_first_place() {
    let (fake, store) = FakeStore::new().shared();
    let mut rows = vec![
        event("x", 1580.0, 1),
        event("x", 1600.0, 2),
        event("y", 1600.0, 3),
    ];
    rows.extend((10..15).map(|minute| event("z", 1400.0, minute)));
    fake.set_history(Ok(newest_first(rows)));
    let caches = caches();

    let snapshot = caches
        .lifetime_rating_snapshot(&store, date(2026, 1, 1))
        .await
        .unwrap();

    assert_eq!(snapshot.rank_by_player["x"], 1);
    assert_eq!(snapshot.rank_by_player["y"], 1);
    assert_eq!(snapshot.rank_by_player["z"], 2);
    assert_eq!(snapshot.games("x"), 2);
    assert_eq!(snapshot.games("y"), 1);
    assert_eq!(snapshot.games("z"), 5);
    assert_eq!(snapshot.total_players, 3);
}
