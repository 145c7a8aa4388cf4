//! Shared fixtures: an in-memory `LeagueStore` with call counters and injectable failures.

#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clubrank::data::models::RatingHistoryRow;
use clubrank::data::{LeagueStore, SharedStore};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Canned<T> = Mutex<Result<T, String>>;

pub struct FakeStore {
    active_season: Canned<Option<String>>,
    start_season: Canned<Option<NaiveDate>>,
    history: Canned<Vec<RatingHistoryRow>>,
    ping: Canned<()>,
    latency: Duration,
    pub active_calls: AtomicUsize,
    pub start_calls: AtomicUsize,
    pub history_calls: AtomicUsize,
    pub history_since: Mutex<Vec<NaiveDate>>,
}

impl Default for FakeStore {
    fn default() -> Self {
        Self {
            active_season: Mutex::new(Ok(None)),
            start_season: Mutex::new(Ok(None)),
            history: Mutex::new(Ok(Vec::new())),
            ping: Mutex::new(Ok(())),
            latency: Duration::ZERO,
            active_calls: AtomicUsize::new(0),
            start_calls: AtomicUsize::new(0),
            history_calls: AtomicUsize::new(0),
            history_since: Mutex::new(Vec::new()),
        }
    }
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every query sleeps this long before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Wrap in an `Arc`, returning both the concrete handle and the trait object.
    pub fn shared(self) -> (Arc<FakeStore>, SharedStore) {
        let fake = Arc::new(self);
        let store: SharedStore = fake.clone();
        (fake, store)
    }

    pub fn set_active_season(&self, season: Result<Option<&str>, &str>) {
        *self.active_season.lock().unwrap() = season
            .map(|id| id.map(str::to_owned))
            .map_err(str::to_owned);
    }

    pub fn set_start_season(&self, start: Result<Option<NaiveDate>, &str>) {
        *self.start_season.lock().unwrap() = start.map_err(str::to_owned);
    }

    pub fn set_history(&self, rows: Result<Vec<RatingHistoryRow>, &str>) {
        *self.history.lock().unwrap() = rows.map_err(str::to_owned);
    }

    pub fn set_ping(&self, ok: bool) {
        *self.ping.lock().unwrap() = if ok { Ok(()) } else { Err("ping failed".to_owned()) };
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

fn answer<T: Clone>(canned: &Canned<T>) -> Result<T> {
    canned.lock().unwrap().clone().map_err(|e| anyhow!(e))
}

#[async_trait]
impl LeagueStore for FakeStore {
    async fn active_season_id(&self) -> Result<Option<String>> {
        self.active_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        answer(&self.active_season)
    }

    async fn rating_start_season(&self, _name_prefix: &str) -> Result<Option<NaiveDate>> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        answer(&self.start_season)
    }

    async fn lifetime_rating_history(&self, since: NaiveDate) -> Result<Vec<RatingHistoryRow>> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.history_since.lock().unwrap().push(since);
        self.pause().await;
        answer(&self.history)
    }

    async fn ping(&self) -> Result<()> {
        answer(&self.ping)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A timestamp `minute` minutes into 2026-03-01.
pub fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, minute / 60, minute % 60, 0)
        .unwrap()
}

pub fn event(player: &str, rate: f64, minute: u32) -> RatingHistoryRow {
    RatingHistoryRow {
        player_id: Some(player.to_owned()),
        new_rate: Some(rate),
        played_at: Some(at(minute)),
        match_id: Some(format!("match-{minute:04}")),
    }
}

/// Order rows the way the history query does: `played_at DESC, match_id DESC`.
pub fn newest_first(mut rows: Vec<RatingHistoryRow>) -> Vec<RatingHistoryRow> {
    rows.sort_by(|a, b| {
        b.played_at
            .cmp(&a.played_at)
            .then_with(|| b.match_id.cmp(&a.match_id))
    });
    rows
}
