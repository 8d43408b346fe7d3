use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use xwordkit::{
    badges::BadgeCatalog,
    config::Config,
    models::{EarnedBadge, PlayerStats},
    swagent::{
        ServiceWorker, WorkerState,
        host::LoggingHost,
        http::{Fetcher, Request, Response},
        storage::{CacheEntry, CacheStorage},
    },
    xwdb::{self, SqliteCacheStorage},
};

struct NoNetwork;

#[async_trait::async_trait]
impl Fetcher for NoNetwork {
    async fn fetch(&self, request: &Request) -> anyhow::Result<Response> {
        anyhow::bail!("offline: {}", request.url)
    }
}

/// Serves every shell asset.
struct ShellServer;

#[async_trait::async_trait]
impl Fetcher for ShellServer {
    async fn fetch(&self, request: &Request) -> anyhow::Result<Response> {
        Ok(Response::new(200, Some("text/html"), format!("shell {}", request.url.path())))
    }
}

fn db_path(dir: &TempDir) -> String {
    dir.path().join("xword.db").to_string_lossy().into_owned()
}

fn config(version: &str) -> Config {
    let version = version.to_string();
    Config::from_lookup(move |key| match key {
        "XWORD_ORIGIN" => Some("https://site.dev".to_string()),
        "XWORD_CACHE_VERSION" => Some(version.clone()),
        _ => None,
    })
    .unwrap()
}

fn shell_entry(body: &str) -> CacheEntry {
    CacheEntry::from_response(
        "https://site.dev/crossword",
        &Response::new(200, Some("text/html"), body),
        Utc.with_ymd_and_hms(2026, 10, 16, 6, 0, 0).unwrap(),
    )
}

#[test]
fn cache_entries_survive_reopening_the_database() {
    let dir = TempDir::new().unwrap();
    {
        let storage = SqliteCacheStorage::open(db_path(&dir)).unwrap();
        storage.put_all("crossword-v3", vec![shell_entry("shell")]).unwrap();
    }

    let storage = SqliteCacheStorage::open(db_path(&dir)).unwrap();
    assert_eq!(storage.cache_names().unwrap(), vec!["crossword-v3".to_string()]);
    assert_eq!(
        storage.lookup("crossword-v3", "https://site.dev/crossword").unwrap(),
        Some(shell_entry("shell"))
    );
}

#[tokio::test]
async fn an_activated_generation_serves_offline_after_restart() {
    let dir = TempDir::new().unwrap();
    {
        let storage = SqliteCacheStorage::open(db_path(&dir)).unwrap();
        storage.put_all("crossword-v3", vec![shell_entry("shell")]).unwrap();
    }

    let storage = Arc::new(SqliteCacheStorage::open(db_path(&dir)).unwrap());
    let worker = ServiceWorker::new(config("v3"), Arc::new(NoNetwork), storage, Arc::new(LoggingHost));
    assert_eq!(worker.resume().unwrap(), WorkerState::Active);

    let mut event = xwordkit::swagent::event::ExtendableEvent::new("fetch");
    let response = worker
        .handle_fetch(&mut event, Request::parse("https://site.dev/crossword").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(response.body, b"shell");
    event.settled().await;
}

#[test]
fn a_new_version_does_not_resume_an_old_generation() {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(SqliteCacheStorage::open(db_path(&dir)).unwrap());
    storage.put_all("crossword-v3", vec![shell_entry("shell")]).unwrap();

    let worker = ServiceWorker::new(config("v4"), Arc::new(NoNetwork), storage, Arc::new(LoggingHost));
    assert_eq!(worker.resume().unwrap(), WorkerState::Parsed);
}

/// A fresh worker over the shared database, as each run of the binary builds one.
fn worker_run(dir: &TempDir, version: &str) -> Arc<ServiceWorker> {
    let storage = Arc::new(SqliteCacheStorage::open(db_path(dir)).unwrap());
    let worker = ServiceWorker::new(config(version), Arc::new(ShellServer), storage, Arc::new(LoggingHost));
    worker.resume().unwrap();
    worker
}

#[tokio::test]
async fn install_and_activate_work_from_separate_runs() {
    let dir = TempDir::new().unwrap();

    // First deploy.
    worker_run(&dir, "v1").install().await.unwrap();
    let run = worker_run(&dir, "v1");
    assert_eq!(run.state(), WorkerState::Active);
    assert!(run.activate().await.unwrap().is_empty());

    // Version bump: the new generation waits next to the old one until activated.
    let run = worker_run(&dir, "v2");
    assert_eq!(run.state(), WorkerState::Parsed);
    run.install().await.unwrap();

    let run = worker_run(&dir, "v2");
    assert_eq!(run.state(), WorkerState::Installed);
    let mut event = xwordkit::swagent::event::ExtendableEvent::new("fetch");
    let request = Request::parse("https://site.dev/crossword").unwrap();
    assert_eq!(run.handle_fetch(&mut event, request.clone()).await.unwrap(), None);

    assert_eq!(run.activate().await.unwrap(), vec!["crossword-v1".to_string()]);
    assert_eq!(run.state(), WorkerState::Active);

    let run = worker_run(&dir, "v2");
    assert_eq!(run.state(), WorkerState::Active);
    let storage = SqliteCacheStorage::open(db_path(&dir)).unwrap();
    assert_eq!(storage.cache_names().unwrap(), vec!["crossword-v2".to_string()]);
    let response = run.handle_fetch(&mut event, request).await.unwrap().unwrap();
    assert_eq!(response.body, b"shell /crossword");
    event.settled().await;
}

#[test]
fn recorded_badges_persist_and_are_awarded_once() {
    let dir = TempDir::new().unwrap();
    let catalog = BadgeCatalog::standard();
    let stats = PlayerStats { current_streak: 3, longest_streak: 3, total_solved: 3, ..PlayerStats::default() };
    let monday = Utc.with_ymd_and_hms(2026, 10, 12, 9, 0, 0).unwrap();
    let tuesday = Utc.with_ymd_and_hms(2026, 10, 13, 9, 0, 0).unwrap();

    {
        let mut db = xwdb::connect(db_path(&dir)).unwrap();
        xwdb::initialize_db(&db).unwrap();
        let recorded = xwdb::record_new_badges(&mut db, catalog, "ana", &stats, monday).unwrap();
        let ids = recorded.iter().map(|earned| earned.badge_id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["progress-1", "streak-3"]);
    }

    let mut db = xwdb::connect(db_path(&dir)).unwrap();
    xwdb::initialize_db(&db).unwrap();
    assert!(xwdb::record_new_badges(&mut db, catalog, "ana", &stats, tuesday).unwrap().is_empty());

    let earned = xwdb::query_earned(&db, "ana").unwrap();
    assert_eq!(earned.len(), 2);
    assert!(earned.iter().all(|badge| badge.earned_at == monday));
}

#[test]
fn invalid_stats_write_nothing() {
    let dir = TempDir::new().unwrap();
    let mut db = xwdb::connect(db_path(&dir)).unwrap();
    xwdb::initialize_db(&db).unwrap();

    let stats = PlayerStats { current_streak: 9, longest_streak: 2, total_solved: 9, ..PlayerStats::default() };
    assert!(xwdb::record_new_badges(&mut db, BadgeCatalog::standard(), "ana", &stats, Utc::now()).is_err());
    assert!(xwdb::query_held_ids(&db, "ana").unwrap().is_empty());
}

#[test]
fn duplicate_inserts_are_reported_not_raised() {
    let dir = TempDir::new().unwrap();
    let db = xwdb::connect(db_path(&dir)).unwrap();
    xwdb::initialize_db(&db).unwrap();

    let earned = EarnedBadge { badge_id: "founder".to_string(), earned_at: Utc::now() };
    assert!(xwdb::insert_earned(&db, "ana", &earned).unwrap());
    assert!(!xwdb::insert_earned(&db, "ana", &earned).unwrap());
    assert!(xwdb::insert_earned(&db, "ben", &earned).unwrap());
}
