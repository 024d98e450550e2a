use super::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use sqlx::SqlitePool;

const ORIGIN: &str = "https://memo.example/";

// =========================================================================
// MockFetcher
// =========================================================================

struct MockFetcher {
    responses: Mutex<HashMap<String, ShellResponse>>,
    calls: AtomicUsize,
    offline: AtomicBool,
}

impl MockFetcher {
    fn with_shell() -> Self {
        let responses = SHELL_ASSETS
            .iter()
            .map(|path| {
                let url = Url::parse(ORIGIN).unwrap().join(path).unwrap();
                (url.to_string(), ok_response(&format!("asset {path}")))
            })
            .collect();
        Self { responses: Mutex::new(responses), calls: AtomicUsize::new(0), offline: AtomicBool::new(false) }
    }

    fn respond(&self, url: &str, response: ShellResponse) {
        self.responses.lock().unwrap().insert(url.to_owned(), response);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &ShellRequest) -> Result<ShellResponse, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::Request { url: request.url.to_string(), message: "offline".into() });
        }
        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .cloned()
            .unwrap_or(ShellResponse { status: 404, content_type: None, body: b"missing".to_vec() }))
    }
}

fn ok_response(body: &str) -> ShellResponse {
    ShellResponse { status: 200, content_type: Some("text/plain".into()), body: body.as_bytes().to_vec() }
}

async fn test_pool() -> SqlitePool {
    crate::db::init_pool("sqlite::memory:", 1).await.unwrap()
}

fn controller(pool: &SqlitePool, fetcher: &Arc<MockFetcher>, version: &str) -> ShellController {
    ShellController::new(ShellCache::new(pool.clone()), fetcher.clone(), version, Url::parse(ORIGIN).unwrap())
}

async fn active_controller() -> (ShellController, Arc<MockFetcher>, SqlitePool) {
    let pool = test_pool().await;
    let fetcher = Arc::new(MockFetcher::with_shell());
    let shell = controller(&pool, &fetcher, "v1");
    shell.install().await.unwrap();
    shell.activate().await.unwrap();
    (shell, fetcher, pool)
}

fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

/// Background cache writes are spawned; poll until one lands.
async fn wait_for_entry(cache: &ShellCache, version: &str, key: &str) -> Option<ShellResponse> {
    for _ in 0..50 {
        if let Some(hit) = cache.lookup(version, key).await.unwrap() {
            return Some(hit);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    None
}

// =========================================================================
// install
// =========================================================================

#[tokio::test]
async fn install_caches_every_shell_asset() {
    let pool = test_pool().await;
    let fetcher = Arc::new(MockFetcher::with_shell());
    let shell = controller(&pool, &fetcher, "v1");

    shell.install().await.unwrap();

    assert_eq!(shell.state(), LifecycleState::Installed);
    assert!(shell.skips_waiting());
    assert!(!shell.has_claimed_clients());
    assert_eq!(fetcher.calls(), SHELL_ASSETS.len());

    let cache = ShellCache::new(pool.clone());
    assert_eq!(cache.entry_count("v1").await.unwrap(), i64::try_from(SHELL_ASSETS.len()).unwrap());
    for asset in shell.asset_urls().unwrap() {
        assert!(cache.lookup("v1", asset.as_str()).await.unwrap().is_some(), "{asset} not cached");
    }
}

#[tokio::test]
async fn install_fails_atomically_on_bad_asset() {
    let pool = test_pool().await;
    let fetcher = Arc::new(MockFetcher::with_shell());
    fetcher.respond(url("/app.js").as_str(), ShellResponse { status: 500, content_type: None, body: Vec::new() });
    let shell = controller(&pool, &fetcher, "v1");

    let err = shell.install().await.unwrap_err();
    assert!(matches!(err, ShellError::AssetStatus { status: 500, .. }));
    assert_eq!(shell.state(), LifecycleState::Redundant);
    assert!(!shell.skips_waiting());
    assert_eq!(ShellCache::new(pool).entry_count("v1").await.unwrap(), 0);
}

#[tokio::test]
async fn install_fails_when_offline() {
    let pool = test_pool().await;
    let fetcher = Arc::new(MockFetcher::with_shell());
    fetcher.go_offline();
    let shell = controller(&pool, &fetcher, "v1");

    assert!(matches!(shell.install().await.unwrap_err(), ShellError::AssetFetch { .. }));
    assert_eq!(shell.state(), LifecycleState::Redundant);
}

#[tokio::test]
async fn install_twice_is_invalid_state() {
    let pool = test_pool().await;
    let fetcher = Arc::new(MockFetcher::with_shell());
    let shell = controller(&pool, &fetcher, "v1");
    shell.install().await.unwrap();

    let err = shell.install().await.unwrap_err();
    assert!(matches!(
        err,
        ShellError::InvalidState { expected: LifecycleState::Parsed, actual: LifecycleState::Installed }
    ));
}

// =========================================================================
// activate
// =========================================================================

#[tokio::test]
async fn activate_before_install_is_rejected() {
    let pool = test_pool().await;
    let fetcher = Arc::new(MockFetcher::with_shell());
    let shell = controller(&pool, &fetcher, "v1");
    assert!(matches!(shell.activate().await.unwrap_err(), ShellError::InvalidState { .. }));
    assert!(!shell.has_claimed_clients());
}

#[tokio::test]
async fn activate_new_version_deletes_old_partitions() {
    let pool = test_pool().await;
    let fetcher = Arc::new(MockFetcher::with_shell());

    let old = controller(&pool, &fetcher, "v1");
    old.install().await.unwrap();
    old.activate().await.unwrap();

    let new = controller(&pool, &fetcher, "v2");
    new.install().await.unwrap();
    let deleted = new.activate().await.unwrap();

    assert_eq!(deleted, vec!["v1".to_owned()]);
    assert_eq!(new.state(), LifecycleState::Activated);
    assert!(new.has_claimed_clients());

    let cache = ShellCache::new(pool);
    assert_eq!(cache.keys().await.unwrap(), vec!["v2".to_owned()]);
    assert_eq!(cache.entry_count("v1").await.unwrap(), 0);
}

#[tokio::test]
async fn activate_same_version_deletes_nothing() {
    let (_shell, _fetcher, pool) = active_controller().await;
    assert_eq!(ShellCache::new(pool).keys().await.unwrap(), vec!["v1".to_owned()]);
}

// =========================================================================
// fetch
// =========================================================================

#[tokio::test]
async fn shell_assets_are_served_without_network_after_install() {
    let (shell, fetcher, _pool) = active_controller().await;
    let before = fetcher.calls();
    fetcher.go_offline();

    for asset in shell.asset_urls().unwrap() {
        let outcome = shell.handle_fetch(&ShellRequest::get(asset)).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::Cached(_)));
    }
    assert_eq!(fetcher.calls(), before);
}

#[tokio::test]
async fn miss_fetches_and_populates_cache() {
    let (shell, fetcher, pool) = active_controller().await;
    let page = url("/extra.css");
    fetcher.respond(page.as_str(), ok_response("body {}"));

    let outcome = shell.handle_fetch(&ShellRequest::get(page.clone())).await.unwrap();
    assert_eq!(outcome, FetchOutcome::Network(ok_response("body {}")));

    let cache = ShellCache::new(pool);
    assert_eq!(wait_for_entry(&cache, "v1", page.as_str()).await, Some(ok_response("body {}")));

    fetcher.go_offline();
    let outcome = shell.handle_fetch(&ShellRequest::get(page)).await.unwrap();
    assert_eq!(outcome, FetchOutcome::Cached(ok_response("body {}")));
}

#[tokio::test]
async fn unsuccessful_responses_are_returned_but_not_cached() {
    let (shell, _fetcher, pool) = active_controller().await;
    let missing = url("/nope");

    let outcome = shell.handle_fetch(&ShellRequest::get(missing.clone())).await.unwrap();
    assert!(matches!(outcome, FetchOutcome::Network(ShellResponse { status: 404, .. })));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(ShellCache::new(pool).lookup("v1", missing.as_str()).await.unwrap().is_none());
}

#[tokio::test]
async fn offline_miss_is_network_error() {
    let (shell, fetcher, _pool) = active_controller().await;
    fetcher.go_offline();
    let err = shell.handle_fetch(&ShellRequest::get(url("/uncached"))).await.unwrap_err();
    assert!(matches!(err, NetworkError::Request { .. }));
}

#[tokio::test]
async fn non_get_requests_never_touch_cache() {
    let (shell, fetcher, pool) = active_controller().await;
    let before = fetcher.calls();
    let cache = ShellCache::new(pool);
    let entries = cache.entry_count("v1").await.unwrap();

    for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
        let request = ShellRequest { method, url: url("/index.html"), content_type: None, body: b"x".to_vec() };
        assert_eq!(shell.handle_fetch(&request).await.unwrap(), FetchOutcome::Passthrough);
    }

    assert_eq!(fetcher.calls(), before);
    assert_eq!(cache.entry_count("v1").await.unwrap(), entries);
}

#[tokio::test]
async fn cross_origin_requests_pass_through() {
    let (shell, fetcher, _pool) = active_controller().await;
    let before = fetcher.calls();
    let foreign = Url::parse("https://cdn.other.example/lib.js").unwrap();

    assert_eq!(shell.handle_fetch(&ShellRequest::get(foreign)).await.unwrap(), FetchOutcome::Passthrough);
    assert_eq!(fetcher.calls(), before);
}

#[tokio::test]
async fn requests_before_activation_pass_through() {
    let pool = test_pool().await;
    let fetcher = Arc::new(MockFetcher::with_shell());
    let shell = controller(&pool, &fetcher, "v1");
    shell.install().await.unwrap();

    let outcome = shell.handle_fetch(&ShellRequest::get(url("/index.html"))).await.unwrap();
    assert_eq!(outcome, FetchOutcome::Passthrough);
}

#[tokio::test]
async fn cache_failure_does_not_fail_response() {
    let (shell, fetcher, pool) = active_controller().await;
    let page = url("/late.js");
    fetcher.respond(page.as_str(), ok_response("late"));
    pool.close().await;

    let outcome = shell.handle_fetch(&ShellRequest::get(page)).await.unwrap();
    assert_eq!(outcome, FetchOutcome::Network(ok_response("late")));
}

#[tokio::test]
async fn same_origin_compares_scheme_host_and_port() {
    let fetcher: Arc<dyn Fetcher> = Arc::new(MockFetcher::with_shell());
    let pool = test_pool().await;
    let shell = ShellController::new(ShellCache::new(pool), fetcher, "v1", Url::parse(ORIGIN).unwrap());

    assert!(shell.is_same_origin(&Url::parse("https://memo.example/a/b?c=d").unwrap()));
    assert!(!shell.is_same_origin(&Url::parse("http://memo.example/").unwrap()));
    assert!(!shell.is_same_origin(&Url::parse("https://memo.example:8443/").unwrap()));
    assert!(!shell.is_same_origin(&Url::parse("https://other.example/").unwrap()));
}
