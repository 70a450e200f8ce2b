//! Test doubles shared by the controller tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use shellcache_core::{AppConfig, CacheDb, CachedResponse, Error, InterceptRequest, MatchMode, ResponseKind};
use url::Url;

use super::{CacheEvent, CacheObserver, ControllerConfig, OfflineController};
use crate::fetch::Network;

pub const BASE: &str = "https://app.test/";

pub fn url(path: &str) -> Url {
    Url::parse(BASE).unwrap().join(path).unwrap()
}

pub fn response(u: &Url, status: u16, kind: ResponseKind, body: &'static str) -> CachedResponse {
    CachedResponse {
        url: u.clone(),
        status,
        status_text: String::new(),
        headers: vec![("content-type".to_string(), "text/plain".to_string())],
        body: Bytes::from_static(body.as_bytes()),
        kind,
    }
}

/// In-memory network with per-URL routes and an offline switch.
///
/// Unrouted URLs answer 404.
pub struct FakeNetwork {
    routes: Mutex<HashMap<String, CachedResponse>>,
    broken: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    online: AtomicBool,
}

impl FakeNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            routes: Mutex::new(HashMap::new()),
            broken: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            online: AtomicBool::new(true),
        })
    }

    pub fn route(&self, path: &str, status: u16, kind: ResponseKind, body: &'static str) {
        let u = url(path);
        let resp = response(&u, status, kind, body);
        self.routes.lock().unwrap().insert(u.to_string(), resp);
    }

    /// 200 basic response.
    pub fn serve(&self, path: &str, body: &'static str) {
        self.route(path, 200, ResponseKind::Basic, body);
    }

    /// Transport failure for one URL only.
    pub fn break_route(&self, path: &str) {
        self.broken.lock().unwrap().insert(url(path).to_string());
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &InterceptRequest) -> Result<CachedResponse, Error> {
        let key = request.url.to_string();
        self.calls.lock().unwrap().push(format!("{} {}", request.method, key));

        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::FetchFailed("offline".into()));
        }
        if self.broken.lock().unwrap().contains(&key) {
            return Err(Error::FetchFailed(format!("connection reset: {key}")));
        }

        let routed = self.routes.lock().unwrap().get(&key).cloned();
        Ok(routed.unwrap_or_else(|| response(&request.url, 404, ResponseKind::Basic, "not found")))
    }
}

/// Observer that keeps every event for inspection.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<CacheEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<CacheEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<CacheEvent> {
        self.events().into_iter().filter(CacheEvent::is_failure).collect()
    }
}

impl CacheObserver for RecordingObserver {
    fn on_event(&self, event: &CacheEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub struct Harness {
    pub controller: OfflineController,
    pub network: Arc<FakeNetwork>,
    pub observer: Arc<RecordingObserver>,
    pub db: CacheDb,
}

pub async fn harness(manifest: &[&str], match_mode: MatchMode) -> Harness {
    let app = AppConfig {
        cache_prefix: "app".into(),
        version: "v7".into(),
        base_url: BASE.into(),
        manifest: manifest.iter().map(|s| s.to_string()).collect(),
        match_mode,
        ..Default::default()
    };
    let config = ControllerConfig::from_app_config(&app).unwrap();
    let db = CacheDb::open_in_memory().await.unwrap();
    let network = FakeNetwork::new();
    let observer = Arc::new(RecordingObserver::default());

    let controller =
        OfflineController::new(config, db.clone(), network.clone()).with_observer(observer.clone());

    Harness { controller, network, observer, db }
}

/// Harness with the shell served, set up and activated.
pub async fn activated(manifest: &[&str], match_mode: MatchMode) -> Harness {
    let h = harness(manifest, match_mode).await;
    h.network.serve("./", "<html>root</html>");
    h.network.serve("./index.html", "<html>shell</html>");
    h.controller.setup().await.unwrap();
    h.controller.activate().await.unwrap();
    h.network.reset_calls();
    h
}
