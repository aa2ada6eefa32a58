/// Test utilities and helpers for LinkDeck testing
///
/// Provides a wired-together subsystem fixture over the in-memory store and
/// key-value backends, plus a scriptable prober for sweep tests.

use async_trait::async_trait;
use ldeck_bus::{CacheClient, EventBus, MemoryKvStore};
use ldeck_core::config::{BusConfig, SweepConfig};
use ldeck_core::{LinkList, UrlItem};
use ldeck_jobs::{ProbeOutcome, Prober, SweepEngine};
use ldeck_store::{ListStore, MemoryListStore, MutationCoordinator};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A fully wired subsystem over in-memory backends.
pub struct TestDeck {
    pub store: Arc<MemoryListStore>,
    pub kv: Arc<MemoryKvStore>,
    pub coordinator: Arc<MutationCoordinator>,
    pub bus: Arc<EventBus>,
    pub cache: Arc<CacheClient>,
    pub prober: Arc<ScriptedProber>,
    pub engine: Arc<SweepEngine>,
}

impl TestDeck {
    pub fn new() -> Self {
        Self::with_prober(ScriptedProber::new())
    }

    pub fn with_prober(prober: ScriptedProber) -> Self {
        let store = Arc::new(MemoryListStore::new());
        let kv = Arc::new(MemoryKvStore::new());
        let coordinator = Arc::new(MutationCoordinator::new(store.clone()));
        let bus = Arc::new(EventBus::new(kv.clone(), BusConfig::default()));
        let cache = Arc::new(CacheClient::new(kv.clone()));
        let prober = Arc::new(prober);
        let engine = Arc::new(SweepEngine::new(
            coordinator.clone(),
            bus.clone(),
            cache.clone(),
            prober.clone(),
            SweepConfig::new().with_pacing(Duration::from_millis(1)),
        ));
        Self {
            store,
            kv,
            coordinator,
            bus,
            cache,
            prober,
            engine,
        }
    }

    /// Create a list with `n` items and return (list_id, item_ids).
    pub fn seed_list(&self, slug: &str, n: usize) -> (String, Vec<String>) {
        let mut list = LinkList::new(slug, "user-1");
        let mut item_ids = Vec::with_capacity(n);
        for i in 0..n {
            let item = UrlItem::new(format!("https://example.com/{}", i), format!("Item {}", i));
            item_ids.push(item.id.clone());
            list.urls.push(item);
        }
        let list_id = list.id.clone();
        self.store.create(list).expect("seed list");
        (list_id, item_ids)
    }
}

impl Default for TestDeck {
    fn default() -> Self {
        Self::new()
    }
}

/// Prober serving canned outcomes by URL; unknown URLs answer 200 in 100ms.
pub struct ScriptedProber {
    outcomes: Mutex<HashMap<String, ProbeOutcome>>,
    bodies: Mutex<HashMap<String, String>>,
    pub calls: AtomicUsize,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(HashMap::new()),
            bodies: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn script_status(&self, url: &str, status: u16, elapsed_ms: u64) {
        self.outcomes.lock().insert(
            url.to_string(),
            ProbeOutcome {
                status: Some(status),
                elapsed: Duration::from_millis(elapsed_ms),
                error: None,
                body: None,
            },
        );
    }

    pub fn script_failure(&self, url: &str, error: &str) {
        self.outcomes
            .lock()
            .insert(url.to_string(), ProbeOutcome::failed(Duration::from_secs(10), error));
    }

    pub fn script_body(&self, url: &str, body: &str) {
        self.bodies.lock().insert(url.to_string(), body.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, url: &str) -> ProbeOutcome {
        self.outcomes.lock().get(url).cloned().unwrap_or(ProbeOutcome {
            status: Some(200),
            elapsed: Duration::from_millis(100),
            error: None,
            body: None,
        })
    }
}

impl Default for ScriptedProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.lookup(url)
    }

    async fn fetch_page(&self, url: &str) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut outcome = self.lookup(url);
        outcome.body = self.bodies.lock().get(url).cloned();
        outcome
    }
}
