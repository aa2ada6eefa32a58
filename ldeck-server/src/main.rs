/// LinkDeck subsystem server
///
/// Hosts the endpoints this subsystem owns:
/// - job-handler callbacks invoked by the external scheduling service
///   (POST /jobs/health-sweep, POST /jobs/metadata-refresh)
/// - the click mutation path (mutate -> publish -> invalidate)
/// - the polling surface for recent channel events
///
/// List CRUD, auth, and UI rendering live elsewhere; this binary only wires
/// the mutation coordinator, event bus, cache client, and sweep engine
/// together with explicitly constructed clients.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ldeck_bus::{channel_activity, channel_update, CacheClient, EventBus, MemoryKvStore};
use ldeck_core::config::{BusConfig, SweepConfig};
use ldeck_core::retry::{retry_with_policy, RetryPolicy};
use ldeck_core::{Envelope, Error, JobKind};
use ldeck_jobs::{HttpProber, HttpScheduler, JobDispatcher, SweepEngine};
use ldeck_store::{MemoryListStore, MutationCoordinator};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Application state
#[derive(Clone)]
struct AppState {
    coordinator: Arc<MutationCoordinator>,
    bus: Arc<EventBus>,
    cache: Arc<CacheClient>,
    engine: Arc<SweepEngine>,
    dispatcher: Arc<JobDispatcher>,
    sweep_config: SweepConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let sweep_config = SweepConfig::default();
    sweep_config.validate().map_err(|e| anyhow::anyhow!(e))?;

    // Explicitly constructed, dependency-injected clients; lifecycle is tied
    // to this process
    let kv = Arc::new(MemoryKvStore::new());
    let store = Arc::new(MemoryListStore::new());
    let coordinator = Arc::new(MutationCoordinator::new(store));
    let bus = Arc::new(EventBus::new(kv.clone(), BusConfig::default()));
    let cache = Arc::new(CacheClient::new(kv));
    let prober = Arc::new(HttpProber::new(&sweep_config)?);

    let dispatcher = match std::env::var("LDECK_SCHEDULER_URL") {
        Ok(endpoint) => {
            let callback_base = std::env::var("LDECK_CALLBACK_BASE")
                .unwrap_or_else(|_| "http://127.0.0.1:3100".to_string());
            info!(endpoint, "scheduler configured");
            JobDispatcher::new(Arc::new(HttpScheduler::new(endpoint, callback_base)?))
        }
        Err(_) => {
            warn!("LDECK_SCHEDULER_URL unset, maintenance jobs will not be scheduled");
            JobDispatcher::disabled()
        }
    };

    let engine = Arc::new(SweepEngine::new(
        coordinator.clone(),
        bus.clone(),
        cache.clone(),
        prober,
        sweep_config.clone(),
    ));

    let state = AppState {
        coordinator,
        bus,
        cache,
        engine,
        dispatcher: Arc::new(dispatcher),
        sweep_config,
    };

    let app = Router::new()
        .route("/", get(root))
        .route("/jobs/health-sweep", post(run_health_sweep))
        .route("/jobs/metadata-refresh", post(run_metadata_refresh))
        .route("/jobs/schedule", post(schedule_job))
        .route("/lists/:list_id/items/:item_id/click", post(record_click))
        .route("/lists/:list_id/events", get(recent_events))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = std::env::var("LDECK_LISTEN").unwrap_or_else(|_| "127.0.0.1:3100".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn root() -> &'static str {
    "LinkDeck job and event endpoints"
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct JobBody {
    list_id: String,
    concurrency: Option<usize>,
}

/// Callback target for scheduled health sweeps.
async fn run_health_sweep(
    State(state): State<AppState>,
    Json(body): Json<JobBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let concurrency = body
        .concurrency
        .unwrap_or(state.sweep_config.effective_concurrency());
    let summary = state
        .engine
        .run_health_sweep(&body.list_id, concurrency)
        .await?;
    Ok(Json(json!(summary)))
}

/// Callback target for scheduled metadata refreshes.
async fn run_metadata_refresh(
    State(state): State<AppState>,
    Json(body): Json<JobBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let concurrency = body
        .concurrency
        .unwrap_or(state.sweep_config.effective_concurrency());
    let summary = state
        .engine
        .run_metadata_refresh(&body.list_id, concurrency)
        .await?;
    Ok(Json(json!(summary)))
}

#[derive(Debug, Deserialize)]
struct ScheduleBody {
    kind: JobKind,
    list_id: String,
    cron: Option<String>,
}

/// Submit a job to the external scheduler. Best-effort: a dispatch failure
/// is reported but should not fail the interactive operation that wanted it.
async fn schedule_job(
    State(state): State<AppState>,
    Json(body): Json<ScheduleBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    match &body.cron {
        Some(cron) => {
            state
                .dispatcher
                .submit_recurring(body.kind, &body.list_id, cron)
                .await?
        }
        None => state.dispatcher.submit(body.kind, &body.list_id).await?,
    }
    Ok(Json(json!({ "submitted": true })))
}

/// The interactive mutation path: serialize the increment through the
/// coordinator, then publish and invalidate. The publish and the cache drop
/// are best-effort by construction and cannot fail the click.
///
/// A `Conflict` here means the row lock wait timed out under contention;
/// clicks are cheap to re-run, so this handler retries briefly before
/// surfacing 409 to the client.
async fn record_click(
    State(state): State<AppState>,
    Path((list_id, item_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let coordinator = state.coordinator.clone();
    let updated = retry_with_policy(&RetryPolicy::fast(), || {
        let coordinator = coordinator.clone();
        let (list_id, item_id) = (list_id.clone(), item_id.clone());
        async move {
            coordinator.apply_counter_mutation(&list_id, &item_id, |clicks| {
                clicks.saturating_add(1)
            })
        }
    })
    .await?;
    let clicks = updated
        .find_url(&item_id)
        .map(|item| item.clicks)
        .ok_or_else(|| Error::Internal("item missing after mutation".into()))?;

    let envelope = Envelope::new("list_activity", &list_id, "click")
        .with_field("item_id", json!(item_id))
        .with_field("clicks", json!(clicks));
    state.bus.publish(&channel_activity(&list_id), &envelope);
    state.cache.invalidate_list(&list_id, &updated.slug);

    Ok(Json(json!({ "clicks": clicks })))
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    limit: Option<usize>,
    channel: Option<String>,
}

/// Polling surface for recent events on a list's channels.
async fn recent_events(
    State(state): State<AppState>,
    Path(list_id): Path<String>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<Envelope>> {
    let channel = match query.channel.as_deref() {
        Some("activity") => channel_activity(&list_id),
        _ => channel_update(&list_id),
    };
    let limit = query.limit.unwrap_or(20);
    Json(state.bus.fetch_recent(&channel, limit))
}

/// Error wrapper mapping subsystem errors onto HTTP status codes
struct AppError(Error);

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Error::DispatchFailure(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.0.to_string(),
            "code": self.0.code(),
            "retryable": self.0.is_retryable(),
        }));

        (status, body).into_response()
    }
}
