use prometheus::{
    Encoder, HistogramOpts, HistogramVec, Histogram, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Dispatcher
    pub http_requests: IntCounterVec,
    pub http_request_duration: HistogramVec,

    // Refresh coordinator
    pub token_refresh: IntCounterVec,
    pub token_refresh_waiters: Histogram,
    pub request_replays: IntCounter,
    pub session_invalidations: IntCounter,

    // Config
    pub config_validation_errors: IntCounter,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("zonaazul".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            http_requests: IntCounterVec::new(Opts::new("http_requests_total", "Dispatched requests by method and status"), &["method", "status"]).unwrap(),
            http_request_duration: HistogramVec::new(HistogramOpts::new("http_request_duration_seconds", "Dispatch duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]), &["method"]).unwrap(),

            token_refresh: IntCounterVec::new(Opts::new("token_refresh_total", "Refresh cycles by outcome"), &["outcome"]).unwrap(),
            token_refresh_waiters: Histogram::with_opts(HistogramOpts::new("token_refresh_waiters", "Callers served per refresh cycle").buckets(vec![1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0])).unwrap(),
            request_replays: IntCounter::new("request_replays_total", "Requests resubmitted after a refresh").unwrap(),
            session_invalidations: IntCounter::new("session_invalidations_total", "Published session-invalidated events").unwrap(),

            config_validation_errors: IntCounter::new("config_validation_errors_total", "Config parse and validation failures").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.http_requests.clone())).unwrap();
        reg.register(Box::new(metrics.http_request_duration.clone())).unwrap();
        reg.register(Box::new(metrics.token_refresh.clone())).unwrap();
        reg.register(Box::new(metrics.token_refresh_waiters.clone())).unwrap();
        reg.register(Box::new(metrics.request_replays.clone())).unwrap();
        reg.register(Box::new(metrics.session_invalidations.clone())).unwrap();
        reg.register(Box::new(metrics.config_validation_errors.clone())).unwrap();

        metrics
    }
}

/// Render the registry in the prometheus text exposition format.
pub async fn metrics_text() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = get_metrics().await.registry.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
