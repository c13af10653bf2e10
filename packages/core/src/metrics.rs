//! Prometheus metrics registry for the site gallery.
//!
//! [`AppMetrics`] owns all registered metrics and the [`Registry`] they
//! belong to. Construct it once at startup, wrap in `Arc`, and share it
//! with the sync scheduler and the HTTP layer.
//!
//! Exposed at `GET /metrics` in Prometheus text exposition format
//! (`text/plain; version=0.0.4`).

use prometheus::{Counter, CounterVec, Gauge, Histogram, HistogramOpts, Opts, Registry};

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

pub struct AppMetrics {
    /// Reconciliation passes started (manual and scheduled).
    pub sync_runs_total: Counter,
    /// Reconciliation passes that failed before writing.
    pub sync_errors_total: Counter,
    /// Rows upserted by the most recent successful pass.
    pub sites_synced: Gauge,
    pub listings_served_total: Counter,
    pub exclusions_total: Counter,
    /// HTTP request count, labelled by method, path, and status code.
    pub http_requests_total: CounterVec,
    pub http_request_duration: Histogram,
    pub registry: Registry,
}

impl AppMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let sync_runs_total = Counter::with_opts(Opts::new(
            "site_gallery_sync_runs_total",
            "Hosting inventory sync passes",
        ))?;

        let sync_errors_total = Counter::with_opts(Opts::new(
            "site_gallery_sync_errors_total",
            "Failed hosting inventory sync passes",
        ))?;

        let sites_synced = Gauge::with_opts(Opts::new(
            "site_gallery_sites_synced",
            "Sites upserted by the last successful sync",
        ))?;

        let listings_served_total = Counter::with_opts(Opts::new(
            "site_gallery_listings_served_total",
            "Site listings served",
        ))?;

        let exclusions_total = Counter::with_opts(Opts::new(
            "site_gallery_exclusions_total",
            "Sites newly excluded",
        ))?;

        let http_requests_total = CounterVec::new(
            Opts::new(
                "site_gallery_http_requests_total",
                "HTTP requests by method, path, and status",
            ),
            &["method", "path", "status"],
        )?;

        let http_request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "site_gallery_http_request_duration_seconds",
                "HTTP request latency in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;

        registry.register(Box::new(sync_runs_total.clone()))?;
        registry.register(Box::new(sync_errors_total.clone()))?;
        registry.register(Box::new(sites_synced.clone()))?;
        registry.register(Box::new(listings_served_total.clone()))?;
        registry.register(Box::new(exclusions_total.clone()))?;
        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;

        Ok(Self {
            sync_runs_total,
            sync_errors_total,
            sites_synced,
            listings_served_total,
            exclusions_total,
            http_requests_total,
            http_request_duration,
            registry,
        })
    }

    /// Render all metrics as Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&metric_families, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}
