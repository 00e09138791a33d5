use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Metric name prefix for all resolver metrics
const PREFIX: &str = "vibe_resolver";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Resolution Metrics
    pub static ref STAGE_HITS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_stage_hits_total"), "Candidates produced, by resolution stage"),
        &["stage"]
    ).expect("Failed to create stage_hits_total metric");

    pub static ref OUTCOMES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_outcomes_total"), "Resolution outcomes by status"),
        &["status"]
    ).expect("Failed to create outcomes_total metric");

    pub static ref RESOLUTION_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_resolution_duration_seconds"),
            "End-to-end resolution duration in seconds"
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0])
    ).expect("Failed to create resolution_duration_seconds metric");

    // Collaborator Metrics
    pub static ref COLLABORATOR_FAILURES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_collaborator_failures_total"),
            "Collaborator calls that exhausted their retry budget"
        ),
        &["collaborator"]
    ).expect("Failed to create collaborator_failures_total metric");

    // Enrichment Metrics
    pub static ref ENRICHMENT_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_enrichment_total"), "Catalog enrichment attempts by result"),
        &["result"]
    ).expect("Failed to create enrichment_total metric");
}

/// Register all metrics with the registry. Safe to call more than once.
pub fn init_metrics() {
    // ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(STAGE_HITS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(OUTCOMES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(RESOLUTION_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(COLLABORATOR_FAILURES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ENRICHMENT_TOTAL.clone()));

    tracing::debug!("Metrics registered");
}

pub fn record_stage_hit(stage: &str) {
    STAGE_HITS_TOTAL.with_label_values(&[stage]).inc();
}

pub fn record_outcome(status: &str, duration: Duration) {
    OUTCOMES_TOTAL.with_label_values(&[status]).inc();
    RESOLUTION_DURATION_SECONDS.observe(duration.as_secs_f64());
}

pub fn record_collaborator_failure(collaborator: &str) {
    COLLABORATOR_FAILURES_TOTAL
        .with_label_values(&[collaborator])
        .inc();
}

pub fn record_enrichment(result: &str) {
    ENRICHMENT_TOTAL.with_label_values(&[result]).inc();
}

/// Render the registry in the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        init_metrics();
        init_metrics();

        record_outcome("resolved", Duration::from_millis(5));
        let metric_families = REGISTRY.gather();
        assert!(!metric_families.is_empty(), "Metrics should be registered");
    }

    #[test]
    fn test_record_stage_hit() {
        init_metrics();

        record_stage_hit("exact_match");

        let metrics = REGISTRY.gather();
        let stage_metrics = metrics
            .iter()
            .find(|m| m.get_name() == "vibe_resolver_stage_hits_total");
        assert!(stage_metrics.is_some(), "Stage metrics should exist");
    }

    #[test]
    fn test_gather_metrics_text_format() {
        init_metrics();

        record_enrichment("inserted");
        record_collaborator_failure("discovery");

        let text = gather_metrics();
        assert!(text.contains("vibe_resolver_enrichment_total"));
        assert!(text.contains("collaborator=\"discovery\""));
    }
}
