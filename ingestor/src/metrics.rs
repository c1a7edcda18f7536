use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Gauge, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref READINGS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_readings_total",
        "Total readings stored, single and batched"
    ))
    .unwrap();
    pub static ref BATCHES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_batches_total",
        "Total batches stored"
    ))
    .unwrap();
    pub static ref VALIDATION_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_validation_failures_total",
        "Total requests rejected by validation"
    ))
    .unwrap();
    pub static ref UNAUTHORIZED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_unauthorized_total",
        "Total requests rejected for a missing or wrong bearer token"
    ))
    .unwrap();
    pub static ref KNOWN_DEVICES: Gauge = Gauge::with_opts(Opts::new(
        "ingestor_known_devices",
        "Devices with at least one stored reading"
    ))
    .unwrap();
}

pub fn init_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(READINGS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(BATCHES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(VALIDATION_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(UNAUTHORIZED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(KNOWN_DEVICES.clone()))?;
    Ok(())
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
