pub fn init() {
    // Logs go to stderr; stdout carries only the JSON result.
    // Default to warn; allow override via RUST_LOG (e.g., "debug").
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Simple helper to log a metrics-like line.
pub fn log_metric(operation: &str, metric: &str, value: f64) {
    tracing::info!(operation = operation, metric = metric, value = value, "metric");
}
