use crate::error::{QryError, Result};
use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    pub files_scanned: IntCounter,
    pub matches_found: IntCounter,
    pub files_skipped: IntCounter,
    pub dirs_pruned: IntCounter,
    registry: Arc<Registry>,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter> {
    let counter = IntCounter::with_opts(Opts::new(name, help)).map_err(metrics_error)?;
    registry
        .register(Box::new(counter.clone()))
        .map_err(metrics_error)?;
    Ok(counter)
}

fn metrics_error(e: prometheus::Error) -> QryError {
    QryError::Other(format!("metrics error: {e}"))
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        Ok(Metrics {
            files_scanned: counter(&registry, "files_scanned", "Number of files evaluated")?,
            matches_found: counter(&registry, "matches_found", "Number of results yielded")?,
            files_skipped: counter(
                &registry,
                "files_skipped",
                "Number of entries skipped because they could not be read",
            )?,
            dirs_pruned: counter(
                &registry,
                "dirs_pruned",
                "Number of directories not descended into (excluded or out of date range)",
            )?,
            registry: Arc::new(registry),
        })
    }

    pub fn gather(&self) -> Result<String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(metrics_error)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
