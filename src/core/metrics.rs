use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;
use crate::db::types::SubmissionStatus;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn submission_transitioned(status: SubmissionStatus) {
    metrics::counter!("submission_transitions_total", "status" => status.as_str()).increment(1);
}

pub(crate) fn summary_field_unavailable(field: &'static str) {
    metrics::counter!("submission_summary_unavailable_total", "field" => field).increment(1);
}

pub(crate) fn mutation_rejected_in_flight(action: &'static str) {
    metrics::counter!("submission_in_flight_rejections_total", "action" => action).increment(1);
}
