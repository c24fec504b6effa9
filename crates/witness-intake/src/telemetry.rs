//! Metrics emitted by the pipeline. A no-op unless the host installs a
//! `metrics` recorder.

use std::time::Instant;

use crate::outcome::IntakeOutcome;

pub const OUTCOMES_TOTAL: &str = "witness_intake_outcomes_total";
pub const DURATION_SECONDS: &str = "witness_intake_duration_seconds";
pub const STORE_RETRIES_TOTAL: &str = "witness_store_retries_total";
pub const COMMIT_DURATION_SECONDS: &str = "witness_commit_duration_seconds";

pub(crate) fn record_outcome(outcome: &IntakeOutcome, started: Instant) {
    metrics::counter!(OUTCOMES_TOTAL, "outcome" => outcome.label()).increment(1);
    metrics::histogram!(DURATION_SECONDS, "outcome" => outcome.label())
        .record(started.elapsed().as_secs_f64());
}

pub(crate) fn record_store_retry(part: &'static str) {
    metrics::counter!(STORE_RETRIES_TOTAL, "part" => part).increment(1);
}

pub(crate) fn record_commit_latency(started: Instant) {
    metrics::histogram!(COMMIT_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
}
