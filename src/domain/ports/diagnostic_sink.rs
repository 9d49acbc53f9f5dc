use crate::domain::models::AnomalyRecord;

/// Operator-facing destination for anomaly records.
///
/// Called synchronously on the notification thread that observed the
/// anomaly, so implementations must be cheap and must not block.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, anomaly: &AnomalyRecord);
}
