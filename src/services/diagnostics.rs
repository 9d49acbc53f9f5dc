//! Diagnostic sink that writes anomaly records to the tracing pipeline.

use crate::domain::models::AnomalyRecord;
use crate::domain::ports::DiagnosticSink;

/// Emits one structured `warn` event per anomaly.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnosticSink;

impl DiagnosticSink for TracingDiagnosticSink {
    fn record(&self, anomaly: &AnomalyRecord) {
        tracing::warn!(
            kind = %anomaly.kind,
            stream = %anomaly.stream,
            resource = %anomaly.resource,
            partition = %anomaly.partition,
            observed = anomaly.observed,
            expected = anomaly.expected,
            upper_bound = anomaly.upper_bound,
            "Partition replica count out of bounds"
        );
    }
}
