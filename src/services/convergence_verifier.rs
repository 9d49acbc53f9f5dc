//! Replica-convergence verifier.
//!
//! Watches the declared and actual placement streams while a rebalance runs
//! and flags partitions whose replica count leaves the acceptable band:
//!
//! - **Under-replication**: fewer replicas than expected, on either stream.
//! - **Over-replication**: more than `expected + tolerance` replicas.
//!
//! Flags are sticky until [`ConvergenceVerifier::reset`]. Notifications are
//! only classified while the verifier is tracking; anything delivered while
//! stopped is dropped.
//!
//! ## Usage
//!
//! ```ignore
//! let verifier = ConvergenceVerifier::builder(snapshot, coordination)
//!     .cluster_node_count(6)
//!     .build();
//! verifier.start()?;
//! // ... run the migration ...
//! verifier.stop();
//! assert!(!verifier.has_less_replica());
//! ```

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::domain::error::VerifierError;
use crate::domain::models::{
    ActualPlacement, AnomalyRecord, AnomalyReport, DeclaredPlacement, DeclaredPlacementSnapshot,
    PlacementStream, ReplicaFactor, VerifierConfig, VerifierState,
};
use crate::domain::ports::{CoordinationService, DiagnosticSink, PlacementChangeListener};

use super::anomaly_ledger::AnomalyLedger;
use super::diagnostics::TracingDiagnosticSink;
use super::listener_registration::ListenerRegistration;
use super::replica_policy::ReplicaCountPolicy;

// ---------------------------------------------------------------------------
// VerifierCore
// ---------------------------------------------------------------------------

/// The listener half of the verifier, shared with the coordination service.
struct VerifierCore {
    snapshot: Arc<DeclaredPlacementSnapshot>,
    policy: ReplicaCountPolicy,
    cluster_node_count: usize,
    /// Callbacks hold the read guard while classifying; `stop()` takes the
    /// write guard, so no classification outlives it.
    state: RwLock<VerifierState>,
    /// `Some` while `start()` is registering listeners. Anomalies from
    /// initial callbacks are held here until registration succeeds.
    pending: Mutex<Option<Vec<AnomalyRecord>>>,
    ledger: AnomalyLedger,
    sinks: Vec<Arc<dyn DiagnosticSink>>,
}

impl VerifierCore {
    fn state(&self) -> VerifierState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: VerifierState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    fn begin_start(&self) {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(Vec::new());
        self.set_state(VerifierState::Tracking);
    }

    fn commit_start(&self) {
        let held = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or_default();
        for record in &held {
            self.publish(record);
        }
    }

    fn abort_start(&self) {
        // Waits for in-flight callbacks, so nothing is added after the take
        self.set_state(VerifierState::Stopped);
        let discarded = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map_or(0, |held| held.len());
        if discarded > 0 {
            tracing::debug!(discarded, "Discarded anomalies from initial callbacks of a failed start");
        }
    }

    fn publish(&self, record: &AnomalyRecord) {
        self.ledger.record(record);
        for sink in &self.sinks {
            sink.record(record);
        }
    }

    fn check_partition(
        &self,
        stream: PlacementStream,
        resource: &str,
        partition: &str,
        observed: usize,
        replica_factor: ReplicaFactor,
    ) {
        let bounds = self.policy.bounds(replica_factor, self.cluster_node_count);
        let Some(kind) = bounds.classify(observed) else {
            return;
        };

        let record = AnomalyRecord::new(
            kind,
            stream,
            resource,
            partition,
            observed,
            bounds.expected,
            bounds.upper,
        );
        if let Some(held) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            held.push(record);
            return;
        }
        self.publish(&record);
    }
}

impl PlacementChangeListener for VerifierCore {
    fn on_declared_placement_changed(&self, placements: &[DeclaredPlacement]) {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if !state.is_tracking() {
            return;
        }

        // The incoming record carries its own replica factor; the snapshot is
        // not consulted or updated here.
        for placement in placements {
            for (partition, state_map) in &placement.partitions {
                self.check_partition(
                    PlacementStream::Declared,
                    &placement.resource,
                    partition,
                    state_map.len(),
                    placement.replica_factor,
                );
            }
        }
    }

    fn on_actual_placement_changed(&self, placements: &[ActualPlacement]) {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if !state.is_tracking() {
            return;
        }

        for placement in placements {
            let Some(declared) = self.snapshot.get(&placement.resource) else {
                tracing::trace!(resource = %placement.resource, "Skipping untracked resource");
                continue;
            };

            // Only partitions declared in the snapshot are checked; a missing
            // partition in the report counts as zero replicas.
            for partition in declared.partition_names() {
                self.check_partition(
                    PlacementStream::Actual,
                    &placement.resource,
                    partition,
                    placement.replica_count(partition),
                    declared.replica_factor,
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ConvergenceVerifier
// ---------------------------------------------------------------------------

/// Observer that flags replica under- and over-provisioning during a migration.
pub struct ConvergenceVerifier {
    core: Arc<VerifierCore>,
    coordination: Arc<dyn CoordinationService>,
    /// `Some` exactly while tracking. The mutex serializes start and stop.
    registration: Mutex<Option<ListenerRegistration>>,
}

impl ConvergenceVerifier {
    /// Start building a verifier over a declared placement snapshot.
    pub fn builder(
        snapshot: Arc<DeclaredPlacementSnapshot>,
        coordination: Arc<dyn CoordinationService>,
    ) -> VerifierBuilder {
        VerifierBuilder::new(snapshot, coordination)
    }

    /// Create a verifier from configuration, logging anomalies via tracing.
    pub fn new(
        snapshot: Arc<DeclaredPlacementSnapshot>,
        coordination: Arc<dyn CoordinationService>,
        config: &VerifierConfig,
    ) -> Self {
        Self::builder(snapshot, coordination).config(config).build()
    }

    /// Begin tracking: register both listeners and transition to `Tracking`.
    ///
    /// Fails without side effects if already tracking or if the
    /// coordination service rejects either registration.
    pub fn start(&self) -> Result<(), VerifierError> {
        let mut registration = self
            .registration
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if registration.is_some() {
            return Err(VerifierError::AlreadyTracking);
        }

        // Tracking is enabled before listeners are registered so initial
        // callbacks fired during registration are classified. Their anomalies
        // only count once every registration has succeeded.
        self.core.begin_start();

        let listener: Arc<dyn PlacementChangeListener> = self.core.clone();
        match ListenerRegistration::acquire(Arc::clone(&self.coordination), &listener) {
            Ok(handle) => {
                *registration = Some(handle);
                self.core.commit_start();
                tracing::info!(
                    resources = self.core.snapshot.len(),
                    partitions = self.core.snapshot.partition_count(),
                    cluster_node_count = self.core.cluster_node_count,
                    tolerance = self.core.policy.tolerance(),
                    "Convergence verifier tracking started"
                );
                Ok(())
            }
            Err(err) => {
                self.core.abort_start();
                tracing::error!(error = %err, "Convergence verifier failed to start");
                Err(err.into())
            }
        }
    }

    /// Stop tracking and deregister both listeners. Idempotent.
    ///
    /// When this returns, no callback is classifying and none will mutate
    /// the anomaly flags, so they can be read as final.
    pub fn stop(&self) {
        let mut registration = self
            .registration
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(handle) = registration.take() else {
            return;
        };

        // Waits for in-flight callbacks holding the read guard
        self.core.set_state(VerifierState::Stopped);

        // Failures are logged per listener; the verifier is stopped regardless
        let _ = handle.release();

        let report = self.core.ledger.report();
        tracing::info!(
            has_less_replica = report.has_under_replication,
            has_more_replica = report.has_over_replication,
            anomalies = report.total_anomalies(),
            "Convergence verifier tracking stopped"
        );
    }

    /// Clear both anomaly flags and the report history. Lifecycle is unchanged.
    pub fn reset(&self) {
        self.core.ledger.reset();
        tracing::debug!(state = %self.state(), "Anomaly flags reset");
    }

    /// Whether any partition exceeded `expected + tolerance` since the last reset.
    pub fn has_more_replica(&self) -> bool {
        self.core.ledger.has_over_replication()
    }

    /// Whether any partition dropped below `expected` since the last reset.
    pub fn has_less_replica(&self) -> bool {
        self.core.ledger.has_under_replication()
    }

    /// Summary of everything observed since the last reset.
    pub fn report(&self) -> AnomalyReport {
        self.core.ledger.report()
    }

    pub fn state(&self) -> VerifierState {
        self.core.state()
    }

    pub fn is_tracking(&self) -> bool {
        self.state().is_tracking()
    }

    /// The snapshot this verifier tracks.
    pub fn snapshot(&self) -> &DeclaredPlacementSnapshot {
        &self.core.snapshot
    }

    /// Deliver a declared batch directly, bypassing the coordination service.
    pub fn on_declared_placement_changed(&self, placements: &[DeclaredPlacement]) {
        self.core.on_declared_placement_changed(placements);
    }

    /// Deliver an actual batch directly, bypassing the coordination service.
    pub fn on_actual_placement_changed(&self, placements: &[ActualPlacement]) {
        self.core.on_actual_placement_changed(placements);
    }
}

impl Drop for ConvergenceVerifier {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// VerifierBuilder
// ---------------------------------------------------------------------------

/// Builder for [`ConvergenceVerifier`].
pub struct VerifierBuilder {
    snapshot: Arc<DeclaredPlacementSnapshot>,
    coordination: Arc<dyn CoordinationService>,
    cluster_node_count: usize,
    policy: ReplicaCountPolicy,
    history_capacity: usize,
    sinks: Vec<Arc<dyn DiagnosticSink>>,
    tracing_sink: bool,
}

impl VerifierBuilder {
    fn new(
        snapshot: Arc<DeclaredPlacementSnapshot>,
        coordination: Arc<dyn CoordinationService>,
    ) -> Self {
        let defaults = VerifierConfig::default();
        Self {
            snapshot,
            coordination,
            cluster_node_count: defaults.cluster_node_count,
            policy: ReplicaCountPolicy::new(defaults.tolerance),
            history_capacity: defaults.history_capacity,
            sinks: Vec::new(),
            tracing_sink: true,
        }
    }

    /// Apply node count, tolerance and history capacity from configuration.
    #[must_use]
    pub fn config(mut self, config: &VerifierConfig) -> Self {
        self.cluster_node_count = config.cluster_node_count;
        self.policy = ReplicaCountPolicy::new(config.tolerance);
        self.history_capacity = config.history_capacity;
        self
    }

    #[must_use]
    pub fn cluster_node_count(mut self, count: usize) -> Self {
        self.cluster_node_count = count;
        self
    }

    #[must_use]
    pub fn tolerance(mut self, tolerance: usize) -> Self {
        self.policy = ReplicaCountPolicy::new(tolerance);
        self
    }

    #[must_use]
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Add a diagnostic sink in addition to the tracing sink.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Disable the default tracing sink.
    #[must_use]
    pub fn without_tracing_sink(mut self) -> Self {
        self.tracing_sink = false;
        self
    }

    pub fn build(self) -> ConvergenceVerifier {
        let mut sinks = self.sinks;
        if self.tracing_sink {
            sinks.insert(0, Arc::new(TracingDiagnosticSink));
        }

        ConvergenceVerifier {
            core: Arc::new(VerifierCore {
                snapshot: self.snapshot,
                policy: self.policy,
                cluster_node_count: self.cluster_node_count,
                state: RwLock::new(VerifierState::Stopped),
                pending: Mutex::new(None),
                ledger: AnomalyLedger::new(self.history_capacity),
                sinks,
            }),
            coordination: self.coordination,
            registration: Mutex::new(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCoordinationService;
    use crate::domain::error::CoordinationError;
    use crate::domain::models::{AnomalyKind, ReplicaFactor};
    use crate::domain::ports::ListenerId;

    const NODES: usize = 6;

    fn nodes(count: usize) -> Vec<(String, String)> {
        (0..count)
            .map(|i| (format!("node_{}", 12918 + i), "ONLINE".to_string()))
            .collect()
    }

    fn snapshot() -> Arc<DeclaredPlacementSnapshot> {
        DeclaredPlacementSnapshot::new([DeclaredPlacement::new("Test-DB-0", ReplicaFactor::Fixed(3))
            .with_partition("Test-DB-0_0", nodes(3))
            .with_partition("Test-DB-0_1", nodes(3))])
        .into_shared()
    }

    fn actual(p0: usize, p1: usize) -> ActualPlacement {
        ActualPlacement::new("Test-DB-0")
            .with_partition("Test-DB-0_0", nodes(p0))
            .with_partition("Test-DB-0_1", nodes(p1))
    }

    fn verifier(coordination: Arc<InMemoryCoordinationService>) -> ConvergenceVerifier {
        ConvergenceVerifier::builder(snapshot(), coordination)
            .cluster_node_count(NODES)
            .without_tracing_sink()
            .build()
    }

    #[test]
    fn test_starts_stopped_and_ignores_notifications() {
        let coordination = Arc::new(InMemoryCoordinationService::new());
        let verifier = verifier(coordination);

        assert_eq!(verifier.state(), VerifierState::Stopped);
        verifier.on_actual_placement_changed(&[actual(1, 1)]);
        assert!(!verifier.has_less_replica());
        assert!(!verifier.has_more_replica());
    }

    #[test]
    fn test_start_registers_both_streams() {
        let coordination = Arc::new(InMemoryCoordinationService::new());
        let verifier = verifier(Arc::clone(&coordination));

        verifier.start().unwrap();
        assert!(verifier.is_tracking());
        assert_eq!(coordination.listener_count(PlacementStream::Declared), 1);
        assert_eq!(coordination.listener_count(PlacementStream::Actual), 1);

        verifier.stop();
        assert_eq!(coordination.listener_count(PlacementStream::Declared), 0);
        assert_eq!(coordination.listener_count(PlacementStream::Actual), 0);
    }

    #[test]
    fn test_start_twice_fails_without_registering_again() {
        let coordination = Arc::new(InMemoryCoordinationService::new());
        let verifier = verifier(Arc::clone(&coordination));

        verifier.start().unwrap();
        assert_eq!(verifier.start(), Err(VerifierError::AlreadyTracking));
        assert!(verifier.is_tracking());
        assert_eq!(coordination.listener_count(PlacementStream::Actual), 1);
    }

    #[test]
    fn test_stop_is_idempotent_and_restartable() {
        let coordination = Arc::new(InMemoryCoordinationService::new());
        let verifier = verifier(Arc::clone(&coordination));

        verifier.stop();
        verifier.start().unwrap();
        verifier.stop();
        verifier.stop();
        assert_eq!(verifier.state(), VerifierState::Stopped);

        verifier.start().unwrap();
        assert!(verifier.is_tracking());
    }

    #[test]
    fn test_under_replication_on_actual_stream() {
        let coordination = Arc::new(InMemoryCoordinationService::new());
        let verifier = verifier(Arc::clone(&coordination));
        verifier.start().unwrap();

        coordination.publish_actual(&[actual(3, 2)]);

        assert!(verifier.has_less_replica());
        assert!(!verifier.has_more_replica());

        let report = verifier.report();
        assert_eq!(report.actual.under_replicated, 1);
        assert_eq!(report.recent[0].partition, "Test-DB-0_1");
        assert_eq!(report.recent[0].kind, AnomalyKind::UnderReplicated);
        assert_eq!(report.recent[0].stream, PlacementStream::Actual);
    }

    #[test]
    fn test_missing_partition_counts_as_zero_replicas() {
        let coordination = Arc::new(InMemoryCoordinationService::new());
        let verifier = verifier(Arc::clone(&coordination));
        verifier.start().unwrap();

        let partial = ActualPlacement::new("Test-DB-0").with_partition("Test-DB-0_0", nodes(3));
        coordination.publish_actual(&[partial]);

        let report = verifier.report();
        assert!(report.has_under_replication);
        assert_eq!(report.recent[0].partition, "Test-DB-0_1");
        assert_eq!(report.recent[0].observed, 0);
    }

    #[test]
    fn test_reported_partitions_outside_snapshot_are_ignored() {
        let coordination = Arc::new(InMemoryCoordinationService::new());
        let verifier = verifier(Arc::clone(&coordination));
        verifier.start().unwrap();

        let extra = actual(3, 3).with_partition("Test-DB-0_99", nodes(1));
        coordination.publish_actual(&[extra]);

        assert!(verifier.report().is_clean());
    }

    #[test]
    fn test_declared_stream_uses_incoming_record() {
        let coordination = Arc::new(InMemoryCoordinationService::new());
        let verifier = verifier(Arc::clone(&coordination));
        verifier.start().unwrap();

        // Untracked on the actual stream, but the declared stream checks
        // every incoming record against its own replica factor.
        let declared = DeclaredPlacement::new("Other-DB", ReplicaFactor::Fixed(2))
            .with_partition("Other-DB_0", nodes(2))
            .with_partition("Other-DB_1", nodes(1));
        coordination.publish_declared(&[declared]);

        let report = verifier.report();
        assert!(report.has_under_replication);
        assert_eq!(report.declared.under_replicated, 1);
        assert_eq!(report.recent[0].expected, 2);
        assert_eq!(report.recent[0].stream, PlacementStream::Declared);
    }

    #[test]
    fn test_reset_clears_flags_but_keeps_tracking() {
        let coordination = Arc::new(InMemoryCoordinationService::new());
        let verifier = verifier(Arc::clone(&coordination));
        verifier.start().unwrap();

        coordination.publish_actual(&[actual(14, 1)]);
        assert!(verifier.has_less_replica());
        assert!(verifier.has_more_replica());

        verifier.reset();
        assert!(!verifier.has_less_replica());
        assert!(!verifier.has_more_replica());
        assert!(verifier.is_tracking());

        coordination.publish_actual(&[actual(3, 13)]);
        assert!(!verifier.has_less_replica());
        assert!(!verifier.has_more_replica());
    }

    #[test]
    fn test_drop_deregisters_listeners() {
        let coordination = Arc::new(InMemoryCoordinationService::new());
        {
            let verifier = verifier(Arc::clone(&coordination));
            verifier.start().unwrap();
            assert_eq!(coordination.listener_count(PlacementStream::Actual), 1);
        }
        assert_eq!(coordination.listener_count(PlacementStream::Declared), 0);
        assert_eq!(coordination.listener_count(PlacementStream::Actual), 0);
    }

    /// Accepts the declared registration and rejects the actual one.
    struct HalfAvailableCoordination {
        inner: InMemoryCoordinationService,
    }

    impl CoordinationService for HalfAvailableCoordination {
        fn register(
            &self,
            stream: PlacementStream,
            listener: Arc<dyn PlacementChangeListener>,
        ) -> Result<ListenerId, CoordinationError> {
            match stream {
                PlacementStream::Declared => self.inner.register(stream, listener),
                PlacementStream::Actual => Err(CoordinationError::Unavailable(
                    "external view path missing".to_string(),
                )),
            }
        }

        fn deregister(&self, id: ListenerId) -> Result<(), CoordinationError> {
            self.inner.deregister(id)
        }
    }

    /// Fires an initial empty actual batch on every registration, the way a
    /// coordination service replays current state to a new listener.
    /// Rejects the actual-stream registration when `reject_actual` is set.
    struct InitialCallbackCoordination {
        inner: InMemoryCoordinationService,
        reject_actual: bool,
    }

    impl CoordinationService for InitialCallbackCoordination {
        fn register(
            &self,
            stream: PlacementStream,
            listener: Arc<dyn PlacementChangeListener>,
        ) -> Result<ListenerId, CoordinationError> {
            listener.on_actual_placement_changed(&[ActualPlacement::new("Test-DB-0")]);
            if self.reject_actual && stream == PlacementStream::Actual {
                return Err(CoordinationError::RegistrationRejected(
                    "external view watch refused".to_string(),
                ));
            }
            self.inner.register(stream, listener)
        }

        fn deregister(&self, id: ListenerId) -> Result<(), CoordinationError> {
            self.inner.deregister(id)
        }
    }

    #[test]
    fn test_failed_start_discards_initial_callback_anomalies() {
        let coordination = Arc::new(InitialCallbackCoordination {
            inner: InMemoryCoordinationService::new(),
            reject_actual: true,
        });
        let verifier = ConvergenceVerifier::builder(snapshot(), coordination.clone())
            .cluster_node_count(NODES)
            .without_tracing_sink()
            .build();

        assert!(verifier.start().is_err());
        assert_eq!(verifier.state(), VerifierState::Stopped);
        assert!(!verifier.has_less_replica());
        assert_eq!(verifier.report().total_anomalies(), 0);
    }

    #[test]
    fn test_successful_start_keeps_initial_callback_anomalies() {
        let coordination = Arc::new(InitialCallbackCoordination {
            inner: InMemoryCoordinationService::new(),
            reject_actual: false,
        });
        let verifier = ConvergenceVerifier::builder(snapshot(), coordination.clone())
            .cluster_node_count(NODES)
            .without_tracing_sink()
            .build();

        verifier.start().unwrap();
        assert!(verifier.has_less_replica());
        // Two registrations, each replaying two empty partitions
        assert_eq!(verifier.report().actual.under_replicated, 4);

        coordination.inner.publish_actual(&[actual(3, 3)]);
        assert_eq!(verifier.report().actual.under_replicated, 4);
    }

    #[test]
    fn test_failed_start_rolls_back_partial_registration() {
        let coordination = Arc::new(HalfAvailableCoordination {
            inner: InMemoryCoordinationService::new(),
        });
        let verifier = ConvergenceVerifier::builder(snapshot(), coordination.clone())
            .without_tracing_sink()
            .build();

        let err = verifier.start().unwrap_err();
        assert!(matches!(err, VerifierError::Registration(CoordinationError::Unavailable(_))));
        assert_eq!(verifier.state(), VerifierState::Stopped);
        assert_eq!(coordination.inner.listener_count(PlacementStream::Declared), 0);

        verifier.on_actual_placement_changed(&[actual(1, 1)]);
        assert!(!verifier.has_less_replica());
    }
}
