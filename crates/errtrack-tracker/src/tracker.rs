//! Error tracker facade
//!
//! [`ErrorTracker`] is the single entry point the host's fault handling calls
//! into. It runs the policy gate, builds the sanitized record and hands it to
//! the sink. Nothing inside it can fail the caller: rejections, delivery
//! failures and panics all come back as a [`ReportOutcome`].
//!
//! ## Per-call states
//!
//! ```text
//! Idle -> PolicyCheck -> Rejected
//!                     -> Building -> Delivering -> Delivered
//!                                               -> Failed
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use errtrack_core::config::TrackerConfig;
use errtrack_core::domain::{DottedTaxonomy, FaultEvent, FaultTaxonomy, RequestContext};
use errtrack_core::policy::{RejectReason, ReportPolicy};
use errtrack_core::ports::{DeliveryReport, HostEnvironment, ReportSink};
use errtrack_delivery::{DeliveryClient, DeliveryError};
use errtrack_telemetry::PayloadBuilder;
use futures_util::FutureExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::hook::{guarded, panic_message, run_isolated};

/// Result of one call to [`ErrorTracker::report`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The policy gate declined the fault; nothing was built or sent
    Rejected(RejectReason),
    /// The endpoint accepted the report
    Delivered {
        /// Attempts used, including the accepted one
        attempts: usize,
    },
    /// The report was built but not accepted, or the pipeline broke down
    Failed {
        /// Attempts made before giving up
        attempts: usize,
        reason: String,
    },
}

impl ReportOutcome {
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, ReportOutcome::Delivered { .. })
    }

    fn from_delivery(delivery: &DeliveryReport) -> Self {
        let attempts = delivery.attempt_count();
        if delivery.delivered {
            return ReportOutcome::Delivered { attempts };
        }

        let reason = if let Some(aborted) = &delivery.aborted {
            aborted.clone()
        } else if let Some(failure) = delivery.last_failure() {
            format!("attempts exhausted, last failure: {failure}")
        } else {
            "no delivery attempt was made".to_string()
        };
        ReportOutcome::Failed { attempts, reason }
    }
}

/// Facade over policy, payload construction and delivery
///
/// Holds only immutable state, so one instance can be shared (`Arc`) by
/// every concurrently faulting task.
pub struct ErrorTracker {
    config: Arc<TrackerConfig>,
    taxonomy: Arc<dyn FaultTaxonomy>,
    host: Arc<dyn HostEnvironment>,
    builder: PayloadBuilder,
    sink: Arc<dyn ReportSink>,
}

impl ErrorTracker {
    /// Creates a tracker delivering through `sink`
    ///
    /// Fault kinds are matched with [`DottedTaxonomy`] until
    /// [`ErrorTracker::with_taxonomy`] is used.
    pub fn new(
        config: Arc<TrackerConfig>,
        host: Arc<dyn HostEnvironment>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        let builder = PayloadBuilder::new(Arc::clone(&config), Arc::clone(&host));
        Self {
            config,
            taxonomy: Arc::new(DottedTaxonomy),
            host,
            builder,
            sink,
        }
    }

    /// Creates a tracker delivering to the configured dashboard
    pub fn from_config(
        config: Arc<TrackerConfig>,
        host: Arc<dyn HostEnvironment>,
    ) -> Result<Self, DeliveryError> {
        let client = DeliveryClient::new(&config)?;
        Ok(Self::new(config, host, Arc::new(client)))
    }

    /// Replaces the fault taxonomy used by exclusion rules
    pub fn with_taxonomy(mut self, taxonomy: Arc<dyn FaultTaxonomy>) -> Self {
        self.taxonomy = taxonomy;
        self
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// The policy gate bound to this tracker's configuration
    pub fn policy(&self) -> ReportPolicy<'_> {
        ReportPolicy::new(&self.config, self.taxonomy.as_ref())
    }

    /// Reports a fault and describes what happened
    ///
    /// Never panics and never returns an error; a panic anywhere in the
    /// pipeline is caught and reported as [`ReportOutcome::Failed`].
    pub async fn report(&self, fault: &FaultEvent, context: &RequestContext) -> ReportOutcome {
        let report_id = Uuid::new_v4();

        let pipeline = guarded(self.run(report_id, fault, context));
        match AssertUnwindSafe(pipeline).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!(%report_id, reason = %reason, "Fault reporting pipeline panicked");
                ReportOutcome::Failed {
                    attempts: 0,
                    reason: format!("reporting pipeline panicked: {reason}"),
                }
            }
        }
    }

    /// Reports a fault; true only if the endpoint accepted it
    pub async fn report_fault(&self, fault: &FaultEvent, context: &RequestContext) -> bool {
        self.report(fault, context).await.is_delivered()
    }

    /// Synchronous [`ErrorTracker::report_fault`] for callers without a runtime
    ///
    /// Runs the report on a dedicated thread with its own single-threaded
    /// runtime, so it may also be called from inside an async context. The
    /// calling thread blocks until delivery finishes.
    pub fn report_fault_blocking(&self, fault: &FaultEvent, context: &RequestContext) -> bool {
        run_isolated(|| self.report_on_current_thread(fault, context)).unwrap_or(false)
    }

    /// Drives [`ErrorTracker::report_fault`] on a private runtime bound to
    /// the calling thread, which must not be inside an async context
    pub(crate) fn report_on_current_thread(
        &self,
        fault: &FaultEvent,
        context: &RequestContext,
    ) -> bool {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(error = %e, "Failed to start runtime for fault reporting");
                return false;
            }
        };
        runtime.block_on(self.report_fault(fault, context))
    }

    async fn run(
        &self,
        report_id: Uuid,
        fault: &FaultEvent,
        context: &RequestContext,
    ) -> ReportOutcome {
        let environment = self.host.environment_name();

        if let Err(reason) = self.policy().evaluate(fault.kind(), &environment) {
            info!(
                %report_id,
                kind = %fault.kind(),
                environment = %environment,
                reason = %reason,
                "Fault not reported"
            );
            return ReportOutcome::Rejected(reason);
        }

        let record = self.builder.build(fault, context);
        debug!(%report_id, exception_type = %record.exception_type, "Fault report built");

        let delivery = self.sink.submit(&record).await;
        let outcome = ReportOutcome::from_delivery(&delivery);

        match &outcome {
            ReportOutcome::Delivered { attempts } => {
                info!(%report_id, attempts, "Fault report delivered");
            }
            ReportOutcome::Failed { attempts, reason } => {
                warn!(%report_id, attempts, reason = %reason, "Fault report not delivered");
            }
            ReportOutcome::Rejected(_) => {}
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use errtrack_core::config::ConfigBuilder;
    use errtrack_core::domain::{
        FaultKind, Headers, ReportRecord, SystemData, TaxonomyMap,
    };
    use errtrack_core::ports::{AttemptFailure, AttemptRecord};
    use errtrack_telemetry::{StaticHost, REDACTION_MARKER};
    use serde_json::json;

    use super::*;

    /// Sink that accepts everything and keeps the records
    #[derive(Default)]
    struct RecordingSink {
        records: Mutex<Vec<ReportRecord>>,
    }

    #[async_trait]
    impl ReportSink for RecordingSink {
        async fn submit(&self, record: &ReportRecord) -> DeliveryReport {
            self.records.lock().unwrap().push(record.clone());
            DeliveryReport {
                delivered: true,
                attempts: vec![AttemptRecord::accepted(1, 201)],
                ..DeliveryReport::default()
            }
        }
    }

    /// Sink whose endpoint is permanently down
    struct FailingSink;

    #[async_trait]
    impl ReportSink for FailingSink {
        async fn submit(&self, _record: &ReportRecord) -> DeliveryReport {
            DeliveryReport {
                delivered: false,
                attempts: (1..=3)
                    .map(|n| AttemptRecord::failed(n, AttemptFailure::Status(500)))
                    .collect(),
                backoff: Duration::from_millis(400),
                aborted: None,
            }
        }
    }

    struct PanickingSink;

    #[async_trait]
    impl ReportSink for PanickingSink {
        async fn submit(&self, _record: &ReportRecord) -> DeliveryReport {
            panic!("sink exploded");
        }
    }

    struct PanickingHost;

    impl HostEnvironment for PanickingHost {
        fn environment_name(&self) -> String {
            "production".to_string()
        }

        fn system_data(&self) -> SystemData {
            panic!("metadata unavailable");
        }
    }

    fn host(environment: &str) -> Arc<dyn HostEnvironment> {
        Arc::new(StaticHost::new(environment, SystemData::default()))
    }

    fn config() -> Arc<TrackerConfig> {
        Arc::new(ConfigBuilder::new().api_key("k").app_id("app").build())
    }

    fn fault(kind: &str) -> FaultEvent {
        FaultEvent::new(FaultKind::new(kind).unwrap(), "something broke")
    }

    #[tokio::test]
    async fn test_runtime_fault_is_delivered() {
        let sink = Arc::new(RecordingSink::default());
        let tracker = ErrorTracker::new(config(), host("production"), sink.clone());

        let outcome = tracker.report(&fault("runtime"), &RequestContext::default()).await;

        assert_eq!(outcome, ReportOutcome::Delivered { attempts: 1 });
        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].application_id, "app");
        assert_eq!(records[0].environment, "production");
    }

    #[tokio::test]
    async fn test_disabled_tracker_rejects_without_building() {
        let sink = Arc::new(RecordingSink::default());
        let config = Arc::new(ConfigBuilder::new().enabled(false).build());
        let tracker = ErrorTracker::new(config, host("production"), sink.clone());

        let outcome = tracker.report(&fault("runtime"), &RequestContext::default()).await;

        assert_eq!(outcome, ReportOutcome::Rejected(RejectReason::Disabled));
        assert!(sink.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_untracked_environment_rejected() {
        let sink = Arc::new(RecordingSink::default());
        let tracker = ErrorTracker::new(config(), host("qa"), sink.clone());

        assert!(!tracker.report_fault(&fault("runtime"), &RequestContext::default()).await);
        assert!(sink.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_excluded_kind_rejected() {
        let sink = Arc::new(RecordingSink::default());
        let tracker = ErrorTracker::new(config(), host("production"), sink.clone());

        let outcome = tracker
            .report(&fault("validation.email"), &RequestContext::default())
            .await;

        assert_eq!(
            outcome,
            ReportOutcome::Rejected(RejectReason::ExcludedType(
                FaultKind::new("validation").unwrap()
            ))
        );
    }

    #[tokio::test]
    async fn test_custom_taxonomy_applies_to_exclusions() {
        let sink = Arc::new(RecordingSink::default());
        let taxonomy = TaxonomyMap::new().with_parent(
            FaultKind::new("model_not_found").unwrap(),
            FaultKind::new("http.not_found").unwrap(),
        );
        let tracker = ErrorTracker::new(config(), host("production"), sink.clone())
            .with_taxonomy(Arc::new(taxonomy));

        assert!(
            !tracker
                .report_fault(&fault("model_not_found"), &RequestContext::default())
                .await
        );
    }

    #[tokio::test]
    async fn test_delivered_record_is_sanitized() {
        let sink = Arc::new(RecordingSink::default());
        let tracker = ErrorTracker::new(config(), host("staging"), sink.clone());
        let context = RequestContext::new("POST", "https://app.test/login")
            .with_headers(Headers::new().with("Cookie", "session=abc"))
            .with_body(
                json!({ "password": "pw", "profile": { "secret": "s" } })
                    .as_object()
                    .cloned()
                    .unwrap(),
            );

        assert!(tracker.report_fault(&fault("runtime"), &context).await);

        let records = sink.records.lock().unwrap();
        let request = &records[0].request_data;
        assert_eq!(request.headers.get("cookie"), Some(REDACTION_MARKER));
        assert!(!request.body.contains_key("password"));
        assert_eq!(request.body["profile"]["secret"], json!(REDACTION_MARKER));
    }

    #[tokio::test]
    async fn test_failed_delivery_returns_false() {
        let tracker = ErrorTracker::new(config(), host("production"), Arc::new(FailingSink));

        let outcome = tracker.report(&fault("runtime"), &RequestContext::default()).await;

        match outcome {
            ReportOutcome::Failed { attempts, reason } => {
                assert_eq!(attempts, 3);
                assert!(reason.contains("status 500"), "{reason}");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_panicking_sink_is_contained() {
        let tracker = ErrorTracker::new(config(), host("production"), Arc::new(PanickingSink));

        let outcome = tracker.report(&fault("runtime"), &RequestContext::default()).await;

        match outcome {
            ReportOutcome::Failed { attempts, reason } => {
                assert_eq!(attempts, 0);
                assert!(reason.contains("sink exploded"), "{reason}");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_panicking_builder_is_contained() {
        let sink = Arc::new(RecordingSink::default());
        let tracker = ErrorTracker::new(config(), Arc::new(PanickingHost), sink.clone());

        assert!(!tracker.report_fault(&fault("runtime"), &RequestContext::default()).await);
        assert!(sink.records.lock().unwrap().is_empty());
    }

    #[test]
    fn test_blocking_report_without_runtime() {
        let sink = Arc::new(RecordingSink::default());
        let tracker = ErrorTracker::new(config(), host("production"), sink.clone());

        assert!(tracker.report_fault_blocking(&fault("runtime"), &RequestContext::default()));
        assert_eq!(sink.records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_blocking_report_inside_runtime() {
        let tracker = ErrorTracker::new(config(), host("production"), Arc::new(PanickingSink));

        assert!(!tracker.report_fault_blocking(&fault("runtime"), &RequestContext::default()));
    }

    #[test]
    fn test_outcome_from_delivery_without_attempts() {
        let outcome = ReportOutcome::from_delivery(&DeliveryReport::default());
        assert_eq!(
            outcome,
            ReportOutcome::Failed {
                attempts: 0,
                reason: "no delivery attempt was made".to_string()
            }
        );

        let outcome = ReportOutcome::from_delivery(&DeliveryReport::aborted("encoding failed"));
        assert!(matches!(outcome, ReportOutcome::Failed { reason, .. } if reason == "encoding failed"));
    }
}
