//! Routes a form submission to every enabled integration of the form.
//!
//! Each adapter runs behind its own isolation boundary: errors, panics and
//! (optionally) timeouts are caught, logged and recorded in the report.
//! A dispatch never fails as a whole.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info};

use formbridge_core::{FormBridgeConfig, SettingsMap};
use formbridge_store::SettingsStore;

use crate::adapter::{IntegrationAdapter, Submission};
use crate::logger::{ActivityLogger, LogContext};
use crate::registry::IntegrationRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No registered adapter for the stored id.
    NotFound,
    /// Disabled for the form, or the adapter lacks credentials.
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Delivered(Value),
    Skipped(SkipReason),
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct AdapterOutcome {
    pub integration_id: String,
    pub outcome: DispatchOutcome,
}

/// Per-adapter results of one dispatch, in stored order.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub form_id: i64,
    pub submission_id: i64,
    pub outcomes: Vec<AdapterOutcome>,
}

impl DispatchReport {
    fn new(submission: &Submission) -> Self {
        Self {
            form_id: submission.form_id,
            submission_id: submission.submission_id,
            outcomes: Vec::new(),
        }
    }

    fn push(&mut self, integration_id: &str, outcome: DispatchOutcome) {
        self.outcomes.push(AdapterOutcome {
            integration_id: integration_id.to_string(),
            outcome,
        });
    }

    pub fn outcome_for(&self, integration_id: &str) -> Option<&DispatchOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.integration_id == integration_id)
            .map(|o| &o.outcome)
    }

    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, DispatchOutcome::Delivered(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, DispatchOutcome::Failed(_)))
            .count()
    }
}

#[derive(Clone)]
pub struct SubmissionDispatcher {
    registry: Arc<IntegrationRegistry>,
    settings: Arc<dyn SettingsStore>,
    logger: ActivityLogger,
    timeout: Option<Duration>,
}

impl SubmissionDispatcher {
    pub fn new(
        registry: Arc<IntegrationRegistry>,
        settings: Arc<dyn SettingsStore>,
        logger: ActivityLogger,
    ) -> Self {
        Self {
            registry,
            settings,
            logger,
            timeout: None,
        }
    }

    /// Bound each adapter call.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_config(
        registry: Arc<IntegrationRegistry>,
        settings: Arc<dyn SettingsStore>,
        logger: ActivityLogger,
        config: &FormBridgeConfig,
    ) -> Self {
        Self::new(registry, settings, logger)
            .with_timeout(config.dispatch_timeout_secs.map(Duration::from_secs))
    }

    pub async fn dispatch(&self, submission: &Submission) -> DispatchReport {
        let mut report = DispatchReport::new(submission);

        let records = match self.settings.entity_integrations(submission.form_id) {
            Ok(records) => records,
            Err(e) => {
                error!("Could not load integrations for form {}: {}", submission.form_id, e);
                return report;
            }
        };

        for (integration_id, settings) in records {
            let Some(adapter) = self.registry.get(&integration_id) else {
                debug!(
                    "Form {} references unknown integration {}; skipping",
                    submission.form_id, integration_id
                );
                report.push(&integration_id, DispatchOutcome::Skipped(SkipReason::NotFound));
                continue;
            };

            // The enabled check runs adapter code too.
            match std::panic::catch_unwind(AssertUnwindSafe(|| adapter.is_enabled(&settings))) {
                Ok(true) => {}
                Ok(false) => {
                    debug!("Integration {} not enabled for form {}", integration_id, submission.form_id);
                    report.push(&integration_id, DispatchOutcome::Skipped(SkipReason::Disabled));
                    continue;
                }
                Err(panic) => {
                    let message = format!("Adapter panicked: {}", panic_message(panic.as_ref()));
                    self.log_failure(&integration_id, submission, &message);
                    report.push(&integration_id, DispatchOutcome::Failed(message));
                    continue;
                }
            }

            let outcome = self.run_isolated(adapter.as_ref(), submission, &settings).await;
            report.push(&integration_id, outcome);
        }

        info!(
            "Dispatched submission {} of form {}: {} delivered, {} failed",
            report.submission_id,
            report.form_id,
            report.delivered(),
            report.failed()
        );
        report
    }

    async fn run_isolated(
        &self,
        adapter: &dyn IntegrationAdapter,
        submission: &Submission,
        settings: &SettingsMap,
    ) -> DispatchOutcome {
        let call = AssertUnwindSafe(adapter.process_submission(submission, settings)).catch_unwind();

        let caught = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(caught) => caught,
                Err(_) => {
                    let message = format!("Timed out after {}s", limit.as_secs_f64());
                    self.log_failure(adapter.id(), submission, &message);
                    return DispatchOutcome::Failed(message);
                }
            },
            None => call.await,
        };

        match caught {
            Ok(Ok(data)) => DispatchOutcome::Delivered(data),
            // Already logged by the adapter.
            Ok(Err(e)) => DispatchOutcome::Failed(e.user_message()),
            Err(panic) => {
                let message = format!("Adapter panicked: {}", panic_message(panic.as_ref()));
                self.log_failure(adapter.id(), submission, &message);
                DispatchOutcome::Failed(message)
            }
        }
    }

    fn log_failure(&self, integration_id: &str, submission: &Submission, message: &str) {
        self.logger.error(
            integration_id,
            message,
            LogContext::new()
                .form(submission.form_id)
                .submission(submission.submission_id),
        );
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
