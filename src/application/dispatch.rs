//! Fan-out of validated submissions to independent external destinations.
//!
//! Every configured destination is attempted concurrently and individually
//! time-bounded. A failure, timeout or panic in one destination is recorded in
//! the report and never stops the others from completing.

use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::{FutureExt, future::join_all};
use metrics::{counter, histogram};
use thiserror::Error;
use tokio::time::{Instant, timeout};
use tracing::{debug, warn};

use crate::domain::submission::Submission;

const METRIC_DESTINATION_ATTEMPT_TOTAL: &str = "yander_destination_attempt_total";
const METRIC_DESTINATION_MS: &str = "yander_destination_ms";

pub const NOT_CONFIGURED: &str = "not configured";
pub const PRIMARY_NOT_CONFIGURED: &str = "primary destination not configured";

/// Successful delivery outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Accepted,
    /// The destination already holds this contact; resubmission is harmless.
    AlreadyExists,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DestinationError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("destination panicked")]
    Panicked,
}

/// An external sink a submission can be delivered to.
#[async_trait]
pub trait Destination: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, submission: &Submission) -> Result<Delivery, DestinationError>;
}

/// A destination position in a flow, configured or skipped.
#[derive(Clone)]
pub enum DestinationSlot {
    Configured(Arc<dyn Destination>),
    NotConfigured { name: &'static str },
}

impl DestinationSlot {
    pub fn configured(destination: Arc<dyn Destination>) -> Self {
        Self::Configured(destination)
    }

    pub fn from_option(name: &'static str, destination: Option<Arc<dyn Destination>>) -> Self {
        match destination {
            Some(destination) => Self::Configured(destination),
            None => Self::NotConfigured { name },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DestinationSlot::Configured(destination) => destination.name(),
            DestinationSlot::NotConfigured { name } => *name,
        }
    }
}

impl std::fmt::Debug for DestinationSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DestinationSlot::Configured(destination) => f
                .debug_tuple("Configured")
                .field(&destination.name())
                .finish(),
            DestinationSlot::NotConfigured { name } => f
                .debug_struct("NotConfigured")
                .field("name", name)
                .finish(),
        }
    }
}

/// How per-destination results combine into the overall outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Overall success mirrors the named destination; others are best-effort.
    PrimaryAuthoritative { primary: &'static str },
    /// Always successful once the submission was valid.
    BestEffort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    pub destination: &'static str,
    pub attempted: bool,
    pub success: bool,
    pub error: Option<String>,
}

impl DispatchResult {
    fn skipped(destination: &'static str) -> Self {
        Self {
            destination,
            attempted: false,
            success: false,
            error: Some(NOT_CONFIGURED.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// One entry per slot, in slot order.
    pub results: Vec<DispatchResult>,
    pub success: bool,
    /// Human-readable summary of the failure that decided `success`.
    pub error: Option<String>,
}

impl DispatchReport {
    pub fn result(&self, destination: &str) -> Option<&DispatchResult> {
        self.results
            .iter()
            .find(|result| result.destination == destination)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn dispatch(
        &self,
        submission: &Submission,
        slots: &[DestinationSlot],
        policy: Policy,
    ) -> DispatchReport {
        let skipped: Vec<&'static str> = slots
            .iter()
            .filter(|slot| matches!(slot, DestinationSlot::NotConfigured { .. }))
            .map(DestinationSlot::name)
            .collect();
        if !skipped.is_empty() {
            warn!(
                target = "application::dispatch",
                kind = submission.kind().as_str(),
                skipped = ?skipped,
                "destinations not configured; skipping"
            );
        }

        let attempts = slots.iter().map(|slot| async move {
            match slot {
                DestinationSlot::Configured(destination) => {
                    self.attempt(destination.as_ref(), submission).await
                }
                DestinationSlot::NotConfigured { name } => DispatchResult::skipped(*name),
            }
        });
        let results = join_all(attempts).await;

        let (success, error) = decide(&results, policy);
        debug!(
            target = "application::dispatch",
            kind = submission.kind().as_str(),
            success,
            attempted = results.iter().filter(|result| result.attempted).count(),
            "dispatch settled"
        );

        DispatchReport {
            results,
            success,
            error,
        }
    }

    async fn attempt(
        &self,
        destination: &dyn Destination,
        submission: &Submission,
    ) -> DispatchResult {
        let name = destination.name();
        let started_at = Instant::now();

        let delivery = AssertUnwindSafe(timeout(self.timeout, destination.deliver(submission)))
            .catch_unwind()
            .await;
        let outcome = match delivery {
            Ok(Ok(result)) => result,
            Ok(Err(_elapsed)) => Err(DestinationError::Timeout(self.timeout)),
            Err(_panic) => Err(DestinationError::Panicked),
        };

        histogram!(METRIC_DESTINATION_MS, "destination" => name)
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        match outcome {
            Ok(delivery) => {
                let label = match delivery {
                    Delivery::Accepted => "accepted",
                    Delivery::AlreadyExists => "already_exists",
                };
                counter!(METRIC_DESTINATION_ATTEMPT_TOTAL, "destination" => name, "outcome" => label)
                    .increment(1);
                debug!(
                    target = "application::dispatch",
                    destination = name,
                    outcome = label,
                    "destination delivered"
                );
                DispatchResult {
                    destination: name,
                    attempted: true,
                    success: true,
                    error: None,
                }
            }
            Err(err) => {
                counter!(METRIC_DESTINATION_ATTEMPT_TOTAL, "destination" => name, "outcome" => "failed")
                    .increment(1);
                warn!(
                    target = "application::dispatch",
                    destination = name,
                    error = %err,
                    "destination delivery failed"
                );
                DispatchResult {
                    destination: name,
                    attempted: true,
                    success: false,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

fn decide(results: &[DispatchResult], policy: Policy) -> (bool, Option<String>) {
    match policy {
        Policy::BestEffort => (true, None),
        Policy::PrimaryAuthoritative { primary } => {
            match results.iter().find(|result| result.destination == primary) {
                Some(result) if result.success => (true, None),
                Some(result) if result.attempted => (
                    false,
                    Some(format!(
                        "{primary}: {}",
                        result.error.as_deref().unwrap_or("delivery failed")
                    )),
                ),
                _ => (false, Some(PRIMARY_NOT_CONFIGURED.to_string())),
            }
        }
    }
}
