//! Waitlist and contact-sales flows: validate, fan out, summarise.

use metrics::counter;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    application::dispatch::{DestinationSlot, DispatchReport, Dispatcher, Policy},
    domain::submission::{Submission, SubmissionKind, ValidationError, validate},
};

const METRIC_SUBMISSION_TOTAL: &str = "yander_submission_total";

pub const EMAIL_DESTINATION: &str = "email";
pub const CRM_DESTINATION: &str = "crm";
pub const SPREADSHEET_DESTINATION: &str = "spreadsheet";

const WAITLIST_FAILURE_MESSAGE: &str = "Failed to join the waitlist. Please try again later.";

/// What the caller learns about a valid submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub details: Option<String>,
}

impl SubmissionOutcome {
    fn accepted() -> Self {
        Self {
            success: true,
            error: None,
            details: None,
        }
    }
}

/// Waitlist signups. The CRM is authoritative; the spreadsheet log is
/// best-effort.
#[derive(Debug, Clone)]
pub struct WaitlistService {
    dispatcher: Dispatcher,
    destinations: Vec<DestinationSlot>,
}

impl WaitlistService {
    pub fn new(dispatcher: Dispatcher, crm: DestinationSlot, spreadsheet: DestinationSlot) -> Self {
        Self {
            dispatcher,
            destinations: vec![crm, spreadsheet],
        }
    }

    pub async fn submit(&self, raw: &Value) -> Result<SubmissionOutcome, ValidationError> {
        let report = run(
            SubmissionKind::Waitlist,
            raw,
            &self.dispatcher,
            &self.destinations,
            Policy::PrimaryAuthoritative {
                primary: CRM_DESTINATION,
            },
        )
        .await?;

        if report.success {
            Ok(SubmissionOutcome::accepted())
        } else {
            Ok(SubmissionOutcome {
                success: false,
                error: Some(WAITLIST_FAILURE_MESSAGE.to_string()),
                details: report.error,
            })
        }
    }
}

/// Contact-sales requests. Valid requests always succeed for the caller;
/// downstream delivery is best-effort notification.
#[derive(Debug, Clone)]
pub struct ContactSalesService {
    dispatcher: Dispatcher,
    destinations: Vec<DestinationSlot>,
}

impl ContactSalesService {
    pub fn new(
        dispatcher: Dispatcher,
        email: DestinationSlot,
        crm: DestinationSlot,
        spreadsheet: DestinationSlot,
    ) -> Self {
        Self {
            dispatcher,
            destinations: vec![email, crm, spreadsheet],
        }
    }

    pub async fn submit(&self, raw: &Value) -> Result<SubmissionOutcome, ValidationError> {
        run(
            SubmissionKind::ContactSales,
            raw,
            &self.dispatcher,
            &self.destinations,
            Policy::BestEffort,
        )
        .await?;
        Ok(SubmissionOutcome::accepted())
    }
}

async fn run(
    kind: SubmissionKind,
    raw: &Value,
    dispatcher: &Dispatcher,
    destinations: &[DestinationSlot],
    policy: Policy,
) -> Result<DispatchReport, ValidationError> {
    let submission = match validate(raw, kind) {
        Ok(submission) => submission,
        Err(err) => {
            counter!(METRIC_SUBMISSION_TOTAL, "kind" => kind.as_str(), "outcome" => "rejected")
                .increment(1);
            info!(
                target = "application::submissions",
                kind = kind.as_str(),
                error = %err,
                "submission rejected"
            );
            return Err(err);
        }
    };

    let report = dispatcher.dispatch(&submission, destinations, policy).await;
    log_report(&submission, &report);

    let outcome = if report.success { "accepted" } else { "failed" };
    counter!(METRIC_SUBMISSION_TOTAL, "kind" => kind.as_str(), "outcome" => outcome).increment(1);

    Ok(report)
}

fn log_report(submission: &Submission, report: &DispatchReport) {
    let delivered: Vec<&str> = report
        .results
        .iter()
        .filter(|result| result.success)
        .map(|result| result.destination)
        .collect();
    let failed: Vec<String> = report
        .results
        .iter()
        .filter(|result| result.attempted && !result.success)
        .map(|result| {
            format!(
                "{}: {}",
                result.destination,
                result.error.as_deref().unwrap_or_default()
            )
        })
        .collect();

    if report.success {
        info!(
            target = "application::submissions",
            kind = submission.kind().as_str(),
            delivered = ?delivered,
            failed = ?failed,
            "submission dispatched"
        );
    } else {
        warn!(
            target = "application::submissions",
            kind = submission.kind().as_str(),
            delivered = ?delivered,
            failed = ?failed,
            error = report.error.as_deref().unwrap_or_default(),
            "submission dispatch failed"
        );
    }
}
