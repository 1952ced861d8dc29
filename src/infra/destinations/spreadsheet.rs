use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    application::{
        dispatch::{Delivery, Destination, DestinationError},
        submissions::SPREADSHEET_DESTINATION,
    },
    config::SpreadsheetSettings,
    domain::submission::Submission,
};

use super::{send, status_error};

/// Webhook that appends one row per submission to a shared sheet.
#[derive(Debug, Clone)]
pub struct SpreadsheetDestination {
    client: Client,
    webhook_url: Url,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SheetRow<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    company_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    company_size: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

impl<'a> SheetRow<'a> {
    fn new(submission: &'a Submission, timestamp: OffsetDateTime) -> Self {
        let mut row = Self {
            kind: submission.kind().as_str(),
            timestamp,
            email: submission.email(),
            first_name: None,
            last_name: None,
            company_name: None,
            company_size: None,
            message: None,
        };
        if let Submission::ContactSales(lead) = submission {
            row.first_name = Some(lead.first_name.as_str());
            row.last_name = Some(lead.last_name.as_str());
            row.company_name = Some(lead.company_name.as_str());
            row.company_size = Some(lead.company_size.as_str());
            row.message = lead.message.as_deref();
        }
        row
    }
}

impl SpreadsheetDestination {
    pub fn new(client: Client, settings: &SpreadsheetSettings) -> Self {
        Self {
            client,
            webhook_url: settings.webhook_url.clone(),
        }
    }
}

#[async_trait]
impl Destination for SpreadsheetDestination {
    fn name(&self) -> &'static str {
        SPREADSHEET_DESTINATION
    }

    async fn deliver(&self, submission: &Submission) -> Result<Delivery, DestinationError> {
        let row = SheetRow::new(submission, OffsetDateTime::now_utc());
        let request = self.client.post(self.webhook_url.clone()).json(&row);

        let (status, body) = send(request).await?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        Ok(Delivery::Accepted)
    }
}
