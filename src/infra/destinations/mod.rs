//! HTTP clients for the external services form submissions are forwarded to.

mod crm;
mod email;
mod spreadsheet;

use std::sync::Arc;

use reqwest::{Client, RequestBuilder, StatusCode, Url};

use crate::{
    application::{
        dispatch::{Destination, DestinationError, DestinationSlot},
        submissions::{CRM_DESTINATION, EMAIL_DESTINATION, SPREADSHEET_DESTINATION},
    },
    config::DestinationSettings,
    infra::{error::InfraError, user_agent},
};

pub use crm::CrmDestination;
pub use email::EmailDestination;
pub use spreadsheet::SpreadsheetDestination;

/// Longest slice of an error body kept for diagnostics.
const ERROR_BODY_LIMIT: usize = 512;

/// Shared HTTP client for every destination.
pub fn build_client(settings: &DestinationSettings) -> Result<Client, InfraError> {
    Client::builder()
        .user_agent(user_agent())
        .connect_timeout(settings.timeout)
        .build()
        .map_err(|err| InfraError::http_client(err.to_string()))
}

/// One slot per destination, configured when its credentials are present.
#[derive(Debug, Clone)]
pub struct DestinationSet {
    pub email: DestinationSlot,
    pub crm: DestinationSlot,
    pub spreadsheet: DestinationSlot,
}

impl DestinationSet {
    pub fn from_settings(settings: &DestinationSettings) -> Result<Self, InfraError> {
        let client = build_client(settings)?;

        let email = settings.email.as_ref().map(|email| {
            Arc::new(EmailDestination::new(client.clone(), email)) as Arc<dyn Destination>
        });
        let crm = settings
            .crm
            .as_ref()
            .map(|crm| Arc::new(CrmDestination::new(client.clone(), crm)) as Arc<dyn Destination>);
        let spreadsheet = settings.spreadsheet.as_ref().map(|spreadsheet| {
            Arc::new(SpreadsheetDestination::new(client.clone(), spreadsheet))
                as Arc<dyn Destination>
        });

        Ok(Self {
            email: DestinationSlot::from_option(EMAIL_DESTINATION, email),
            crm: DestinationSlot::from_option(CRM_DESTINATION, crm),
            spreadsheet: DestinationSlot::from_option(SPREADSHEET_DESTINATION, spreadsheet),
        })
    }
}

/// `base` with `path` appended, keeping any path prefix already on `base`.
fn endpoint(base: &Url, path: &str) -> Result<Url, DestinationError> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|err| DestinationError::Transport(format!("invalid url: {err}")))
}

/// Send `request` and return the status with the body text.
async fn send(request: RequestBuilder) -> Result<(StatusCode, String), DestinationError> {
    let response = request
        .send()
        .await
        .map_err(|err| DestinationError::Transport(err.to_string()))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| DestinationError::Decode(err.to_string()))?;
    Ok((status, body))
}

fn status_error(status: StatusCode, body: &str) -> DestinationError {
    let mut body = body.trim().to_string();
    if body.len() > ERROR_BODY_LIMIT {
        let mut cut = ERROR_BODY_LIMIT;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    DestinationError::Status {
        status: status.as_u16(),
        body,
    }
}
