use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::{
    application::{
        dispatch::{Delivery, Destination, DestinationError},
        submissions::CRM_DESTINATION,
    },
    config::CrmSettings,
    domain::submission::Submission,
};

use super::{endpoint, send, status_error};

const CONTACTS_PATH: &str = "crm/v3/objects/contacts";
const ALREADY_EXISTS: &str = "already exists";

/// CRM contact store; the authoritative destination for waitlist signups.
#[derive(Debug, Clone)]
pub struct CrmDestination {
    client: Client,
    api_base: Url,
    access_token: String,
}

#[derive(Debug, Serialize)]
struct NewContact<'a> {
    properties: ContactProperties<'a>,
}

#[derive(Debug, Default, Serialize)]
struct ContactProperties<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    firstname: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lastname: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    company: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    company_size: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    lifecyclestage: &'a str,
}

#[derive(Debug, Deserialize)]
struct CrmErrorBody {
    #[serde(default)]
    message: String,
}

impl CrmDestination {
    pub fn new(client: Client, settings: &CrmSettings) -> Self {
        Self {
            client,
            api_base: settings.api_base.clone(),
            access_token: settings.access_token.clone(),
        }
    }
}

fn contact_properties(submission: &Submission) -> ContactProperties<'_> {
    match submission {
        Submission::Waitlist(signup) => ContactProperties {
            email: &signup.email,
            lifecyclestage: "subscriber",
            ..Default::default()
        },
        Submission::ContactSales(lead) => ContactProperties {
            email: &lead.email,
            firstname: Some(lead.first_name.as_str()),
            lastname: Some(lead.last_name.as_str()),
            company: Some(lead.company_name.as_str()),
            company_size: Some(lead.company_size.as_str()),
            message: lead.message.as_deref(),
            lifecyclestage: "lead",
        },
    }
}

/// Whether an error response says the contact is already on file.
fn reports_existing_contact(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::CONFLICT {
        return true;
    }
    let message = serde_json::from_str::<CrmErrorBody>(body)
        .map(|parsed| parsed.message)
        .unwrap_or_else(|_| body.to_string());
    message.to_lowercase().contains(ALREADY_EXISTS)
}

#[async_trait]
impl Destination for CrmDestination {
    fn name(&self) -> &'static str {
        CRM_DESTINATION
    }

    async fn deliver(&self, submission: &Submission) -> Result<Delivery, DestinationError> {
        let url = endpoint(&self.api_base, CONTACTS_PATH)?;
        let request = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&NewContact {
                properties: contact_properties(submission),
            });

        let (status, body) = send(request).await?;
        if status.is_success() {
            return Ok(Delivery::Accepted);
        }
        if reports_existing_contact(status, &body) {
            return Ok(Delivery::AlreadyExists);
        }
        Err(status_error(status, &body))
    }
}
