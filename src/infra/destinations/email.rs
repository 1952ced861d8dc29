use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    application::{
        dispatch::{Delivery, Destination, DestinationError},
        submissions::EMAIL_DESTINATION,
    },
    config::EmailSettings,
    domain::submission::{ContactSalesPayload, Submission},
};

use super::{endpoint, send, status_error};

/// Transactional email API that notifies the sales inbox of new leads.
#[derive(Debug, Clone)]
pub struct EmailDestination {
    client: Client,
    api_base: Url,
    api_key: String,
    from: String,
    sales_inbox: String,
}

#[derive(Debug, Serialize)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    reply_to: &'a str,
    subject: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct SentEmail {
    id: String,
}

impl EmailDestination {
    pub fn new(client: Client, settings: &EmailSettings) -> Self {
        Self {
            client,
            api_base: settings.api_base.clone(),
            api_key: settings.api_key.clone(),
            from: settings.from.clone(),
            sales_inbox: settings.sales_inbox.clone(),
        }
    }

    fn sales_notification<'a>(&'a self, lead: &'a ContactSalesPayload) -> OutgoingEmail<'a> {
        let mut text = format!(
            "Name: {} {}\nEmail: {}\nCompany: {}\nCompany size: {}\n",
            lead.first_name, lead.last_name, lead.email, lead.company_name, lead.company_size
        );
        if let Some(message) = &lead.message {
            text.push_str("\nMessage:\n");
            text.push_str(message);
            text.push('\n');
        }

        OutgoingEmail {
            from: &self.from,
            to: [self.sales_inbox.as_str()],
            reply_to: &lead.email,
            subject: format!("New sales inquiry from {}", lead.company_name),
            text,
        }
    }
}

#[async_trait]
impl Destination for EmailDestination {
    fn name(&self) -> &'static str {
        EMAIL_DESTINATION
    }

    async fn deliver(&self, submission: &Submission) -> Result<Delivery, DestinationError> {
        let Submission::ContactSales(lead) = submission else {
            debug!(
                target = "infra::destinations::email",
                kind = submission.kind().as_str(),
                "no notification for submission kind"
            );
            return Ok(Delivery::Accepted);
        };

        let url = endpoint(&self.api_base, "emails")?;
        let request = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&self.sales_notification(lead));

        let (status, body) = send(request).await?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let sent: SentEmail = serde_json::from_str(&body)
            .map_err(|err| DestinationError::Decode(err.to_string()))?;
        debug!(
            target = "infra::destinations::email",
            email_id = %sent.id,
            "sales notification sent"
        );
        Ok(Delivery::Accepted)
    }
}
