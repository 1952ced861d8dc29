use httpmock::MockServer;
use reqwest::{Client, Url};
use serde_json::json;

use yander::application::dispatch::{Delivery, Destination, DestinationError};
use yander::config::{CrmSettings, EmailSettings, SpreadsheetSettings};
use yander::domain::submission::{ContactSalesPayload, Submission, WaitlistPayload};
use yander::infra::destinations::{CrmDestination, EmailDestination, SpreadsheetDestination};

fn waitlist() -> Submission {
    Submission::Waitlist(WaitlistPayload {
        email: "a@b.com".into(),
    })
}

fn contact_sales() -> Submission {
    Submission::ContactSales(ContactSalesPayload {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: "ada@example.com".into(),
        company_name: "Analytical Engines".into(),
        company_size: "11-50".into(),
        message: Some("We would like a demo.".into()),
    })
}

fn crm(server: &MockServer) -> CrmDestination {
    CrmDestination::new(
        Client::new(),
        &CrmSettings {
            access_token: "pat-test".into(),
            api_base: Url::parse(&server.base_url()).expect("base url"),
        },
    )
}

#[tokio::test]
async fn crm_creates_subscriber_contact_for_waitlist() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST")
            .path("/crm/v3/objects/contacts")
            .header("authorization", "Bearer pat-test")
            .json_body(json!({
                "properties": { "email": "a@b.com", "lifecyclestage": "subscriber" }
            }));
        then.status(201)
            .header("content-type", "application/json")
            .body(r#"{"id":"501"}"#);
    });

    let delivery = crm(&server).deliver(&waitlist()).await;

    assert_eq!(delivery, Ok(Delivery::Accepted));
    mock.assert();
}

#[tokio::test]
async fn crm_sends_lead_properties_for_contact_sales() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST")
            .path("/crm/v3/objects/contacts")
            .json_body(json!({
                "properties": {
                    "email": "ada@example.com",
                    "firstname": "Ada",
                    "lastname": "Lovelace",
                    "company": "Analytical Engines",
                    "company_size": "11-50",
                    "message": "We would like a demo.",
                    "lifecyclestage": "lead"
                }
            }));
        then.status(201).body(r#"{"id":"502"}"#);
    });

    let delivery = crm(&server).deliver(&contact_sales()).await;

    assert_eq!(delivery, Ok(Delivery::Accepted));
    mock.assert();
}

#[tokio::test]
async fn crm_conflict_means_contact_already_exists() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("POST").path("/crm/v3/objects/contacts");
        then.status(409)
            .header("content-type", "application/json")
            .body(r#"{"status":"error","message":"Contact already exists. Existing ID: 501","category":"CONFLICT"}"#);
    });

    assert_eq!(
        crm(&server).deliver(&waitlist()).await,
        Ok(Delivery::AlreadyExists)
    );
}

#[tokio::test]
async fn crm_already_exists_message_is_recognised_on_other_statuses() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("POST").path("/crm/v3/objects/contacts");
        then.status(400)
            .body(r#"{"status":"error","message":"Contact Already Exists"}"#);
    });

    assert_eq!(
        crm(&server).deliver(&waitlist()).await,
        Ok(Delivery::AlreadyExists)
    );
}

#[tokio::test]
async fn crm_server_errors_are_reported_with_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("POST").path("/crm/v3/objects/contacts");
        then.status(500).body("upstream exploded");
    });

    assert_eq!(
        crm(&server).deliver(&waitlist()).await,
        Err(DestinationError::Status {
            status: 500,
            body: "upstream exploded".into()
        })
    );
}

#[tokio::test]
async fn unreachable_destination_is_a_transport_error() {
    let destination = CrmDestination::new(
        Client::new(),
        &CrmSettings {
            access_token: "pat-test".into(),
            api_base: Url::parse("http://127.0.0.1:9").expect("url"),
        },
    );

    assert!(matches!(
        destination.deliver(&waitlist()).await,
        Err(DestinationError::Transport(_))
    ));
}

fn email(server: &MockServer) -> EmailDestination {
    EmailDestination::new(
        Client::new(),
        &EmailSettings {
            api_key: "re_test".into(),
            api_base: Url::parse(&server.base_url()).expect("base url"),
            from: "Yander <notifications@yander.dev>".into(),
            sales_inbox: "sales@yander.dev".into(),
        },
    )
}

#[tokio::test]
async fn email_notifies_sales_inbox() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST")
            .path("/emails")
            .header("authorization", "Bearer re_test")
            .json_body(json!({
                "from": "Yander <notifications@yander.dev>",
                "to": ["sales@yander.dev"],
                "reply_to": "ada@example.com",
                "subject": "New sales inquiry from Analytical Engines",
                "text": "Name: Ada Lovelace\nEmail: ada@example.com\nCompany: Analytical Engines\nCompany size: 11-50\n\nMessage:\nWe would like a demo.\n"
            }));
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"id":"49a3999c-0ce1-4ea6-ab68-afcd6dc2e794"}"#);
    });

    assert_eq!(
        email(&server).deliver(&contact_sales()).await,
        Ok(Delivery::Accepted)
    );
    mock.assert();
}

#[tokio::test]
async fn email_rejects_malformed_success_body() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("POST").path("/emails");
        then.status(200).body("ok");
    });

    assert!(matches!(
        email(&server).deliver(&contact_sales()).await,
        Err(DestinationError::Decode(_))
    ));
}

#[tokio::test]
async fn email_skips_waitlist_signups() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST").path("/emails");
        then.status(200).body(r#"{"id":"x"}"#);
    });

    assert_eq!(
        email(&server).deliver(&waitlist()).await,
        Ok(Delivery::Accepted)
    );
    mock.assert_calls(0);
}

#[tokio::test]
async fn spreadsheet_posts_row_to_webhook() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST")
            .path("/macros/s/abc/exec")
            .header("content-type", "application/json");
        then.status(200).body(r#"{"result":"success"}"#);
    });

    let destination = SpreadsheetDestination::new(
        Client::new(),
        &SpreadsheetSettings {
            webhook_url: Url::parse(&server.url("/macros/s/abc/exec")).expect("url"),
        },
    );

    assert_eq!(
        destination.deliver(&waitlist()).await,
        Ok(Delivery::Accepted)
    );
    mock.assert();
}
