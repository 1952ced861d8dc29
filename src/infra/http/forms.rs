//! Form submission endpoints.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use yander_api_types::SubmissionResponse;

use crate::application::{
    error::{ErrorReport, HttpError},
    submissions::SubmissionOutcome,
};

use super::HttpState;

const INVALID_JSON_MESSAGE: &str = "Invalid JSON body";

pub(super) async fn waitlist(State(state): State<HttpState>, body: Bytes) -> Response {
    let raw = match parse_body("infra::http::forms::waitlist", &body) {
        Ok(raw) => raw,
        Err(err) => return err.into_response(),
    };

    match state.waitlist.submit(&raw).await {
        Ok(outcome) => outcome_response("infra::http::forms::waitlist", outcome),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn contact_sales(State(state): State<HttpState>, body: Bytes) -> Response {
    let raw = match parse_body("infra::http::forms::contact_sales", &body) {
        Ok(raw) => raw,
        Err(err) => return err.into_response(),
    };

    match state.contact_sales.submit(&raw).await {
        Ok(outcome) => outcome_response("infra::http::forms::contact_sales", outcome),
        Err(err) => HttpError::from(err).into_response(),
    }
}

fn parse_body(source: &'static str, body: &[u8]) -> Result<Value, HttpError> {
    serde_json::from_slice(body).map_err(|err| {
        HttpError::from_error(source, StatusCode::BAD_REQUEST, INVALID_JSON_MESSAGE, &err)
    })
}

fn outcome_response(source: &'static str, outcome: SubmissionOutcome) -> Response {
    if outcome.success {
        return (StatusCode::OK, Json(SubmissionResponse::accepted())).into_response();
    }

    let error = outcome.error.unwrap_or_default();
    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(SubmissionResponse::failed(error.clone(), outcome.details.clone())),
    )
        .into_response();

    let mut messages = vec![error];
    messages.extend(outcome.details);
    ErrorReport {
        source,
        status: StatusCode::INTERNAL_SERVER_ERROR,
        messages,
    }
    .attach(&mut response);
    response
}
