//! Form submissions accepted by the site and the rules they must satisfy.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
    Waitlist,
    ContactSales,
}

impl SubmissionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionKind::Waitlist => "waitlist",
            SubmissionKind::ContactSales => "contact_sales",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitlistPayload {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSalesPayload {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company_name: String,
    pub company_size: String,
    pub message: Option<String>,
}

/// A validated submission, ready to be handed to destinations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Waitlist(WaitlistPayload),
    ContactSales(ContactSalesPayload),
}

impl Submission {
    pub fn kind(&self) -> SubmissionKind {
        match self {
            Submission::Waitlist(_) => SubmissionKind::Waitlist,
            Submission::ContactSales(_) => SubmissionKind::ContactSales,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Submission::Waitlist(payload) => &payload.email,
            Submission::ContactSales(payload) => &payload.email,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },
    #[error("Please provide a valid email address")]
    InvalidEmail,
    #[error("Request body is malformed: {reason}")]
    MalformedBody { reason: String },
}

impl ValidationError {
    fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedBody {
            reason: reason.into(),
        }
    }
}

/// Validate a raw JSON body as the given submission kind.
pub fn validate(raw: &Value, kind: SubmissionKind) -> Result<Submission, ValidationError> {
    let Some(fields) = raw.as_object() else {
        return Err(ValidationError::malformed("expected a JSON object"));
    };

    match kind {
        SubmissionKind::Waitlist => validate_waitlist(fields).map(Submission::Waitlist),
        SubmissionKind::ContactSales => {
            validate_contact_sales(fields).map(Submission::ContactSales)
        }
    }
}

fn validate_waitlist(fields: &Map<String, Value>) -> Result<WaitlistPayload, ValidationError> {
    let email = string_field(fields, "email")?.ok_or(ValidationError::InvalidEmail)?;
    Ok(WaitlistPayload {
        email: normalize_email(&email)?,
    })
}

fn validate_contact_sales(
    fields: &Map<String, Value>,
) -> Result<ContactSalesPayload, ValidationError> {
    let required = |field: &'static str| -> Result<String, ValidationError> {
        string_field(fields, field)?.ok_or(ValidationError::MissingField { field })
    };

    let first_name = required("firstName")?;
    let last_name = required("lastName")?;
    let email = required("email")?;
    let company_name = required("companyName")?;
    let company_size = required("companySize")?;

    Ok(ContactSalesPayload {
        first_name,
        last_name,
        email: normalize_email(&email)?,
        company_name,
        company_size,
        message: string_field(fields, "message")?,
    })
}

/// Trimmed, non-empty string value of `name`; `None` when absent, null or blank.
fn string_field(
    fields: &Map<String, Value>,
    name: &'static str,
) -> Result<Option<String>, ValidationError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => {
            let trimmed = value.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(_) => Err(ValidationError::malformed(format!(
            "`{name}` must be a string"
        ))),
    }
}

fn normalize_email(email: &str) -> Result<String, ValidationError> {
    if !email.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(email.to_lowercase())
}
