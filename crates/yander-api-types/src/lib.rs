//! Request and response bodies exposed by the Yander site API.
//!
//! Field names follow the camelCase shape the site's forms post, so a browser
//! client and the server agree on the wire format without extra mapping.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Body accepted by `POST /api/waitlist`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistRequest {
    pub email: String,
}

/// Body accepted by `POST /api/contact-sales`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSalesRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company_name: String,
    pub company_size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Success or failure of a form submission as seen by the visitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl SubmissionResponse {
    pub fn accepted() -> Self {
        Self {
            success: true,
            error: None,
            details: None,
        }
    }

    pub fn failed(error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            details,
        }
    }
}

/// Body returned with 4xx responses and non-submission failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u32,
    pub total_pages: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryView {
    pub title: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummaryView {
    pub title: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub published_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub categories: Vec<CategoryView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostListResponse {
    pub posts: Vec<PostSummaryView>,
    pub pagination: PageMeta,
    pub categories: Vec<CategoryView>,
}

/// One table-of-contents node; `children` holds nested h3 entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntryView {
    pub id: String,
    pub text: String,
    pub level: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TocEntryView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetailResponse {
    #[serde(flatten)]
    pub summary: PostSummaryView,
    pub html: String,
    pub toc: Vec<TocEntryView>,
    pub reading_time_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntryView {
    pub title: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub date: Option<OffsetDateTime>,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogResponse {
    pub entries: Vec<ChangelogEntryView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationView {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationListResponse {
    pub integrations: Vec<IntegrationView>,
    pub pagination: PageMeta,
    pub categories: Vec<String>,
}
