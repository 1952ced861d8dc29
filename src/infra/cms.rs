//! Client for the headless content store's HTTP query API.
//!
//! Queries are GROQ strings sent as URL parameters; the store answers with a
//! `{ "result": .. }` envelope. Every list item is decoded on its own so that a
//! single malformed document is dropped instead of failing the whole listing.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use time::{
    Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description,
};
use tracing::{debug, warn};

use crate::{
    application::{
        content::{ContentError, ContentSource},
        render::{AssetUrlBuilder, ImageOptions},
    },
    config::ContentSettings,
    domain::{
        content::{AssetRef, Document},
        listing::{Category, ChangelogEntry, Integration, Post, PostSummary},
    },
    infra::{error::InfraError, user_agent},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const IMAGE_CDN: &str = "https://cdn.sanity.io";

const POSTS_QUERY: &str = r#"*[_type == "post" && defined(slug.current) && !(_id in path("drafts.**"))] | order(publishedAt desc) {
  title, "slug": slug.current, excerpt, publishedAt,
  "categories": categories[]->{ title, "slug": slug.current },
  "coverImage": mainImage.asset._ref
}"#;

const POST_QUERY: &str = r#"*[_type == "post" && slug.current == $slug && !(_id in path("drafts.**"))][0] {
  title, "slug": slug.current, excerpt, publishedAt,
  "categories": categories[]->{ title, "slug": slug.current },
  "coverImage": mainImage.asset._ref,
  body
}"#;

const CHANGELOG_QUERY: &str = r#"*[_type == "changelog" && defined(slug.current)] | order(date desc) {
  title, "slug": slug.current, version, date, body
}"#;

const INTEGRATIONS_QUERY: &str = r#"*[_type == "integration" && defined(slug.current)] | order(name asc) {
  name, "slug": slug.current, description, category, "logo": logo.asset._ref
}"#;

const CATEGORIES_QUERY: &str = r#"*[_type == "category" && defined(slug.current)] | order(title asc) {
  title, "slug": slug.current
}"#;

#[derive(Debug, Deserialize)]
struct QueryEnvelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    title: String,
    slug: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPost {
    title: String,
    slug: String,
    #[serde(default)]
    excerpt: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    categories: Option<Vec<RawCategory>>,
    #[serde(default)]
    cover_image: Option<String>,
    #[serde(default)]
    body: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawChangelogEntry {
    title: String,
    slug: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    body: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawIntegration {
    name: String,
    slug: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    logo: Option<String>,
}

impl From<RawCategory> for Category {
    fn from(raw: RawCategory) -> Self {
        Category {
            title: raw.title,
            slug: raw.slug,
        }
    }
}

impl RawPost {
    fn into_summary(self) -> (PostSummary, Option<Value>) {
        let summary = PostSummary {
            title: self.title,
            slug: self.slug,
            excerpt: self.excerpt.filter(|excerpt| !excerpt.trim().is_empty()),
            published_at: self.published_at.as_deref().and_then(parse_timestamp),
            categories: self
                .categories
                .unwrap_or_default()
                .into_iter()
                .map(Category::from)
                .collect(),
            cover_image: self.cover_image.as_deref().map(AssetRef::parse),
        };
        (summary, self.body)
    }
}

impl From<RawChangelogEntry> for ChangelogEntry {
    fn from(raw: RawChangelogEntry) -> Self {
        ChangelogEntry {
            title: raw.title,
            slug: raw.slug,
            version: raw.version,
            date: raw.date.as_deref().and_then(parse_timestamp),
            body: document_from(raw.body),
        }
    }
}

impl From<RawIntegration> for Integration {
    fn from(raw: RawIntegration) -> Self {
        Integration {
            name: raw.name,
            slug: raw.slug,
            description: raw.description.unwrap_or_default(),
            category: raw.category.unwrap_or_default(),
            logo: raw.logo.as_deref().map(AssetRef::parse),
        }
    }
}

fn document_from(body: Option<Value>) -> Document {
    body.map(|value| Document::from_json(&value))
        .unwrap_or_default()
}

/// RFC 3339 timestamps, or plain `YYYY-MM-DD` dates taken as midnight UTC.
fn parse_timestamp(value: &str) -> Option<OffsetDateTime> {
    if let Ok(timestamp) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(timestamp);
    }
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}

/// Decode each element on its own, dropping the ones that do not fit `T`.
fn decode_items<T: DeserializeOwned>(entity: &'static str, items: Vec<Value>) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!(
                    target = "infra::cms",
                    entity,
                    error = %err,
                    "dropping malformed content item"
                );
                None
            }
        })
        .collect()
}

/// [`ContentSource`] backed by the content store's query endpoint.
#[derive(Debug, Clone)]
pub struct CmsClient {
    client: Client,
    query_url: Url,
    token: Option<String>,
}

impl CmsClient {
    /// `None` while no project is configured.
    pub fn from_settings(settings: &ContentSettings) -> Result<Option<Self>, InfraError> {
        let Some(project_id) = settings.project_id.as_deref() else {
            return Ok(None);
        };

        let base = match &settings.api_base {
            Some(base) => base.as_str().trim_end_matches('/').to_string(),
            None => {
                let host = if settings.use_cdn { "apicdn" } else { "api" };
                format!("https://{project_id}.{host}.sanity.io")
            }
        };
        let version = settings.api_version.trim_start_matches('v');
        let query_url = Url::parse(&format!(
            "{base}/v{version}/data/query/{}",
            settings.dataset
        ))
        .map_err(|err| InfraError::configuration(format!("invalid content query url: {err}")))?;

        let client = Client::builder()
            .user_agent(user_agent())
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;

        Ok(Some(Self {
            client,
            query_url,
            token: settings.token.clone(),
        }))
    }

    pub fn query_url(&self) -> &Url {
        &self.query_url
    }

    async fn query<T: DeserializeOwned>(
        &self,
        groq: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ContentError> {
        let mut url = self.query_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", groq);
            for (name, value) in params {
                let encoded = serde_json::to_string(value)
                    .map_err(|err| ContentError::Transport(err.to_string()))?;
                pairs.append_pair(&format!("${name}"), &encoded);
            }
        }

        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| ContentError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ContentError::Transport(format!(
                "query failed with status {}: {}",
                status.as_u16(),
                text.trim()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| ContentError::Transport(err.to_string()))?;
        let envelope: QueryEnvelope<T> = serde_json::from_slice(&body)
            .map_err(|err| ContentError::Decode(err.to_string()))?;
        Ok(envelope.result)
    }

    async fn query_list<T: DeserializeOwned>(
        &self,
        entity: &'static str,
        groq: &str,
    ) -> Result<Vec<T>, ContentError> {
        let result: Value = self.query(groq, &[]).await?;
        let Value::Array(items) = result else {
            return Err(ContentError::Schema(format!("{entity} query did not return a list")));
        };
        let total = items.len();
        let decoded = decode_items::<T>(entity, items);
        debug!(
            target = "infra::cms",
            entity,
            total,
            kept = decoded.len(),
            "content list fetched"
        );
        Ok(decoded)
    }
}

#[async_trait]
impl ContentSource for CmsClient {
    async fn posts(&self) -> Result<Vec<PostSummary>, ContentError> {
        let posts: Vec<RawPost> = self.query_list("post", POSTS_QUERY).await?;
        Ok(posts
            .into_iter()
            .map(|raw| raw.into_summary().0)
            .collect())
    }

    async fn post(&self, slug: &str) -> Result<Option<Post>, ContentError> {
        let result: Value = self.query(POST_QUERY, &[("slug", slug)]).await?;
        if result.is_null() {
            return Ok(None);
        }

        let raw: RawPost = serde_json::from_value(result)
            .map_err(|err| ContentError::Schema(format!("post `{slug}`: {err}")))?;
        let (summary, body) = raw.into_summary();
        Ok(Some(Post {
            summary,
            body: document_from(body),
        }))
    }

    async fn changelog(&self) -> Result<Vec<ChangelogEntry>, ContentError> {
        let entries: Vec<RawChangelogEntry> =
            self.query_list("changelog", CHANGELOG_QUERY).await?;
        Ok(entries.into_iter().map(ChangelogEntry::from).collect())
    }

    async fn integrations(&self) -> Result<Vec<Integration>, ContentError> {
        let integrations: Vec<RawIntegration> =
            self.query_list("integration", INTEGRATIONS_QUERY).await?;
        Ok(integrations.into_iter().map(Integration::from).collect())
    }

    async fn categories(&self) -> Result<Vec<Category>, ContentError> {
        let categories: Vec<RawCategory> = self.query_list("category", CATEGORIES_QUERY).await?;
        Ok(categories.into_iter().map(Category::from).collect())
    }
}

/// Image URLs on the content store's image CDN.
#[derive(Debug, Clone)]
pub struct CdnAssetUrls {
    base: Url,
}

impl CdnAssetUrls {
    pub fn new(project_id: &str, dataset: &str) -> Result<Self, InfraError> {
        let base = Url::parse(&format!("{IMAGE_CDN}/images/{project_id}/{dataset}/"))
            .map_err(|err| InfraError::configuration(format!("invalid image cdn url: {err}")))?;
        Ok(Self { base })
    }

    pub fn from_settings(settings: &ContentSettings) -> Result<Option<Self>, InfraError> {
        settings
            .project_id
            .as_deref()
            .map(|project_id| Self::new(project_id, &settings.dataset))
            .transpose()
    }
}

impl AssetUrlBuilder for CdnAssetUrls {
    fn image_url(&self, asset: &AssetRef, options: &ImageOptions) -> Option<String> {
        let (Some(hash), Some(width), Some(height), Some(extension)) = (
            asset.hash.as_deref(),
            asset.width,
            asset.height,
            asset.extension.as_deref(),
        ) else {
            return None;
        };

        let mut url = self
            .base
            .join(&format!("{hash}-{width}x{height}.{extension}"))
            .ok()?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(width) = options.width {
                pairs.append_pair("w", &width.to_string());
            }
            if let Some(height) = options.height {
                pairs.append_pair("h", &height.to_string());
            }
            if options.auto_format {
                pairs.append_pair("auto", "format");
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Some(url.into())
    }
}

/// Builder for contexts without a content store; every image is unresolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAssetUrls;

impl AssetUrlBuilder for NoAssetUrls {
    fn image_url(&self, _asset: &AssetRef, _options: &ImageOptions) -> Option<String> {
        None
    }
}
