//! Read-only listing endpoints over the content store.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use yander_api_types::{
    CategoryView, ChangelogEntryView, ChangelogResponse, IntegrationListResponse,
    IntegrationView, PageMeta, PostDetailResponse, PostListResponse, PostSummaryView,
    TocEntryView,
};

use crate::{
    application::{
        content::{ContentError, ContentService},
        error::HttpError,
        pagination::Paginated,
        render::{ImageOptions, TocEntry},
    },
    domain::listing::{Category, Integration, PostSummary},
};

use super::HttpState;

const COVER_IMAGE_WIDTH: u32 = 1200;
const LOGO_WIDTH: u32 = 160;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct BlogQuery {
    page: Option<u32>,
    category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct IntegrationQuery {
    page: Option<u32>,
    category: Option<String>,
    q: Option<String>,
}

fn content_service(state: &HttpState) -> Result<&ContentService, HttpError> {
    state
        .content
        .as_deref()
        .ok_or_else(|| HttpError::from(ContentError::Unavailable))
}

pub(super) async fn list_posts(
    State(state): State<HttpState>,
    Query(query): Query<BlogQuery>,
) -> Result<Json<PostListResponse>, HttpError> {
    let content = content_service(&state)?;
    let listing = content
        .list_posts(query.page, query.category.as_deref())
        .await?;

    let pagination = page_meta(&listing.posts);
    Ok(Json(PostListResponse {
        posts: listing
            .posts
            .items
            .into_iter()
            .map(|post| post_summary_view(content, post))
            .collect(),
        pagination,
        categories: listing.categories.into_iter().map(category_view).collect(),
    }))
}

pub(super) async fn post_detail(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Result<Json<PostDetailResponse>, HttpError> {
    let content = content_service(&state)?;
    let post = content.post(&slug).await?;

    Ok(Json(PostDetailResponse {
        summary: post_summary_view(content, post.summary),
        html: post.rendered.html,
        toc: post.rendered.toc.into_iter().map(toc_view).collect(),
        reading_time_minutes: post.rendered.metrics.reading_time_minutes,
    }))
}

pub(super) async fn changelog(
    State(state): State<HttpState>,
) -> Result<Json<ChangelogResponse>, HttpError> {
    let content = content_service(&state)?;
    let entries = content.changelog().await?;

    Ok(Json(ChangelogResponse {
        entries: entries
            .into_iter()
            .map(|rendered| ChangelogEntryView {
                title: rendered.entry.title,
                slug: rendered.entry.slug,
                version: rendered.entry.version,
                date: rendered.entry.date,
                html: rendered.html,
            })
            .collect(),
    }))
}

pub(super) async fn list_integrations(
    State(state): State<HttpState>,
    Query(query): Query<IntegrationQuery>,
) -> Result<Json<IntegrationListResponse>, HttpError> {
    let content = content_service(&state)?;
    let listing = content
        .list_integrations(query.page, query.category.as_deref(), query.q.as_deref())
        .await?;

    let pagination = page_meta(&listing.integrations);
    Ok(Json(IntegrationListResponse {
        integrations: listing
            .integrations
            .items
            .into_iter()
            .map(|integration| integration_view(content, integration))
            .collect(),
        pagination,
        categories: listing.categories,
    }))
}

fn page_meta<T>(page: &Paginated<T>) -> PageMeta {
    PageMeta {
        page: page.page,
        per_page: page.per_page,
        total_items: page.total_items,
        total_pages: page.total_pages,
    }
}

fn category_view(category: Category) -> CategoryView {
    CategoryView {
        title: category.title,
        slug: category.slug,
    }
}

fn post_summary_view(content: &ContentService, post: PostSummary) -> PostSummaryView {
    let cover_image_url = post.cover_image.as_ref().and_then(|asset| {
        content.image_url(asset, &ImageOptions::auto().with_width(COVER_IMAGE_WIDTH))
    });
    PostSummaryView {
        title: post.title,
        slug: post.slug,
        excerpt: post.excerpt,
        published_at: post.published_at,
        categories: post.categories.into_iter().map(category_view).collect(),
        cover_image_url,
    }
}

fn integration_view(content: &ContentService, integration: Integration) -> IntegrationView {
    let logo_url = integration
        .logo
        .as_ref()
        .and_then(|asset| content.image_url(asset, &ImageOptions::auto().with_width(LOGO_WIDTH)));
    IntegrationView {
        name: integration.name,
        slug: integration.slug,
        description: integration.description,
        category: integration.category,
        logo_url,
    }
}

fn toc_view(entry: TocEntry) -> TocEntryView {
    TocEntryView {
        id: entry.id,
        text: entry.text,
        level: entry.level,
        children: entry.children.into_iter().map(toc_view).collect(),
    }
}
