mod content;
mod forms;
mod middleware;

use std::sync::Arc;

use axum::{
    Router,
    http::StatusCode,
    middleware as axum_middleware,
    routing::{get, post},
};

use crate::application::{
    content::ContentService,
    submissions::{ContactSalesService, WaitlistService},
};

pub use middleware::{RequestContext, log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub waitlist: Arc<WaitlistService>,
    pub contact_sales: Arc<ContactSalesService>,
    /// `None` while the content store is not configured; content routes then
    /// answer 503.
    pub content: Option<Arc<ContentService>>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/api/waitlist", post(forms::waitlist))
        .route("/api/contact-sales", post(forms::contact_sales))
        .route("/api/blog", get(content::list_posts))
        .route("/api/blog/{slug}", get(content::post_detail))
        .route("/api/changelog", get(content::changelog))
        .route("/api/integrations", get(content::list_integrations))
        .route("/_health", get(health))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}
