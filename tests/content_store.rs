use httpmock::MockServer;
use reqwest::Url;
use serde_json::json;

use yander::application::content::{ContentError, ContentSource};
use yander::config::ContentSettings;
use yander::domain::content::Block;
use yander::infra::cms::CmsClient;

const QUERY_PATH: &str = "/v2024-01-01/data/query/production";

fn client(server: &MockServer, token: Option<&str>) -> CmsClient {
    let settings = ContentSettings {
        project_id: Some("proj".into()),
        dataset: "production".into(),
        api_version: "2024-01-01".into(),
        use_cdn: false,
        token: token.map(str::to_string),
        api_base: Some(Url::parse(&server.base_url()).expect("base url")),
    };
    CmsClient::from_settings(&settings)
        .expect("client")
        .expect("configured")
}

#[tokio::test]
async fn posts_are_decoded_and_malformed_items_dropped() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path(QUERY_PATH).query_param_exists("query");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "ms": 4,
                "result": [
                    {
                        "title": "Launch week",
                        "slug": "launch-week",
                        "excerpt": "Five days of releases",
                        "publishedAt": "2024-05-01T09:00:00Z",
                        "categories": [{ "title": "Product", "slug": "product" }],
                        "coverImage": "image-abc123-1600x900-png"
                    },
                    { "title": "No slug" },
                    { "title": "Bare", "slug": "bare", "categories": null }
                ]
            }));
    });

    let posts = client(&server, None).posts().await.expect("posts");

    mock.assert();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].slug, "launch-week");
    assert!(posts[0].in_category("product"));
    assert_eq!(
        posts[0].cover_image.as_ref().and_then(|asset| asset.width),
        Some(1600)
    );
    assert!(posts[0].published_at.is_some());
    assert!(posts[1].categories.is_empty());
}

#[tokio::test]
async fn single_post_passes_slug_parameter_and_token() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path(QUERY_PATH)
            .query_param("$slug", "\"launch-week\"")
            .header("authorization", "Bearer read-token");
        then.status(200).json_body(json!({
            "result": {
                "title": "Launch week",
                "slug": "launch-week",
                "body": [
                    {
                        "_type": "block", "_key": "h", "style": "h2",
                        "children": [{ "_type": "span", "text": "Day one", "marks": [] }]
                    },
                    { "_type": "callout", "_key": "x" }
                ]
            }
        }));
    });

    let post = client(&server, Some("read-token"))
        .post("launch-week")
        .await
        .expect("query")
        .expect("post exists");

    mock.assert();
    assert_eq!(post.summary.title, "Launch week");
    assert_eq!(post.body.blocks.len(), 2);
    assert!(matches!(post.body.blocks[1], Block::Unknown { .. }));
}

#[tokio::test]
async fn missing_post_is_none() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path(QUERY_PATH);
        then.status(200).json_body(json!({ "result": null }));
    });

    let post = client(&server, None).post("nope").await.expect("query");
    assert!(post.is_none());
}

#[tokio::test]
async fn changelog_accepts_plain_dates() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path(QUERY_PATH);
        then.status(200).json_body(json!({
            "result": [{
                "title": "Faster sync",
                "slug": "faster-sync",
                "version": "2.1.0",
                "date": "2024-06-12",
                "body": []
            }]
        }));
    });

    let entries = client(&server, None).changelog().await.expect("changelog");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].version.as_deref(), Some("2.1.0"));
    assert!(entries[0].date.is_some());
    assert!(entries[0].body.is_empty());
}

#[tokio::test]
async fn upstream_failures_map_to_content_errors() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path(QUERY_PATH);
        then.status(500).body("boom");
    });
    assert!(matches!(
        client(&server, None).integrations().await,
        Err(ContentError::Transport(_))
    ));

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path(QUERY_PATH);
        then.status(200).body("<html>");
    });
    assert!(matches!(
        client(&server, None).categories().await,
        Err(ContentError::Decode(_))
    ));

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path(QUERY_PATH);
        then.status(200).json_body(json!({ "result": { "not": "a list" } }));
    });
    assert!(matches!(
        client(&server, None).integrations().await,
        Err(ContentError::Schema(_))
    ));
}
