//! Router tests that need no database.
//!
//! Requests go through the full router with in-memory sessions using
//! tower's `oneshot`.

#![allow(clippy::unwrap_used)]

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;

use tradedesk_integration_tests::offline_app;

async fn get(uri: &str) -> axum::response::Response {
    offline_app()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

fn location(response: &axum::response::Response) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn test_health() {
    let response = get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn test_readiness_without_database() {
    let response = get("/health/ready").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_pages_redirect_to_store_picker() {
    for uri in [
        "/",
        "/customers",
        "/customers/new",
        "/customers/export",
        "/customers/7",
        "/orders",
        "/orders/new?customer_id=3",
        "/deliveries",
        "/deliveries/new",
        "/statistics?from=2026-01-01&to=2026-01-31",
        "/statistics/export",
    ] {
        let response = get(uri).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), Some("/stores/select"), "{uri}");
    }
}

#[tokio::test]
async fn test_form_posts_redirect_to_store_picker() {
    for uri in ["/customers", "/orders", "/deliveries", "/orders/1/delete"] {
        let response = offline_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("note=x"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), Some("/stores/select"), "{uri}");
    }
}

#[tokio::test]
async fn test_api_without_store_is_unauthorized() {
    for uri in ["/api/customers?q=C", "/api/customers/1/open-details"] {
        let response = get(uri).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_unknown_route() {
    let response = get("/settings").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
