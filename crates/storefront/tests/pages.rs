//! HTML routes that work without a backend session.

#![allow(clippy::unwrap_used)]

mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::{mailer, state};
use tower::ServiceExt;

fn app() -> Router {
    servicehub_storefront::app(state(mailer(None, None)))
}

fn request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "203.0.113.20");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_cookie_banner_hidden_after_consent() {
    let app = app();

    let first = app.clone().oneshot(request("GET", "/", None)).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert!(body_text(first).await.contains("cookie-banner"));

    let accepted = app
        .clone()
        .oneshot(request("POST", "/cookies/consent", None))
        .await
        .unwrap();
    assert_eq!(accepted.status(), StatusCode::SEE_OTHER);
    assert_eq!(accepted.headers()[header::LOCATION], "/");
    let cookie = accepted.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("sh_session="));

    let after = app
        .oneshot(request("GET", "/", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(after.status(), StatusCode::OK);
    assert!(!body_text(after).await.contains("cookie-banner"));
}

#[tokio::test]
async fn test_delete_confirmation_requires_sign_in() {
    let response = app()
        .oneshot(request("GET", "/profile/bookings/b1/delete", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/auth/signin");
}
