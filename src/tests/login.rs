use axum::body::Body;
use axum::http::Method;
use axum::http::Request;
use axum::http::StatusCode;
use http_body_util::BodyExt;
use tower::Service;

use crate::calendar::Disabled;
use crate::config::Config;
use crate::storage::Storage;
use crate::tests::helper;

#[tokio::test]
async fn test_login() {
    let (mut app, _) = helper::setup_test_app();

    let access_token = helper::login(&mut app).await;
    assert!(access_token.len() > 10);
}

#[tokio::test]
async fn test_login_twice_resolves_to_the_same_user() {
    let (mut app, storage) = helper::setup_test_app();

    helper::login(&mut app).await;
    helper::login(&mut app).await;

    assert_eq!(1, storage.count_users().await.unwrap());
}

#[tokio::test]
async fn test_login_with_fallback_disabled() {
    let config = Config {
        default_identity_enabled: false,
        ..helper::test_config()
    };
    let (mut app, storage) = helper::setup_test_app_with(Disabled, config);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/users/token")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    assert_eq!(StatusCode::UNAUTHORIZED, response.status());

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body = String::from_utf8_lossy(&body[..]).to_string();
    assert!(body.contains("Default identity is disabled"));

    assert_eq!(0, storage.count_users().await.unwrap());
}
