use axum::http::StatusCode;

use crate::tests::helper;

#[tokio::test]
async fn test_root() {
    let (mut app, _) = helper::setup_test_app();

    let (status_code, body) = helper::root(&mut app).await;
    assert_eq!(StatusCode::OK, status_code);
    assert!(body.contains("daybook"));
}

#[tokio::test]
async fn test_health() {
    let (mut app, _) = helper::setup_test_app();

    let (status_code, body) = helper::health(&mut app).await;
    assert_eq!(StatusCode::OK, status_code);
    assert!(body.contains(r#""status":"ok""#));
    assert!(body.contains(r#""userCount":0"#));
}

#[tokio::test]
async fn test_health_counts_users() {
    let (mut app, _) = helper::setup_test_app();

    // resolve the default identity
    helper::login(&mut app).await;

    let (status_code, body) = helper::health(&mut app).await;
    assert_eq!(StatusCode::OK, status_code);
    assert!(body.contains(r#""userCount":1"#));
}
