use serde_json::json;

use crate::common::{TestApp, register_and_login, routes};

#[tokio::test]
async fn authenticated_user_can_register_and_fetch_an_image() {
    let app = TestApp::spawn().await;
    let token = register_and_login(&app, "alice").await;

    let res = app
        .post_with_token(
            routes::IMAGES,
            &json!({"url": "https://img.example/pan.jpg", "provider_id": "prov-1"}),
            &token,
        )
        .await;

    assert_eq!(res.status, 201);
    let id = res.body["id"].as_i64().unwrap();
    assert_eq!(res.body["kind"], "recipe");

    let res = app.get_without_token(&routes::image(id)).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["url"], "https://img.example/pan.jpg");
    assert_eq!(res.body["provider_id"], "prov-1");
}

#[tokio::test]
async fn anonymous_image_registration_is_rejected() {
    let app = TestApp::spawn().await;

    let res = app
        .post_without_token(
            routes::IMAGES,
            &json!({"url": "https://img.example/pan.jpg", "provider_id": "prov-1"}),
        )
        .await;

    assert_eq!(res.status, 401);
    assert_eq!(res.body["code"], "TOKEN_MISSING");
}

#[tokio::test]
async fn empty_url_is_rejected() {
    let app = TestApp::spawn().await;
    let token = register_and_login(&app, "alice").await;

    let res = app
        .post_with_token(
            routes::IMAGES,
            &json!({"url": "  ", "provider_id": "prov-1"}),
            &token,
        )
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn fetching_a_missing_image_returns_404() {
    let app = TestApp::spawn().await;

    let res = app.get_without_token(&routes::image(999)).await;

    assert_eq!(res.status, 404);
    assert_eq!(res.body["code"], "NOT_FOUND");
}
