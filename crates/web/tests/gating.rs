//! Session gating and sign-in/out over HTTP.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get, location, post_empty, post_json, signed_in_app, test_config};
use serde_json::json;

#[tokio::test]
async fn root_is_a_landing_page_when_signed_out() {
    let (app, _) = build_test_app().await;
    let response = get(&app, "/").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["view"], "landing");
    assert_eq!(json["data"]["sign_in"], "/signin");
}

#[tokio::test]
async fn protected_pages_redirect_to_sign_in() {
    let (app, _) = build_test_app().await;
    for uri in ["/profile", "/folders", "/folders/f1", "/add-note", "/add-note/f1", "/note/n1"] {
        let response = get(&app, uri).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), "/signin", "{uri}");
    }
}

#[tokio::test]
async fn mutations_under_protected_pages_redirect_too() {
    let (app, _) = build_test_app().await;

    let response = post_json(&app, "/note/n1/comments", json!({ "text": "hi" })).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = post_json(&app, "/folders", json!({ "name": "Recipes" })).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/signin");
}

#[tokio::test]
async fn sign_in_page_redirects_home_once_signed_in() {
    let (app, _) = signed_in_app().await;
    let response = get(&app, "/signin").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn sign_in_with_demo_account_then_sign_out() {
    let (app, state) = build_test_app().await;
    let demo = test_config().demo;

    let response = post_json(
        &app,
        "/signin",
        json!({ "email": demo.email, "password": demo.password }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["email"], "demo@example.com");
    assert_eq!(json["data"]["display_name"], "Demo");
    assert!(state.client.session.is_authenticated());

    assert_eq!(get(&app, "/profile").await.status(), StatusCode::OK);

    let response = post_empty(&app, "/signout").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!state.client.session.is_authenticated());

    let response = get(&app, "/profile").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn wrong_password_is_an_auth_error() {
    let (app, state) = build_test_app().await;
    let response = post_json(
        &app,
        "/signin",
        json!({ "email": "demo@example.com", "password": "nope" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "AUTH_ERROR");
    assert!(!state.client.session.is_authenticated());
}

#[tokio::test]
async fn sign_in_form_lists_fields() {
    let (app, _) = build_test_app().await;
    let json = body_json(get(&app, "/signin").await).await;
    assert_eq!(json["data"]["fields"], json!(["email", "password"]));
}
