use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn user_reads_and_renames_their_profile() {
    let app = TestApp::spawn().await;
    let (_, b, _) = app.admin_and_two_users().await;

    let own = app.get_with_token(routes::PROFILE, &b.token).await;
    assert_eq!(own.status, 200, "profile failed: {}", own.text);
    assert_eq!(own.body["name"], "B");

    let res = app
        .patch_with_token(routes::PROFILE, &json!({"name": "  Bea  "}), &b.token)
        .await;
    assert_eq!(res.status, 200, "rename failed: {}", res.text);
    assert_eq!(res.body["name"], "Bea");

    let me = app.get_with_token(routes::ME, &b.token).await;
    assert_eq!(me.body["name"], "Bea");
}

#[tokio::test]
async fn blank_name_is_rejected() {
    let app = TestApp::spawn().await;
    let (_, b, _) = app.admin_and_two_users().await;

    let res = app
        .patch_with_token(routes::PROFILE, &json!({"name": "   "}), &b.token)
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn profiles_are_private_to_owner_and_admin() {
    let app = TestApp::spawn().await;
    let (a, b, c) = app.admin_and_two_users().await;

    let by_other = app.get_with_token(&routes::profile(&b.user_id), &c.token).await;
    assert_eq!(by_other.status, 404);
    assert_eq!(by_other.body["code"], "NOT_FOUND");

    let by_owner = app.get_with_token(&routes::profile(&b.user_id), &b.token).await;
    assert_eq!(by_owner.status, 200);

    let by_admin = app.get_with_token(&routes::profile(&b.user_id), &a.token).await;
    assert_eq!(by_admin.status, 200);
    assert_eq!(by_admin.body["name"], "B");
}

#[tokio::test]
async fn admin_can_delete_a_profile_but_another_user_cannot() {
    let app = TestApp::spawn().await;
    let (a, b, c) = app.admin_and_two_users().await;

    let by_other = app.delete_with_token(&routes::profile(&b.user_id), &c.token).await;
    assert_eq!(by_other.status, 404);

    let by_admin = app.delete_with_token(&routes::profile(&b.user_id), &a.token).await;
    assert_eq!(by_admin.status, 204);

    let own = app.get_with_token(routes::PROFILE, &b.token).await;
    assert_eq!(own.status, 404);
    let me = app.get_with_token(routes::ME, &b.token).await;
    assert_eq!(me.status, 200);
    assert!(me.body["name"].is_null());
}
