use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn admin_lists_every_user_with_roles() {
    let app = TestApp::spawn().await;
    let (a, _, _) = app.admin_and_two_users().await;

    let res = app.get_with_token(routes::ADMIN_USERS, &a.token).await;

    assert_eq!(res.status, 200, "list users failed: {}", res.text);
    let users = res.body["users"].as_array().unwrap();
    assert_eq!(users.len(), 3);
    assert_eq!(users[0]["email"], "a@example.com");
    assert_eq!(users[0]["roles"], json!(["admin"]));
    assert_eq!(users[1]["roles"], json!(["user"]));
}

#[tokio::test]
async fn plain_user_cannot_reach_admin_endpoints() {
    let app = TestApp::spawn().await;
    let (a, b, _) = app.admin_and_two_users().await;

    let list = app.get_with_token(routes::ADMIN_USERS, &b.token).await;
    assert_eq!(list.status, 403);
    assert_eq!(list.body["code"], "PERMISSION_DENIED");

    let grant = app
        .post_with_token(&routes::user_roles(&b.user_id), &json!({"role": "admin"}), &b.token)
        .await;
    assert_eq!(grant.status, 403);

    let revoke = app
        .delete_with_token(&routes::user_role(&a.user_id, "admin"), &b.token)
        .await;
    assert_eq!(revoke.status, 403);
}

#[tokio::test]
async fn granted_role_applies_to_the_existing_session() {
    let app = TestApp::spawn().await;
    let (a, b, _) = app.admin_and_two_users().await;

    let grant = app
        .post_with_token(&routes::user_roles(&b.user_id), &json!({"role": "admin"}), &a.token)
        .await;
    assert_eq!(grant.status, 201, "grant failed: {}", grant.text);
    assert_eq!(grant.body["roles"], json!(["user", "admin"]));

    let now_admin = app.get_with_token(routes::ADMIN_USERS, &b.token).await;
    assert_eq!(now_admin.status, 200);

    let revoke = app
        .delete_with_token(&routes::user_role(&b.user_id, "admin"), &a.token)
        .await;
    assert_eq!(revoke.status, 204, "revoke failed: {}", revoke.text);

    let no_longer = app.get_with_token(routes::ADMIN_USERS, &b.token).await;
    assert_eq!(no_longer.status, 403);
}

#[tokio::test]
async fn granting_a_held_role_conflicts() {
    let app = TestApp::spawn().await;
    let (a, b, _) = app.admin_and_two_users().await;

    let res = app
        .post_with_token(&routes::user_roles(&b.user_id), &json!({"role": "user"}), &a.token)
        .await;

    assert_eq!(res.status, 409);
    assert_eq!(res.body["code"], "CONFLICT");
}

#[tokio::test]
async fn revoking_a_missing_role_is_not_found() {
    let app = TestApp::spawn().await;
    let (a, b, _) = app.admin_and_two_users().await;

    let res = app
        .delete_with_token(&routes::user_role(&b.user_id, "admin"), &a.token)
        .await;

    assert_eq!(res.status, 404);
    assert_eq!(res.body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn unknown_role_name_is_a_validation_error() {
    let app = TestApp::spawn().await;
    let (a, b, _) = app.admin_and_two_users().await;

    let res = app
        .delete_with_token(&routes::user_role(&b.user_id, "superuser"), &a.token)
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn granting_to_an_unknown_user_is_not_found() {
    let app = TestApp::spawn().await;
    let (a, _, _) = app.admin_and_two_users().await;

    let res = app
        .post_with_token(
            &routes::user_roles("00000000-0000-0000-0000-000000000000"),
            &json!({"role": "admin"}),
            &a.token,
        )
        .await;

    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn admin_reads_a_users_roles() {
    let app = TestApp::spawn().await;
    let (a, b, _) = app.admin_and_two_users().await;

    let res = app.get_with_token(&routes::user_roles(&b.user_id), &a.token).await;

    assert_eq!(res.status, 200, "roles failed: {}", res.text);
    assert_eq!(res.body["user_id"], b.user_id.as_str());
    assert_eq!(res.body["roles"], json!(["user"]));
}
