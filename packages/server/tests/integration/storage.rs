use crate::common::{TestApp, routes};

#[tokio::test]
async fn owner_can_put_get_and_delete_objects_under_their_own_path() {
    let app = TestApp::spawn().await;
    let (_, b, _) = app.admin_and_two_users().await;
    let key = format!("{}/avatar.png", b.user_id);

    let put = app
        .put_bytes_with_token(&routes::object("images", &key), b"pixels".to_vec(), &b.token)
        .await;
    assert_eq!(put.status, 201, "put failed: {}", put.text);
    assert_eq!(put.body["key"], key.as_str());
    assert_eq!(put.body["size"], 6);

    let get = app.get_with_token(&routes::object("images", &key), &b.token).await;
    assert_eq!(get.status, 200);
    assert_eq!(get.text, "pixels");

    let delete = app.delete_with_token(&routes::object("images", &key), &b.token).await;
    assert_eq!(delete.status, 204);
    let gone = app.get_with_token(&routes::object("images", &key), &b.token).await;
    assert_eq!(gone.status, 404);
}

#[tokio::test]
async fn put_replaces_an_existing_object() {
    let app = TestApp::spawn().await;
    let (_, b, _) = app.admin_and_two_users().await;
    let key = format!("{}/readme.txt", b.user_id);

    app.put_bytes_with_token(&routes::object("documents", &key), b"v1".to_vec(), &b.token)
        .await;
    app.put_bytes_with_token(&routes::object("documents", &key), b"v2".to_vec(), &b.token)
        .await;

    let get = app.get_with_token(&routes::object("documents", &key), &b.token).await;
    assert_eq!(get.text, "v2");
}

#[tokio::test]
async fn cannot_write_under_another_users_path() {
    let app = TestApp::spawn().await;
    let (a, b, c) = app.admin_and_two_users().await;
    let key = format!("{}/planted.txt", b.user_id);

    let by_user = app
        .put_bytes_with_token(&routes::object("documents", &key), b"x".to_vec(), &c.token)
        .await;
    assert_eq!(by_user.status, 403);
    assert_eq!(by_user.body["code"], "PERMISSION_DENIED");

    let by_admin = app
        .put_bytes_with_token(&routes::object("documents", &key), b"x".to_vec(), &a.token)
        .await;
    assert_eq!(by_admin.status, 403);
}

#[tokio::test]
async fn other_users_and_admins_cannot_read_a_private_object() {
    let app = TestApp::spawn().await;
    let (a, b, c) = app.admin_and_two_users().await;
    let key = format!("{}/diary.txt", b.user_id);
    app.put_bytes_with_token(&routes::object("documents", &key), b"dear".to_vec(), &b.token)
        .await;

    let by_user = app.get_with_token(&routes::object("documents", &key), &c.token).await;
    assert_eq!(by_user.status, 404);
    assert_eq!(by_user.body["code"], "NOT_FOUND");

    let by_admin = app.get_with_token(&routes::object("documents", &key), &a.token).await;
    assert_eq!(by_admin.status, 404);

    let delete = app.delete_with_token(&routes::object("documents", &key), &c.token).await;
    assert_eq!(delete.status, 404);
    let still_there = app.get_with_token(&routes::object("documents", &key), &b.token).await;
    assert_eq!(still_there.status, 200);
}

#[tokio::test]
async fn object_over_the_bucket_cap_is_rejected() {
    let app = TestApp::spawn_with(|config| config.storage.document_max_bytes = 8).await;
    let (_, b, _) = app.admin_and_two_users().await;
    let key = format!("{}/big.txt", b.user_id);

    let put = app
        .put_bytes_with_token(&routes::object("documents", &key), vec![b'x'; 16], &b.token)
        .await;

    assert_eq!(put.status, 400, "put should fail: {}", put.text);
    assert_eq!(put.body["code"], "VALIDATION_ERROR");
    let get = app.get_with_token(&routes::object("documents", &key), &b.token).await;
    assert_eq!(get.status, 404);
}

#[tokio::test]
async fn unknown_bucket_is_rejected() {
    let app = TestApp::spawn().await;
    let (_, b, _) = app.admin_and_two_users().await;
    let key = format!("{}/x.txt", b.user_id);

    let put = app
        .put_bytes_with_token(&routes::object("videos", &key), b"x".to_vec(), &b.token)
        .await;

    assert_eq!(put.status, 400);
    assert_eq!(put.body["code"], "VALIDATION_ERROR");
}

mod signed_urls {
    use super::*;

    #[tokio::test]
    async fn signed_url_serves_the_object_without_a_session() {
        let app = TestApp::spawn().await;
        let (_, b, _) = app.admin_and_two_users().await;
        let key = format!("{}/shared.txt", b.user_id);
        app.put_bytes_with_token(&routes::object("documents", &key), b"shared".to_vec(), &b.token)
            .await;

        let signed = app
            .post_with_token(&routes::sign("documents", &key), &serde_json::json!({}), &b.token)
            .await;
        assert_eq!(signed.status, 200, "sign failed: {}", signed.text);
        assert!(signed.body["expires_at"].is_string());

        let res = app.get_absolute(signed.body["url"].as_str().unwrap()).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.text, "shared");
    }

    #[tokio::test]
    async fn signature_for_one_key_does_not_open_another() {
        let app = TestApp::spawn().await;
        let (_, b, _) = app.admin_and_two_users().await;
        let first = format!("{}/one.txt", b.user_id);
        let second = format!("{}/two.txt", b.user_id);
        for key in [&first, &second] {
            app.put_bytes_with_token(&routes::object("documents", key), b"data".to_vec(), &b.token)
                .await;
        }

        let signed = app
            .post_with_token(&routes::sign("documents", &first), &serde_json::json!({}), &b.token)
            .await;
        let url = signed.body["url"].as_str().unwrap();
        let forged = url.replace("one.txt", "two.txt");

        let res = app.get_absolute(&forged).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn tampered_signature_is_rejected() {
        let app = TestApp::spawn().await;
        let (_, b, _) = app.admin_and_two_users().await;
        let key = format!("{}/one.txt", b.user_id);
        app.put_bytes_with_token(&routes::object("documents", &key), b"data".to_vec(), &b.token)
            .await;

        let res = app
            .get_without_token(&format!(
                "/api/v1/storage/signed/documents/{key}?token=not-a-signature"
            ))
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn cannot_sign_someone_elses_object() {
        let app = TestApp::spawn().await;
        let (_, b, c) = app.admin_and_two_users().await;
        let key = format!("{}/one.txt", b.user_id);
        app.put_bytes_with_token(&routes::object("documents", &key), b"data".to_vec(), &b.token)
            .await;

        let res = app
            .post_with_token(&routes::sign("documents", &key), &serde_json::json!({}), &c.token)
            .await;

        assert_eq!(res.status, 404);
    }
}

#[tokio::test]
async fn private_bucket_is_not_served_publicly() {
    let app = TestApp::spawn().await;
    let (_, b, _) = app.admin_and_two_users().await;
    let key = format!("{}/avatar.png", b.user_id);
    app.put_bytes_with_token(&routes::object("images", &key), b"pixels".to_vec(), &b.token)
        .await;

    let res = app.get_without_token(&routes::public_object("images", &key)).await;

    assert_eq!(res.status, 404);
}
