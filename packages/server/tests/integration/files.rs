use common::storage::Bucket;
use sea_orm::{EntityTrait, PaginatorTrait};
use vault_server::entity::file_upload;

use crate::common::{TestApp, png_bytes, routes};

mod upload {
    use super::*;

    #[tokio::test]
    async fn image_upload_records_metadata_under_the_owners_path() {
        let app = TestApp::spawn().await;
        let (_, b, _) = app.admin_and_two_users().await;

        let res = app
            .upload_with_token("image", "photo.png", "image/png", png_bytes(3 * 1024 * 1024), &b.token)
            .await;

        assert_eq!(res.status, 201, "upload failed: {}", res.text);
        assert_eq!(res.body["file_name"], "photo.png");
        assert_eq!(res.body["file_type"], "image/png");
        assert_eq!(res.body["file_size"], 3 * 1024 * 1024);
        assert_eq!(res.body["category"], "image");
        let path = res.body["storage_path"].as_str().unwrap();
        assert!(path.starts_with(&format!("{}/", b.user_id)));
        assert!(path.ends_with(".png"));
    }

    #[tokio::test]
    async fn wrong_type_for_category_is_rejected_without_storing() {
        let app = TestApp::spawn().await;
        let (_, b, _) = app.admin_and_two_users().await;

        let res = app
            .upload_with_token("image", "report.pdf", "application/pdf", b"%PDF-1.4".to_vec(), &b.token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        let count = file_upload::Entity::find().count(&app.db).await.unwrap();
        assert_eq!(count, 0);
        assert_eq!(app.stored_object_count(), 0);
    }

    #[tokio::test]
    async fn file_over_the_category_cap_is_rejected() {
        let app = TestApp::spawn_with(|config| config.storage.image_max_bytes = 1024).await;
        let (_, b, _) = app.admin_and_two_users().await;

        let res = app
            .upload_with_token("image", "big.png", "image/png", png_bytes(2048), &b.token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        let count = file_upload::Entity::find().count(&app.db).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn second_file_part_is_rejected_and_the_first_is_discarded() {
        let app = TestApp::spawn().await;
        let (_, b, _) = app.admin_and_two_users().await;
        let part = |name: &str| {
            reqwest::multipart::Part::bytes(png_bytes(64))
                .file_name(name.to_string())
                .mime_str("image/png")
                .unwrap()
        };
        let form = reqwest::multipart::Form::new()
            .part("file", part("first.png"))
            .part("file", part("second.png"));

        let res = app
            .client
            .post(app.url(&routes::upload("image")))
            .bearer_auth(&b.token)
            .multipart(form)
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), 400);
        let count = file_upload::Entity::find().count(&app.db).await.unwrap();
        assert_eq!(count, 0);
        assert_eq!(app.stored_object_count(), 0);
    }

    #[tokio::test]
    async fn unsafe_filename_is_rejected() {
        let app = TestApp::spawn().await;
        let (_, b, _) = app.admin_and_two_users().await;

        let res = app
            .upload_with_token("document", "../escape.txt", "text/plain", b"hi".to_vec(), &b.token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_category_is_rejected() {
        let app = TestApp::spawn().await;
        let (_, b, _) = app.admin_and_two_users().await;

        let res = app
            .upload_with_token("video", "clip.png", "image/png", png_bytes(16), &b.token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod access {
    use super::*;

    #[tokio::test]
    async fn owner_downloads_content_with_original_name() {
        let app = TestApp::spawn().await;
        let (_, b, _) = app.admin_and_two_users().await;
        let uploaded = app
            .upload_with_token("document", "hello.txt", "text/plain", b"hello vault".to_vec(), &b.token)
            .await;
        assert_eq!(uploaded.status, 201, "upload failed: {}", uploaded.text);

        let res = app
            .client
            .get(app.url(&routes::file_download(&uploaded.id())))
            .bearer_auth(&b.token)
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), 200);
        let disposition = res.headers()["content-disposition"].to_str().unwrap().to_string();
        assert!(disposition.contains("hello.txt"));
        assert_eq!(res.text().await.unwrap(), "hello vault");
    }

    #[tokio::test]
    async fn other_users_files_are_invisible() {
        let app = TestApp::spawn().await;
        let (_, b, c) = app.admin_and_two_users().await;
        let uploaded = app
            .upload_with_token("image", "photo.png", "image/png", png_bytes(64), &b.token)
            .await;
        let id = uploaded.id();

        assert_eq!(app.get_with_token(&routes::file(&id), &c.token).await.status, 404);
        assert_eq!(
            app.get_with_token(&routes::file_download(&id), &c.token).await.status,
            404
        );
        assert_eq!(app.get_with_token(&routes::file_url(&id), &c.token).await.status, 404);
        assert_eq!(app.delete_with_token(&routes::file(&id), &c.token).await.status, 404);
        let key = uploaded.body["storage_path"].as_str().unwrap();
        let object = app.get_with_token(&routes::object("images", key), &b.token).await;
        assert_eq!(object.status, 200, "denied delete removed the object");

        let list = app.get_with_token(routes::FILES, &c.token).await;
        assert_eq!(list.body["total"], 0);
        let own = app.get_with_token(routes::FILES, &b.token).await;
        assert_eq!(own.body["total"], 1);
    }

    #[tokio::test]
    async fn list_filters_by_category() {
        let app = TestApp::spawn().await;
        let (_, b, _) = app.admin_and_two_users().await;
        app.upload_with_token("image", "a.png", "image/png", png_bytes(32), &b.token)
            .await;
        app.upload_with_token("document", "b.txt", "text/plain", b"b".to_vec(), &b.token)
            .await;

        let images = app
            .get_with_token(&format!("{}?category=image", routes::FILES), &b.token)
            .await;

        assert_eq!(images.status, 200);
        assert_eq!(images.body["total"], 1);
        assert_eq!(images.body["files"][0]["file_name"], "a.png");
    }

    #[tokio::test]
    async fn private_file_url_is_signed_and_works_without_a_session() {
        let app = TestApp::spawn().await;
        let (_, b, _) = app.admin_and_two_users().await;
        let uploaded = app
            .upload_with_token("document", "memo.txt", "text/plain", b"signed".to_vec(), &b.token)
            .await;

        let url = app.get_with_token(&routes::file_url(&uploaded.id()), &b.token).await;
        assert_eq!(url.status, 200, "url failed: {}", url.text);
        assert!(url.body["expires_at"].is_string());

        let res = app.get_absolute(url.body["url"].as_str().unwrap()).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.text, "signed");
    }

    #[tokio::test]
    async fn public_bucket_url_never_expires() {
        let app =
            TestApp::spawn_with(|config| config.storage.public_buckets = vec![Bucket::Images]).await;
        let (_, b, _) = app.admin_and_two_users().await;
        let uploaded = app
            .upload_with_token("image", "logo.png", "image/png", png_bytes(64), &b.token)
            .await;

        let url = app.get_with_token(&routes::file_url(&uploaded.id()), &b.token).await;

        assert_eq!(url.status, 200, "url failed: {}", url.text);
        assert!(url.body["expires_at"].is_null());
        assert!(url.body["url"].as_str().unwrap().contains("/storage/public/images/"));
        let res = app.get_absolute(url.body["url"].as_str().unwrap()).await;
        assert_eq!(res.status, 200);
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn owner_delete_removes_row_and_object() {
        let app = TestApp::spawn().await;
        let (_, b, _) = app.admin_and_two_users().await;
        let uploaded = app
            .upload_with_token("image", "photo.png", "image/png", png_bytes(64), &b.token)
            .await;
        let key = uploaded.body["storage_path"].as_str().unwrap().to_string();

        let res = app.delete_with_token(&routes::file(&uploaded.id()), &b.token).await;

        assert_eq!(res.status, 200, "delete failed: {}", res.text);
        assert_eq!(res.body["object_removed"], true);
        let object = app.get_with_token(&routes::object("images", &key), &b.token).await;
        assert_eq!(object.status, 404);
    }

    #[tokio::test]
    async fn admin_delete_removes_row_but_leaves_the_owners_object() {
        let app = TestApp::spawn().await;
        let (a, b, _) = app.admin_and_two_users().await;
        let uploaded = app
            .upload_with_token("image", "photo.png", "image/png", png_bytes(3 * 1024 * 1024), &b.token)
            .await;
        assert_eq!(uploaded.status, 201, "upload failed: {}", uploaded.text);
        let id = uploaded.id();
        let key = uploaded.body["storage_path"].as_str().unwrap().to_string();

        let res = app.delete_with_token(&routes::file(&id), &a.token).await;

        assert_eq!(res.status, 200, "admin delete failed: {}", res.text);
        assert_eq!(res.body["object_removed"], false);
        assert_eq!(app.get_with_token(&routes::file(&id), &b.token).await.status, 404);

        let object = app.get_with_token(&routes::object("images", &key), &b.token).await;
        assert_eq!(object.status, 200);

        let cleanup = app.delete_with_token(&routes::object("images", &key), &b.token).await;
        assert_eq!(cleanup.status, 204);
    }

    #[tokio::test]
    async fn admin_override_lets_admin_remove_the_object_too() {
        let app =
            TestApp::spawn_with(|config| config.storage.admin_object_override = true).await;
        let (a, b, _) = app.admin_and_two_users().await;
        let uploaded = app
            .upload_with_token("image", "photo.png", "image/png", png_bytes(64), &b.token)
            .await;
        let key = uploaded.body["storage_path"].as_str().unwrap().to_string();

        let res = app.delete_with_token(&routes::file(&uploaded.id()), &a.token).await;

        assert_eq!(res.status, 200, "admin delete failed: {}", res.text);
        assert_eq!(res.body["object_removed"], true);
        let object = app.get_with_token(&routes::object("images", &key), &b.token).await;
        assert_eq!(object.status, 404);
    }

    #[tokio::test]
    async fn admin_listing_covers_every_owner() {
        let app = TestApp::spawn().await;
        let (a, b, c) = app.admin_and_two_users().await;
        app.upload_with_token("image", "b.png", "image/png", png_bytes(32), &b.token)
            .await;
        app.upload_with_token("document", "c.txt", "text/plain", b"c".to_vec(), &c.token)
            .await;

        let all = app.get_with_token(routes::ADMIN_FILES, &a.token).await;
        assert_eq!(all.status, 200, "admin list failed: {}", all.text);
        assert_eq!(all.body["total"], 2);

        let denied = app.get_with_token(routes::ADMIN_FILES, &b.token).await;
        assert_eq!(denied.status, 403);
    }
}
