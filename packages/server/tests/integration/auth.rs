use serde_json::json;

use crate::common::{TestApp, routes};

mod signup {
    use super::*;

    #[tokio::test]
    async fn first_account_is_admin_and_later_accounts_are_users() {
        let app = TestApp::spawn().await;

        let first = app
            .post_without_token(
                routes::SIGNUP,
                &json!({"email": "first@example.com", "password": "secret1", "name": "First"}),
            )
            .await;
        assert_eq!(first.status, 201, "Signup failed: {}", first.text);
        assert_eq!(first.body["roles"], json!(["admin"]));
        assert_eq!(first.body["name"], "First");

        let second = app
            .post_without_token(
                routes::SIGNUP,
                &json!({"email": "second@example.com", "password": "secret2", "name": "Second"}),
            )
            .await;
        assert_eq!(second.status, 201, "Signup failed: {}", second.text);
        assert_eq!(second.body["roles"], json!(["user"]));
    }

    #[tokio::test]
    async fn email_is_normalized_and_cannot_be_reused() {
        let app = TestApp::spawn().await;

        let first = app
            .post_without_token(
                routes::SIGNUP,
                &json!({"email": "  Alice@Example.COM ", "password": "secret1", "name": "Alice"}),
            )
            .await;
        assert_eq!(first.status, 201, "Signup failed: {}", first.text);
        assert_eq!(first.body["email"], "alice@example.com");

        let res = app
            .post_without_token(
                routes::SIGNUP,
                &json!({"email": "alice@example.com", "password": "secret2", "name": "Other"}),
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "EMAIL_TAKEN");
    }

    #[tokio::test]
    async fn cannot_sign_up_with_a_short_password() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::SIGNUP,
                &json!({"email": "alice@example.com", "password": "12345", "name": "Alice"}),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn cannot_sign_up_with_a_malformed_email() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::SIGNUP,
                &json!({"email": "not-an-email", "password": "secret1", "name": "Alice"}),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod login {
    use super::*;

    #[tokio::test]
    async fn login_returns_a_session_usable_for_me() {
        let app = TestApp::spawn().await;
        let session = app
            .signup_and_login("alice@example.com", "secret1", "Alice")
            .await;

        let res = app.get_with_token(routes::ME, &session.token).await;

        assert_eq!(res.status, 200, "me failed: {}", res.text);
        assert_eq!(res.body["id"], session.user_id.as_str());
        assert_eq!(res.body["email"], "alice@example.com");
        assert!(res.body["session_expires_at"].is_string());
    }

    #[tokio::test]
    async fn cannot_login_with_wrong_password() {
        let app = TestApp::spawn().await;
        app.signup_and_login("alice@example.com", "secret1", "Alice")
            .await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "alice@example.com", "password": "wrong-password"}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn unknown_email_looks_like_a_wrong_password() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "nobody@example.com", "password": "secret1"}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }
}

mod sessions {
    use super::*;

    #[tokio::test]
    async fn requests_without_a_token_are_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::ME).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_with_token(routes::ME, "not.a.jwt").await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn logout_revokes_only_the_current_session() {
        let app = TestApp::spawn().await;
        let first = app
            .signup_and_login("alice@example.com", "secret1", "Alice")
            .await;
        let second = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "alice@example.com", "password": "secret1"}),
            )
            .await;
        let second_token = second.body["token"].as_str().unwrap().to_string();

        let res = app
            .post_with_token(routes::LOGOUT, &json!({}), &first.token)
            .await;
        assert_eq!(res.status, 204, "logout failed: {}", res.text);

        let revoked = app.get_with_token(routes::ME, &first.token).await;
        assert_eq!(revoked.status, 401);
        assert_eq!(revoked.body["code"], "TOKEN_INVALID");

        let still_valid = app.get_with_token(routes::ME, &second_token).await;
        assert_eq!(still_valid.status, 200);
    }

    #[tokio::test]
    async fn event_stream_requires_a_session() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::EVENTS).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }
}

mod magic_link {
    use super::*;

    #[tokio::test]
    async fn magic_link_creates_an_account_named_after_the_email() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::MAGIC_LINK, &json!({"email": "Dana@Example.com"}))
            .await;
        assert_eq!(res.status, 202, "magic link failed: {}", res.text);
        assert_eq!(res.body["email"], "dana@example.com");

        let token = app
            .mailer
            .last_token_for("dana@example.com")
            .expect("a magic link should have been sent");
        let session = app
            .post_without_token(routes::MAGIC_LINK_VERIFY, &json!({"token": token}))
            .await;

        assert_eq!(session.status, 200, "verify failed: {}", session.text);
        assert_eq!(session.body["user"]["email"], "dana@example.com");
        assert_eq!(session.body["user"]["name"], "dana");
        // No one signed up before, so this identity is the admin.
        assert_eq!(session.body["user"]["roles"], json!(["admin"]));
    }

    #[tokio::test]
    async fn magic_link_signs_in_an_existing_account() {
        let app = TestApp::spawn().await;
        let existing = app
            .signup_and_login("alice@example.com", "secret1", "Alice")
            .await;

        app.post_without_token(routes::MAGIC_LINK, &json!({"email": "alice@example.com"}))
            .await;
        let token = app.mailer.last_token_for("alice@example.com").unwrap();
        let res = app
            .post_without_token(routes::MAGIC_LINK_VERIFY, &json!({"token": token}))
            .await;

        assert_eq!(res.status, 200, "verify failed: {}", res.text);
        assert_eq!(res.body["user"]["id"], existing.user_id.as_str());
        assert_eq!(res.body["user"]["name"], "Alice");
    }

    #[tokio::test]
    async fn magic_link_token_works_only_once() {
        let app = TestApp::spawn().await;

        app.post_without_token(routes::MAGIC_LINK, &json!({"email": "dana@example.com"}))
            .await;
        let token = app.mailer.last_token_for("dana@example.com").unwrap();

        let first = app
            .post_without_token(routes::MAGIC_LINK_VERIFY, &json!({"token": token}))
            .await;
        assert_eq!(first.status, 200, "verify failed: {}", first.text);

        let second = app
            .post_without_token(routes::MAGIC_LINK_VERIFY, &json!({"token": token}))
            .await;
        assert_eq!(second.status, 401);
        assert_eq!(second.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn unknown_magic_link_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::MAGIC_LINK_VERIFY, &json!({"token": "deadbeef"}))
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }
}
