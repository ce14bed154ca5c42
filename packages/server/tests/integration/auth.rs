use serde_json::json;

use crate::common::{ADMIN_USERNAME, TEAM_PASSWORD, TestApp, routes};

mod registration {
    use super::*;

    #[tokio::test]
    async fn new_team_starts_in_round_one_without_access() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"team_number": 7, "team_name": "Night Owls", "password": TEAM_PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["team_number"], 7);
        assert_eq!(res.body["team_name"], "Night Owls");
        assert_eq!(res.body["current_round"], 1);
        assert_eq!(res.body["status"], "active");
        assert_eq!(res.body["event_access"], false);
        assert!(res.body["eliminated_round"].is_null());
        assert!(res.body.get("password").is_none());
    }

    #[tokio::test]
    async fn cannot_register_a_taken_team_number() {
        let app = TestApp::spawn().await;
        let body = json!({"team_number": 3, "team_name": "First", "password": TEAM_PASSWORD});

        let first = app.post_without_token(routes::REGISTER, &body).await;
        assert_eq!(first.status, 201, "First registration failed: {}", first.text);

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"team_number": 3, "team_name": "Second", "password": TEAM_PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "TEAM_NUMBER_TAKEN");
    }

    #[tokio::test]
    async fn cannot_register_with_a_short_password() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"team_number": 1, "team_name": "Owls", "password": "short"}),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn cannot_register_a_non_positive_team_number() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"team_number": 0, "team_name": "Owls", "password": TEAM_PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::REGISTER, &json!({"team_name": "Owls"}))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod login {
    use super::*;

    #[tokio::test]
    async fn team_login_grants_round_play() {
        let app = TestApp::spawn().await;
        app.create_team(5, "Foxes").await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"team_number": 5, "password": TEAM_PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["token"].is_string());
        assert_eq!(res.body["id"], 5);
        assert_eq!(res.body["role"], "team");
        assert_eq!(res.body["permissions"], json!(["round:play"]));
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let app = TestApp::spawn().await;
        app.create_team(5, "Foxes").await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"team_number": 5, "password": "not-the-password"}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn unknown_team_is_rejected_like_a_wrong_password() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"team_number": 99, "password": TEAM_PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn seeded_admin_can_log_in() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let me = app.get_with_token(routes::ME, &token).await;

        assert_eq!(me.status, 200, "{}", me.text);
        assert_eq!(me.body["name"], ADMIN_USERNAME);
        assert_eq!(me.body["role"], "admin");
        assert!(me.body["team"].is_null());
        let perms = me.body["permissions"].as_array().unwrap();
        assert!(perms.contains(&json!("event:manage")));
        assert!(perms.contains(&json!("team:manage")));
    }

    #[tokio::test]
    async fn admin_login_rejects_wrong_password() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::ADMIN_LOGIN,
                &json!({"username": ADMIN_USERNAME, "password": "wrong-password"}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }
}

mod me {
    use super::*;

    #[tokio::test]
    async fn team_sees_its_own_record() {
        let app = TestApp::spawn().await;
        let token = app.create_team(12, "Ravens").await;

        let res = app.get_with_token(routes::ME, &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["id"], 12);
        assert_eq!(res.body["role"], "team");
        assert_eq!(res.body["team"]["team_number"], 12);
        assert_eq!(res.body["team"]["current_round"], 1);
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::ME).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_with_token(routes::ME, "not-a-jwt").await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn deleted_team_token_reports_team_not_found() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let token = app.create_team(4, "Gone").await;

        let del = app.delete_with_token(&routes::admin_team(4), &admin).await;
        assert_eq!(del.status, 204, "{}", del.text);

        let res = app.get_with_token(routes::ME, &token).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "TEAM_NOT_FOUND");
    }
}
