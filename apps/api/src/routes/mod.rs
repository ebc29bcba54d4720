pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::embedded::handlers as embedded;
use crate::jobs::handlers as jobs;
use crate::state::AppState;
use crate::users::handlers as users;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Users
        .route("/users", post(users::handle_create_user))
        .route("/users/me", get(users::handle_get_me))
        .route("/users/me/token", post(users::handle_refresh_token))
        .route(
            "/users/:id",
            get(users::handle_get_user)
                .put(users::handle_update_user)
                .delete(users::handle_delete_user),
        )
        .route("/users/:id/:kind", post(embedded::handle_append_user_item))
        .route(
            "/users/:id/:kind/:item_id",
            put(embedded::handle_patch_user_item).delete(embedded::handle_remove_user_item),
        )
        // Jobs
        .route(
            "/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route("/jobs/mine", get(jobs::handle_my_jobs))
        .route(
            "/jobs/:id",
            get(jobs::handle_get_job)
                .put(jobs::handle_update_job)
                .delete(jobs::handle_delete_job),
        )
        .route("/jobs/:id/:kind", post(embedded::handle_append_job_item))
        .route(
            "/jobs/:id/:kind/:item_id",
            put(embedded::handle_patch_job_item).delete(embedded::handle_remove_job_item),
        )
        // Applications
        .route(
            "/applications/:application_id",
            put(embedded::handle_update_application_status),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::TokenKeys;
    use crate::config::{Config, StoreBackend};
    use crate::store::MemoryDocumentStore;

    fn test_router() -> Router {
        let config = Config {
            store_backend: StoreBackend::Memory,
            database_url: None,
            database_max_connections: 1,
            jwt_secret: "test-secret".to_string(),
            token_ttl_secs: 3600,
            port: 0,
            rust_log: "debug".to_string(),
        };
        build_router(AppState {
            store: Arc::new(MemoryDocumentStore::new()),
            tokens: TokenKeys::new(&config.jwt_secret, config.token_ttl_secs),
            config,
        })
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Signs up and returns (user id, token).
    async fn sign_up(app: &Router, email: &str, role: &str) -> (String, String) {
        let (status, body) = call(
            app,
            Method::POST,
            "/users",
            None,
            Some(json!({"name": "Test", "email": email, "role": role})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (
            body["data"]["user"]["id"].as_str().unwrap().to_string(),
            body["data"]["token"].as_str().unwrap().to_string(),
        )
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_router();
        let (status, body) = call(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["store"], "memory");
    }

    #[tokio::test]
    async fn test_mutations_require_bearer_token() {
        let app = test_router();
        let (user_id, _) = sign_up(&app, "u1@example.com", "jobseeker").await;
        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/users/{user_id}/employments"),
            Some("not-a-token"),
            Some(json!({"jobTitle": "Engineer", "company": "Acme"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_token_refresh_needs_live_account() {
        let app = test_router();
        let (user_id, token) = sign_up(&app, "u1@example.com", "jobseeker").await;

        let (status, body) =
            call(&app, Method::POST, "/users/me/token", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let fresh = body["data"]["token"].as_str().unwrap().to_string();
        let (status, body) = call(&app, Method::GET, "/users/me", Some(&fresh), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], user_id.as_str());

        let (status, _) = call(
            &app,
            Method::DELETE,
            &format!("/users/{user_id}"),
            Some(&fresh),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, Method::POST, "/users/me/token", Some(&fresh), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, Method::POST, "/users/me/token", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let app = test_router();
        sign_up(&app, "dup@example.com", "jobseeker").await;
        let (status, _) = call(
            &app,
            Method::POST,
            "/users",
            None,
            Some(json!({"name": "Again", "email": "DUP@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_employment_lifecycle_over_http() {
        let app = test_router();
        let (user_id, token) = sign_up(&app, "u1@example.com", "jobseeker").await;
        let base = format!("/users/{user_id}/employments");

        let (status, body) = call(
            &app,
            Method::POST,
            &base,
            Some(&token),
            Some(json!({"jobTitle": "Engineer", "company": "Acme"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["success"], true);
        let entries = body["data"]["employments"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        let item_id = entries[0]["id"].as_str().unwrap().to_string();

        let (status, body) = call(
            &app,
            Method::PUT,
            &format!("{base}/{item_id}"),
            Some(&token),
            Some(json!({"company": "NewCo"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["employments"][0]["company"], "NewCo");
        assert_eq!(body["data"]["employments"][0]["jobTitle"], "Engineer");

        for _ in 0..2 {
            let (status, body) = call(
                &app,
                Method::DELETE,
                &format!("{base}/{item_id}"),
                Some(&token),
                None,
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["data"]["employments"], json!([]));
        }

        let (status, _) = call(
            &app,
            Method::PUT,
            &format!("{base}/{item_id}"),
            Some(&token),
            Some(json!({"company": "Again"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_fields_and_kinds_rejected() {
        let app = test_router();
        let (user_id, token) = sign_up(&app, "u1@example.com", "jobseeker").await;

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/users/{user_id}/itSkills"),
            Some(&token),
            Some(json!({"skill": "Rust", "rating": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("rating"));

        let (status, _) = call(
            &app,
            Method::POST,
            &format!("/users/{user_id}/hobbies"),
            Some(&token),
            Some(json!({"name": "chess"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(
            &app,
            Method::POST,
            &format!("/users/{user_id}/applications"),
            Some(&token),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_append_to_missing_parent_is_404() {
        let app = test_router();
        let (_, token) = sign_up(&app, "u1@example.com", "jobseeker").await;
        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/users/{}/projects", uuid::Uuid::new_v4()),
            Some(&token),
            Some(json!({"title": "Compiler"})),
        )
        .await;
        // Parent lookup runs before the ownership check.
        assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
    }

    #[tokio::test]
    async fn test_application_status_flow() {
        let app = test_router();
        let (_, employer) = sign_up(&app, "boss@example.com", "employer").await;
        let (_, rival) = sign_up(&app, "rival@example.com", "employer").await;
        let (_, seeker) = sign_up(&app, "seeker@example.com", "jobseeker").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/jobs",
            Some(&employer),
            Some(json!({"title": "Rust Engineer", "company": "Acme", "employmentType": "full_time"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let job_id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/jobs/{job_id}/applications"),
            Some(&seeker),
            Some(json!({"coverLetter": "Hire me"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let application = &body["data"]["applications"][0];
        assert_eq!(application["status"], "pending");
        assert_eq!(application["applicant"]["email"], "seeker@example.com");
        let application_id = application["id"].as_str().unwrap().to_string();
        let uri = format!("/applications/{application_id}");

        let (status, _) = call(
            &app,
            Method::PUT,
            &uri,
            Some(&employer),
            Some(json!({"status": "approved"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        for requested in ["accepted", ""] {
            let (status, _) = call(
                &app,
                Method::PUT,
                &uri,
                Some(&rival),
                Some(json!({"status": requested})),
            )
            .await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{requested:?}");
        }

        let (status, body) = call(
            &app,
            Method::PUT,
            &uri,
            Some(&employer),
            Some(json!({"status": "accepted"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "accepted");
        assert_eq!(body["data"]["id"], application_id.as_str());

        let (status, _) = call(
            &app,
            Method::PUT,
            &format!("/applications/{}", uuid::Uuid::new_v4()),
            Some(&employer),
            Some(json!({"status": "rejected"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(&app, Method::GET, "/jobs/mine", Some(&employer), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["applications"][0]["status"], "accepted");
    }

    #[tokio::test]
    async fn test_public_listing_hides_applications() {
        let app = test_router();
        let (_, employer) = sign_up(&app, "boss@example.com", "employer").await;
        let (_, seeker) = sign_up(&app, "seeker@example.com", "jobseeker").await;

        let (_, body) = call(
            &app,
            Method::POST,
            "/jobs",
            Some(&employer),
            Some(json!({"title": "SRE", "company": "Acme"})),
        )
        .await;
        let job_id = body["data"]["id"].as_str().unwrap().to_string();
        call(
            &app,
            Method::POST,
            &format!("/jobs/{job_id}/applications"),
            Some(&seeker),
            Some(json!({})),
        )
        .await;

        let (status, body) = call(&app, Method::GET, "/jobs", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["applicationCount"], 1);
        assert!(body["data"][0].get("applications").is_none());

        let (_, body) = call(
            &app,
            Method::GET,
            &format!("/jobs/{job_id}"),
            Some(&seeker),
            None,
        )
        .await;
        assert!(body["data"].get("applications").is_none());
    }

    #[tokio::test]
    async fn test_application_responses_hide_other_applicants() {
        let app = test_router();
        let (_, employer) = sign_up(&app, "boss@example.com", "employer").await;
        let (_, seeker) = sign_up(&app, "seeker@example.com", "jobseeker").await;
        let (_, other) = sign_up(&app, "other@example.com", "jobseeker").await;

        let (_, body) = call(
            &app,
            Method::POST,
            "/jobs",
            Some(&employer),
            Some(json!({"title": "SRE", "company": "Acme"})),
        )
        .await;
        let job_id = body["data"]["id"].as_str().unwrap().to_string();
        let uri = format!("/jobs/{job_id}/applications");
        call(
            &app,
            Method::POST,
            &uri,
            Some(&seeker),
            Some(json!({"coverLetter": "private letter"})),
        )
        .await;

        // Removing an absent entry succeeds but must not reveal the list.
        let (status, body) = call(
            &app,
            Method::DELETE,
            &format!("{uri}/{}", uuid::Uuid::new_v4()),
            Some(&other),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["applicationCount"], 1);
        assert_eq!(body["data"]["applications"], json!([]));
        assert!(!body.to_string().contains("private letter"));

        let (status, body) = call(&app, Method::POST, &uri, Some(&other), Some(json!({}))).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let visible = body["data"]["applications"].as_array().unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0]["applicant"]["email"], "other@example.com");
        assert!(!body.to_string().contains("seeker@example.com"));

        let (_, body) = call(
            &app,
            Method::GET,
            &format!("/jobs/{job_id}"),
            Some(&employer),
            None,
        )
        .await;
        assert_eq!(body["data"]["applications"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_jobseeker_cannot_post_job() {
        let app = test_router();
        let (_, seeker) = sign_up(&app, "seeker@example.com", "jobseeker").await;
        let (status, body) = call(
            &app,
            Method::POST,
            "/jobs",
            Some(&seeker),
            Some(json!({"title": "SRE", "company": "Acme"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_malformed_path_id_uses_error_envelope() {
        let app = test_router();
        let (_, token) = sign_up(&app, "u1@example.com", "jobseeker").await;
        let (status, body) =
            call(&app, Method::GET, "/users/not-a-uuid", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }
}
