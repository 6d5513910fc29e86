use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use lectern_api::auth::{AppState, AppStateInner, bootstrap_admin};
use lectern_db::Database;

struct TestApp {
    app: Router,
    state: AppState,
    path: PathBuf,
}

impl TestApp {
    fn new() -> Self {
        let path = std::env::temp_dir().join(format!("lectern_api_test_{}.db", Uuid::new_v4()));
        let state: AppState = Arc::new(AppStateInner {
            db: Database::open(&path).unwrap(),
            jwt_secret: "test-secret".into(),
            token_ttl: chrono::Duration::days(1),
        });
        Self {
            app: lectern_api::router(state.clone()),
            state,
            path,
        }
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(v) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };

        let response = self.app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn register(&self, name: &str, email: &str) -> (String, Uuid) {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": "secret123" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        let id = body["user"]["id"].as_str().unwrap().parse().unwrap();
        (body["token"].as_str().unwrap().to_string(), id)
    }

    async fn admin(&self) -> String {
        bootstrap_admin(&self.state.db, "admin@lectern.test", "admin-pass").unwrap();
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": "admin@lectern.test", "password": "admin-pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["token"].as_str().unwrap().to_string()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut p = self.path.clone().into_os_string();
            p.push(suffix);
            let _ = std::fs::remove_file(p);
        }
    }
}

fn book_body(title: &str) -> Value {
    json!({
        "title": title,
        "author": "St. John Climacus",
        "description": "Thirty steps of ascent",
        "category": "Spirituality",
        "tags": ["ascetic"],
        "pageCount": 300
    })
}

#[tokio::test]
async fn test_register_and_login() {
    let t = TestApp::new();
    let (_, id) = t.register("Anna", "Anna@Example.com").await;

    let (status, body) = t
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "anna@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["id"], id.to_string());
    assert!(body["user"].get("password").is_none());

    let (status, body) = t
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "anna@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");

    let (status, body) = t
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Anna", "email": "anna@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_deactivated_account_cannot_log_in() {
    let t = TestApp::new();
    let admin = t.admin().await;
    let (token, id) = t.register("Boris", "boris@example.com").await;

    let (status, _) = t
        .request(
            Method::PUT,
            &format!("/api/admin/users/{}/active", id),
            Some(&admin),
            Some(json!({ "isActive": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = t
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "boris@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Account has been deactivated");

    let (status, _) = t.request(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_submission_approval_notifies_submitter() {
    let t = TestApp::new();
    let admin = t.admin().await;
    let (token, _) = t.register("Clara", "clara@example.com").await;

    let (status, body) = t
        .request(Method::POST, "/api/books/submit", Some(&token), Some(book_body("Ladder")))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["book"]["status"], "pending");
    assert_eq!(body["book"]["isVerified"], false);
    let book_id = body["book"]["id"].as_str().unwrap().to_string();

    let (_, listed) = t.request(Method::GET, "/api/books", None, None).await;
    assert_eq!(listed.as_array().unwrap().len(), 0);

    let approve = format!("/api/admin/books/{}/approve", book_id);
    let (status, _) = t.request(Method::PUT, &approve, Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = t.request(Method::PUT, &approve, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book"]["status"], "approved");
    assert_eq!(body["book"]["isVerified"], true);
    assert!(body["book"].get("rejectionReason").is_none());

    let (_, body) = t.request(Method::GET, "/api/notifications", Some(&token), None).await;
    let notifications = body["notifications"].as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["title"], "Book Approved");

    let (status, _) = t.request(Method::PUT, &approve, Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, listed) = t.request(Method::GET, "/api/books?search=ladder", None, None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_approval_survives_notification_failure() {
    let t = TestApp::new();
    let admin = t.admin().await;
    let (token, _) = t.register("Gleb", "gleb@example.com").await;

    let (_, body) = t
        .request(Method::POST, "/api/books/submit", Some(&token), Some(book_body("Ladder")))
        .await;
    let book_id = body["book"]["id"].as_str().unwrap().to_string();

    t.state
        .db
        .with_conn_mut(|conn| {
            conn.execute_batch("DROP TABLE notifications")?;
            Ok(())
        })
        .unwrap();

    let approve = format!("/api/admin/books/{}/approve", book_id);
    let (status, body) = t.request(Method::PUT, &approve, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book"]["status"], "approved");
    assert_eq!(body["book"]["isVerified"], true);

    let (_, book) = t.request(Method::GET, &format!("/api/books/{}", book_id), None, None).await;
    assert_eq!(book["status"], "approved");
    assert_eq!(book["isVerified"], true);
}

#[tokio::test]
async fn test_rejection_requires_reason() {
    let t = TestApp::new();
    let admin = t.admin().await;
    let (token, _) = t.register("Dmitri", "dmitri@example.com").await;

    let (_, body) = t
        .request(
            Method::POST,
            "/api/songs/submit",
            Some(&token),
            Some(json!({ "title": "Troparion", "singer": "Choir", "lyrics": "..." })),
        )
        .await;
    let reject = format!("/api/admin/songs/{}/reject", body["song"]["id"].as_str().unwrap());

    let (status, _) = t
        .request(Method::PUT, &reject, Some(&admin), Some(json!({ "reason": "  " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = t
        .request(Method::PUT, &reject, Some(&admin), Some(json!({ "reason": "Duplicate" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["song"]["status"], "rejected");
    assert_eq!(body["song"]["isVerified"], false);
    assert_eq!(body["song"]["rejectionReason"], "Duplicate");
}

#[tokio::test]
async fn test_review_aggregate_follows_mutations() {
    let t = TestApp::new();
    let admin = t.admin().await;

    let (_, body) = t
        .request(Method::POST, "/api/admin/books", Some(&admin), Some(book_body("Ladder")))
        .await;
    let book_id = body["book"]["id"].as_str().unwrap().to_string();
    let reviews = format!("/api/books/{}/reviews", book_id);

    let mut tokens = Vec::new();
    let mut last = Value::Null;
    for (i, rating) in [5, 4, 3].into_iter().enumerate() {
        let (token, _) = t.register("Reader", &format!("reader{}@example.com", i)).await;
        let (status, body) = t
            .request(
                Method::POST,
                &reviews,
                Some(&token),
                Some(json!({ "comment": "Worth reading", "rating": rating })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        tokens.push(token);
        last = body;
    }
    assert_eq!(last["book"]["averageRating"].as_f64(), Some(4.0));
    assert_eq!(last["book"]["totalReviews"], 3);

    let (status, _) = t
        .request(
            Method::POST,
            &reviews,
            Some(&tokens[0]),
            Some(json!({ "comment": "Again", "rating": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t
        .request(
            Method::POST,
            &reviews,
            Some(&tokens[0]),
            Some(json!({ "comment": "Too high", "rating": 6 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let third = last["review"]["id"].as_str().unwrap().to_string();
    let review_url = format!("{}/{}", reviews, third);

    let (status, _) = t
        .request(Method::PUT, &review_url, Some(&tokens[0]), Some(json!({ "rating": 5 })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = t
        .request(
            Method::PUT,
            &review_url,
            Some(&tokens[2]),
            Some(json!({ "comment": "Better on a second reading", "rating": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["review"]["rating"], 5);
    assert_eq!(body["review"]["comment"], "Better on a second reading");
    assert_eq!(body["book"]["averageRating"].as_f64(), Some(4.7));
    assert_eq!(body["book"]["totalReviews"], 3);

    let (status, body) = t.request(Method::DELETE, &review_url, Some(&tokens[2]), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book"]["averageRating"].as_f64(), Some(4.5));
    assert_eq!(body["book"]["totalReviews"], 2);

    let (status, _) = t.request(Method::DELETE, &review_url, Some(&tokens[2]), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_favorite_toggle_twice_restores_state() {
    let t = TestApp::new();
    let admin = t.admin().await;
    let (token, _) = t.register("Elena", "elena@example.com").await;

    let (_, body) = t
        .request(Method::POST, "/api/admin/books", Some(&admin), Some(book_body("Ladder")))
        .await;
    let book_id = body["book"]["id"].as_str().unwrap().to_string();
    let url = format!("/api/user/favorites/books/{}", book_id);

    let (status, body) = t.request(Method::POST, &url, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isFavorite"], true);
    assert_eq!(body["favoriteBooks"], json!([book_id]));

    let (_, body) = t.request(Method::POST, &url, Some(&token), None).await;
    assert_eq!(body["isFavorite"], false);
    assert_eq!(body["favoriteBooks"], json!([]));

    let missing = format!("/api/user/favorites/books/{}", Uuid::new_v4());
    let (status, _) = t.request(Method::POST, &missing, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_report_status_is_admin_only() {
    let t = TestApp::new();
    let admin = t.admin().await;
    let (token, _) = t.register("Fotini", "fotini@example.com").await;

    let (status, body) = t
        .request(
            Method::POST,
            "/api/reports",
            Some(&token),
            Some(json!({
                "type": "book",
                "title": "Broken cover",
                "description": "Image does not load",
                "screenshotUrl": "/uploads/shot.png"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["report"]["status"], "pending");
    assert_eq!(body["report"]["reporterName"], "Fotini");
    let url = format!("/api/reports/{}/status", body["report"]["id"].as_str().unwrap());

    let (status, _) = t.request(Method::GET, "/api/reports", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t
        .request(Method::PUT, &url, Some(&token), Some(json!({ "status": "resolved" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = t
        .request(Method::PUT, &url, Some(&admin), Some(json!({ "status": "resolved" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["status"], "resolved");

    let (status, body) = t.request(Method::GET, "/api/reports", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reports"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_error_bodies_share_shape() {
    let t = TestApp::new();

    let (status, body) = t.request(Method::GET, "/api/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "success": false, "message": "Route not found" }));

    let (status, body) = t.request(Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, body) = t.request(Method::GET, "/api/books/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = t
        .request(Method::GET, &format!("/api/books/{}", Uuid::new_v4()), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Book not found");

    let (status, body) = t.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
