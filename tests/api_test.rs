//! HTTP API integration tests
//!
//! Every request goes through the fully composed router with
//! `tower::ServiceExt::oneshot`.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use common::{session_cookie, signup_body, test_settings_builder, TestApp};
use coredevs::shared::RateLimitSettings;

#[tokio::test]
async fn test_health_and_info() {
    let app = TestApp::spawn().await;

    let (status, _, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "UP"}));

    let (status, _, body) = app.get("/info", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["build"]["name"], "coredevs");
    assert!(body["build"]["version"].is_string());
}

#[tokio::test]
async fn test_signup_login_me_logout() {
    let app = TestApp::spawn().await;

    let (status, headers, body) = app
        .request(
            Method::POST,
            "/api/auth/signup",
            Some(signup_body("ada@example.com", "password123", "Ada")),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["token"].is_string());
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["role"], "user");
    assert_eq!(body["user"]["online"], false);
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("createdAt").is_none());
    let cookie = session_cookie(&headers).unwrap();
    assert!(cookie.starts_with("coredevs="));

    let (status, _, me) = app.get("/api/auth/me", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "ada@example.com");
    assert_eq!(me["id"], body["user"]["id"]);

    let (status, headers, body) = app
        .request(
            Method::POST,
            "/api/auth/login",
            Some(json!({"email": "ada@example.com", "password": "password123"})),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());
    assert!(session_cookie(&headers).is_some());

    let (status, headers, _) = app.request(Method::POST, "/api/auth/logout", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session_cookie(&headers).unwrap(), "coredevs=");
}

#[tokio::test]
async fn test_signup_validation_and_duplicates() {
    let app = TestApp::spawn().await;
    let signup = |email: &str, password: &str| signup_body(email, password, "Ann");

    let (status, _, body) = app
        .request(Method::POST, "/api/auth/signup", Some(signup("not-an-email", "password123")), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid email format");

    let (status, _, _) = app
        .request(Method::POST, "/api/auth/signup", Some(signup("a@b.co", "short")), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = app
        .request(Method::POST, "/api/auth/signup", Some(signup("a@b.co", "password123")), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _, body) = app
        .request(Method::POST, "/api/auth/signup", Some(signup("a@b.co", "password123")), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);

    let mut missing_profile = signup_body("b@b.co", "password123", "Bea");
    missing_profile.as_object_mut().unwrap().remove("workingHours");
    let (status, _, _) = app
        .request(Method::POST, "/api/auth/signup", Some(missing_profile), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signup_with_full_user_document() {
    let app = TestApp::spawn().await;
    let (status, _, body) = app
        .request(
            Method::POST,
            "/api/auth/signup",
            Some(json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": "ada@example.com",
                "password": "password123",
                "role": "super-admin",
                "workingDays": ["mo", "tu", "we"],
                "workingHours": 2,
                "skillsets": ["math"],
                "userName": "ada",
                "dob": "1815-12-10",
                "gender": "others",
                "phone": 351912345678u64,
                "notifySubs": [{"endpoint": "https://push.example.com/1"}]
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let user = &body["user"];
    assert_eq!(user["role"], "user");
    assert_eq!(user["gender"], "others");
    assert_eq!(user["phone"], 351912345678u64);
    assert_eq!(user["workingHours"], 2);
    assert!(user.get("notifySubs").is_none());
    assert!(user.get("status").is_none());
}

#[tokio::test]
async fn test_login_rejections() {
    let app = TestApp::spawn().await;
    let (user, _) = app.create_user("grace@example.com", "password123", "user").await;

    let (status, _, body) = app
        .request(
            Method::POST,
            "/api/auth/login",
            Some(json!({"email": "grace@example.com", "password": "wrong-password"})),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"status": 401, "reason": "Unauthorized"}));

    let (status, _, _) = app
        .request(
            Method::POST,
            "/api/auth/login",
            Some(json!({"email": "nobody@example.com", "password": "password123"})),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut deactivated = user;
    deactivated.set("status", json!("deactive"));
    app.state.users().unwrap().save(&mut deactivated).await.unwrap();
    let (status, _, _) = app
        .request(
            Method::POST,
            "/api/auth/login",
            Some(json!({"email": "grace@example.com", "password": "password123"})),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_middleware() {
    let app = TestApp::spawn().await;

    let (status, _, body) = app.get("/users", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"status": 401, "reason": "Unauthorized"}));

    let (status, _, _) = app.get("/users", Some("coredevs=not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Bearer tokens are a development-only convenience
    let (user, cookie) = app.create_user("bearer@example.com", "password123", "user").await;
    let token = cookie.trim_start_matches("coredevs=");
    let request = Request::builder()
        .uri("/users")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Deactivated users lose access even with a valid token
    let mut deactivated = user;
    deactivated.set("status", json!("deactive"));
    app.state.users().unwrap().save(&mut deactivated).await.unwrap();
    let (status, _, _) = app.get("/users", Some(&cookie)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_users() {
    let app = TestApp::spawn().await;
    let (_, cookie) = app.create_user("one@example.com", "password123", "user").await;
    app.create_user("two@example.com", "password123", "driver").await;
    app.create_user("three@example.com", "password123", "driver").await;

    let (status, _, body) = app.get("/users", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalDocs"], 3);
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 10);
    assert_eq!(body["hasNextPage"], false);
    // newest first
    assert_eq!(body["docs"][0]["email"], "three@example.com");
    assert!(body["docs"][0].get("password").is_none());

    let (status, _, body) = app.get("/users?role=driver&sortBy=email:asc&limit=1", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalDocs"], 2);
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["nextPage"], 2);
    assert_eq!(body["docs"][0]["email"], "three@example.com");

    let (status, _, body) = app.get("/users?search=TWO&paginate=false", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    let docs = body.as_array().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["email"], "two@example.com");

    let (status, _, body) = app.get("/users?password=x", Some(&cookie)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Query validation issue", "status": 400}));
}

#[tokio::test]
async fn test_get_update_delete_user() {
    let app = TestApp::spawn().await;
    let (target, user_cookie) = app.create_user("target@example.com", "password123", "user").await;
    let (_, admin_cookie) = app.create_user("admin@example.com", "password123", "admin").await;
    let uri = format!("/users/{}", target.id);

    let (status, _, body) = app.get(&uri, Some(&user_cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "target@example.com");

    let (status, _, body) = app
        .request(Method::PATCH, &uri, Some(json!({"firstName": "Grace"})), Some(&user_cookie))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"status": 401, "reason": "unauthorized"}));

    let (status, _, body) = app
        .request(
            Method::PATCH,
            &uri,
            Some(json!({"firstName": "Grace", "notAField": true})),
            Some(&admin_cookie),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["firstName"], "Grace");
    assert!(body.get("notAField").is_none());

    let (status, _, _) = app
        .request(Method::PATCH, &uri, Some(json!({"role": "owner"})), Some(&admin_cookie))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = app.request(Method::DELETE, &uri, None, Some(&user_cookie)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, body) = app.request(Method::DELETE, &uri, None, Some(&admin_cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], json!(target.id));

    let (status, _, body) = app.get(&uri, Some(&admin_cookie)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "User not found", "status": 404}));
}

#[tokio::test]
async fn test_user_search_index() {
    let app = TestApp::spawn().await;
    for (email, first_name) in [("ada@example.com", "Ada"), ("alan@example.com", "Alan")] {
        let (status, _, _) = app
            .request(
                Method::POST,
                "/api/auth/signup",
                Some(signup_body(email, "password123", first_name)),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (_, cookie) = app.create_user("viewer@example.com", "password123", "user").await;

    let (status, _, body) = app.get("/users/search?term=ada", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["hits"][0]["document"]["firstName"], "Ada");

    let (status, _, body) = app.get("/users/search?term=a", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn test_user_route_emits_message() {
    let app = TestApp::spawn().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _session = app.state.socket.connect(tx, None);

    let (status, _, body) = app.get("/user?message=hi", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Hello!"}));

    let frame = rx.recv().await.unwrap();
    assert_eq!(frame.event, "message");
    assert_eq!(frame.data, json!("hi"));
}

#[tokio::test]
async fn test_user_socket_event() {
    let app = TestApp::spawn().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = app.state.socket.connect(tx, None);

    let events = app.state.socket.events();
    let frame = coredevs::shared::SocketFrame::new("user", Value::Null);
    assert!(events.dispatch(frame, session).await);

    let reply = rx.recv().await.unwrap();
    assert_eq!(reply.event, "user");
    assert_eq!(reply.data, json!({"username": "CoreDevs"}));
}

#[tokio::test]
async fn test_demo_service() {
    let app = TestApp::spawn().await;

    let (status, headers, _) = app.get("/demo", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("x-coredevs-demo").unwrap(), "passed");

    let uploads = app.state.settings.uploads_dir();
    std::fs::create_dir_all(&uploads).unwrap();
    let source = uploads.join("avatar.PNG");
    std::fs::write(&source, b"png-bytes").unwrap();
    let (status, headers, body) = app
        .request(
            Method::POST,
            "/demo",
            Some(json!({"name": "demo", "image": source.to_string_lossy()})),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers.get("x-coredevs-demo").is_none());
    assert_eq!(body["name"], "demo");
    let image = body["image"].as_str().unwrap();
    assert!(image.starts_with("images/") && image.ends_with(".PNG"));
    assert_eq!(std::fs::read(app.dir.path().join(image)).unwrap(), b"png-bytes");

    let (status, _, body) = app
        .request(Method::POST, "/demo", Some(json!({"image": "notes.txt"})), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Failed to save image.");
}

#[tokio::test]
async fn test_demo_rejects_server_paths() {
    let app = TestApp::spawn().await;
    std::fs::create_dir_all(app.state.settings.uploads_dir()).unwrap();

    let outside = app.dir.path().join("private.png");
    std::fs::write(&outside, b"not yours").unwrap();
    let (status, _, body) = app
        .request(
            Method::POST,
            "/demo",
            Some(json!({"image": outside.to_string_lossy()})),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Failed to save image.");
    assert!(!app.state.settings.images_dir().exists());
}

#[tokio::test]
async fn test_demo_form_payloads() {
    let app = TestApp::spawn().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/demo")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("tag=a&tag=b&name=form"))
        .unwrap();
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"tag": ["a", "b"], "name": "form"}));

    let boundary = "X-COREDEVS-BOUNDARY";
    let multipart = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\nupload\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"pic.gif\"\r\n\
         Content-Type: image/gif\r\n\r\nGIF89a\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/demo")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(multipart))
        .unwrap();
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "upload");
    let image = body["image"].as_str().unwrap();
    assert!(image.starts_with("images/") && image.ends_with(".gif"));
    assert_eq!(std::fs::read(app.dir.path().join(image)).unwrap(), b"GIF89a");

    // the multipart temp file is gone once the response is out
    let leftovers = std::fs::read_dir(app.state.settings.uploads_dir()).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_static_client_fallback() {
    let app = TestApp::spawn().await;
    std::fs::write(app.dir.path().join("client").join("index.html"), "<h1>client</h1>").unwrap();

    let (status, _, body) = app.get("/index.html", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("<h1>client</h1>"));

    let (status, _, _) = app.get("/missing.js", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rate_limit() {
    let dir = tempfile::tempdir().unwrap();
    let settings = test_settings_builder(dir.path())
        .rate_limit(RateLimitSettings {
            enabled: true,
            requests: 2,
            period_secs: 60,
        })
        .build()
        .unwrap();
    let app = TestApp::with_settings(dir, settings).await;

    assert_eq!(app.get("/health", None).await.0, StatusCode::OK);
    assert_eq!(app.get("/health", None).await.0, StatusCode::OK);
    let (status, _, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["status"], 429);
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = TestApp::spawn().await;
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/users")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:3000"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
}
