mod common;

use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{assert_no_credentials, error_of, spawn_app};

#[tokio::test]
async fn signup_returns_message_not_record() {
    let app = spawn_app().await;
    let res = app.signup("Ana", "ana@example.com").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "message": "Successfully signed up!" }));
}

#[tokio::test]
async fn signup_validation_and_duplicate_email() {
    let app = spawn_app().await;

    let res = app
        .http
        .post(app.url("/api/users"))
        .json(&json!({ "email": "ana@example.com", "password": "secret1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(
        error_of(res).await,
        (StatusCode::BAD_REQUEST, "Name is required".to_string())
    );

    app.signup("Ana", "ana@example.com").await;
    let res = app.signup("Other", "ana@example.com").await;
    assert_eq!(
        error_of(res).await,
        (StatusCode::BAD_REQUEST, "Email already exists".to_string())
    );
}

#[tokio::test]
async fn list_projects_exactly_four_fields() {
    let app = spawn_app().await;
    app.signup("Ana", "ana@example.com").await;
    app.signup("Ben", "ben@example.com").await;

    let res = app.http.get(app.url("/api/users")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_no_credentials(&body);

    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 2);
    for user in users {
        let mut keys: Vec<_> = user.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["created", "email", "name", "updated"]);
    }
}

#[tokio::test]
async fn read_is_open_and_hides_credentials() {
    let app = spawn_app().await;
    let ana = app.user("Ana", "ana@example.com").await;

    let user = app.get_user(&ana.id).await;
    assert_eq!(user["_id"], ana.id.as_str());
    assert_eq!(user["name"], "Ana");
    assert_eq!(user["profilePic"], "/default-profile.png");
    assert_no_credentials(&user);
}

#[tokio::test]
async fn unknown_user_is_rejected_before_the_handler() {
    let app = spawn_app().await;

    let missing = uuid::Uuid::now_v7();
    let res = app
        .http
        .get(app.url(&format!("/api/users/{}", missing)))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "User not found" }));

    let res = app
        .http
        .delete(app.url(&format!("/api/users/{}", missing)))
        .send()
        .await
        .unwrap();
    assert_eq!(
        error_of(res).await,
        (StatusCode::BAD_REQUEST, "User not found".to_string())
    );

    let res = app
        .http
        .get(app.url("/api/users/not-an-id"))
        .send()
        .await
        .unwrap();
    assert_eq!(
        error_of(res).await,
        (StatusCode::BAD_REQUEST, "Could not retrieve user".to_string())
    );
}

#[tokio::test]
async fn empty_update_bumps_updated() {
    let app = spawn_app().await;
    let ana = app.user("Ana", "ana@example.com").await;
    let before = app.get_user(&ana.id).await;

    let res = app
        .http
        .put(app.url(&format!("/api/users/{}", ana.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let after: Value = res.json().await.unwrap();
    assert_no_credentials(&after);

    let parse = |v: &Value| {
        chrono::DateTime::parse_from_rfc3339(v["updated"].as_str().unwrap()).unwrap()
    };
    assert!(parse(&after) > parse(&before));
    assert_eq!(after["created"], before["created"]);
}

#[tokio::test]
async fn update_ignores_protected_fields() {
    let app = spawn_app().await;
    let ana = app.user("Ana", "ana@example.com").await;

    let res = app
        .http
        .put(app.url(&format!("/api/users/{}", ana.id)))
        .json(&json!({
            "bio": "hello",
            "followers": ["someone"],
            "hashed_password": "x",
            "_id": "other"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let user: Value = res.json().await.unwrap();
    assert_eq!(user["bio"], "hello");
    assert_eq!(user["_id"], ana.id.as_str());
    assert_eq!(user["followers"], json!([]));

    // Old password still works.
    let res = app
        .http
        .post(app.url("/auth/signin"))
        .json(&json!({ "email": "ana@example.com", "password": "secret1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn delete_returns_snapshot_and_second_delete_fails() {
    let app = spawn_app().await;
    let ana = app.user("Ana", "ana@example.com").await;
    let path = app.url(&format!("/api/users/{}", ana.id));

    let res = app.http.delete(&path).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let deleted: Value = res.json().await.unwrap();
    assert_eq!(deleted["_id"], ana.id.as_str());
    assert_no_credentials(&deleted);

    let res = app.http.delete(&path).send().await.unwrap();
    let (status, message) = error_of(res).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!message.is_empty());
}

#[tokio::test]
async fn follow_and_unfollow() {
    let app = spawn_app().await;
    let a = app.user("A", "a@example.com").await;
    let b = app.user("B", "b@example.com").await;

    let res = app
        .http
        .put(app.url(&format!("/api/users/follow/{}", b.id)))
        .bearer_auth(&a.token)
        .json(&json!({ "userId": a.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "User followed successfully");

    assert_eq!(app.get_user(&a.id).await["following"], json!([b.id]));
    assert_eq!(app.get_user(&b.id).await["followers"], json!([a.id]));

    let res = app
        .http
        .put(app.url(&format!("/api/users/unfollow/{}", b.id)))
        .bearer_auth(&a.token)
        .json(&json!({ "userId": a.id }))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "User unfollowed successfully");

    assert_eq!(app.get_user(&a.id).await["following"], json!([]));
    assert_eq!(app.get_user(&b.id).await["followers"], json!([]));
}

#[tokio::test]
async fn follow_unknown_target_is_not_found() {
    let app = spawn_app().await;
    let a = app.user("A", "a@example.com").await;

    let res = app
        .http
        .put(app.url(&format!("/api/users/follow/{}", uuid::Uuid::now_v7())))
        .bearer_auth(&a.token)
        .json(&json!({ "userId": a.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(
        error_of(res).await,
        (StatusCode::BAD_REQUEST, "User not found".to_string())
    );
    assert_eq!(app.get_user(&a.id).await["following"], json!([]));
}

#[tokio::test]
async fn unfollow_without_follow_is_a_noop() {
    let app = spawn_app().await;
    let a = app.user("A", "a@example.com").await;
    let b = app.user("B", "b@example.com").await;

    for _ in 0..2 {
        let res = app
            .http
            .put(app.url(&format!("/api/users/unfollow/{}", b.id)))
            .bearer_auth(&a.token)
            .json(&json!({ "userId": a.id }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["message"], "User unfollowed successfully");
    }
    assert_eq!(app.get_user(&a.id).await["following"], json!([]));
    assert_eq!(app.get_user(&b.id).await["followers"], json!([]));
}

#[tokio::test]
async fn follow_requires_signin_and_a_follower() {
    let app = spawn_app().await;
    let a = app.user("A", "a@example.com").await;
    let b = app.user("B", "b@example.com").await;
    let path = app.url(&format!("/api/users/follow/{}", b.id));

    let res = app
        .http
        .put(&path)
        .json(&json!({ "userId": a.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .http
        .put(&path)
        .bearer_auth("garbage")
        .json(&json!({ "userId": a.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .http
        .put(&path)
        .bearer_auth(&a.token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(
        error_of(res).await,
        (StatusCode::BAD_REQUEST, "Could not follow user".to_string())
    );
}

#[tokio::test]
async fn malformed_follower_id_writes_nothing() {
    let app = spawn_app().await;
    let a = app.user("A", "a@example.com").await;
    let b = app.user("B", "b@example.com").await;

    for (action, message) in [
        ("follow", "Could not follow user"),
        ("unfollow", "Could not unfollow user"),
    ] {
        let res = app
            .http
            .put(app.url(&format!("/api/users/{}/{}", action, b.id)))
            .bearer_auth(&a.token)
            .json(&json!({ "userId": "not-an-id" }))
            .send()
            .await
            .unwrap();
        assert_eq!(
            error_of(res).await,
            (StatusCode::BAD_REQUEST, message.to_string())
        );
    }
    assert_eq!(app.get_user(&b.id).await["followers"], json!([]));
}

#[tokio::test]
async fn signin_errors() {
    let app = spawn_app().await;
    app.signup("Ana", "ana@example.com").await;

    let res = app
        .http
        .post(app.url("/auth/signin"))
        .json(&json!({ "email": "nobody@example.com", "password": "secret1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(
        error_of(res).await,
        (StatusCode::UNAUTHORIZED, "User not found".to_string())
    );

    let res = app
        .http
        .post(app.url("/auth/signin"))
        .json(&json!({ "email": "ana@example.com", "password": "wrong-one" }))
        .send()
        .await
        .unwrap();
    assert_eq!(
        error_of(res).await,
        (
            StatusCode::UNAUTHORIZED,
            "Email and password don't match.".to_string()
        )
    );

    let res = app.http.get(app.url("/auth/signout")).send().await.unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "signed out");
}

#[tokio::test]
async fn token_of_deleted_user_is_rejected() {
    let app = spawn_app().await;
    let a = app.user("A", "a@example.com").await;
    let b = app.user("B", "b@example.com").await;
    app.http
        .delete(app.url(&format!("/api/users/{}", a.id)))
        .send()
        .await
        .unwrap();

    let res = app
        .http
        .put(app.url(&format!("/api/users/follow/{}", b.id)))
        .bearer_auth(&a.token)
        .json(&json!({ "userId": a.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

fn profile_form(name: &str) -> Form {
    Form::new()
        .text("username", "ana_b")
        .text("name", name.to_string())
        .text("email", "ana@example.com")
        .text("bio", "Hi there")
        .part(
            "profilePic",
            Part::bytes(b"\x89PNG fake".to_vec()).file_name("me.png"),
        )
}

#[tokio::test]
async fn multipart_update_is_owner_only_and_stores_picture() {
    let app = spawn_app().await;
    let ana = app.user("Ana", "ana@example.com").await;
    let ben = app.user("Ben", "ben@example.com").await;
    let path = app.url(&format!("/api/users/update/{}", ana.id));

    let res = app
        .http
        .put(&path)
        .multipart(profile_form("Ana B"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .http
        .put(&path)
        .bearer_auth(&ben.token)
        .multipart(profile_form("Ana B"))
        .send()
        .await
        .unwrap();
    assert_eq!(
        error_of(res).await,
        (StatusCode::FORBIDDEN, "User is not authorized".to_string())
    );

    let res = app
        .http
        .put(&path)
        .bearer_auth(&ana.token)
        .multipart(profile_form("Ana B"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let user: Value = res.json().await.unwrap();
    assert_no_credentials(&user);
    assert_eq!(user["name"], "Ana B");
    assert_eq!(user["username"], "ana_b");
    assert_eq!(user["bio"], "Hi there");

    let pic = user["profilePic"].as_str().unwrap();
    assert!(pic.starts_with("/uploads/") && pic.ends_with(".png"));

    let res = app.http.get(app.url(pic)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "image/png");
    assert_eq!(res.bytes().await.unwrap().as_ref(), b"\x89PNG fake");
}

#[tokio::test]
async fn rejected_multipart_update_keeps_no_upload() {
    let app = spawn_app().await;
    let ana = app.user("Ana", "ana@example.com").await;

    let form = Form::new()
        .text("name", "Ana")
        .text("email", "broken")
        .part("profilePic", Part::bytes(b"png".to_vec()).file_name("me.png"));
    let res = app
        .http
        .put(app.url(&format!("/api/users/update/{}", ana.id)))
        .bearer_auth(&ana.token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(
        error_of(res).await,
        (
            StatusCode::BAD_REQUEST,
            "Please fill a valid email address".to_string()
        )
    );

    let uploads = app.state.config.uploads_path();
    let stored = std::fs::read_dir(&uploads).map(|dir| dir.count()).unwrap_or(0);
    assert_eq!(stored, 0);
    assert_eq!(app.get_user(&ana.id).await["profilePic"], "/default-profile.png");
}

#[tokio::test]
async fn uploads_refuse_traversal() {
    let app = spawn_app().await;
    let res = app
        .http
        .get(app.url("/uploads/..%2Ftest.db"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

async fn create_post(app: &common::TestApp, token: &str, content: &str) -> Value {
    let res = app
        .http
        .post(app.url("/api/posts"))
        .bearer_auth(token)
        .json(&json!({ "content": content, "photo": "/uploads/p.png" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.json().await.unwrap()
}

#[tokio::test]
async fn posts_lifecycle() {
    let app = spawn_app().await;
    let ana = app.user("Ana", "ana@example.com").await;
    let ben = app.user("Ben", "ben@example.com").await;

    let res = app
        .http
        .post(app.url("/api/posts"))
        .json(&json!({ "content": "hi", "photo": "/p.png" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .http
        .post(app.url("/api/posts"))
        .bearer_auth(&ana.token)
        .json(&json!({ "photo": "/p.png" }))
        .send()
        .await
        .unwrap();
    assert_eq!(
        error_of(res).await,
        (StatusCode::BAD_REQUEST, "Content is required".to_string())
    );

    let first = create_post(&app, &ana.token, "first").await;
    let second = create_post(&app, &ana.token, "second").await;
    assert_eq!(first["user"], ana.id.as_str());
    assert_eq!(first["likes"], json!([]));

    let all: Value = app
        .http
        .get(app.url("/api/posts"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all[0]["_id"], second["_id"]);
    assert_eq!(all[1]["_id"], first["_id"]);

    let by_ben: Value = app
        .http
        .get(app.url(&format!("/api/posts/by/{}", ben.id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(by_ben, json!([]));

    let post_path = app.url(&format!("/api/posts/{}", first["_id"].as_str().unwrap()));

    let res = app
        .http
        .put(&post_path)
        .bearer_auth(&ben.token)
        .json(&json!({ "content": "hijack" }))
        .send()
        .await
        .unwrap();
    assert_eq!(
        error_of(res).await,
        (StatusCode::FORBIDDEN, "User is not authorized".to_string())
    );

    let res = app
        .http
        .put(&post_path)
        .bearer_auth(&ana.token)
        .json(&json!({ "content": "edited" }))
        .send()
        .await
        .unwrap();
    let edited: Value = res.json().await.unwrap();
    assert_eq!(edited["content"], "edited");

    let res = app
        .http
        .put(format!("{}/like", post_path))
        .bearer_auth(&ben.token)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "likes": [ben.id] }));

    let res = app
        .http
        .put(format!("{}/comment", post_path))
        .bearer_auth(&ben.token)
        .json(&json!({ "commentId": "c-1" }))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "comments": ["c-1"] }));

    let res = app
        .http
        .put(format!("{}/uncomment", post_path))
        .bearer_auth(&ben.token)
        .json(&json!({ "commentId": "c-1" }))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "comments": [] }));

    let res = app
        .http
        .delete(&post_path)
        .bearer_auth(&ana.token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app.http.get(&post_path).send().await.unwrap();
    assert_eq!(
        error_of(res).await,
        (StatusCode::BAD_REQUEST, "Post not found".to_string())
    );
}
