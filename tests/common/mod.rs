#![allow(dead_code)]

use reqwest::StatusCode;
use serde_json::{json, Value};
use tempfile::TempDir;

use social::config::Config;
use social::db;
use social::routes;
use social::state::AppState;

pub struct TestApp {
    pub base_url: String,
    pub http: reqwest::Client,
    pub state: AppState,
    _dir: TempDir,
}

/// Serves the full router on an ephemeral port backed by a temporary database.
pub async fn spawn_app() -> TestApp {
    let dir = TempDir::new().unwrap();

    let mut config = Config::default();
    config.database.path = Some(dir.path().join("test.db"));
    config.storage.path = Some(dir.path().join("uploads"));
    config.auth.jwt_secret = Some("test-secret".to_string());
    config.auth.bcrypt_cost = 4;

    let pool = db::create_pool(&config.db_path()).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");

    let state = AppState { db: pool, config };
    let app = routes::app(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        base_url: format!("http://{}", addr),
        http: reqwest::Client::new(),
        state,
        _dir: dir,
    }
}

pub struct SignedIn {
    pub id: String,
    pub token: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn signup(&self, name: &str, email: &str) -> reqwest::Response {
        self.http
            .post(self.url("/api/users"))
            .json(&json!({ "name": name, "email": email, "password": "secret1" }))
            .send()
            .await
            .unwrap()
    }

    /// Signs a fresh user up and in.
    pub async fn user(&self, name: &str, email: &str) -> SignedIn {
        let res = self.signup(name, email).await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = self
            .http
            .post(self.url("/auth/signin"))
            .json(&json!({ "email": email, "password": "secret1" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        SignedIn {
            id: body["user"]["_id"].as_str().unwrap().to_string(),
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    pub async fn get_user(&self, id: &str) -> Value {
        let res = self
            .http
            .get(self.url(&format!("/api/users/{}", id)))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        res.json().await.unwrap()
    }
}

pub fn assert_no_credentials(value: &Value) {
    let text = value.to_string();
    assert!(!text.contains("hashed_password"), "leaked hash: {}", text);
    assert!(!text.contains("\"salt\""), "leaked salt: {}", text);
}

pub async fn error_of(res: reqwest::Response) -> (StatusCode, String) {
    let status = res.status();
    let body: Value = res.json().await.unwrap();
    let message = body["error"].as_str().unwrap_or_default().to_string();
    (status, message)
}
