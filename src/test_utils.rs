//! Test harness: the real router over an in-memory SQLite pool and a
//! scripted model.

use std::sync::Arc;

use axum_test::TestServer;
use serde_json::json;
use sqlx::SqlitePool;

use crate::config::{AuthSettings, Prompts};
use crate::db::testing::memory_pool;
use crate::openai::testing::ScriptedModel;
use crate::protocol::{AuthOut, Envelope};
use crate::routes::build_router;
use crate::state::AppState;

pub const TEST_JWT_SECRET: &str = "test-secret-key-for-jwt";

pub fn test_auth_settings() -> AuthSettings {
    AuthSettings {
        jwt_secret: TEST_JWT_SECRET.to_string(),
        token_ttl: chrono::Duration::days(7),
        bcrypt_cost: 4,
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub model: Arc<ScriptedModel>,
    pub state: Arc<AppState>,
    pub pool: SqlitePool,
}

impl TestApp {
    pub async fn new() -> Self {
        let model = Arc::new(ScriptedModel::new());
        let pool = memory_pool().await;
        let state = Arc::new(AppState::new(
            pool.clone(),
            model.clone(),
            "gpt-4".to_string(),
            Prompts::default(),
            test_auth_settings(),
        ));
        let server = TestServer::new(build_router(state.clone())).expect("Failed to create test server");
        Self { server, model, state, pool }
    }

    /// Register through the API and return the `{user, token}` payload.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> AuthOut {
        let res = self
            .server
            .post("/api/users/register")
            .json(&json!({ "username": username, "email": email, "password": password }))
            .await;
        res.assert_status(axum::http::StatusCode::CREATED);
        let body: Envelope<AuthOut> = res.json();
        body.data.expect("register response carries data")
    }
}
