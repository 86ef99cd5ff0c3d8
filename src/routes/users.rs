//! Account endpoints: registration, login, and the caller's own profile.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::auth::{hash_password, issue_token, verify_password, AuthUser};
use crate::domain::{NewUser, ProfilePatch, UserProfile};
use crate::error::AppError;
use crate::protocol::{ApiJson, AuthOut, Envelope, LoginIn, ProfileUpdateIn, RegisterIn};
use crate::state::AppState;
use crate::util::non_blank;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/profile", get(get_profile).put(update_profile))
        .route("/account", delete(delete_account))
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid credentials".to_string())
}

#[instrument(level = "info", skip(state, body), fields(username = ?body.username))]
async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<RegisterIn>,
) -> Result<(StatusCode, Json<Envelope<AuthOut>>), AppError> {
    let (Some(username), Some(email), Some(password)) = (
        non_blank(body.username.as_deref()),
        non_blank(body.email.as_deref()),
        body.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::Validation("Missing required fields".to_string()));
    };

    if state.users.is_taken(Some(&username), Some(&email), None).await? {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let password_hash = hash_password(&password, state.auth.bcrypt_cost).await?;
    let user = state.users.create(NewUser { username, email, password_hash }).await?;
    let token = issue_token(&user.id, &state.auth)?;

    info!(user_id = %user.id, "User registered");
    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(AuthOut { user: UserProfile::from(&user), token })),
    ))
}

#[instrument(level = "info", skip(state, body))]
async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<LoginIn>,
) -> Result<Json<Envelope<AuthOut>>, AppError> {
    let (Some(email), Some(password)) = (
        non_blank(body.email.as_deref()),
        body.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::Validation("Missing required fields".to_string()));
    };

    // unknown email and wrong password must be indistinguishable
    let user = state.users.find_by_email(&email).await?.ok_or_else(invalid_credentials)?;
    if !verify_password(&password, &user.password_hash).await? {
        return Err(invalid_credentials());
    }

    let token = issue_token(&user.id, &state.auth)?;
    info!(user_id = %user.id, "User logged in");
    Ok(Json(Envelope::ok(AuthOut { user: UserProfile::from(&user), token })))
}

#[instrument(level = "info", skip(state), fields(user_id = %caller.user_id))]
async fn get_profile(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
) -> Result<Json<Envelope<UserProfile>>, AppError> {
    let user = state
        .users
        .find_by_id(&caller.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(Envelope::ok(UserProfile::from(&user))))
}

#[instrument(level = "info", skip(state, body), fields(user_id = %caller.user_id))]
async fn update_profile(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    ApiJson(body): ApiJson<ProfileUpdateIn>,
) -> Result<Json<Envelope<()>>, AppError> {
    let patch = ProfilePatch {
        username: non_blank(body.username.as_deref()),
        email: non_blank(body.email.as_deref()),
    };
    if patch.is_empty() {
        return Err(AppError::Validation("No fields to update".to_string()));
    }

    if state
        .users
        .is_taken(patch.username.as_deref(), patch.email.as_deref(), Some(&caller.user_id))
        .await?
    {
        return Err(AppError::Conflict("Username or email already in use".to_string()));
    }

    state.users.update_profile(&caller.user_id, &patch).await?;
    Ok(Json(Envelope::message("Profile updated successfully")))
}

#[instrument(level = "info", skip(state), fields(user_id = %caller.user_id))]
async fn delete_account(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
) -> Result<Json<Envelope<()>>, AppError> {
    state.users.delete(&caller.user_id).await?;
    info!("Account deleted");
    Ok(Json(Envelope::message("Account deleted successfully")))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use crate::auth::{verify_token, Claims};
    use crate::db::UserRepository;
    use crate::test_utils::{test_auth_settings, TestApp};

    use super::*;

    #[tokio::test]
    async fn register_then_login_issue_valid_tokens() {
        let app = TestApp::new().await;
        let registered = app.register("alice", "alice@example.com", "hunter22").await;
        assert_eq!(registered.user.username, "alice");

        let res = app
            .server
            .post("/api/users/login")
            .json(&json!({ "email": "alice@example.com", "password": "hunter22" }))
            .await;
        res.assert_status_ok();
        let body: Envelope<AuthOut> = res.json();
        let out = body.data.unwrap();
        assert_eq!(out.user.id, registered.user.id);

        let claims: Claims = verify_token(&out.token, &test_auth_settings()).unwrap();
        assert_eq!(claims.user_id, registered.user.id);
        assert!(claims.exp - chrono::Utc::now().timestamp() <= 7 * 24 * 60 * 60);
    }

    #[tokio::test]
    async fn register_response_never_contains_the_hash() {
        let app = TestApp::new().await;
        let res = app
            .server
            .post("/api/users/register")
            .json(&json!({ "username": "bob", "email": "bob@example.com", "password": "pw" }))
            .await;
        res.assert_status(StatusCode::CREATED);
        assert!(!res.text().contains("password"));
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected_without_new_row() {
        let app = TestApp::new().await;
        app.register("alice", "alice@example.com", "pw").await;

        for body in [
            json!({ "username": "other", "email": "alice@example.com", "password": "pw" }),
            json!({ "username": "alice", "email": "other@example.com", "password": "pw" }),
        ] {
            let res = app.server.post("/api/users/register").json(&body).await;
            res.assert_status(StatusCode::BAD_REQUEST);
            let env: Envelope<Value> = res.json();
            assert_eq!(env.error.as_deref(), Some("User already exists"));
        }

        assert!(app.state.users.find_by_email("other@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn register_requires_all_fields() {
        let app = TestApp::new().await;
        let res = app
            .server
            .post("/api/users/register")
            .json(&json!({ "username": "alice", "email": "  " }))
            .await;
        res.assert_status(StatusCode::BAD_REQUEST);
        let env: Envelope<Value> = res.json();
        assert_eq!(env.error.as_deref(), Some("Missing required fields"));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let app = TestApp::new().await;
        app.register("alice", "alice@example.com", "right").await;

        let wrong = app
            .server
            .post("/api/users/login")
            .json(&json!({ "email": "alice@example.com", "password": "wrong" }))
            .await;
        let unknown = app
            .server
            .post("/api/users/login")
            .json(&json!({ "email": "nobody@example.com", "password": "right" }))
            .await;

        wrong.assert_status(StatusCode::UNAUTHORIZED);
        unknown.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.text(), unknown.text());
    }

    #[tokio::test]
    async fn profile_requires_a_valid_token() {
        let app = TestApp::new().await;

        app.server.get("/api/users/profile").await.assert_status(StatusCode::UNAUTHORIZED);
        app.server
            .get("/api/users/profile")
            .authorization_bearer("not-a-jwt")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        let mut expired = test_auth_settings();
        expired.token_ttl = chrono::Duration::hours(-2);
        let token = issue_token("someone", &expired).unwrap();
        app.server
            .delete("/api/users/account")
            .authorization_bearer(token)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn profile_round_trip() {
        let app = TestApp::new().await;
        let me = app.register("alice", "alice@example.com", "pw").await;

        let res = app.server.get("/api/users/profile").authorization_bearer(&me.token).await;
        res.assert_status_ok();
        let env: Envelope<UserProfile> = res.json();
        assert_eq!(env.data.unwrap(), me.user);

        let res = app
            .server
            .put("/api/users/profile")
            .authorization_bearer(&me.token)
            .json(&json!({ "username": "alicia" }))
            .await;
        res.assert_status_ok();
        let env: Envelope<Value> = res.json();
        assert_eq!(env.message.as_deref(), Some("Profile updated successfully"));

        let stored = app.state.users.find_by_id(&me.user.id).await.unwrap().unwrap();
        assert_eq!(stored.username, "alicia");
        assert_eq!(stored.email, "alice@example.com");
    }

    #[tokio::test]
    async fn profile_update_rejects_empty_and_taken_fields() {
        let app = TestApp::new().await;
        let me = app.register("alice", "alice@example.com", "pw").await;
        app.register("bob", "bob@example.com", "pw").await;

        let res = app.server.put("/api/users/profile").authorization_bearer(&me.token).json(&json!({})).await;
        res.assert_status(StatusCode::BAD_REQUEST);
        let env: Envelope<Value> = res.json();
        assert_eq!(env.error.as_deref(), Some("No fields to update"));

        let res = app
            .server
            .put("/api/users/profile")
            .authorization_bearer(&me.token)
            .json(&json!({ "email": "bob@example.com" }))
            .await;
        res.assert_status(StatusCode::BAD_REQUEST);

        // keeping your own username is not a conflict
        app.server
            .put("/api/users/profile")
            .authorization_bearer(&me.token)
            .json(&json!({ "username": "alice" }))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn delete_account_then_profile_is_gone() {
        let app = TestApp::new().await;
        let me = app.register("alice", "alice@example.com", "pw").await;

        let res = app.server.delete("/api/users/account").authorization_bearer(&me.token).await;
        res.assert_status_ok();
        let env: Envelope<Value> = res.json();
        assert_eq!(env.message.as_deref(), Some("Account deleted successfully"));

        app.server
            .get("/api/users/profile")
            .authorization_bearer(&me.token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
        app.server
            .delete("/api/users/account")
            .authorization_bearer(&me.token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
