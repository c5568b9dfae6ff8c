use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            LoginRequest, LoginResponse, MessageResponse, PublicUser, RefreshRequest,
            RefreshResponse, RegisterRequest, RegisterResponse, VerifyPasswordRequest,
            VerifyPasswordResponse, VerifyResponse,
        },
        extractors::AuthUser,
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/verify", get(verify))
        .route("/auth/verify-password", post(verify_password))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let Json(payload) = payload?;
    let user = state
        .session
        .register(
            payload.nik.trim(),
            payload.nama.trim(),
            &payload.email.trim().to_lowercase(),
            &payload.password,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully",
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(payload) = payload?;
    let out = state
        .session
        .login(payload.nik.trim(), &payload.password)
        .await?;

    Ok(Json(LoginResponse {
        message: "Login successful",
        access_token: out.access_token,
        refresh_token: out.refresh_token,
        user: out.user.into(),
    }))
}

#[instrument(skip_all)]
pub async fn verify(AuthUser { user, .. }: AuthUser) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        valid: true,
        user: PublicUser::from(user),
    })
}

#[instrument(skip_all)]
pub async fn verify_password(
    State(state): State<AppState>,
    AuthUser { ctx, .. }: AuthUser,
    payload: Result<Json<VerifyPasswordRequest>, JsonRejection>,
) -> Result<Json<VerifyPasswordResponse>, AppError> {
    let Json(payload) = payload?;
    state.session.verify_password(&ctx, &payload.password).await?;
    Ok(Json(VerifyPasswordResponse {
        valid: true,
        message: "Password verified successfully",
    }))
}

#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>, AppError> {
    let Json(payload) = payload?;
    let out = state.session.refresh(&payload.refresh_token).await?;
    Ok(Json(RefreshResponse {
        access_token: out.access_token,
        user: out.user.into(),
    }))
}

#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(payload) = payload?;
    state.session.logout(&payload.refresh_token).await?;
    Ok(Json(MessageResponse {
        message: "Logout successful",
    }))
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::app::build_auth_app;
    use crate::auth::repo::memory::MemoryCredentialRepo;
    use crate::config::{AppConfig, JwtConfig};
    use crate::state::AppState;

    const NIK: &str = "1234567890123456";

    fn test_app() -> Router {
        let config = Arc::new(AppConfig {
            database_url: "postgres://unused".into(),
            max_connections: 1,
            jwt: JwtConfig {
                access_secret: "access-secret".into(),
                refresh_secret: "refresh-secret".into(),
                access_ttl: Duration::from_secs(900),
                refresh_ttl: Duration::from_secs(7 * 86400),
            },
        });
        let repo = Arc::new(MemoryCredentialRepo::default());
        build_auth_app(AppState::from_parts(config, repo))
    }

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_bearer(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn register_and_login(app: &Router) -> Value {
        let (status, _) = call(
            app,
            post_json(
                "/auth/register",
                json!({"nik": NIK, "nama": "Budi", "email": "budi@example.com", "password": "rahasia123"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = call(
            app,
            post_json("/auth/login", json!({"nik": NIK, "password": "rahasia123"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    #[tokio::test]
    async fn register_returns_created_user() {
        let app = test_app();
        let (status, body) = call(
            &app,
            post_json(
                "/auth/register",
                json!({"nik": NIK, "nama": "Budi", "email": "budi@example.com", "password": "rahasia123"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "User registered successfully");
        assert_eq!(body["user"]["nik"], NIK);
        assert_eq!(body["user"]["role"], "warga");
        assert!(body["user"]["created_at"].is_string());
        assert!(body["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn register_validation_and_conflict() {
        let app = test_app();
        let (status, _) = call(
            &app,
            post_json(
                "/auth/register",
                json!({"nik": "123", "nama": "Budi", "email": "budi@example.com", "password": "x"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &app,
            post_json("/auth/register", json!({"nik": NIK, "password": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        register_and_login(&app).await;
        let (status, body) = call(
            &app,
            post_json(
                "/auth/register",
                json!({"nik": NIK, "nama": "Lain", "email": "lain@example.com", "password": "x"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "NIK or email already exists");
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let app = test_app();
        let req = Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid request body");
    }

    #[tokio::test]
    async fn login_failures_share_one_response() {
        let app = test_app();
        register_and_login(&app).await;
        let wrong = call(
            &app,
            post_json("/auth/login", json!({"nik": NIK, "password": "salah"})),
        )
        .await;
        let unknown = call(
            &app,
            post_json(
                "/auth/login",
                json!({"nik": "6543210987654321", "password": "rahasia123"}),
            ),
        )
        .await;
        assert_eq!(wrong.0, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong, unknown);
        assert_eq!(wrong.1["error"], "Invalid credentials");
    }

    #[tokio::test]
    async fn full_session_lifecycle() {
        let app = test_app();
        let login = register_and_login(&app).await;
        assert_eq!(login["message"], "Login successful");
        assert_eq!(login["user"]["role"], "warga");
        let access = login["accessToken"].as_str().unwrap().to_string();
        let refresh = login["refreshToken"].as_str().unwrap().to_string();

        let (status, body) = call(&app, get_bearer("/auth/verify", &access)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);
        assert_eq!(body["user"]["nik"], NIK);

        let (status, body) = call(
            &app,
            post_json("/auth/refresh", json!({"refreshToken": refresh})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["accessToken"].is_string());
        assert_eq!(body["user"]["nik"], NIK);

        let (status, body) = call(
            &app,
            post_json("/auth/logout", json!({"refreshToken": refresh})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Logout successful");

        let (status, _) = call(
            &app,
            post_json("/auth/refresh", json!({"refreshToken": refresh})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // logout again is still fine
        let (status, _) = call(
            &app,
            post_json("/auth/logout", json!({"refreshToken": refresh})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn tampered_access_token_is_rejected() {
        let app = test_app();
        let login = register_and_login(&app).await;
        let access = login["accessToken"].as_str().unwrap();

        // flip the first character of the signature segment
        let sig_start = access.rfind('.').unwrap() + 1;
        let mut bytes = access.as_bytes().to_vec();
        bytes[sig_start] = if bytes[sig_start] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        let (status, body) = call(&app, get_bearer("/auth/verify", &tampered)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid token");
    }

    #[tokio::test]
    async fn verify_requires_bearer_token() {
        let app = test_app();
        let req = Request::builder().uri("/auth/verify").body(Body::empty()).unwrap();
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "No token provided");
    }

    #[tokio::test]
    async fn refresh_rejects_access_token() {
        let app = test_app();
        let login = register_and_login(&app).await;
        let (status, _) = call(
            &app,
            post_json("/auth/refresh", json!({"refreshToken": login["accessToken"]})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let refresh = login["refreshToken"].as_str().unwrap();
        let (status, _) = call(&app, get_bearer("/auth/verify", refresh)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn verify_password_endpoint() {
        let app = test_app();
        let login = register_and_login(&app).await;
        let access = login["accessToken"].as_str().unwrap();

        let req = |password: &str| {
            Request::builder()
                .method("POST")
                .uri("/auth/verify-password")
                .header(header::AUTHORIZATION, format!("Bearer {access}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "password": password }).to_string()))
                .unwrap()
        };

        let (status, body) = call(&app, req("rahasia123")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);
        assert_eq!(body["message"], "Password verified successfully");

        let (status, _) = call(&app, req("salah")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let app = test_app();
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "healthy"}));
    }
}
