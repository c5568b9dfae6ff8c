use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    reports::{
        dto::{
            CreateReportRequest, CreatedReport, MyReport, MyReportsQuery, PublicPage,
            PublicQuery, PublicReport,
        },
        services::{self, PageRequest},
    },
    state::ReportState,
};

pub fn read_routes() -> Router<ReportState> {
    Router::new()
        .route("/laporan/public", get(list_public))
        .route("/laporan/my", get(list_mine))
}

pub fn write_routes() -> Router<ReportState> {
    Router::new().route("/laporan", post(create_report))
}

#[instrument(skip_all)]
pub async fn create_report(
    State(state): State<ReportState>,
    AuthUser { ctx, .. }: AuthUser,
    payload: Result<Json<CreateReportRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedReport>), AppError> {
    let Json(payload) = payload?;
    let report = services::create_report(state.reports.as_ref(), &ctx, &payload).await?;
    Ok((StatusCode::CREATED, Json(report.into())))
}

#[instrument(skip(state))]
pub async fn list_public(
    State(state): State<ReportState>,
    Query(q): Query<PublicQuery>,
) -> Result<Json<PublicPage>, AppError> {
    let page = PageRequest::resolve(&q);
    let (rows, total) = services::list_public(state.reports.as_ref(), page).await?;
    Ok(Json(PublicPage {
        data: rows.into_iter().map(PublicReport::from).collect(),
        page: page.page,
        limit: page.limit,
        total_items: total,
        total_pages: page.total_pages(total),
    }))
}

#[instrument(skip_all)]
pub async fn list_mine(
    State(state): State<ReportState>,
    AuthUser { ctx, .. }: AuthUser,
    Query(q): Query<MyReportsQuery>,
) -> Result<Json<Vec<MyReport>>, AppError> {
    let filter = services::owner_filter(&ctx, &q)?;
    let rows = services::list_mine(state.reports.as_ref(), filter).await?;
    Ok(Json(rows.into_iter().map(MyReport::from).collect()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::app::build_report_app;
    use crate::auth::jwt::TokenAuthority;
    use crate::auth::repo::{memory::MemoryCredentialRepo, CredentialRepo};
    use crate::auth::repo_types::NewUser;
    use crate::reports::repo::memory::MemoryReportRepo;
    use crate::state::ReportState;

    const SECRET: &str = "access-secret";
    const NIK: &str = "1234567890123456";

    struct Harness {
        app: Router,
        credentials: Arc<MemoryCredentialRepo>,
        reports: Arc<MemoryReportRepo>,
        token: String,
    }

    async fn harness() -> Harness {
        let credentials = Arc::new(MemoryCredentialRepo::default());
        let reports = Arc::new(MemoryReportRepo::default());
        let user = credentials
            .insert_user(NewUser {
                nik: NIK,
                nama: "Budi",
                email: "budi@example.com",
                password_hash: "unused",
            })
            .await
            .unwrap();
        let token = TokenAuthority::access_only(SECRET)
            .issue_access_token(user.id, &user.nik, &user.nama)
            .unwrap();
        let app = build_report_app(ReportState::from_parts(
            SECRET,
            credentials.clone(),
            reports.clone(),
        ));
        Harness {
            app,
            credentials,
            reports,
            token,
        }
    }

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    fn create(token: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/laporan")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut req = Request::builder().uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        req.body(Body::empty()).unwrap()
    }

    fn report(tipe: &str) -> Value {
        json!({
            "title": "Sampah menumpuk",
            "description": "Di depan pasar",
            "tipe": tipe,
            "divisi": "kebersihan"
        })
    }

    #[tokio::test]
    async fn creates_attributed_report() {
        let h = harness().await;
        let (status, body) = call(&h.app, create(&h.token, report("publik"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "pending");
        assert_eq!(body["tipe"], "publik");
        assert_eq!(body["divisi"], "kebersihan");
        assert!(body.get("user_nik").is_none());
        assert_eq!(h.reports.all()[0].user_nik, NIK);
    }

    #[tokio::test]
    async fn anonymous_report_needs_hash() {
        let h = harness().await;
        let (status, _) = call(&h.app, create(&h.token, report("anonim"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(h.reports.all().is_empty());

        let mut body = report("anonim");
        body["userNikHash"] = json!("c0ffee");
        let (status, _) = call(&h.app, create(&h.token, body)).await;
        assert_eq!(status, StatusCode::CREATED);
        let stored = h.reports.all();
        assert_eq!(stored[0].user_nik, "c0ffee");
        assert_ne!(stored[0].user_nik, NIK);
    }

    #[tokio::test]
    async fn rejects_bad_categories_and_missing_fields() {
        let h = harness().await;
        let mut body = report("rahasia");
        let (status, body_out) = call(&h.app, create(&h.token, body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body_out["error"], "Tipe must be one of: publik, private, anonim");

        body["tipe"] = json!("private");
        body["divisi"] = json!("pajak");
        let (status, _) = call(&h.app, create(&h.token, body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        body["divisi"] = json!("fasilitas umum");
        body["title"] = json!("  ");
        let (status, body_out) = call(&h.app, create(&h.token, body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body_out["error"], "Title and description are required");
    }

    #[tokio::test]
    async fn create_requires_token() {
        let h = harness().await;
        let req = Request::builder()
            .method("POST")
            .uri("/laporan")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(report("publik").to_string()))
            .unwrap();
        let (status, body) = call(&h.app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "No token provided");
    }

    #[tokio::test]
    async fn foreign_role_is_forbidden() {
        let h = harness().await;
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        let claims = json!({
            "userId": 1, "nik": NIK, "nama": "Budi", "role": "admin",
            "iat": now, "exp": now + 600, "kind": "access"
        });
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        let (status, body) = call(&h.app, create(&token, report("publik"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Access denied. Warga only.");
    }

    #[tokio::test]
    async fn deleted_user_cannot_file_reports() {
        let h = harness().await;
        h.credentials.delete_user(1);
        let (status, _) = call(&h.app, create(&h.token, report("publik"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(h.reports.all().is_empty());
    }

    #[tokio::test]
    async fn token_from_other_secret_is_rejected() {
        let h = harness().await;
        let token = TokenAuthority::access_only("some-other-secret")
            .issue_access_token(1, NIK, "Budi")
            .unwrap();
        let (status, body) = call(&h.app, create(&token, report("publik"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid token");
    }

    #[tokio::test]
    async fn public_board_pages_only_public_reports() {
        let h = harness().await;
        for _ in 0..3 {
            call(&h.app, create(&h.token, report("publik"))).await;
        }
        call(&h.app, create(&h.token, report("private"))).await;

        let (status, body) = call(&h.app, get("/laporan/public?page=2&limit=2", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["page"], 2);
        assert_eq!(body["limit"], 2);
        assert_eq!(body["totalItems"], 3);
        assert_eq!(body["totalPages"], 2);
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["id"], 1);
        assert!(data[0].get("user_nik").is_none());

        let (_, body) = call(&h.app, get("/laporan/public?limit=500", None)).await;
        assert_eq!(body["limit"], 10);
        // newest first
        assert_eq!(body["data"][0]["id"], 3);
    }

    #[tokio::test]
    async fn my_reports_by_filter() {
        let h = harness().await;
        call(&h.app, create(&h.token, report("publik"))).await;
        call(&h.app, create(&h.token, report("private"))).await;
        let mut anon = report("anonim");
        anon["userNikHash"] = json!("c0ffee");
        call(&h.app, create(&h.token, anon)).await;

        let (status, body) = call(&h.app, get("/laporan/my", Some(&h.token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (_, body) = call(
            &h.app,
            get("/laporan/my?filter=hash&user_hash=c0ffee", Some(&h.token)),
        )
        .await;
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["tipe"], "anonim");

        let (_, body) = call(
            &h.app,
            get("/laporan/my?filter=all&user_hash=c0ffee", Some(&h.token)),
        )
        .await;
        assert_eq!(body.as_array().unwrap().len(), 3);

        let (status, _) = call(&h.app, get("/laporan/my?filter=hash", Some(&h.token))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&h.app, get("/laporan/my", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
