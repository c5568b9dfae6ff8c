use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRef;
use sqlx::{migrate::Migrator, postgres::PgPoolOptions, PgPool};

use crate::auth::jwt::TokenAuthority;
use crate::auth::repo::{CredentialRepo, PgCredentialRepo};
use crate::auth::services::CredentialStore;
use crate::auth::session::SessionProtocol;
use crate::config::{AppConfig, ReportConfig};
use crate::reports::repo::{PgReportRepo, ReportRepo};

static AUTH_MIGRATIONS: Migrator = sqlx::migrate!("./migrations/auth");
static REPORT_MIGRATIONS: Migrator = sqlx::migrate!("./migrations/reports");

async fn connect(url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .context("connect to database")
}

async fn migrate(migrator: &Migrator, db: &PgPool) {
    if let Err(e) = migrator.run(db).await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }
}

/// Auth service state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub session: SessionProtocol,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = connect(&config.database_url, config.max_connections).await?;
        migrate(&AUTH_MIGRATIONS, &db).await;
        let repo = Arc::new(PgCredentialRepo::new(db)) as Arc<dyn CredentialRepo>;
        Ok(Self::from_parts(config, repo))
    }

    pub fn from_parts(config: Arc<AppConfig>, repo: Arc<dyn CredentialRepo>) -> Self {
        let tokens = Arc::new(TokenAuthority::new(&config.jwt));
        let session = SessionProtocol::new(CredentialStore::new(repo), tokens);
        Self { config, session }
    }
}

impl FromRef<AppState> for SessionProtocol {
    fn from_ref(state: &AppState) -> Self {
        state.session.clone()
    }
}

/// Report service state. `session` reads the credential database and can
/// only verify access tokens.
#[derive(Clone)]
pub struct ReportState {
    pub session: SessionProtocol,
    pub reports: Arc<dyn ReportRepo>,
}

impl ReportState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = ReportConfig::from_env()?;
        let db = connect(&config.database_url, config.max_connections).await?;
        migrate(&REPORT_MIGRATIONS, &db).await;
        let auth_db = connect(&config.auth_database_url, config.max_connections)
            .await
            .context("connect to credential database")?;

        let credentials = Arc::new(PgCredentialRepo::new(auth_db)) as Arc<dyn CredentialRepo>;
        let reports = Arc::new(PgReportRepo::new(db)) as Arc<dyn ReportRepo>;
        Ok(Self::from_parts(&config.access_secret, credentials, reports))
    }

    pub fn from_parts(
        access_secret: &str,
        credentials: Arc<dyn CredentialRepo>,
        reports: Arc<dyn ReportRepo>,
    ) -> Self {
        let tokens = Arc::new(TokenAuthority::access_only(access_secret));
        Self {
            session: SessionProtocol::new(CredentialStore::new(credentials), tokens),
            reports,
        }
    }
}

impl FromRef<ReportState> for SessionProtocol {
    fn from_ref(state: &ReportState) -> Self {
        state.session.clone()
    }
}
