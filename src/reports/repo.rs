use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::repo::RepoError;
use crate::reports::repo_types::{NewReport, OwnerFilter, Report, INITIAL_STATUS};

/// Access to the report database.
#[async_trait]
pub trait ReportRepo: Send + Sync {
    async fn insert_report(&self, report: NewReport<'_>) -> Result<Report, RepoError>;
    async fn count_public(&self) -> Result<i64, RepoError>;
    /// Publik reports, newest first.
    async fn list_public(&self, limit: i64, offset: i64) -> Result<Vec<Report>, RepoError>;
    /// Reports matching `filter`, newest first.
    async fn list_by_owner(&self, filter: OwnerFilter<'_>) -> Result<Vec<Report>, RepoError>;
}

#[derive(Clone)]
pub struct PgReportRepo {
    db: PgPool,
}

impl PgReportRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReportRepo for PgReportRepo {
    async fn insert_report(&self, report: NewReport<'_>) -> Result<Report, RepoError> {
        let row = sqlx::query_as::<_, Report>(
            r#"
            INSERT INTO laporan (title, description, tipe, divisi, user_nik, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, title, description, tipe, divisi, user_nik, status, created_at, updated_at
            "#,
        )
        .bind(report.title)
        .bind(report.description)
        .bind(report.tipe.as_str())
        .bind(report.divisi.as_str())
        .bind(report.owner)
        .bind(INITIAL_STATUS)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn count_public(&self) -> Result<i64, RepoError> {
        let (count,): (i64,) =
            sqlx::query_as(r#"SELECT COUNT(*) FROM laporan WHERE tipe = 'publik'"#)
                .fetch_one(&self.db)
                .await?;
        Ok(count)
    }

    async fn list_public(&self, limit: i64, offset: i64) -> Result<Vec<Report>, RepoError> {
        let rows = sqlx::query_as::<_, Report>(
            r#"
            SELECT id, title, description, tipe, divisi, user_nik, status, created_at, updated_at
            FROM laporan
            WHERE tipe = 'publik'
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn list_by_owner(&self, filter: OwnerFilter<'_>) -> Result<Vec<Report>, RepoError> {
        // NULL binds never compare equal, so a missing identifier matches no rows.
        let rows = sqlx::query_as::<_, Report>(
            r#"
            SELECT id, title, description, tipe, divisi, user_nik, status, created_at, updated_at
            FROM laporan
            WHERE (user_nik = $1 AND tipe IN ('publik', 'private'))
               OR (user_nik = $2 AND tipe = 'anonim')
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.nik)
        .bind(filter.hash)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
