use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::reports::repo_types::Report;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tipe: String,
    #[serde(default)]
    pub divisi: String,
    /// Client-computed identifier, required for anonim reports.
    #[serde(default)]
    pub user_nik_hash: Option<String>,
}

/// Raw query for `/laporan/public`. Values that do not parse fall back to the
/// defaults instead of failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct PublicQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MyReportsQuery {
    pub filter: Option<String>,
    pub user_hash: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedReport {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub tipe: String,
    pub divisi: String,
    pub status: String,
}

impl From<Report> for CreatedReport {
    fn from(r: Report) -> Self {
        Self {
            id: r.id,
            title: r.title,
            description: r.description,
            tipe: r.tipe,
            divisi: r.divisi,
            status: r.status,
        }
    }
}

/// Report as shown on the public board. The filer's identifier is left out.
#[derive(Debug, Serialize)]
pub struct PublicReport {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub divisi: String,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Report> for PublicReport {
    fn from(r: Report) -> Self {
        Self {
            id: r.id,
            title: r.title,
            description: r.description,
            divisi: r.divisi,
            status: r.status,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPage {
    pub data: Vec<PublicReport>,
    pub page: i64,
    pub limit: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

/// Report as shown to the caller who filed it.
#[derive(Debug, Serialize)]
pub struct MyReport {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub tipe: String,
    pub divisi: String,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Report> for MyReport {
    fn from(r: Report) -> Self {
        Self {
            id: r.id,
            title: r.title,
            description: r.description,
            tipe: r.tipe,
            divisi: r.divisi,
            status: r.status,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
