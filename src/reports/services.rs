use tracing::info;

use crate::auth::session::AuthContext;
use crate::error::AppError;
use crate::reports::dto::{CreateReportRequest, MyReportsQuery, PublicQuery};
use crate::reports::repo::ReportRepo;
use crate::reports::repo_types::{Division, NewReport, OwnerFilter, Report, ReportKind};

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

/// Resolved pagination for the public board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// Out-of-range or unparseable values fall back to the defaults.
    pub fn resolve(q: &PublicQuery) -> Self {
        let page = q
            .page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(DEFAULT_PAGE);
        let limit = q
            .limit
            .as_deref()
            .and_then(|l| l.trim().parse::<i64>().ok())
            .filter(|l| (1..=MAX_LIMIT).contains(l))
            .unwrap_or(DEFAULT_LIMIT);
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total_items: i64) -> i64 {
        (total_items + self.limit - 1) / self.limit
    }
}

fn storage(err: impl std::fmt::Display) -> AppError {
    AppError::Storage(err.to_string())
}

/// Files a report for the verified caller. Anonim reports are stored under
/// the client-supplied hash and never under the caller's nik.
pub async fn create_report(
    repo: &dyn ReportRepo,
    ctx: &AuthContext,
    req: &CreateReportRequest,
) -> Result<Report, AppError> {
    let title = req.title.trim();
    let description = req.description.trim();
    if title.is_empty() || description.is_empty() {
        return Err(AppError::Validation(
            "Title and description are required".into(),
        ));
    }
    let tipe: ReportKind = req.tipe.trim().parse()?;
    let divisi: Division = req.divisi.trim().parse()?;

    let owner = match tipe {
        ReportKind::Anonim => req
            .user_nik_hash
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                AppError::Validation("userNikHash is required for anonymous reports".into())
            })?,
        ReportKind::Publik | ReportKind::Private => ctx.nik.as_str(),
    };

    let report = repo
        .insert_report(NewReport {
            title,
            description,
            tipe,
            divisi,
            owner,
        })
        .await
        .map_err(storage)?;

    if tipe == ReportKind::Anonim {
        info!(report_id = report.id, "anonymous report created");
    } else {
        info!(report_id = report.id, user_id = ctx.user_id, %tipe, "report created");
    }
    Ok(report)
}

pub async fn list_public(
    repo: &dyn ReportRepo,
    page: PageRequest,
) -> Result<(Vec<Report>, i64), AppError> {
    let total = repo.count_public().await.map_err(storage)?;
    let rows = repo
        .list_public(page.limit, page.offset())
        .await
        .map_err(storage)?;
    Ok((rows, total))
}

/// Picks the identifiers for `/laporan/my`. The nik always comes from the
/// verified context.
pub fn owner_filter<'a>(
    ctx: &'a AuthContext,
    q: &'a MyReportsQuery,
) -> Result<OwnerFilter<'a>, AppError> {
    let hash = q
        .user_hash
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty());
    let nik = Some(ctx.nik.as_str());

    match q.filter.as_deref().unwrap_or("nik") {
        "hash" => {
            let hash = hash.ok_or_else(|| {
                AppError::Validation("user_hash is required for hash filter".into())
            })?;
            Ok(OwnerFilter {
                nik: None,
                hash: Some(hash),
            })
        }
        "all" => Ok(OwnerFilter { nik, hash }),
        _ => Ok(OwnerFilter { nik, hash: None }),
    }
}

pub async fn list_mine(
    repo: &dyn ReportRepo,
    filter: OwnerFilter<'_>,
) -> Result<Vec<Report>, AppError> {
    repo.list_by_owner(filter).await.map_err(storage)
}
