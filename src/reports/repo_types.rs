use std::{fmt, str::FromStr};

use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::error::AppError;

/// Visibility of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Publik,
    Private,
    /// Filed under a client-computed hash instead of the caller's nik.
    Anonim,
}

impl ReportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::Publik => "publik",
            ReportKind::Private => "private",
            ReportKind::Anonim => "anonim",
        }
    }
}

impl FromStr for ReportKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "publik" => Ok(ReportKind::Publik),
            "private" => Ok(ReportKind::Private),
            "anonim" => Ok(ReportKind::Anonim),
            _ => Err(AppError::Validation(
                "Tipe must be one of: publik, private, anonim".into(),
            )),
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Department a report is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Division {
    #[serde(rename = "kebersihan")]
    Kebersihan,
    #[serde(rename = "kesehatan")]
    Kesehatan,
    #[serde(rename = "fasilitas umum")]
    FasilitasUmum,
    #[serde(rename = "kriminalitas")]
    Kriminalitas,
}

impl Division {
    pub fn as_str(self) -> &'static str {
        match self {
            Division::Kebersihan => "kebersihan",
            Division::Kesehatan => "kesehatan",
            Division::FasilitasUmum => "fasilitas umum",
            Division::Kriminalitas => "kriminalitas",
        }
    }
}

impl FromStr for Division {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kebersihan" => Ok(Division::Kebersihan),
            "kesehatan" => Ok(Division::Kesehatan),
            "fasilitas umum" => Ok(Division::FasilitasUmum),
            "kriminalitas" => Ok(Division::Kriminalitas),
            _ => Err(AppError::Validation(
                "Divisi must be one of: kebersihan, kesehatan, fasilitas umum, kriminalitas".into(),
            )),
        }
    }
}

/// Row in the `laporan` table. `tipe` and `divisi` are kept as stored text;
/// the table's CHECK constraints hold them to the enum values.
#[derive(Debug, Clone, FromRow)]
pub struct Report {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub tipe: String,
    pub divisi: String,
    pub user_nik: String, // nik, or the anonymous hash for anonim reports
    pub status: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewReport<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub tipe: ReportKind,
    pub divisi: Division,
    pub owner: &'a str,
}

/// Which of a caller's reports to list. Identifiers that are `None` match
/// nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerFilter<'a> {
    /// Matches publik and private reports filed under this nik.
    pub nik: Option<&'a str>,
    /// Matches anonim reports filed under this hash.
    pub hash: Option<&'a str>,
}

pub const INITIAL_STATUS: &str = "pending";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_values_only() {
        assert_eq!("anonim".parse::<ReportKind>().unwrap(), ReportKind::Anonim);
        assert!("Publik".parse::<ReportKind>().is_err());
        assert_eq!(
            "fasilitas umum".parse::<Division>().unwrap(),
            Division::FasilitasUmum
        );
        assert!("fasilitas_umum".parse::<Division>().is_err());
    }

    #[test]
    fn serializes_as_stored_text() {
        assert_eq!(
            serde_json::to_value(Division::FasilitasUmum).unwrap(),
            "fasilitas umum"
        );
        assert_eq!(serde_json::to_value(ReportKind::Private).unwrap(), "private");
    }
}
