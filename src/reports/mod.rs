use crate::state::ReportState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<ReportState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
