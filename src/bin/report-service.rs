use warga_auth::{
    app::{build_report_app, init_tracing, serve},
    state::ReportState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("report_service=debug,warga_auth=debug,axum=info,tower_http=info");

    let app_state = ReportState::init().await?;
    serve(build_report_app(app_state), "8080").await
}
