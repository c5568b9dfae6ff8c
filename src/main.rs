use warga_auth::{
    app::{build_auth_app, init_tracing, serve},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("warga_auth=debug,axum=info,tower_http=info");

    let app_state = AppState::init().await?;
    serve(build_auth_app(app_state), "8081").await
}
