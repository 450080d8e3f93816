// Web Server - main.rs
// MERKE Cloud dashboard gateway
mod api;
mod backend;
mod history;
mod live;
mod middleware;
mod session_store;
mod static_files;

use actix_web::{web, App, HttpServer};
use backend::BackendClient;
use common::{setup_tracing, Config};
use middleware::route_guard::RouteGuard;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    setup_tracing();

    let config = Config::from_env();

    let server_addr = config.web_server_addr.clone();
    let session_secret = config.session.secret.clone();
    let static_cfg = config.static_files.clone();

    tracing::info!("Starting MERKE Cloud dashboard gateway on {}", server_addr);
    tracing::info!("Backend API: {}", config.backend.base_url);
    tracing::info!("Realtime endpoint: {}", config.realtime_url);

    let backend = BackendClient::new(
        config.backend.base_url.clone(),
        config.backend.api_key.clone(),
    );

    let config_data = web::Data::new(config);
    let backend_data = web::Data::new(backend);

    HttpServer::new(move || {
        App::new()
            .app_data(config_data.clone())
            .app_data(backend_data.clone())
            .wrap(RouteGuard::new(&session_secret))
            .configure(api::configure)
            .configure(live::configure)
            .configure(|cfg| static_files::configure(cfg, &static_cfg))
    })
    .bind(&server_addr)?
    .run()
    .await
}
