// web-server/src/static_files.rs
use actix_files::{Files, NamedFile};
use actix_web::{web, Error, HttpRequest, HttpResponse, Result};
use common::{Config, StaticFilesConfig};
use std::path::PathBuf;

// Serve the dashboard index for any unmatched page path (the dashboard is
// a single-page app with client-side routing under the guard's paths).
async fn spa_index(req: HttpRequest, config: web::Data<Config>) -> Result<HttpResponse, Error> {
    let path = req.path();
    if path.starts_with("/api/") || path.starts_with("/ws/") {
        return Ok(HttpResponse::NotFound().finish());
    }

    let index = PathBuf::from(&config.static_files.path).join(&config.static_files.index);
    let file = NamedFile::open(index)?;
    Ok(file.into_response(&req))
}

pub fn configure(cfg: &mut web::ServiceConfig, static_cfg: &StaticFilesConfig) {
    cfg.service(
        Files::new("/assets", &static_cfg.path)
            .prefer_utf8(true)
            .use_etag(true)
            .use_last_modified(true),
    )
    .default_service(web::route().to(spa_index));
}
