// web-server/src/api/mod.rs
pub mod auth;
pub mod channels;

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(
        actix_web::web::scope("/api")
            .service(auth::login)
            .service(auth::me)
            .service(auth::logout)
            // stats route must be registered before the {channel_id} catch-all
            .service(channels::stats_overview)
            .service(channels::list_channels)
            .service(channels::get_channel)
            .service(channels::update_channel)
            .service(channels::delete_channel),
    );
}
