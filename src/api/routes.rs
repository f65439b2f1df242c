// src/api/routes.rs
use actix_web::web;
use super::handlers;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::health_check))
        .route("/health", web::get().to(handlers::health_check))
        .route("/interactions", web::post().to(handlers::interactions));
}
