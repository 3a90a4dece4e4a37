//! HTTP inbound adapter exposing the gallery REST endpoints.

pub mod auth;
pub mod cache_control;
pub mod client_ip;
pub mod diagrams;
pub mod diagrams_dto;
pub mod error;
pub mod health;
pub mod og;
pub mod payload;
pub mod session;
pub mod session_config;
pub mod share;
pub mod state;

use actix_web::web;

pub use error::ApiResult;

/// Register every gallery route plus the extractor configuration.
///
/// Expects `web::Data<HttpState>` and `web::Data<HealthState>` to be
/// installed on the app.
///
/// # Examples
/// ```no_run
/// use actix_web::App;
/// use renderboard::inbound::http::configure;
///
/// let _app = App::new().configure(configure);
/// ```
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(payload::json_config())
        .app_data(payload::query_config())
        .service(auth::login)
        .service(auth::callback)
        .service(auth::logout)
        .service(auth::me)
        .service(diagrams::create_guest_diagram)
        .service(diagrams::create_diagram)
        .service(diagrams::list_diagrams)
        .service(diagrams::get_diagram)
        .service(diagrams::update_diagram)
        .service(diagrams::delete_diagram)
        .service(diagrams::share_diagram)
        .service(share::resolve_share)
        .service(og::snapshot)
        .service(health::ready)
        .service(health::live);
}
