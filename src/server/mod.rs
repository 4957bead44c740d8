//! HTTP surface: trail ingest and plot rendering.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod users;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::{config::ServerConfig, engine::plot::PlotRenderer, persist::files::TrailDirectory};

use self::{auth::Authenticator, users::UserRegistry};

pub use self::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub auth: Arc<dyn Authenticator>,
    pub trails: TrailDirectory,
    pub users: Arc<UserRegistry>,
}

impl AppState {
    pub fn new(config: ServerConfig, auth: Arc<dyn Authenticator>) -> Self {
        let users = UserRegistry::new(config.waypoint_cache_capacity, config.waypoint_cache_ttl);
        Self {
            trails: TrailDirectory::new(&config.data_dir),
            users: Arc::new(users),
            config: Arc::new(config),
            auth,
        }
    }

    pub fn renderer(&self) -> PlotRenderer {
        PlotRenderer {
            width: self.config.plot_width,
            height: self.config.plot_height,
            proximity_m: self.config.proximity_m,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;
    Router::new()
        .route("/trail/:user/:secret", post(handlers::post_trail))
        .route("/plot/:user/:secret/:params", get(handlers::get_plot))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
