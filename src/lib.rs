use crate::api::auth::ApiKey;
use axum::extract::State;
use std::sync::Arc;

pub mod api;
pub mod app_env;
pub mod db;
pub mod domain;
pub mod dto;
pub mod external_connections;
pub mod logging;
pub mod persistence;
pub mod routes;
pub mod routing_utils;

/// Data shared by every request handler
pub struct SharedData {
    pub ext_cxn: persistence::ExternalConnectivity,
    pub api_key: ApiKey,
}

/// Shorthand for the state extractor used by route handlers
pub type AppState = State<Arc<SharedData>>;
