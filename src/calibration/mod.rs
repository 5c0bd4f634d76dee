pub mod dto;
pub mod engine;
pub mod handlers;
pub mod regression;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::calibration_routes())
}
