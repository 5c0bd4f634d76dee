mod claims;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod registry;

use crate::state::AppState;
use axum::Router;

pub use extractors::{current_profile, profile_required, CurrentSession};
pub use registry::{PendingMeal, Session, SessionRegistry};

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::session_routes())
}
