use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::{info, instrument};

use super::{dto::CalibrationResponse, services};
use crate::{
    session::{current_profile, CurrentSession},
    state::AppState,
};

pub fn calibration_routes() -> Router<AppState> {
    Router::new().route("/calibration", post(run_calibration))
}

#[instrument(skip(state, session))]
pub async fn run_calibration(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Result<Json<CalibrationResponse>, (StatusCode, String)> {
    let mut session = session.handle.lock().await;
    let profile = current_profile(&mut session, state.store.as_ref()).await?;

    let outcome = services::recalibrate(state.store.as_ref(), &profile).await;
    if outcome.persisted {
        if let Some(cached) = session.profile.as_mut() {
            cached.inflation_factor = outcome.result.inflation_factor();
        }
    }

    let response = CalibrationResponse::new(outcome, profile.inflation_factor);
    info!(
        user_id = %profile.user_id,
        factor = response.inflation_factor,
        message = %response.message,
        "calibration run"
    );
    Ok(Json(response))
}
