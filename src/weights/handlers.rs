use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use super::dto::LogWeightRequest;
use crate::{
    domain::WeightSample,
    session::{profile_required, CurrentSession},
    state::AppState,
};

pub fn weight_routes() -> Router<AppState> {
    Router::new().route("/weights", post(log_weight))
}

#[instrument(skip(state, session))]
pub async fn log_weight(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(payload): Json<LogWeightRequest>,
) -> Result<(StatusCode, Json<WeightSample>), (StatusCode, String)> {
    if let Err(msg) = payload.validate() {
        warn!(%msg, "invalid weight");
        return Err((StatusCode::BAD_REQUEST, msg));
    }

    let session = session.handle.lock().await;
    profile_required(&session)?;

    let sample = WeightSample {
        date: OffsetDateTime::now_utc().date(),
        user_id: session.user_id.clone(),
        weight_kg: payload.weight_kg,
    };

    if let Err(e) = state.store.append_weight(&sample).await {
        error!(error = %e, user_id = %sample.user_id, "weight save failed");
        return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
    }

    info!(user_id = %sample.user_id, weight_kg = sample.weight_kg, "weight logged");
    Ok((StatusCode::CREATED, Json(sample)))
}
