use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::{error, info, instrument, warn};

use super::{
    dto::{CreateProfileRequest, ProfileView},
    services,
};
use crate::{session::CurrentSession, state::AppState, store::StoreError};

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).post(create_profile))
}

#[instrument(skip(state, session))]
pub async fn get_profile(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Result<Json<ProfileView>, (StatusCode, String)> {
    let mut session = session.handle.lock().await;
    let stored = session
        .refresh_profile(state.store.as_ref())
        .await
        .map(|p| p.cloned());
    match stored {
        Ok(Some(profile)) => Ok(Json(ProfileView::from(profile))),
        Ok(None) => Err((StatusCode::NOT_FOUND, "profile setup required".into())),
        Err(e) => {
            error!(error = %e, user_id = %session.user_id, "profile lookup failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

#[instrument(skip(state, session))]
pub async fn create_profile(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(payload): Json<CreateProfileRequest>,
) -> Result<(StatusCode, Json<ProfileView>), (StatusCode, String)> {
    if let Err(msg) = payload.validate() {
        warn!(%msg, "invalid profile form");
        return Err((StatusCode::BAD_REQUEST, msg));
    }

    let mut session = session.handle.lock().await;
    if session.profile.is_some() {
        return Err((StatusCode::CONFLICT, "profile already exists".into()));
    }

    let user_id = session.user_id.clone();
    let profile = match services::create_profile(state.store.as_ref(), user_id, &payload).await {
        Ok(p) => p,
        Err(e @ StoreError::ProfileExists(_)) => {
            warn!(error = %e, "profile created elsewhere");
            return Err((StatusCode::CONFLICT, e.to_string()));
        }
        Err(e) => {
            error!(error = %e, user_id = %session.user_id, "profile save failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    info!(user_id = %profile.user_id, tdee = profile.tdee, "profile created");
    session.profile = Some(profile.clone());
    Ok((StatusCode::CREATED, Json(ProfileView::from(profile))))
}
