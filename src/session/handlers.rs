use axum::{
    extract::{FromRef, Query, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use super::{
    dto::{LoginRequest, LoginResponse, LogoutResponse, MagicLink},
    extractors::CurrentSession,
    jwt::SessionKeys,
};
use crate::{domain::UserId, profile::dto::ProfileView, state::AppState};

pub fn session_routes() -> Router<AppState> {
    Router::new().route("/session", post(login).delete(logout))
}

pub(crate) fn is_valid_nickname(user_id: &UserId) -> bool {
    lazy_static! {
        static ref NICKNAME_RE: Regex = Regex::new(r"^[\p{L}\p{M}\p{N} _.\-]{1,64}$").unwrap();
    }
    NICKNAME_RE.is_match(user_id.as_str())
}

#[instrument(skip(state, previous, body))]
pub async fn login(
    State(state): State<AppState>,
    previous: Option<CurrentSession>,
    Query(link): Query<MagicLink>,
    body: Option<Json<LoginRequest>>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    let user_id = body
        .and_then(|Json(b)| b.user)
        .or(link.user)
        .ok_or((StatusCode::BAD_REQUEST, "nickname required".to_string()))?;

    if !is_valid_nickname(&user_id) {
        warn!(user_id = %user_id, "invalid nickname");
        return Err((StatusCode::BAD_REQUEST, "Invalid nickname".into()));
    }

    // Switching user ends the session the client was holding.
    if let Some(prev) = previous {
        if state.sessions.close(prev.id).await {
            info!(session_id = %prev.id, "previous session ended on user switch");
        }
    }

    let profile = match state.store.find_profile(&user_id).await {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, user_id = %user_id, "profile lookup failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let (session_id, handle) = state.sessions.open(user_id.clone(), profile.clone()).await;
    let expires_at = handle.lock().await.expires_at;

    let keys = SessionKeys::from_ref(&state);
    let token = match keys.sign(&user_id, session_id, expires_at) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "session token signing failed");
            state.sessions.close(session_id).await;
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let active_sessions = state.sessions.len().await;
    info!(
        user_id = %user_id,
        session_id = %session_id,
        needs_setup = profile.is_none(),
        active_sessions,
        "session started"
    );
    Ok(Json(LoginResponse {
        token,
        session_id,
        user_id,
        needs_setup: profile.is_none(),
        profile: profile.map(ProfileView::from),
    }))
}

#[instrument(skip(state, session))]
pub async fn logout(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Json<LogoutResponse> {
    let started_at = session.handle.lock().await.started_at;
    let minutes = (OffsetDateTime::now_utc() - started_at).whole_minutes();
    let ended = state.sessions.close(session.id).await;
    info!(session_id = %session.id, minutes, "session ended");
    Json(LogoutResponse { ended })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nickname_rules() {
        assert!(is_valid_nickname(&UserId::from("Mom")));
        assert!(is_valid_nickname(&UserId::from("Aunty Priya")));
        assert!(is_valid_nickname(&UserId::from(42_i64)));
        assert!(is_valid_nickname(&UserId::from("दादी")));
        assert!(!is_valid_nickname(&UserId::from("   ")));
        assert!(!is_valid_nickname(&UserId::from("drop;table")));
        assert!(!is_valid_nickname(&UserId::from("x".repeat(65))));
    }
}
