use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use tracing::{error, warn};
use uuid::Uuid;

use super::jwt::SessionKeys;
use super::registry::{Session, SessionHandle};
use crate::{domain::UserProfile, state::AppState, store::LogStore};

/// Session resolved from the bearer token.
pub struct CurrentSession {
    pub id: Uuid,
    pub handle: SessionHandle,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "missing Authorization header".into()))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or((StatusCode::UNAUTHORIZED, "invalid auth scheme".into()))?;

        let keys = SessionKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            (StatusCode::UNAUTHORIZED, "invalid or expired token".to_string())
        })?;

        let handle = state
            .sessions
            .get(claims.sid)
            .await
            .ok_or((StatusCode::UNAUTHORIZED, "session ended, log in again".into()))?;

        if handle.lock().await.user_id.as_str() != claims.sub {
            warn!(session_id = %claims.sid, "token subject does not match session");
            return Err((StatusCode::UNAUTHORIZED, "invalid or expired token".into()));
        }

        Ok(CurrentSession {
            id: claims.sid,
            handle,
        })
    }
}

/// Cached profile, or 412 when the one-time setup has not been done.
pub fn profile_required(session: &Session) -> Result<UserProfile, (StatusCode, String)> {
    session.profile.clone().ok_or((
        StatusCode::PRECONDITION_FAILED,
        "profile setup required".into(),
    ))
}

/// Profile as currently stored, refreshing the session's cache. 412 when
/// setup has not been done, 500 when the store cannot be read.
pub async fn current_profile(
    session: &mut Session,
    store: &dyn LogStore,
) -> Result<UserProfile, (StatusCode, String)> {
    let stored = session.refresh_profile(store).await.map(|p| p.cloned());
    match stored {
        Ok(Some(profile)) => Ok(profile),
        Ok(None) => Err((
            StatusCode::PRECONDITION_FAILED,
            "profile setup required".into(),
        )),
        Err(e) => {
            error!(error = %e, user_id = %session.user_id, "profile reload failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}
