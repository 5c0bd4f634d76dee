use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use super::dto::{AnalyzeTextRequest, CancelResponse, PendingMealView};
use super::services::{self, AnalyzeError, ConfirmError};
use crate::{
    domain::{FoodLogEntry, TimeOffset},
    estimation::MealInput,
    session::{current_profile, CurrentSession},
    state::AppState,
};

const PHOTO_FIELD: &str = "photo";
const OFFSET_FIELD: &str = "offset";
const DEFAULT_PHOTO_MIME: &str = "image/jpeg";

pub fn meal_routes() -> Router<AppState> {
    Router::new()
        .route("/meals/analyze", post(analyze_text))
        .route("/meals/analyze/photo", post(analyze_photo))
        .route("/meals/confirm", post(confirm_meal))
        .route("/meals/pending", delete(cancel_pending))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB
}

#[instrument(skip(state, session, body))]
pub async fn analyze_text(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(body): Json<AnalyzeTextRequest>,
) -> Result<Json<PendingMealView>, (StatusCode, String)> {
    analyze(&state, session, MealInput::Text(body.description), body.offset).await
}

/// POST /meals/analyze/photo (multipart)
/// Fields: photo (image file), optional offset ("Just now", "30 mins ago", "1 hr ago")
#[instrument(skip(state, session, mp))]
pub async fn analyze_photo(
    State(state): State<AppState>,
    session: CurrentSession,
    mut mp: Multipart,
) -> Result<Json<PendingMealView>, (StatusCode, String)> {
    let mut photo = None;
    let mut offset = TimeOffset::default();

    while let Some(field) = mp.next_field().await.map_err(bad_request)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(PHOTO_FIELD) => {
                let mime_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| DEFAULT_PHOTO_MIME.into());
                if !mime_type.starts_with("image/") {
                    return Err((StatusCode::BAD_REQUEST, format!("unsupported photo type {mime_type}")));
                }
                let bytes = field.bytes().await.map_err(bad_request)?;
                photo = Some(MealInput::Image { bytes, mime_type });
            }
            Some(OFFSET_FIELD) => {
                let text = field.text().await.map_err(bad_request)?;
                offset = text.parse().map_err(bad_request)?;
            }
            _ => {}
        }
    }

    let input = photo.ok_or((StatusCode::BAD_REQUEST, "input needed".to_string()))?;
    analyze(&state, session, input, offset).await
}

async fn analyze(
    state: &AppState,
    session: CurrentSession,
    input: MealInput,
    offset: TimeOffset,
) -> Result<Json<PendingMealView>, (StatusCode, String)> {
    let mut session = session.handle.lock().await;
    let profile = current_profile(&mut session, state.store.as_ref()).await?;

    match services::analyze(state.estimator.as_ref(), &mut session, input, offset).await {
        Ok(pending) => Ok(Json(PendingMealView::new(&pending, profile.inflation_factor))),
        Err(e @ AnalyzeError::EmptyInput) => Err((StatusCode::BAD_REQUEST, e.to_string())),
        Err(e @ AnalyzeError::Estimation(_)) => Err((StatusCode::BAD_GATEWAY, e.to_string())),
    }
}

#[instrument(skip(state, session))]
pub async fn confirm_meal(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Result<(StatusCode, Json<FoodLogEntry>), (StatusCode, String)> {
    let mut session = session.handle.lock().await;

    match services::confirm(state.store.as_ref(), &mut session, OffsetDateTime::now_utc()).await {
        Ok(entry) => {
            info!(
                user_id = %entry.user_id,
                food = %entry.food_name,
                raw = entry.raw_calories,
                adjusted = entry.adjusted_calories,
                "meal saved"
            );
            Ok((StatusCode::CREATED, Json(entry)))
        }
        Err(e @ ConfirmError::ProfileRequired) => Err((StatusCode::PRECONDITION_FAILED, e.to_string())),
        Err(e @ ConfirmError::NothingPending) => {
            warn!(user_id = %session.user_id, "confirm with nothing pending");
            Err((StatusCode::CONFLICT, e.to_string()))
        }
        Err(ConfirmError::Store(e)) => {
            error!(error = %e, user_id = %session.user_id, "meal save failed, entry kept for retry");
            Err(internal(e))
        }
    }
}

#[instrument(skip(session))]
pub async fn cancel_pending(session: CurrentSession) -> Json<CancelResponse> {
    let cancelled = session.handle.lock().await.reset_stage();
    Json(CancelResponse { cancelled })
}

fn bad_request<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, e.to_string())
}

fn internal<E: std::error::Error>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
