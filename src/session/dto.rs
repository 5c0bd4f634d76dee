use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::UserId;
use crate::profile::dto::ProfileView;

/// Request body for login; a household member picks or types a nickname.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub user: Option<UserId>,
}

/// `?user=` query parameter of a magic login link.
#[derive(Debug, Default, Deserialize)]
pub struct MagicLink {
    pub user: Option<UserId>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub session_id: Uuid,
    pub user_id: UserId,
    pub needs_setup: bool,
    pub profile: Option<ProfileView>,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub ended: bool,
}
