use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bearer token payload tying a household member to one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user ID, normalized
    pub sid: Uuid,   // session ID
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
    pub iss: String, // issuer
    pub aud: String, // audience
}
