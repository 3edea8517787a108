use serde::{Deserialize, Serialize};

use crate::dashboards::d100_consumption_lookup::SearchMode;
use crate::system::users::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "identifier")]
    pub username: String,
    #[serde(alias = "secret")]
    pub password: String,
}

/// What the client needs to render the post-login page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub username: String,
    pub display_name: String,
    pub role: Role,
    pub search_modes: Vec<SearchMode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // user identifier
    pub name: String,
    pub role: String,
    pub sid: String, // session id
    pub exp: usize,  // expiration timestamp
    pub iat: usize,  // issued at
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Same token as the session cookie, for clients using `Authorization: Bearer`
    pub access_token: String,
    pub session: SessionInfo,
}
