use axum::{extract::State, http::header, response::IntoResponse, Json};
use contracts::system::auth::{LoginRequest, LoginResponse, SessionInfo};

use crate::dashboards::d100_consumption_lookup::offered_modes;
use crate::shared::errors::ApiJson;
use crate::state::AppState;
use crate::system::auth::extractor::CurrentSession;
use crate::system::auth::{AuthError, SessionContext};

fn session_info(session: SessionContext) -> SessionInfo {
    let search_modes = offered_modes(&session.role);
    SessionInfo {
        username: session.username,
        display_name: session.display_name,
        role: session.role,
        search_modes,
    }
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let session = state
        .users
        .authenticate(&request.username, &request.password)
        .await?;

    let access_token = state.sessions.issue(&session)?;
    let cookie = state.sessions.session_cookie(&access_token);

    let response = LoginResponse {
        access_token,
        session: session_info(session),
    };

    Ok(([(header::SET_COOKIE, cookie)], Json(response)))
}

/// POST /api/auth/logout
///
/// Sessions are stateless JWTs: this only expires the cookie. A token copied
/// out of it (or taken from the login response) stays valid until its `exp`,
/// so rotating `[cookie] key` is the way to revoke every session at once.
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    [(header::SET_COOKIE, state.sessions.expired_cookie())]
}

/// GET /api/auth/me
pub async fn me(CurrentSession(session): CurrentSession) -> Json<SessionInfo> {
    Json(session_info(session))
}
