use axum::{extract::State, Json};
use contracts::dashboards::d100_consumption_lookup::{
    LookupResponse, LookupStatus, QueryRequest, SearchMode,
};

use crate::dashboards::d100_consumption_lookup::{offered_modes, LookupError};
use crate::shared::errors::ApiJson;
use crate::state::AppState;
use crate::system::auth::extractor::CurrentSession;

/// GET /api/d100/search_modes
pub async fn search_modes(CurrentSession(session): CurrentSession) -> Json<Vec<SearchMode>> {
    Json(offered_modes(&session.role))
}

/// POST /api/d100/lookup
pub async fn lookup(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    ApiJson(request): ApiJson<QueryRequest>,
) -> Result<Json<LookupResponse>, LookupError> {
    tracing::info!(
        "D100 lookup by {} ({}): mode {}",
        session.username,
        session.role,
        request.search_mode
    );

    match state.lookup.lookup(&session, &request).await {
        Ok(response) => {
            if response.status == LookupStatus::NoRows {
                tracing::info!("D100 lookup: no rows");
            }
            Ok(Json(response))
        }
        Err(e) => {
            tracing::warn!("D100 lookup rejected: {}", e);
            Err(e)
        }
    }
}
