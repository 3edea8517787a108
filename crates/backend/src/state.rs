use std::sync::Arc;

use crate::dashboards::d100_consumption_lookup::LookupService;
use crate::system::auth::jwt::SessionKeys;
use crate::system::users::UserDirectory;

/// Process-wide handles shared by all requests
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionKeys>,
    pub users: Arc<UserDirectory>,
    pub lookup: Arc<LookupService>,
}
