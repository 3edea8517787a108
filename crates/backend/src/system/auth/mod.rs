pub mod errors;
pub mod extractor;
pub mod jwt;
pub mod middleware;
pub mod password;

use contracts::system::users::Role;

pub use errors::AuthError;

/// Authenticated employee, passed explicitly to every role-gated handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub username: String,
    pub display_name: String,
    pub role: Role,
}
