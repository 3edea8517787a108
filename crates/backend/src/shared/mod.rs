pub mod config;
pub mod errors;
pub mod format;
pub mod google_auth;
pub mod warehouse;
