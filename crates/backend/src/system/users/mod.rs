//! Credential resolution: where the employee list comes from and how it is cached.

pub mod file;
pub mod model;
pub mod service;
pub mod sheets;
pub mod source;

pub use model::UserRecord;
pub use service::UserDirectory;
pub use source::{UserSource, UserSourceError};
