//! D100: consumption lookup by account ("Suministro") or distribution point (SED).

pub mod query;
pub mod series;
pub mod service;
pub mod statistics;

pub use query::{build_query, offered_modes, LookupError, QuerySettings};
pub use service::{LookupOutcome, LookupService};
