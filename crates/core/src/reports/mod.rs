//! Generic report executor.
//!
//! Pure validation of ad-hoc report requests against a static allow-list of
//! data sources. Execution against the store lives in the db crate.

pub mod error;
pub mod registry;
pub mod service;
pub mod types;


pub use error::ReportError;
pub use registry::{REGISTRY_VERSION, RegistryInfo, definition, describe};
pub use service::{MAX_FILTERS, MAX_IN_VALUES, ReportService, like_pattern};
pub use types::*;
