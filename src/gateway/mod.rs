//! Gateway module - backend catalog and fallback resolution

pub mod catalog;
pub mod resolver;

pub use catalog::BackendCatalog;
pub use resolver::{AttemptOutcome, FallbackResolver, Resolution, ResolutionState};
