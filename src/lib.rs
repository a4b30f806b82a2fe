//! Generation Fallback Gateway
//!
//! Serves text and image generation requests by trying a ranked catalog of
//! provider backends one after another until one succeeds.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;
pub mod response;

pub use error::{AppError, Result};

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use backend::traits::BackendInvoker;
use gateway::resolver::FallbackResolver;

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Arc<config::Settings>,
    pub resolver: Arc<FallbackResolver>,
    pub invoker: Arc<dyn BackendInvoker>,
    /// Cancelled on shutdown; each request resolves under a child token
    pub shutdown: CancellationToken,
}
