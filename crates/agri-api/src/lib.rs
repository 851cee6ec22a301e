//! HTTP boundary for the control engine.
//!
//! Task submission, registry listing and reload, and health. Handlers only
//! enqueue work; everything after acceptance surfaces through process logs.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
