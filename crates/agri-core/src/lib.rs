pub mod config;
pub mod error;
pub mod types;

pub use config::AgriConfig;
pub use error::{AgriError, Result};
pub use types::*;
