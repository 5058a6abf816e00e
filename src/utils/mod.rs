//! Utility functions for vinscan
//!
//! Provides environment variable handling and logging setup.

pub mod env;
pub mod logging;

pub use env::{get_and_validate_api_key, get_api_url, load_env, validate_api_key};
pub use logging::init_logging;
