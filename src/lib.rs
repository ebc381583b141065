pub mod auth;
pub mod config;
pub mod tui;

/// Crate version with the short git hash appended when built from a checkout.
pub const VERSION: &str = env!("AZSCOPE_VERSION");
