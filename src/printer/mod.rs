//! # Printer Module
//!
//! Paper-specific configuration.
//!
//! ## Modules
//!
//! - [`config`]: Paper profiles (58mm / 80mm)

pub mod config;

pub use config::PaperProfile;
