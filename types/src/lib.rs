//! Shared configuration and display types for resona.

pub mod formatting;
pub mod settings;

pub use settings::Settings;
