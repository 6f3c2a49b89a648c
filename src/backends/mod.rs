//! Inference backends for model-backed background removal
//!
//! - Tract backend (pure Rust, no external dependencies)

#[cfg(feature = "tract")]
pub mod tract;

#[cfg(feature = "tract")]
pub use self::tract::TractRemover;
