//! Collaborator services used around the transformation stages
//!
//! - [`format`]: output encoding rules and content types
//! - [`fetch`]: remote image retrieval

pub mod fetch;
pub mod format;

pub use fetch::{HttpFetcher, ImageFetcher};
pub use format::{EncodedImage, OutputFormatHandler, DEFAULT_QUALITY};
