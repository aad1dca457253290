//! Image sorting pipeline components.
//!
//! - **discovery**: Find image files in a directory
//! - **validate**: Size and magic-byte checks before decoding
//! - **decode**: Decode and preprocess images under a timeout
//! - **channel**: Bounded channel for backpressure
//! - **categorizer**: Orchestrates preprocessing and inference per image
//! - **mover**: Moves categorized images into category folders

pub mod categorizer;
pub mod channel;
pub mod decode;
pub mod discovery;
pub mod mover;
pub mod validate;

// Re-exports for convenient access
pub use categorizer::Categorizer;
pub use decode::{DecodedImage, ImageDecoder};
pub use discovery::{FileDiscovery, ScanResult};
pub use mover::{FileMover, MoveRecord};
pub use validate::Validator;
