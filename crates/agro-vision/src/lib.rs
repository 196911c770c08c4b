//! # agro-vision
//!
//! The inference adapter behind the vision WebSocket: decode an uploaded
//! frame, ask a [`Detector`] for objects, outline them, and re-encode the
//! result as JPEG.

#![deny(unsafe_code)]

pub mod adapter;
pub mod annotate;
pub mod detector;
pub mod errors;

pub use adapter::{DEFAULT_JPEG_QUALITY, InferenceAdapter};
pub use detector::{Detection, Detector, PassthroughDetector, RemoteDetector};
pub use errors::{Result, VisionError};
