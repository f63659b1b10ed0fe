//! Utility functions for numeric casts and OpenCV interop.

pub mod safe_cast;
#[cfg(feature = "opencv")]
pub mod image_conversion;
