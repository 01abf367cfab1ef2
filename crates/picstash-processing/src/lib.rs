//! Picstash Processing Library
//!
//! Image probing (format sniffing, dimension extraction) and the resize
//! primitive. All functions here are synchronous and CPU-bound; callers run
//! them on a blocking thread (`tokio::task::spawn_blocking`), never on the
//! async pool.

pub mod probe;
pub mod resize;

// Re-export commonly used types
pub use probe::{format_for_mime, ImageInfo, ImageProbe, ProbeError};
pub use resize::{ImageResize, ResizeDimensions, ResizeOutput};
