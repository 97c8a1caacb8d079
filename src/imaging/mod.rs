//! Image processing: decode once, queue operations, encode lazily.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` + decoder orientation / ICC |
//! | **Auto-orient** | `DynamicImage::apply_orientation` |
//! | **Resize** | Lanczos3 `resize_exact`, gravity or entropy crop, letterbox overlay |
//! | **Rotate** | `rotate90/180/270`, bilinear resample for other angles |
//! | **Grayscale / duotone** | luma conversion, luminance gradient map |
//! | **Encode** | `image` PNG / JPEG / lossless WEBP / TIFF encoders |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for geometry and encoder tuning (unit testable)
//! - **Parameters**: [`TransformArgs`] and the types it is built from
//! - **Pipeline**: [`Pipeline`], the lazily evaluated decode handle
//! - **Operations**: Pixel work for each queued [`Operation`]
//! - **Duotone**: The two-colour gradient map

mod calculations;
pub mod duotone;
pub mod operations;
mod params;
mod pipeline;

pub use calculations::{
    MAX_EDGE, PngCompression, ResizePlan, exceeds_max_edge, fit_inside, fit_outside,
    gravity_offset, plan_resize, png_compression, png_quality_range, rotated_bounds,
    round_dimension,
};
pub use params::{
    CropFocus, Duotone, Fit, OutputFormat, Quality, Rgba, TransformArgs, TransformDefaults,
};
pub use pipeline::{EncodeDirective, Operation, Pipeline, PipelineError};
