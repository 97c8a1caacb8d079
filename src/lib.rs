//! # pixfan
//!
//! Fan one source image out into many output variants. A caller names the
//! source and a list of transforms (target format, size, fit, rotation,
//! grayscale, duotone, encoder tuning); pixfan decodes the source once and
//! produces every output in parallel.
//!
//! # Architecture
//!
//! ```text
//!                        ┌─▶ clone ─▶ compose ─▶ dispatch ─▶ out/a.webp
//! source ─▶ Pipeline::open ─▶ clone ─▶ compose ─▶ dispatch ─▶ out/b.png
//!                        └─▶ clone ─▶ compose ─▶ dispatch ─▶ out/c.jpg
//! ```
//!
//! 1. **Decode**: [`imaging::Pipeline::open`] reads the source, its EXIF
//!    orientation and its ICC profile. Failure here is fatal to the batch.
//! 2. **Compose**: [`compose::compose`] queues the conditional steps for one
//!    transform's args in a fixed order and stages the output encoding.
//! 3. **Dispatch**: [`dispatch::dispatch`] either writes the native encoding
//!    directly or routes an intermediate encoding through a
//!    [`compress::Recompressor`]. Failure here affects that transform only.
//!
//! Output file names usually embed [`fingerprint::fingerprint`], a short hash
//! of the args that influence the output bytes.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`process`] | Batch orchestration: decode once, fan out on rayon, collect outcomes |
//! | [`compose`] | Args → queued pipeline steps |
//! | [`dispatch`] | Format-specific encode path and file write |
//! | [`fingerprint`] | Five-character args fingerprint |
//! | [`imaging`] | Lazy decode handle, pixel operations, parameter types |
//! | [`compress`] | Lossy PNG / mozjpeg / lossy WEBP re-compressors |
//! | [`request`] | Transforms file loading, output naming, de-duplication |
//! | [`config`] | `pixfan.toml` loading, validation and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Decode, Many Clones
//!
//! Decoded pixels live behind an `Arc` and are never mutated. Each transform
//! clones the handle, which copies only the (empty) operation queue, so
//! transforms run concurrently without locks and without seeing each other's
//! steps.
//!
//! ## Recompression Behind a Trait
//!
//! The lossy encoders are the slow, native-code part of the system. Keeping
//! them behind [`compress::Recompressor`] lets tests substitute a mock that
//! records calls, and keeps dispatch logic testable without libwebp or
//! mozjpeg producing real bytes.

pub mod compose;
pub mod compress;
pub mod config;
pub mod dispatch;
pub mod fingerprint;
pub mod imaging;
pub mod output;
pub mod process;
pub mod request;
