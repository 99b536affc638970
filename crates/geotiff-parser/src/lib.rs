//! GeoTIFF decoding for gridded wind components.
//!
//! Rasters carry 32-bit float wind components in m/s. A single file holds
//! band 0 = u and band 1 = v; alternatively u and v arrive as two files whose
//! dimensions must agree.
//!
//! Bands may be pixel-interleaved samples of one image directory (the usual
//! layout), band-planar, or one directory per band. Overview and mask
//! directories are ignored.
//!
//! # Georeferencing
//!
//! The extent is read from the `ModelPixelScale` + `ModelTiepoint` tag pair, or
//! from `ModelTransformation`. Files with neither report no bounds, and
//! [`decode_vector_field`] places them on the full globe.

pub mod bands;
mod chunks;
pub mod decode;
pub mod error;

pub use bands::{assemble_vector_field, decode_vector_field};
pub use decode::{decode_raster, DecodedRaster};
pub use error::{GeoTiffError, GeoTiffResult};
