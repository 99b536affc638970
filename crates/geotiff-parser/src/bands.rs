//! Assemble decoded rasters into a u/v `VectorFieldGrid`.

use tracing::{debug, warn};
use wind_common::{normalize_bounds, DataQuality, GeoBounds, VectorFieldGrid, WindResult};

use crate::decode::{decode_raster, DecodedRaster};
use crate::error::GeoTiffError;

/// Decode u/v rasters into a grid.
///
/// With one source, band 0 is u and band 1 is v; a missing v band is
/// zero-filled and the grid is flagged [`DataQuality::MissingV`]. With two
/// sources, band 0 of each is used and their dimensions must match.
pub fn decode_vector_field(u_bytes: &[u8], v_bytes: Option<&[u8]>) -> WindResult<VectorFieldGrid> {
    let u_raster = decode_raster(u_bytes)?;
    let v_raster = v_bytes.map(decode_raster).transpose()?;
    assemble_vector_field(u_raster, v_raster)
}

/// Combine already-decoded rasters; see [`decode_vector_field`].
pub fn assemble_vector_field(
    mut u_raster: DecodedRaster,
    v_raster: Option<DecodedRaster>,
) -> WindResult<VectorFieldGrid> {
    let (width, height) = (u_raster.width, u_raster.height);
    let raw_bounds = u_raster
        .bounds
        .or_else(|| v_raster.as_ref().and_then(|r| r.bounds));

    let (u, v, quality) = match v_raster {
        Some(mut v_raster) => {
            if (v_raster.width, v_raster.height) != (width, height) {
                return Err(GeoTiffError::band_mismatch(format!(
                    "u is {}x{}, v is {}x{}",
                    width, height, v_raster.width, v_raster.height
                ))
                .into());
            }
            let u = take_band(&mut u_raster, 0)?;
            let v = take_band(&mut v_raster, 0)?;
            (u, v, DataQuality::Complete)
        }
        None => {
            let u = take_band(&mut u_raster, 0)?;
            if u_raster.band_count() > 1 {
                let v = take_band(&mut u_raster, 1)?;
                (u, v, DataQuality::Complete)
            } else {
                warn!(
                    width = width,
                    height = height,
                    "Raster has a single band, v component set to zero"
                );
                (u, vec![0.0; width * height], DataQuality::MissingV)
            }
        }
    };

    let (bounds, fallback) = match raw_bounds {
        Some(raw) => {
            let normalized = normalize_bounds(raw);
            (normalized.bounds, normalized.degenerate)
        }
        None => {
            debug!("Raster has no georeference, using global coverage");
            (GeoBounds::GLOBAL, false)
        }
    };

    Ok(VectorFieldGrid::new(width, height, bounds, u, v)?
        .with_quality(quality)
        .with_bounds_fallback(fallback))
}

fn take_band(raster: &mut DecodedRaster, index: usize) -> Result<Vec<f32>, GeoTiffError> {
    raster
        .bands
        .get_mut(index)
        .map(std::mem::take)
        .ok_or_else(|| GeoTiffError::decode(format!("raster has no band {}", index)))
}
