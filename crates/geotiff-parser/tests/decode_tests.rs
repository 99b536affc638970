//! Decoding tests against in-memory GeoTIFF fixtures.

use geotiff_parser::{assemble_vector_field, decode_raster, decode_vector_field, GeoTiffError};
use test_utils::{
    bbox, create_test_grid, random_wind, single_band_geotiff, uv_geotiff, vortex_wind, BandLayout,
    FixtureCompression, GeoTiffFixture,
};
use wind_common::{DataQuality, GeoBounds, WindError};

// ============================================================================
// Raw raster decoding
// ============================================================================

#[test]
fn test_decode_dimensions_and_values() {
    let data = create_test_grid(4, 3);
    let bytes = single_band_geotiff(4, 3, data.clone(), bbox::SMALL);

    let raster = decode_raster(&bytes).unwrap();
    assert_eq!(raster.width, 4);
    assert_eq!(raster.height, 3);
    assert_eq!(raster.band_count(), 1);
    assert_eq!(raster.band(0).unwrap(), data.as_slice());
}

#[test]
fn test_decode_reads_georeference() {
    let bytes = single_band_geotiff(4, 2, vec![0.0; 8], bbox::SOUTH_CHINA_SEA);
    let raster = decode_raster(&bytes).unwrap();
    assert_eq!(raster.bounds, Some([100.0, 5.0, 120.0, 25.0]));
}

#[test]
fn test_decode_without_georeference() {
    let bytes = GeoTiffFixture::new(2, 2).band(vec![1.0; 4]).encode();
    let raster = decode_raster(&bytes).unwrap();
    assert_eq!(raster.bounds, None);
}

#[test]
fn test_decode_interleaved_samples_as_bands() {
    let u = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let v = vec![-1.0, -2.0, -3.0, -4.0, -5.0, -6.0];
    let bytes = uv_geotiff(3, 2, u.clone(), v.clone(), bbox::SMALL);

    let raster = decode_raster(&bytes).unwrap();
    assert_eq!(raster.band_count(), 2);
    assert_eq!(raster.band(0).unwrap(), u.as_slice());
    assert_eq!(raster.band(1).unwrap(), v.as_slice());
}

#[test]
fn test_decode_two_directories_as_bands() {
    let bytes = GeoTiffFixture::new(2, 2)
        .band(vec![1.0; 4])
        .band(vec![2.0; 4])
        .layout(BandLayout::Directories)
        .encode();
    let raster = decode_raster(&bytes).unwrap();
    assert_eq!(raster.band_count(), 2);
    assert_eq!(raster.band(1).unwrap(), &[2.0; 4]);
}

#[test]
fn test_decode_compressed_interleaved() {
    let (u, v) = random_wind(7, 5, 25.0, 42);

    for compression in [
        FixtureCompression::Deflate,
        FixtureCompression::Lzw,
        FixtureCompression::PackBits,
    ] {
        let bytes = GeoTiffFixture::new(7, 5)
            .band(u.clone())
            .band(v.clone())
            .bbox(bbox::SMALL)
            .compression(compression)
            .encode();

        let raster = decode_raster(&bytes).unwrap();
        assert_eq!(raster.band(0).unwrap(), u.as_slice(), "{:?}", compression);
        assert_eq!(raster.band(1).unwrap(), v.as_slice(), "{:?}", compression);
    }
}

#[test]
fn test_decode_interleaved_no_data_reads_as_zero() {
    let bytes = uv_geotiff(2, 1, vec![f32::NAN, 1.5], vec![2.5, f32::INFINITY], bbox::SMALL);
    let raster = decode_raster(&bytes).unwrap();
    assert_eq!(raster.band(0).unwrap(), &[0.0, 1.5]);
    assert_eq!(raster.band(1).unwrap(), &[2.5, 0.0]);
}

#[test]
fn test_overview_directories_are_skipped() {
    let data = create_test_grid(4, 4);
    let bytes = GeoTiffFixture::new(4, 4)
        .band(data.clone())
        .bbox(bbox::SMALL)
        .overview(2, 2, vec![9.0; 4])
        .encode();

    let raster = decode_raster(&bytes).unwrap();
    assert_eq!((raster.width, raster.height), (4, 4));
    assert_eq!(raster.band_count(), 1);
    assert_eq!(raster.band(0).unwrap(), data.as_slice());
}

// ============================================================================
// Malformed input
// ============================================================================

#[test]
fn test_garbage_bytes_fail() {
    let result = decode_raster(b"definitely not a tiff file");
    assert!(result.is_err());

    let err: WindError = decode_vector_field(b"garbage", None).unwrap_err();
    assert!(matches!(err, WindError::Decode(_)));
}

#[test]
fn test_truncated_tiff_fails() {
    let bytes = single_band_geotiff(8, 8, vec![1.0; 64], bbox::SMALL);
    let truncated = &bytes[..bytes.len() / 2];
    assert!(decode_vector_field(truncated, None).is_err());
}

#[test]
fn test_decoded_sources_must_match() {
    let u = decode_raster(&GeoTiffFixture::new(2, 2).band(vec![0.0; 4]).encode()).unwrap();
    let v = decode_raster(&GeoTiffFixture::new(3, 3).band(vec![0.0; 9]).encode()).unwrap();

    let err = assemble_vector_field(u, Some(v)).unwrap_err();
    assert!(matches!(err, WindError::DimensionMismatch { .. }));
}

#[test]
fn test_band_mismatch_converts_to_dimension_mismatch() {
    let err: WindError = GeoTiffError::band_mismatch("3x3 vs 4x4").into();
    assert!(matches!(err, WindError::DimensionMismatch { .. }));
}

// ============================================================================
// Vector field assembly
// ============================================================================

#[test]
fn test_combined_file_uses_band_0_and_1() {
    let (u, v) = vortex_wind(5, 4, 10.0);
    let bytes = uv_geotiff(5, 4, u.clone(), v.clone(), bbox::SMALL);

    let grid = decode_vector_field(&bytes, None).unwrap();
    assert_eq!(grid.width(), 5);
    assert_eq!(grid.height(), 4);
    assert_eq!(grid.u(), u.as_slice());
    assert_eq!(grid.v(), v.as_slice());
    assert_eq!(grid.quality(), DataQuality::Complete);
    assert_eq!(grid.bounds(), GeoBounds::from_array(bbox::SMALL));
}

#[test]
fn test_interleaved_uv_with_overview() {
    let (u, v) = vortex_wind(4, 4, 12.0);
    let bytes = GeoTiffFixture::new(4, 4)
        .band(u.clone())
        .band(v.clone())
        .bbox(bbox::SOUTH_CHINA_SEA)
        .compression(FixtureCompression::Deflate)
        .overview(2, 2, vec![0.0; 4])
        .encode();

    let grid = decode_vector_field(&bytes, None).unwrap();
    assert_eq!((grid.width(), grid.height()), (4, 4));
    assert_eq!(grid.u(), u.as_slice());
    assert_eq!(grid.v(), v.as_slice());
    assert_eq!(grid.quality(), DataQuality::Complete);
    assert_eq!(grid.bounds(), GeoBounds::from_array(bbox::SOUTH_CHINA_SEA));
}

#[test]
fn test_single_band_zero_fills_v() {
    let bytes = single_band_geotiff(3, 3, vec![4.0; 9], bbox::SMALL);
    let grid = decode_vector_field(&bytes, None).unwrap();

    assert_eq!(grid.quality(), DataQuality::MissingV);
    assert!(grid.v().iter().all(|&v| v == 0.0));
    assert!(grid.speed().iter().all(|&s| s == 4.0));
}

#[test]
fn test_split_files() {
    let u = single_band_geotiff(3, 2, vec![3.0; 6], bbox::SMALL);
    let v = single_band_geotiff(3, 2, vec![4.0; 6], bbox::SMALL);

    let grid = decode_vector_field(&u, Some(&v)).unwrap();
    assert_eq!(grid.quality(), DataQuality::Complete);
    assert!(grid.speed().iter().all(|&s| (s - 5.0).abs() < 1e-6));
}

#[test]
fn test_split_files_mismatched_size() {
    let u = single_band_geotiff(3, 3, vec![1.0; 9], bbox::SMALL);
    let v = single_band_geotiff(4, 4, vec![1.0; 16], bbox::SMALL);

    let err = decode_vector_field(&u, Some(&v)).unwrap_err();
    assert!(matches!(err, WindError::DimensionMismatch { .. }));
}

#[test]
fn test_missing_georeference_uses_full_globe() {
    let bytes = GeoTiffFixture::new(2, 2)
        .band(vec![1.0; 4])
        .band(vec![1.0; 4])
        .encode();
    let grid = decode_vector_field(&bytes, None).unwrap();
    assert_eq!(grid.bounds(), GeoBounds::GLOBAL);
    assert!(!grid.bounds_fallback());
}

#[test]
fn test_inverted_extent_flags_fallback() {
    let bytes = uv_geotiff(2, 2, vec![1.0; 4], vec![1.0; 4], bbox::INVERTED);
    let grid = decode_vector_field(&bytes, None).unwrap();
    assert_eq!(grid.bounds(), GeoBounds::GLOBAL);
    assert!(grid.bounds_fallback());
}

#[test]
fn test_out_of_range_extent_is_clamped() {
    let bytes = uv_geotiff(4, 2, vec![0.0; 8], vec![0.0; 8], bbox::BEYOND_POLES);
    let grid = decode_vector_field(&bytes, None).unwrap();
    assert_eq!(grid.bounds().to_array(), [-180.0, -85.0, 180.0, 85.0]);
}
