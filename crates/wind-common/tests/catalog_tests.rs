//! Tests for the timestamp catalog.

use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime};
use test_utils::scan_listing_json;
use wind_common::{RasterSource, TimeSeriesCatalog, TimestampEntry, WindError};

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 11, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn entry(day: u32, hour: u32) -> TimestampEntry {
    TimestampEntry::new(at(day, hour), RasterSource::Combined(format!("wind_{}_{}.tif", day, hour)))
}

fn labels(entries: &[TimestampEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.label()).collect()
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_sorted_and_deduplicated() {
    let catalog = TimeSeriesCatalog::new(vec![entry(3, 0), entry(1, 0), entry(3, 0), entry(2, 0)]);
    assert_eq!(
        labels(catalog.entries()),
        vec!["2025-11-01 00:00", "2025-11-02 00:00", "2025-11-03 00:00"]
    );
}

#[test]
fn test_empty_catalog() {
    let catalog = TimeSeriesCatalog::new(vec![]);
    assert!(catalog.is_empty());
    assert!(catalog.span().is_none());
    assert!(catalog.compute_display_window().is_empty());
    assert!(catalog.nearest_to(at(1, 0)).is_none());
}

#[test]
fn test_from_scan_json() {
    let json = scan_listing_json(&[
        ("2025-11-15 12:00", "wind_12.tif", "wind_12.tif"),
        ("2025-11-15 06:00", "u_06.tif", "v_06.tif"),
    ]);
    let catalog = TimeSeriesCatalog::from_scan_json(&json).unwrap();

    assert_eq!(catalog.len(), 2);
    let first = &catalog.entries()[0];
    assert_eq!(first.label(), "2025-11-15 06:00");
    assert_eq!(
        first.source(),
        &RasterSource::Split {
            u: "u_06.tif".into(),
            v: "v_06.tif".into()
        }
    );
    assert_eq!(
        catalog.entries()[1].source(),
        &RasterSource::Combined("wind_12.tif".into())
    );
}

#[test]
fn test_scan_failure_reported() {
    let err = TimeSeriesCatalog::from_scan_json(r#"{"success":false,"message":"no rasters"}"#)
        .unwrap_err();
    assert!(matches!(err, WindError::Catalog(ref m) if m == "no rasters"));
}

#[test]
fn test_scan_malformed_json() {
    let err = TimeSeriesCatalog::from_scan_json("{not json").unwrap_err();
    assert!(matches!(err, WindError::Catalog(_)));
}

#[test]
fn test_iso_label_accepted() {
    let e = TimestampEntry::parse("2025-11-15T06:00", RasterSource::Combined("a".into())).unwrap();
    assert_eq!(e.time(), at(15, 6));
}

// ============================================================================
// Display window
// ============================================================================

#[test]
fn test_short_catalog_shown_in_full() {
    let catalog = TimeSeriesCatalog::new(vec![entry(1, 0), entry(3, 0), entry(5, 12)]);
    assert_eq!(catalog.compute_display_window().len(), 3);
}

#[test]
fn test_long_catalog_trimmed_to_suffix() {
    let entries: Vec<_> = (1..=10).map(|d| entry(d, 0)).collect();
    let catalog = TimeSeriesCatalog::new(entries);

    let window = catalog.compute_display_window();
    assert_eq!(labels(window).first(), Some(&"2025-11-05 00:00"));
    assert_eq!(labels(window).last(), Some(&"2025-11-10 00:00"));
    assert_eq!(window.len(), 6);
}

#[test]
fn test_custom_threshold() {
    let entries: Vec<_> = (0..24).map(|h| entry(1, h)).collect();
    let catalog = TimeSeriesCatalog::new(entries);
    assert_eq!(catalog.display_window(Duration::hours(6)).len(), 7);
}

// ============================================================================
// Nearest / current
// ============================================================================

#[test]
fn test_nearest_to() {
    let catalog = TimeSeriesCatalog::new(vec![entry(1, 0), entry(1, 6), entry(1, 12)]);
    assert_eq!(catalog.nearest_to(at(1, 7)).unwrap().label(), "2025-11-01 06:00");
    assert_eq!(catalog.nearest_to(at(20, 0)).unwrap().label(), "2025-11-01 12:00");
}

#[test]
fn test_nearest_tie_goes_to_earlier() {
    let catalog = TimeSeriesCatalog::new(vec![entry(1, 0), entry(1, 6)]);
    assert_eq!(catalog.nearest_to(at(1, 3)).unwrap().label(), "2025-11-01 00:00");
}

#[test]
fn test_current_at_uses_display_window() {
    let entries: Vec<_> = (1..=10).map(|d| entry(d, 0)).collect();
    let catalog = TimeSeriesCatalog::new(entries);
    // Day 1 is outside the window, so the oldest visible entry wins.
    assert_eq!(catalog.current_at(at(1, 0)).unwrap().label(), "2025-11-05 00:00");
}

#[test]
fn test_current_with_offset() {
    let catalog = TimeSeriesCatalog::new(vec![entry(1, 0)])
        .with_offset(FixedOffset::east_opt(7 * 3600).unwrap());
    assert_eq!(catalog.offset().local_minus_utc(), 7 * 3600);
    assert!(catalog.current().is_some());
}

// ============================================================================
// Lookup helpers
// ============================================================================

#[test]
fn test_find_and_next_after() {
    let catalog = TimeSeriesCatalog::new(vec![entry(1, 0), entry(1, 6), entry(1, 12)]);
    assert!(catalog.find("2025-11-01 06:00").is_some());
    assert!(catalog.find("2025-11-01 07:00").is_none());
    assert_eq!(
        catalog.next_after("2025-11-01 06:00").unwrap().label(),
        "2025-11-01 12:00"
    );
    assert!(catalog.next_after("2025-11-01 12:00").is_none());
}

#[test]
fn test_within_storm_period() {
    let entries: Vec<_> = (1..=6).map(|d| entry(d, 0)).collect();
    let catalog = TimeSeriesCatalog::new(entries);

    let storm = catalog.within(at(2, 0), Some(at(4, 0)));
    assert_eq!(storm.len(), 3);

    let ongoing = catalog.within(at(5, 0), None);
    assert_eq!(ongoing.len(), 2);
}
