//! Speed coloring for the lap polyline
//!
//! Speeds are mapped onto a two-segment gradient: red -> yellow over the lower
//! half of `[min, max]`, then yellow -> cyan over the upper half (green falls
//! while blue rises). The polyline is
//! quantized into a fixed number of buckets so adjacent samples of the same
//! bucket share one drawn segment.

use lapview_core::{GeoPoint, TrackPoint};

/// Color of a degenerate (`min == max`) range
pub const FLAT_RANGE_COLOR: &str = "#00FF00";

/// CSS color for `speed` within `[min_speed, max_speed]`
pub fn color_for_speed(speed: f64, min_speed: f64, max_speed: f64) -> String {
    let range = max_speed - min_speed;
    if range <= 0.0 || !range.is_finite() {
        return FLAT_RANGE_COLOR.to_string();
    }
    let ratio = ((speed - min_speed) / range).clamp(0.0, 1.0);

    let (r, g, b) = if ratio < 0.5 {
        (255.0, 255.0 * ratio * 2.0, 0.0)
    } else {
        let upper = (ratio - 0.5) * 2.0;
        (255.0 * (1.0 - upper), 255.0, 255.0 * upper)
    };
    format!(
        "rgb({},{},{})",
        r.round() as u8,
        g.round() as u8,
        b.round() as u8
    )
}

/// Bucket (0-based) a speed falls into; degenerate ranges use the top bucket
pub fn speed_bucket(speed: f64, min_speed: f64, max_speed: f64, buckets: usize) -> usize {
    let buckets = buckets.max(1);
    let range = max_speed - min_speed;
    if range <= 0.0 || !range.is_finite() {
        return buckets - 1;
    }
    let ratio = ((speed - min_speed) / range).clamp(0.0, 1.0);
    ((ratio * buckets as f64) as usize).min(buckets - 1)
}

/// Representative color of a bucket (the color of its center speed)
pub fn bucket_color(bucket: usize, min_speed: f64, max_speed: f64, buckets: usize) -> String {
    let buckets = buckets.max(1);
    let center = (bucket.min(buckets - 1) as f64 + 0.5) / buckets as f64;
    color_for_speed(
        min_speed + center * (max_speed - min_speed),
        min_speed,
        max_speed,
    )
}

/// One drawable run of same-bucket polyline
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedSegment {
    pub bucket: usize,
    pub color: String,
    pub path: Vec<GeoPoint>,
}

/// Split a point sequence into color segments
///
/// Each step `i -> i + 1` is colored by its mean speed. Consecutive steps in
/// the same bucket extend the current segment; segments share their boundary
/// point so the drawn line stays continuous.
pub fn build_speed_segments(
    points: &[TrackPoint],
    min_speed: f64,
    max_speed: f64,
    buckets: usize,
) -> Vec<SpeedSegment> {
    let mut segments: Vec<SpeedSegment> = Vec::new();

    for pair in points.windows(2) {
        let mean = (pair[0].speed.0 + pair[1].speed.0) / 2.0;
        let bucket = speed_bucket(mean, min_speed, max_speed, buckets);

        match segments.last_mut() {
            Some(current) if current.bucket == bucket => current.path.push(pair[1].position()),
            _ => segments.push(SpeedSegment {
                bucket,
                color: bucket_color(bucket, min_speed, max_speed, buckets),
                path: vec![pair[0].position(), pair[1].position()],
            }),
        }
    }
    segments
}
