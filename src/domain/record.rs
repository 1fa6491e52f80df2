// ============================================================
// Layer 3 - Trace Record Domain Type
// ============================================================
// One row of the archive's metadata table. The raw 3-channel
// waveform is NOT stored here; it lives in the waveform store
// and is looked up by `trace_name`.
//
// Column names follow the archive's CSV header so serde can
// deserialise rows directly. Extra columns are ignored.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Metadata for a single seismic trace. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Unique trace identifier, also the waveform store key
    pub trace_name: String,

    /// Sample index where the P phase arrives.
    /// Stored as a float in the archive (e.g. "700.0").
    pub p_arrival_sample: f64,

    /// Event magnitude, the regression target
    pub source_magnitude: f64,

    /// Magnitude-scale category, e.g. "ml" or "md"
    pub source_magnitude_type: String,

    pub source_longitude: f64,
    pub source_latitude: f64,
}

impl TraceRecord {
    /// Arrival offset as a sample index. Negative or NaN values clamp to 0.
    pub fn arrival_index(&self) -> usize {
        if self.p_arrival_sample.is_finite() && self.p_arrival_sample > 0.0 {
            self.p_arrival_sample as usize
        } else {
            0
        }
    }

    /// (longitude, latitude) pair
    pub fn position(&self) -> [f64; 2] {
        [self.source_longitude, self.source_latitude]
    }
}

/// Opaque magnitude-scale tag taken from configuration.
///
/// The archive schema decides what values exist ("ml", "md", ...);
/// the pipeline only ever compares tags for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MagnitudeScale(String);

impl MagnitudeScale {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// True if the record was measured on this scale
    pub fn matches(&self, record: &TraceRecord) -> bool {
        record.source_magnitude_type == self.0
    }
}

impl fmt::Display for MagnitudeScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
pub(crate) fn test_record(name: &str, arrival: f64, magnitude: f64, scale: &str) -> TraceRecord {
    TraceRecord {
        trace_name: name.to_string(),
        p_arrival_sample: arrival,
        source_magnitude: magnitude,
        source_magnitude_type: scale.to_string(),
        source_longitude: -117.5,
        source_latitude: 35.2,
    }
}
