use thiserror::Error;

use crate::detection::TrackId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown count direction `{0}` (expected left_to_right, right_to_left or both)")]
    UnknownDirection(String),

    #[error("cooldown_frames must be non-negative, got {0}")]
    NegativeCooldown(i64),

    #[error("{name} must be within [0, 1], got {value}")]
    InvalidFraction { name: &'static str, value: f32 },

    #[error("roi_y_min ({min}) is greater than roi_y_max ({max})")]
    InvalidRoi { min: f32, max: f32 },

    #[error("association_distance_factor must be finite and non-negative, got {0}")]
    InvalidAssociationFactor(f32),

    #[error("invalid frame dimensions {width}x{height}")]
    InvalidFrameDims { width: u32, height: u32 },

    #[error("frame is {}x{} but the session was built for {}x{}", .got.0, .got.1, .expected.0, .expected.1)]
    FrameDimsChanged {
        expected: (u32, u32),
        got: (u32, u32),
    },

    #[error("invalid detection for track {track_id}: {reason}")]
    InvalidDetection {
        track_id: TrackId,
        reason: &'static str,
    },

    #[error("invalid observation for track {track_id}: x = {x}")]
    InvalidObservation { track_id: TrackId, x: f32 },

    #[error("frame {got} arrived after frame {last}")]
    OutOfOrderFrame { last: u64, got: u64 },

    #[error("malformed dump at line {line}: {reason}")]
    Dump { line: usize, reason: String },

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML Error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
}
